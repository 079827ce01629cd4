//! Runtime declaration of exception types.
//!
//! Most programs declare their exception types as `static` items. The
//! [`TypeRegistry`] covers the remaining cases: types whose names are only known
//! at runtime (plugins, scripting layers, generated bindings) and programs that
//! want to look types up by name.
//!
//! # Declaration Phase
//!
//! A registry accepts declarations until [`TypeRegistry::seal`] is called. After
//! that it is read-only, which matches the rule that every type must exist before
//! the first throw that uses it. Sealing is a one-way switch.
//!
//! # Thread Safety
//!
//! Storage is an append-only [`boxcar::Vec`] plus a [`DashMap`] name index, so
//! declarations and lookups from several threads need no external locking.
//! Descriptors are leaked on declaration; their address is their identity and
//! must stay valid for the rest of the process.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    OnceLock,
};

use dashmap::{mapref::entry::Entry, DashMap};

use crate::{
    typesystem::{ExceptionType, TypeRef, ASSERT_EXCEPTION, BASE_EXCEPTION},
    Error, Result,
};

/// Longest ancestor chain the registry accepts.
pub const MAX_HIERARCHY_DEPTH: usize = 256;

/// Registry of exception types, indexed by name.
///
/// # Examples
///
/// ```rust
/// use exceptscope::{TypeRegistry, BASE_EXCEPTION};
///
/// let registry = TypeRegistry::new();
/// let io = registry.declare("IoError", Some(&BASE_EXCEPTION))?;
/// let timeout = registry.declare("Timeout", Some(io))?;
/// registry.seal();
///
/// assert!(timeout.is_a(io));
/// assert_eq!(registry.get("Timeout"), Some(timeout));
/// # Ok::<(), exceptscope::Error>(())
/// ```
pub struct TypeRegistry {
    /// Every registered type, in registration order
    types: boxcar::Vec<TypeRef>,
    /// Name index; names are unique within one registry
    by_name: DashMap<String, TypeRef>,
    /// Set once the declaration phase is over
    sealed: AtomicBool,
}

impl TypeRegistry {
    /// Creates a registry holding the built-in types.
    ///
    /// [`BASE_EXCEPTION`] and [`ASSERT_EXCEPTION`] are registered up front so
    /// they can be found by name like any declared type.
    #[must_use]
    pub fn new() -> Self {
        let registry = Self::empty();
        for builtin in [&BASE_EXCEPTION, &ASSERT_EXCEPTION] {
            registry.insert(builtin);
        }
        registry
    }

    /// Creates a registry without any types.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            types: boxcar::Vec::new(),
            by_name: DashMap::new(),
            sealed: AtomicBool::new(false),
        }
    }

    /// The process-wide registry used by [`declare_type`].
    pub fn global() -> &'static TypeRegistry {
        static GLOBAL: OnceLock<TypeRegistry> = OnceLock::new();
        GLOBAL.get_or_init(TypeRegistry::new)
    }

    /// Declares a new exception type.
    ///
    /// The descriptor gets a `'static` address that stays valid for the rest of
    /// the process, so the returned [`TypeRef`] can be stored anywhere.
    ///
    /// # Arguments
    ///
    /// * `name`   - Unique name within this registry
    /// * `parent` - Direct ancestor, `None` for a new root
    ///
    /// # Errors
    ///
    /// - [`Error::RegistrySealed`] if the declaration phase is over
    /// - [`Error::DuplicateType`] if `name` is already taken
    /// - [`Error::RecursionLimit`] if the parent chain is too deep or cyclic
    pub fn declare(&self, name: impl Into<String>, parent: Option<TypeRef>) -> Result<TypeRef> {
        let name = name.into();
        if self.is_sealed() {
            return Err(Error::RegistrySealed(name));
        }

        if let Some(parent) = parent {
            if parent.checked_depth()? >= MAX_HIERARCHY_DEPTH {
                return Err(Error::RecursionLimit(MAX_HIERARCHY_DEPTH));
            }
        }

        match self.by_name.entry(name) {
            Entry::Occupied(slot) => Err(Error::DuplicateType(slot.key().clone())),
            Entry::Vacant(slot) => {
                let declared: TypeRef =
                    Box::leak(Box::new(ExceptionType::named(slot.key().clone(), parent)));
                slot.insert(declared);
                self.types.push(declared);

                log::debug!(
                    "declared exception type {} (parent: {})",
                    declared,
                    parent.map_or("<root>", ExceptionType::name)
                );
                Ok(declared)
            }
        }
    }

    /// Registers a statically declared type so it can be found by name.
    ///
    /// Registering the same descriptor twice is a no-op.
    ///
    /// # Errors
    ///
    /// - [`Error::RegistrySealed`] if the declaration phase is over
    /// - [`Error::DuplicateType`] if a different type already uses the name
    /// - [`Error::RecursionLimit`] if the type's ancestor chain is cyclic
    pub fn register(&self, ty: TypeRef) -> Result<TypeRef> {
        if self.is_sealed() {
            return Err(Error::RegistrySealed(ty.name().to_string()));
        }
        ty.checked_depth()?;

        match self.by_name.entry(ty.name().to_string()) {
            Entry::Occupied(slot) if *slot.get() == ty => Ok(ty),
            Entry::Occupied(slot) => Err(Error::DuplicateType(slot.key().clone())),
            Entry::Vacant(slot) => {
                slot.insert(ty);
                self.types.push(ty);
                Ok(ty)
            }
        }
    }

    fn insert(&self, ty: TypeRef) {
        self.by_name.insert(ty.name().to_string(), ty);
        self.types.push(ty);
    }

    /// Ends the declaration phase; further declarations fail.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    /// Returns `true` once [`seal`](Self::seal) has been called.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Looks up a type by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<TypeRef> {
        self.by_name.get(name).map(|entry| *entry.value())
    }

    /// Looks up a type by name, failing with [`Error::TypeNotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeNotFound`] if no type is registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<TypeRef> {
        self.get(name)
            .ok_or_else(|| Error::TypeNotFound(name.to_string()))
    }

    /// Returns `true` if this exact descriptor is registered.
    #[must_use]
    pub fn contains(&self, ty: &ExceptionType) -> bool {
        self.get(ty.name()).is_some_and(|found| found == ty)
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.count()
    }

    /// Returns `true` if no type is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over all registered types in registration order.
    pub fn iter(&self) -> impl Iterator<Item = TypeRef> + '_ {
        self.types.iter().map(|(_, ty)| *ty)
    }

    /// Iterates over the registered root types.
    pub fn roots(&self) -> impl Iterator<Item = TypeRef> + '_ {
        self.iter().filter(|ty| ty.is_root())
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Declares a type in the [global registry](TypeRegistry::global).
///
/// # Errors
///
/// See [`TypeRegistry::declare`].
pub fn declare_type(name: impl Into<String>, parent: Option<TypeRef>) -> Result<TypeRef> {
    TypeRegistry::global().declare(name, parent)
}
