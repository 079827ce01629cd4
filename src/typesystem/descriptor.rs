//! Exception type descriptors and the is-a relation.
//!
//! An [`ExceptionType`] is a node in an immutable forest: it has a name for
//! diagnostics and an optional parent. Two descriptors are the same type only if
//! they are the same object, so equality, hashing and [`ExceptionType::is_a`]
//! all work on addresses and never look at names.
//!
//! Descriptors are normally declared as `static` items, which makes the whole
//! hierarchy available before `main` runs:
//!
//! ```rust
//! use exceptscope::{ExceptionType, BASE_EXCEPTION};
//!
//! static IO_ERROR: ExceptionType = ExceptionType::derived("IoError", &BASE_EXCEPTION);
//! static NOT_FOUND: ExceptionType = ExceptionType::derived("NotFound", &IO_ERROR);
//!
//! assert!(NOT_FOUND.is_a(&IO_ERROR));
//! assert!(NOT_FOUND.is_a(&BASE_EXCEPTION));
//! assert!(!IO_ERROR.is_a(&NOT_FOUND));
//! ```
//!
//! Types only known at runtime are declared through
//! [`TypeRegistry`](crate::typesystem::TypeRegistry).

use std::{
    borrow::Cow,
    fmt,
    hash::{Hash, Hasher},
    ptr,
};

use crate::{typesystem::MAX_HIERARCHY_DEPTH, Error, Result};

/// Reference to an exception type descriptor.
///
/// Descriptors are never freed, so every reference is `'static` and can be
/// copied into handler frames and exception objects freely.
pub type TypeRef = &'static ExceptionType;

/// Base exception type that all built-in types inherit from.
pub static BASE_EXCEPTION: ExceptionType = ExceptionType::root("BaseException");

/// Exception type thrown by [`except_assert!`](crate::except_assert).
pub static ASSERT_EXCEPTION: ExceptionType =
    ExceptionType::derived("AssertException", &BASE_EXCEPTION);

/// A node of the exception type forest.
///
/// See the [module documentation](self) for how descriptors are declared and
/// compared.
pub struct ExceptionType {
    /// Name used in diagnostics; not part of the type's identity
    name: Cow<'static, str>,
    /// The next type up the chain, `None` for a root
    parent: Option<TypeRef>,
}

impl ExceptionType {
    /// Creates a root type, a type without parent.
    ///
    /// # Arguments
    ///
    /// * `name` - Name shown in diagnostics
    #[must_use]
    pub const fn root(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            parent: None,
        }
    }

    /// Creates a type deriving from `parent`.
    ///
    /// # Arguments
    ///
    /// * `name`   - Name shown in diagnostics
    /// * `parent` - The direct ancestor of the new type
    #[must_use]
    pub const fn derived(name: &'static str, parent: TypeRef) -> Self {
        Self {
            name: Cow::Borrowed(name),
            parent: Some(parent),
        }
    }

    /// Creates a descriptor with a runtime name, used by the registry.
    pub(crate) fn named(name: String, parent: Option<TypeRef>) -> Self {
        Self {
            name: Cow::Owned(name),
            parent,
        }
    }

    /// The diagnostic name of this type.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The direct ancestor, or `None` for a root type.
    #[must_use]
    pub fn parent(&self) -> Option<TypeRef> {
        self.parent
    }

    /// Returns `true` if this type has no parent.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Iterates over this type and then each of its ancestors, ending with the root.
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors { next: Some(self) }
    }

    /// Checks whether this type is `other` or descends from it.
    ///
    /// Walks the ancestor chain starting at `self` (inclusive) and compares each
    /// node with `other` by address. The walk is O(depth) and ends at the first
    /// root, so types from unrelated roots never match.
    ///
    /// # Arguments
    ///
    /// * `other` - The candidate ancestor
    #[must_use]
    pub fn is_a(&self, other: &ExceptionType) -> bool {
        self.ancestors().any(|candidate| ptr::eq(candidate, other))
    }

    /// Number of ancestors above this type; a root has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.ancestors().count() - 1
    }

    /// The root at the top of this type's chain.
    #[must_use]
    pub fn root_type(&self) -> &ExceptionType {
        let mut current = self;
        while let Some(parent) = current.parent {
            current = parent;
        }
        current
    }

    /// Depth of this type, refusing chains longer than [`MAX_HIERARCHY_DEPTH`].
    ///
    /// Statically declared types can refer to each other in a cycle, which the
    /// compiler accepts. This bounded walk is how the registry rejects them
    /// before any is-a query can run into one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecursionLimit`] if the chain does not reach a root
    /// within [`MAX_HIERARCHY_DEPTH`] steps.
    pub fn checked_depth(&self) -> Result<usize> {
        let mut depth = 0;
        let mut current = self;
        while let Some(parent) = current.parent {
            depth += 1;
            if depth > MAX_HIERARCHY_DEPTH {
                return Err(Error::RecursionLimit(MAX_HIERARCHY_DEPTH));
            }
            current = parent;
        }
        Ok(depth)
    }
}

impl PartialEq for ExceptionType {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self, other)
    }
}

impl Eq for ExceptionType {}

impl Hash for ExceptionType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        ptr::hash(self, state);
    }
}

impl fmt::Display for ExceptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Debug for ExceptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionType")
            .field("name", &self.name)
            .field("parent", &self.parent.map(ExceptionType::name))
            .finish()
    }
}

/// Iterator over a type's ancestor chain, see [`ExceptionType::ancestors`].
#[derive(Clone, Debug)]
pub struct Ancestors<'a> {
    next: Option<&'a ExceptionType>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a ExceptionType;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent.map(|parent| parent as &'a ExceptionType);
        Some(current)
    }
}
