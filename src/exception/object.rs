//! The exception object carried from a throw site to its handler.
//!
//! An [`Exception`] bundles three things: the [`ExceptionType`] used for
//! matching, an arbitrary user payload, and the [`SourceLocation`] of the throw.
//! All three are fixed at construction; there are no setters.
//!
//! # Ownership
//!
//! The thrower creates the object and hands it to [`throw`](crate::engine::throw),
//! which binds it to the innermost handler frame. Unregistering that frame hands
//! it out again: to the handler of a
//! [`ProtectedRegion`](crate::engine::ProtectedRegion) directly, or through the
//! current-exception slot and
//! [`take_current_exception`](crate::engine::take_current_exception) for
//! hand-written constructs. The engine never keeps it beyond the dispatch that
//! delivers it; one it has to let go of is dropped outside the engine's state.
//!
//! Release is explicit ([`Exception::release`]) or implicit when the owner drops
//! it. Because release consumes the value, releasing twice or touching the object
//! afterwards does not compile.
//!
//! Payloads are `Box<dyn Any>` without a `Send` bound: exceptions stay on the
//! thread that threw them, and `Exception` is `!Send` as a consequence.

use std::{any::Any, fmt};

use crate::{
    exception::SourceLocation,
    typesystem::{ExceptionType, TypeRef},
};

/// A thrown (or about to be thrown) exception.
///
/// # Examples
///
/// ```rust
/// use exceptscope::{Exception, SourceLocation, BASE_EXCEPTION};
///
/// let e = Exception::at(&BASE_EXCEPTION, 404_u16, SourceLocation::new("f.c", 10));
/// assert_eq!(e.payload::<u16>(), Some(&404));
/// assert_eq!(e.location().to_string(), "f.c:10");
/// assert!(e.is_a(&BASE_EXCEPTION));
/// e.release();
/// ```
pub struct Exception {
    ty: TypeRef,
    payload: Box<dyn Any>,
    location: SourceLocation,
}

impl Exception {
    /// Creates an exception located at the caller.
    ///
    /// # Arguments
    ///
    /// * `ty`      - The type used for catch clause matching
    /// * `payload` - Arbitrary user data; use `()` when there is none
    #[must_use]
    #[track_caller]
    pub fn new<P: Any>(ty: TypeRef, payload: P) -> Self {
        Self::at(ty, payload, SourceLocation::caller())
    }

    /// Creates an exception with an explicit throw-site location.
    ///
    /// # Arguments
    ///
    /// * `ty`       - The type used for catch clause matching
    /// * `payload`  - Arbitrary user data
    /// * `location` - Where the exception is considered thrown from
    #[must_use]
    pub fn at<P: Any>(ty: TypeRef, payload: P, location: SourceLocation) -> Self {
        Self {
            ty,
            payload: Box::new(payload),
            location,
        }
    }

    /// The exception's type.
    #[must_use]
    pub fn exception_type(&self) -> TypeRef {
        self.ty
    }

    /// The payload, if it is of type `T`.
    #[must_use]
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// The payload as a type-erased reference.
    #[must_use]
    pub fn payload_any(&self) -> &dyn Any {
        self.payload.as_ref()
    }

    /// The throw-site location.
    #[must_use]
    pub fn location(&self) -> SourceLocation {
        self.location
    }

    /// Source file of the throw site.
    #[must_use]
    pub fn file(&self) -> &'static str {
        self.location.file
    }

    /// Line of the throw site.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.location.line
    }

    /// Checks whether the exception's type is `ty` or descends from it.
    #[must_use]
    pub fn is_a(&self, ty: &ExceptionType) -> bool {
        self.ty.is_a(ty)
    }

    /// Consumes the exception and returns its payload.
    #[must_use]
    pub fn into_payload(self) -> Box<dyn Any> {
        self.payload
    }

    /// Releases the exception and its payload.
    pub fn release(self) {
        drop(self);
    }
}

impl fmt::Debug for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exception")
            .field("type", &self.ty.name())
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} thrown at {}", self.ty, self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typesystem::{ASSERT_EXCEPTION, BASE_EXCEPTION};

    static BASE: ExceptionType = ExceptionType::root("Base");
    static DERIVED: ExceptionType = ExceptionType::derived("Derived", &BASE);
    static UNRELATED: ExceptionType = ExceptionType::root("Unrelated");

    #[test]
    fn derived_exception_is_a_base() {
        let e = Exception::new(&DERIVED, "payload");
        assert!(e.is_a(&BASE));
        assert!(e.is_a(&DERIVED));
        assert!(!e.is_a(&UNRELATED));
        assert_eq!(e.exception_type(), &DERIVED);
    }

    #[test]
    fn new_records_caller_location() {
        let line = line!() + 1;
        let e = Exception::new(&BASE_EXCEPTION, ());
        assert_eq!(e.line(), line);
        assert!(e.file().ends_with("object.rs"));
    }

    #[test]
    fn payload_downcast() {
        let e = Exception::at(
            &ASSERT_EXCEPTION,
            String::from("x > 0"),
            SourceLocation::new("a.rs", 3),
        );
        assert_eq!(e.payload::<String>().map(String::as_str), Some("x > 0"));
        assert!(e.payload::<u32>().is_none());
        assert!(e.payload_any().is::<String>());
        assert_eq!(e.to_string(), "AssertException thrown at a.rs:3");

        let payload = e.into_payload();
        assert_eq!(payload.downcast_ref::<String>().unwrap(), "x > 0");
    }
}
