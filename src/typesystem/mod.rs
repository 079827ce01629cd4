//! Exception type hierarchy.
//!
//! Exception types form a forest: each type has at most one parent and any
//! number of independent roots may coexist. Catch clauses name a type and
//! match every exception whose type is that type or one of its descendants.
//!
//! # Key Components
//!
//! - [`ExceptionType`] - An immutable type descriptor, compared by identity
//! - [`TypeRef`] - The `'static` reference handed around by frames and exceptions
//! - [`TypeRegistry`] - Runtime declaration and lookup by name
//! - [`BASE_EXCEPTION`] / [`ASSERT_EXCEPTION`] - Built-in types

mod descriptor;
mod registry;

pub use descriptor::{Ancestors, ExceptionType, TypeRef, ASSERT_EXCEPTION, BASE_EXCEPTION};
pub use registry::{declare_type, TypeRegistry, MAX_HIERARCHY_DEPTH};
