//! # exceptscope Prelude
//!
//! The types, functions and macros needed to declare exception types, throw
//! and catch. Import this module to get all of them at once:
//!
//! ```rust
//! use exceptscope::prelude::*;
//! ```

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The error type for misuse and registry failures
pub use crate::Error;

/// The result type used throughout exceptscope
pub use crate::Result;

/// Engine configuration
pub use crate::{EngineConfig, FatalPolicy};

// ================================================================================================
// Exceptions and Types
// ================================================================================================

/// The exception object and its location
pub use crate::{Exception, SourceLocation};

/// Type descriptors and the registry
pub use crate::{declare_type, ExceptionType, TypeRef, TypeRegistry};

/// Built-in types
pub use crate::{ASSERT_EXCEPTION, BASE_EXCEPTION};

// ================================================================================================
// Throwing and Catching
// ================================================================================================

/// Throwing; `throw` is both the function and the macro
pub use crate::{rethrow, throw};

/// The ready-made try/catch/finally construct
pub use crate::engine::ProtectedRegion;

/// Current-exception access for hand-written constructs
pub use crate::engine::{
    begin_block, capture, end_block, take_current_exception, with_current_exception,
    HandlerFrame, Landing, ResumeTarget,
};

/// Assertion and location macros
pub use crate::{except_assert, location};
