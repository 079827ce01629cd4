// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # exceptscope
//!
//! Typed throw / catch / finally for Rust code that needs exceptions with a
//! type hierarchy, per-thread handler frames and diagnostics for misuse.
//!
//! ## Features
//!
//! - **Type hierarchy** - Exception types form a forest; a catch clause matches
//!   its type and every descendant
//! - **Ordered clauses** - The first matching clause of the innermost frame wins
//! - **Finally paths** - Unmatched exceptions run the frame's cleanup and are
//!   rethrown to the enclosing frame
//! - **Thread isolation** - Every thread has its own frame stack and
//!   current-exception slot
//! - **Misuse detection** - Uncaught exceptions and frames left behind by an
//!   early exit from a region are reported with a source location
//!
//! ## Quick Start
//!
//! ```rust
//! use exceptscope::prelude::*;
//!
//! static CONFIG_ERROR: ExceptionType = ExceptionType::derived("ConfigError", &BASE_EXCEPTION);
//! static MISSING_KEY: ExceptionType = ExceptionType::derived("MissingKey", &CONFIG_ERROR);
//!
//! fn read_port(raw: Option<&str>) -> u16 {
//!     match raw {
//!         Some(value) => value.parse().unwrap_or(0),
//!         None => throw!(&MISSING_KEY, "port"),
//!     }
//! }
//!
//! let port = ProtectedRegion::new(|| read_port(None))
//!     .catch(&CONFIG_ERROR, |e| {
//!         assert!(e.is_a(&MISSING_KEY));
//!         8080
//!     })
//!     .finally(|| println!("config parsed"))
//!     .run();
//! assert_eq!(port, 8080);
//! ```
//!
//! ## Architecture
//!
//! - [`typesystem`] - Exception type descriptors and the runtime registry
//! - [`exception`] - The exception object and source locations
//! - [`engine`] - Frames, dispatch, control transfer and stack validation
//! - [`config`] - Debug facilities and the fatal error policy
//! - [`fatal`] - Reporting and termination for misuse
//!
//! ## Fatal Errors
//!
//! Misuse is never turned into an exception. An uncaught throw reports
//! `ERROR: Uncaught exception at <file>:<line>` and a broken frame stack reports
//! `<file>:<line>: BUG detected: ...`; by default the process then exits with
//! status `-1`. See [`FatalPolicy`] for the alternatives.
//!
//! ## Build Requirements
//!
//! Control transfer uses Rust unwinding, so the final binary must be built
//! with `panic = "unwind"` (the default).

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

pub mod config;
pub mod engine;
pub mod exception;
pub mod fatal;
pub mod prelude;
pub mod typesystem;

/// `exceptscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
///
/// # Examples
///
/// ```rust
/// use exceptscope::{Result, TypeRef, TypeRegistry};
///
/// fn declare_io(registry: &TypeRegistry) -> Result<TypeRef> {
///     registry.declare("IoError", None)
/// }
///
/// assert!(declare_io(&TypeRegistry::new()).is_ok());
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `exceptscope` Error type
///
/// Covers misuse of the engine and failures of the type registry. See
/// [`Error::is_fatal`] for how the two groups differ.
pub use error::{DisciplineViolation, Error};

/// Engine configuration and the fatal error policy.
pub use config::{EngineConfig, FatalPolicy, DEFAULT_EXIT_CODE};

/// The exception object and its throw-site location.
pub use exception::{Exception, SourceLocation};

/// Exception types, the registry and the built-in types.
pub use typesystem::{
    declare_type, ExceptionType, TypeRef, TypeRegistry, ASSERT_EXCEPTION, BASE_EXCEPTION,
};

/// The operations most code needs from the engine.
pub use engine::{
    begin_block, end_block, rethrow, take_current_exception, throw, HandlerFrame,
    ProtectedRegion,
};
