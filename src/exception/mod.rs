//! Exception objects and source locations.
//!
//! - [`Exception`] - Typed, owned carrier of a payload and its throw site
//! - [`SourceLocation`] - `file:line` position used by all diagnostics

mod location;
mod object;

pub use location::SourceLocation;
pub use object::Exception;
