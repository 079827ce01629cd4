use thiserror::Error;

use crate::exception::SourceLocation;

macro_rules! misuse_error {
    // Frame operation reported at the construct's call site
    ($kind:expr, $location:expr) => {
        crate::Error::StackDiscipline {
            kind: $kind,
            location: $location,
        }
    };

    // Frame operation reported at the macro's own invocation site
    ($kind:expr) => {
        crate::Error::StackDiscipline {
            kind: $kind,
            location: crate::exception::SourceLocation::new(file!(), line!()),
        }
    };
}

/// The kind of stack discipline violation detected on a handler frame operation.
///
/// Both kinds indicate that a protected-region construct let control leave a
/// region without passing through [`end_block`](crate::engine::end_block), or
/// registered a frame whose storage does not follow the real call stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum DisciplineViolation {
    /// `end_block` was called with a frame that is not the top of the stack.
    #[strum(to_string = "frame is not the innermost active frame")]
    NotTopFrame,

    /// `end_block` was called while no frame is registered at all.
    #[strum(to_string = "no frame is registered")]
    EmptyStack,

    /// `begin_block` received a frame that is not deeper in the call stack than
    /// the current top frame.
    #[strum(to_string = "frame registered out of call-stack order")]
    OutOfOrder,
}

/// The generic Error type, which covers every failure this library can report.
///
/// Errors fall into two groups that are kept apart on purpose:
///
/// ## Fatal misuse
/// - [`Error::Uncaught`] - An exception was thrown with no handler frame registered
/// - [`Error::StackDiscipline`] - Frames were registered or unregistered out of order
/// - [`Error::StackDirectionUnknown`] - The validator could not probe the stack
/// - [`Error::NothingToRethrow`] - A rethrow found no current exception
///
/// These are never handed to catch clauses. The engine's free functions route
/// them through [`crate::fatal::terminate`], which reports and ends the process
/// according to the thread's [`FatalPolicy`](crate::FatalPolicy). The pure
/// [`ExecutionContext`](crate::engine::ExecutionContext) API returns them so they
/// can be inspected in tests.
///
/// ## Type system errors
/// - [`Error::RegistrySealed`] - Declaration attempted after the declaration phase
/// - [`Error::DuplicateType`] - A type name is already taken
/// - [`Error::TypeNotFound`] - Lookup by name failed
/// - [`Error::RecursionLimit`] - An ancestor chain is too deep or cyclic
///
/// # Examples
///
/// ```rust
/// use exceptscope::{Error, TypeRegistry};
///
/// let registry = TypeRegistry::new();
/// registry.seal();
///
/// match registry.declare("IoError", None) {
///     Err(Error::RegistrySealed(name)) => assert_eq!(name, "IoError"),
///     other => panic!("unexpected: {other:?}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// An exception was thrown while the thread had no handler frame.
    ///
    /// The location is the throw site recorded in the exception object.
    #[error("ERROR: Uncaught exception at {0}")]
    Uncaught(SourceLocation),

    /// A handler frame was pushed or popped in violation of stack discipline.
    ///
    /// # Fields
    ///
    /// * `kind` - What exactly went wrong
    /// * `location` - Call site of the offending `begin_block` / `end_block`
    #[error("{location}: BUG detected: {kind}. Check that you are not using break, continue, return or ? from within an exception block")]
    StackDiscipline {
        /// What exactly went wrong
        kind: DisciplineViolation,
        /// Call site of the offending frame operation
        location: SourceLocation,
    },

    /// The stack growth direction could not be determined.
    ///
    /// Two locals in nested, non-inlined calls ended up at the same address.
    /// This is an internal failure of the validator, not a caller bug.
    #[error("Unable to determine stack direction!")]
    StackDirectionUnknown,

    /// A rethrow found the current-exception slot empty, or a region landed
    /// with no exception bound to its frame.
    ///
    /// The slot was taken or cleared by the code between the landing and the
    /// rethrow, or `rethrow` was called from a region handler, which owns its
    /// exception instead. The location is the site that expected an exception.
    #[error("{0}: BUG detected: no current exception to rethrow")]
    NothingToRethrow(SourceLocation),

    /// The type registry no longer accepts declarations.
    ///
    /// The associated value is the name that was being declared.
    #[error("Type declaration phase is over, cannot declare - {0}")]
    RegistrySealed(String),

    /// A type with the same name is already registered.
    #[error("Exception type already declared - {0}")]
    DuplicateType(String),

    /// No type with the requested name is registered.
    #[error("Failed to find exception type - {0}")]
    TypeNotFound(String),

    /// Recursion limit reached.
    ///
    /// Walking an ancestor chain exceeded the allowed depth, which for
    /// statically declared types means the chain is cyclic.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),
}

impl Error {
    /// Returns `true` for the variants that must terminate the process.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Uncaught(_)
                | Error::StackDiscipline { .. }
                | Error::StackDirectionUnknown
                | Error::NothingToRethrow(_)
        )
    }

    /// The source location carried by the error, if any.
    #[must_use]
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            Error::Uncaught(location)
            | Error::NothingToRethrow(location)
            | Error::StackDiscipline { location, .. } => Some(*location),
            _ => None,
        }
    }
}
