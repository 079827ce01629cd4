//! Engine configuration.
//!
//! Configuration controls the debug facilities of the engine and what happens
//! when a fatal misuse is detected. It does not change dispatch semantics.
//!
//! # Scopes
//!
//! - A process-wide default, installed once with
//!   [`EngineConfig::install_global`] before threads start throwing
//! - A per-thread override, set with [`configure`](crate::engine::configure)
//!
//! A thread picks up the process default when its execution context is created,
//! on the first engine call made from that thread.
//!
//! # Presets
//!
//! - [`EngineConfig::debug()`] - Stack validation on, exit on fatal errors
//! - [`EngineConfig::release()`] - Stack validation off, exit on fatal errors
//! - [`EngineConfig::testing()`] - Stack validation on, panic on fatal errors
//!
//! # Example
//!
//! ```rust
//! use exceptscope::{EngineConfig, FatalPolicy};
//!
//! let config = EngineConfig::release()
//!     .with_fatal_policy(FatalPolicy::Abort)
//!     .with_trace_dispatch(true);
//! assert!(!config.check_stack);
//! ```

use std::{fmt, sync::OnceLock};

/// Exit status used by [`FatalPolicy::Exit`] in the default configuration.
pub const DEFAULT_EXIT_CODE: i32 = -1;

/// What the engine does after reporting a fatal misuse.
///
/// The report itself (stderr line plus a `log::error!` record) is emitted for
/// every policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FatalPolicy {
    /// Terminate with [`std::process::exit`] and the given status.
    Exit(i32),

    /// Terminate with [`std::process::abort`].
    Abort,

    /// Raise an ordinary Rust panic carrying the diagnostic.
    ///
    /// Protected regions never intercept it, so it behaves like any other panic
    /// and ends the thread unless something outside the engine catches it. Meant
    /// for test harnesses and embedders that isolate work with threads.
    Panic,
}

impl fmt::Display for FatalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalPolicy::Exit(code) => write!(f, "exit({code})"),
            FatalPolicy::Abort => f.write_str("abort"),
            FatalPolicy::Panic => f.write_str("panic"),
        }
    }
}

impl Default for FatalPolicy {
    fn default() -> Self {
        FatalPolicy::Exit(DEFAULT_EXIT_CODE)
    }
}

/// Engine configuration.
///
/// # Default Configuration
///
/// - Stack validation follows the build: on with `debug_assertions` or the
///   `stack-check` feature, off otherwise
/// - Fatal errors exit the process with status `-1`
/// - Per-dispatch tracing off
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Run the stack discipline validator on every `begin_block`.
    ///
    /// The validator determines the stack growth direction once per thread and
    /// rejects frames that are not deeper in the call stack than the current
    /// top frame.
    pub check_stack: bool,

    /// Behavior after a fatal misuse has been reported.
    pub fatal_policy: FatalPolicy,

    /// Emit a `trace` record for every dispatch decision.
    pub trace_dispatch: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            check_stack: cfg!(any(debug_assertions, feature = "stack-check")),
            fatal_policy: FatalPolicy::default(),
            trace_dispatch: false,
        }
    }
}

impl EngineConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stack validation on, exit on fatal errors.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            check_stack: true,
            ..Self::default()
        }
    }

    /// Stack validation off, exit on fatal errors.
    #[must_use]
    pub fn release() -> Self {
        Self {
            check_stack: false,
            ..Self::default()
        }
    }

    /// Stack validation on, fatal errors panic instead of ending the process.
    #[must_use]
    pub fn testing() -> Self {
        Self {
            check_stack: true,
            fatal_policy: FatalPolicy::Panic,
            trace_dispatch: true,
        }
    }

    /// Sets [`check_stack`](Self::check_stack).
    #[must_use]
    pub fn with_check_stack(mut self, enabled: bool) -> Self {
        self.check_stack = enabled;
        self
    }

    /// Sets [`fatal_policy`](Self::fatal_policy).
    #[must_use]
    pub fn with_fatal_policy(mut self, policy: FatalPolicy) -> Self {
        self.fatal_policy = policy;
        self
    }

    /// Sets [`trace_dispatch`](Self::trace_dispatch).
    #[must_use]
    pub fn with_trace_dispatch(mut self, enabled: bool) -> Self {
        self.trace_dispatch = enabled;
        self
    }

    /// Installs `self` as the process-wide default.
    ///
    /// Only the first call wins. Threads whose context already exists keep
    /// their configuration.
    ///
    /// # Errors
    ///
    /// Returns the rejected configuration if a default was installed before.
    pub fn install_global(self) -> Result<(), EngineConfig> {
        GLOBAL_CONFIG.set(self)
    }

    /// The process-wide default configuration.
    #[must_use]
    pub fn global() -> EngineConfig {
        GLOBAL_CONFIG.get().copied().unwrap_or_default()
    }
}

static GLOBAL_CONFIG: OnceLock<EngineConfig> = OnceLock::new();
