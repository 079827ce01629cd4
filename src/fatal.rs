//! Reporting and termination for fatal misuse.
//!
//! An uncaught exception or a broken frame stack means the protected-region
//! bookkeeping can no longer be trusted, so nothing is unwound through catch
//! clauses. The failure is reported once on stderr and through `log::error!`,
//! then the thread's [`FatalPolicy`] decides how the process ends.

use std::process;

use crate::{engine, Error, FatalPolicy};

/// Reports `error` and terminates according to the calling thread's policy.
///
/// Application code normally never calls this; the engine does when
/// [`throw`](crate::engine::throw), [`begin_block`](crate::engine::begin_block)
/// or [`end_block`](crate::engine::end_block) detect misuse. A custom
/// protected-region construct may call it for its own unrecoverable states so
/// that they are reported the same way.
pub fn terminate(error: Error) -> ! {
    terminate_with(error, engine::config().fatal_policy)
}

/// Reports `error` and terminates according to `policy`.
pub fn terminate_with(error: Error, policy: FatalPolicy) -> ! {
    let report = error.to_string();
    log::error!("{report}");

    match policy {
        FatalPolicy::Exit(code) => {
            eprintln!("{report}");
            process::exit(code)
        }
        FatalPolicy::Abort => {
            eprintln!("{report}");
            process::abort()
        }
        FatalPolicy::Panic => panic!("{report}"),
    }
}
