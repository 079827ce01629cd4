//! Non-local control transfer from a throw site to its landing site.
//!
//! A throw has to leave an arbitrary number of nested Rust calls and resume
//! inside the protected region that owns the selected frame. The engine does
//! this with the unwinding machinery Rust already has: [`transfer`] starts an
//! unwind whose payload is a [`Transfer`] addressed to one frame, and
//! [`capture`], which every region runs its body under, stops the unwind when
//! the address matches and hands the landing decision back to the region.
//!
//! Values owned by the skipped calls are dropped on the way, the same as for a
//! panic. Unwinds that are not transfers, or that are addressed to another
//! frame, pass through `capture` untouched.
//!
//! # Requirements
//!
//! - The crate must be built with `panic = "unwind"`; under `panic = "abort"`
//!   every throw aborts the process.
//! - A frame that a transfer can be addressed to must have its body running
//!   under [`capture`]. Frames registered by hand with
//!   [`begin_block`](crate::engine::begin_block) and no `capture` let the
//!   transfer escape and end the thread.

use std::panic::{self, AssertUnwindSafe};

use crate::engine::frame::{FrameId, HandlerFrame, ResumeTarget};

/// A landing decision in flight: which frame to stop at and where to resume.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transfer {
    /// The innermost frame at the time of the throw
    pub frame: FrameId,
    /// The clause or finally path selected in that frame
    pub target: ResumeTarget,
}

/// How the body run by [`capture`] ended.
#[derive(Debug, PartialEq, Eq)]
pub enum Landing<R> {
    /// The body returned normally.
    Completed(R),
    /// An exception was thrown to the frame; resume at the given target.
    Resumed(ResumeTarget),
}

impl<R> Landing<R> {
    /// Returns `true` if the body returned normally.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Landing::Completed(_))
    }
}

/// Runs `body` as the protected part of `frame`'s region.
///
/// # Arguments
///
/// * `frame` - The frame the region registered; transfers addressed to it land here
/// * `body`  - The protected code
///
/// # Returns
///
/// [`Landing::Completed`] with the body's value, or [`Landing::Resumed`] with
/// the target of a throw that selected `frame`. Anything else unwinding out of
/// `body` keeps unwinding.
pub fn capture<R>(frame: &HandlerFrame, body: impl FnOnce() -> R) -> Landing<R> {
    let payload = match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(value) => return Landing::Completed(value),
        Err(payload) => payload,
    };

    match payload.downcast::<Transfer>() {
        Ok(transfer) if transfer.frame == frame.id() => {
            log::trace!("landed in {} at {}", transfer.frame, transfer.target);
            Landing::Resumed(transfer.target)
        }
        Ok(transfer) => panic::resume_unwind(transfer),
        Err(other) => panic::resume_unwind(other),
    }
}

/// Starts unwinding toward the frame named in `transfer`.
///
/// Uses [`panic::resume_unwind`], so the panic hook does not run and nothing is
/// printed.
pub(crate) fn transfer(transfer: Transfer) -> ! {
    panic::resume_unwind(Box::new(transfer))
}
