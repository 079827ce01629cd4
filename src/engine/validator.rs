//! Stack discipline validator.
//!
//! The engine cannot see the real call stack, but it can compare addresses.
//! A frame registered by a nested region lives in a deeper activation record
//! than the frame of the region enclosing it, so its address is further from
//! the stack origin. Which way "further" points depends on the platform and is
//! probed once per thread by [`find_stack_direction`].
//!
//! A frame that is *not* deeper than the current top means the previous region
//! was left without unregistering (an early `return`, `break` or `?` out of a
//! hand-written construct), and its stale frame is still on the stack.

use std::hint::black_box;

use crate::{Error, Result};

/// Direction in which the call stack grows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
pub enum StackDirection {
    /// Toward lower addresses (x86, x86_64, AArch64, RISC-V, ...).
    #[strum(to_string = "downward")]
    Downward,
    /// Toward higher addresses.
    #[strum(to_string = "upward")]
    Upward,
}

impl StackDirection {
    /// Checks whether `candidate` lies deeper in the stack than `reference`.
    #[must_use]
    pub fn is_deeper(self, candidate: usize, reference: usize) -> bool {
        match self {
            StackDirection::Downward => candidate < reference,
            StackDirection::Upward => candidate > reference,
        }
    }
}

/// Probes the stack growth direction of the calling thread.
///
/// Compares the address of a local in this call with the address of a local in
/// a nested, non-inlined call.
///
/// # Errors
///
/// Returns [`Error::StackDirectionUnknown`] if both locals end up at the same
/// address, which only an optimizer merging the two activation records could
/// cause.
#[inline(never)]
pub fn find_stack_direction() -> Result<StackDirection> {
    let variable = 1_u8;
    compare_with_nested(black_box(&variable as *const u8 as usize))
}

#[inline(never)]
fn compare_with_nested(parent: usize) -> Result<StackDirection> {
    let variable = 5_u8;
    let here = black_box(&variable as *const u8 as usize);

    classify(here, parent)
}

fn classify(nested: usize, parent: usize) -> Result<StackDirection> {
    match nested.cmp(&parent) {
        std::cmp::Ordering::Greater => Ok(StackDirection::Upward),
        std::cmp::Ordering::Less => Ok(StackDirection::Downward),
        std::cmp::Ordering::Equal => Err(Error::StackDirectionUnknown),
    }
}
