//! The exception handling engine.
//!
//! This module holds everything that runs when code throws: the per-thread
//! stack of handler frames, dispatch of an exception to the innermost frame,
//! the control transfer to its landing site and the stack discipline
//! validator.
//!
//! # Architecture
//!
//! - [`frame`] - Handler frames, catch clauses and resume targets
//! - [`context`] - Per-thread frame stack and current-exception slot
//! - [`handler`] - Target selection, [`throw`] and [`rethrow`]
//! - [`unwinder`] - Non-local transfer and its [`capture`] point
//! - [`validator`] - Stack growth direction probing
//! - [`region`] - [`ProtectedRegion`], a ready-made try/catch/finally construct
//!
//! # Driving the Engine by Hand
//!
//! A protected-region construct performs these steps, which is exactly what
//! [`ProtectedRegion::run`] does:
//!
//! 1. Create a [`HandlerFrame`] as a local and add its catch clauses in order
//! 2. [`begin_block`] the frame
//! 3. Run the body under [`capture`]
//! 4. [`end_block`] the frame, on every path, before running any handler code;
//!    an exception thrown to the frame becomes the current exception
//! 5. On [`Landing::Resumed`] with a catch target, take the exception with
//!    [`take_current_exception`] and handle it
//! 6. On the finally target, do the cleanup and [`rethrow`]
//!
//! ```rust
//! use exceptscope::{
//!     engine::{self, capture, HandlerFrame, Landing, ResumeTarget},
//!     Exception, BASE_EXCEPTION,
//! };
//!
//! let mut frame = HandlerFrame::new();
//! let on_base = frame.add_catch(&BASE_EXCEPTION);
//!
//! engine::begin_block(&frame);
//! let landing: Landing<()> = capture(&frame, || {
//!     engine::throw(Exception::new(&BASE_EXCEPTION, "boom"))
//! });
//! engine::end_block(&frame);
//!
//! match landing {
//!     Landing::Resumed(ResumeTarget::Catch(point)) => {
//!         assert_eq!(point, on_base);
//!         let e = engine::take_current_exception().unwrap();
//!         assert_eq!(e.payload::<&str>(), Some(&"boom"));
//!     }
//!     other => panic!("unexpected landing: {other:?}"),
//! }
//! ```
//!
//! # Thread Safety
//!
//! All engine state is thread-local. Frames, exceptions and transfers never
//! cross threads, and threads cannot observe each other's dispatches.

pub mod context;
pub mod frame;
pub mod handler;
pub mod region;
pub mod unwinder;
pub mod validator;

pub use context::{
    begin_block, begin_block_at, clear_current_exception, config, configure, end_block,
    end_block_at, frame_depth, has_current_exception, stack_direction, take_current_exception,
    unwind_to, with_current_exception, ActiveFrame, ExecutionContext,
};
pub use frame::{CatchClause, FrameId, HandlerFrame, ResumePoint, ResumeTarget};
pub use handler::{rethrow, select_target, throw};
pub use region::ProtectedRegion;
pub use unwinder::{capture, Landing, Transfer};
pub use validator::{find_stack_direction, StackDirection};
