//! A protected-region construct built on the engine primitives.
//!
//! [`ProtectedRegion`] is the try/catch/finally shape most code wants: a body,
//! typed catch handlers tried in order, and an optional cleanup that runs on
//! every path out of the region. It drives the same operations a hand-written
//! construct would: it registers a local [`HandlerFrame`], runs the body under
//! [`capture`], unregisters the frame and then acts on the landing.
//!
//! # Paths Out of a Region
//!
//! | Body outcome                  | What runs                 | Region result           |
//! |-------------------------------|---------------------------|-------------------------|
//! | returns                       | cleanup                   | body's value            |
//! | throws, a handler matches     | handler, then cleanup     | handler's value         |
//! | throws, nothing matches       | cleanup                   | exception rethrown      |
//! | handler throws                | cleanup                   | new exception propagates|
//!
//! The frame is unregistered before any handler or cleanup runs, so an
//! exception thrown from either goes to the enclosing region. The caught
//! exception comes straight from the frame, so regions run by destructors
//! during the transfer cannot take it.
//!
//! Rust panics are not exceptions. A panic out of the body or out of a handler
//! passes through the region, which only unregisters its frame on the way; no
//! handler or cleanup runs for it.
//!
//! # Example
//!
//! ```rust
//! use exceptscope::{
//!     engine::{throw, ProtectedRegion},
//!     Exception, ExceptionType, BASE_EXCEPTION,
//! };
//!
//! static NOT_FOUND: ExceptionType = ExceptionType::derived("NotFound", &BASE_EXCEPTION);
//!
//! fn lookup(key: &str) -> u32 {
//!     if key == "answer" {
//!         42
//!     } else {
//!         throw(Exception::new(&NOT_FOUND, key.to_string()))
//!     }
//! }
//!
//! let value = ProtectedRegion::new(|| lookup("question"))
//!     .catch(&NOT_FOUND, |e| {
//!         assert_eq!(e.payload::<String>().map(String::as_str), Some("question"));
//!         0
//!     })
//!     .run();
//! assert_eq!(value, 0);
//! ```

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
};

use crate::{
    engine::{
        context::{begin_block_at, end_block_taking, unwind_to},
        frame::{HandlerFrame, ResumeTarget},
        handler::throw,
        unwinder::{capture, Landing, Transfer},
    },
    exception::{Exception, SourceLocation},
    fatal,
    typesystem::TypeRef,
    Error,
};

type Handler<'a, R> = Box<dyn FnOnce(Exception) -> R + 'a>;

/// A try/catch/finally region.
///
/// Handlers receive the caught exception by value and own it from then on. To
/// propagate it after all, pass it to [`throw`]; its original throw location is
/// kept. The exception is not in the current-exception slot, so
/// [`rethrow`](crate::engine::rethrow) inside a handler is fatal.
pub struct ProtectedRegion<'a, R> {
    body: Box<dyn FnOnce() -> R + 'a>,
    handlers: Vec<(TypeRef, Handler<'a, R>)>,
    cleanup: Option<Box<dyn FnOnce() + 'a>>,
}

impl<'a, R> ProtectedRegion<'a, R> {
    /// Creates a region protecting `body`.
    pub fn new(body: impl FnOnce() -> R + 'a) -> Self {
        Self {
            body: Box::new(body),
            handlers: Vec::new(),
            cleanup: None,
        }
    }

    /// Adds a handler for exceptions of type `ty` or any descendant.
    ///
    /// Handlers are tried in the order they are added.
    #[must_use]
    pub fn catch(mut self, ty: TypeRef, handler: impl FnOnce(Exception) -> R + 'a) -> Self {
        self.handlers.push((ty, Box::new(handler)));
        self
    }

    /// Sets the cleanup that runs on every path out of the region.
    ///
    /// A second call replaces the first.
    #[must_use]
    pub fn finally(mut self, cleanup: impl FnOnce() + 'a) -> Self {
        self.cleanup = Some(Box::new(cleanup));
        self
    }

    /// Runs the region.
    ///
    /// # Returns
    ///
    /// The body's value, or the value of the handler that caught the exception.
    /// Does not return if the exception is not handled here or a handler throws.
    ///
    /// # Panics
    ///
    /// Stack discipline violations detected while registering or unregistering
    /// the frame are fatal; they panic only under
    /// [`FatalPolicy::Panic`](crate::FatalPolicy::Panic).
    #[track_caller]
    #[inline(never)]
    pub fn run(self) -> R {
        let location = SourceLocation::caller();
        let Self {
            body,
            mut handlers,
            cleanup,
        } = self;

        let mut frame = HandlerFrame::new();
        for (ty, _) in &handlers {
            frame.add_catch(*ty);
        }

        let guard = FrameGuard::register(&frame, location);
        let landing = capture(&frame, body);
        let landed = guard.release();

        match landing {
            Landing::Completed(value) => {
                drop(landed);
                run_cleanup(cleanup);
                value
            }
            Landing::Resumed(ResumeTarget::Catch(point)) => {
                let Some(exception) = landed else {
                    fatal::terminate(Error::NothingToRethrow(location));
                };
                let (_, handler) = handlers.swap_remove(point.index());

                match panic::catch_unwind(AssertUnwindSafe(|| handler(exception))) {
                    Ok(value) => {
                        run_cleanup(cleanup);
                        value
                    }
                    Err(payload) if payload.is::<Transfer>() => {
                        // The handler threw to the enclosing frame; clean up on
                        // the way there.
                        run_cleanup(cleanup);
                        panic::resume_unwind(payload)
                    }
                    Err(payload) => panic::resume_unwind(payload),
                }
            }
            Landing::Resumed(ResumeTarget::Finally) => propagate(landed, cleanup, location),
        }
    }
}

impl<R> fmt::Debug for ProtectedRegion<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let catches: Vec<_> = self.handlers.iter().map(|(ty, _)| ty.name()).collect();
        f.debug_struct("ProtectedRegion")
            .field("catches", &catches)
            .field("has_cleanup", &self.cleanup.is_some())
            .finish_non_exhaustive()
    }
}

/// Keeps a frame registered for the duration of the region's body.
///
/// Dropped without [`release`](Self::release) only when an unwind leaves the
/// body, and then removes the frame without discipline checks.
struct FrameGuard<'f> {
    frame: &'f HandlerFrame,
    location: SourceLocation,
    armed: bool,
}

impl<'f> FrameGuard<'f> {
    fn register(frame: &'f HandlerFrame, location: SourceLocation) -> Self {
        begin_block_at(frame, location);
        Self {
            frame,
            location,
            armed: true,
        }
    }

    /// Unregisters the frame and returns the exception thrown to it.
    fn release(mut self) -> Option<Exception> {
        self.armed = false;
        end_block_taking(self.frame, self.location)
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            unwind_to(self.frame.id());
        }
    }
}

fn run_cleanup(cleanup: Option<Box<dyn FnOnce() + '_>>) {
    if let Some(cleanup) = cleanup {
        cleanup();
    }
}

/// Runs the cleanup and rethrows the landed exception to the enclosing frame.
fn propagate(
    landed: Option<Exception>,
    cleanup: Option<Box<dyn FnOnce() + '_>>,
    location: SourceLocation,
) -> ! {
    run_cleanup(cleanup);

    match landed {
        Some(exception) => throw(exception),
        None => fatal::terminate(Error::NothingToRethrow(location)),
    }
}
