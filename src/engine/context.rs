//! Per-thread execution context.
//!
//! Each thread owns one [`ExecutionContext`]: the stack of active handler
//! frames, the current-exception slot, the cached stack direction and the
//! thread's [`EngineConfig`]. Nothing in it is shared, so the dispatch path
//! takes no locks.
//!
//! # Where an Exception Lives
//!
//! A thrown exception is held by the frame it was dispatched to until that
//! frame is unregistered, so regions that run while the transfer is under way
//! (in destructors of skipped values, say) cannot take it. Unregistering hands
//! it out: [`end_block`] moves it into the current-exception slot for
//! hand-written constructs to pick up.
//!
//! Exceptions the context lets go of (a replaced slot, frames removed by
//! [`unwind_to`]) are dropped only after the context borrow has ended, so
//! payload destructors may call back into the engine.
//!
//! # Two Layers
//!
//! - [`ExecutionContext`] is a plain value whose operations return
//!   [`Result`]. It is what the free functions drive, and it can be created
//!   directly to inspect misuse errors without ending the process.
//! - The free functions ([`begin_block`], [`end_block`],
//!   [`take_current_exception`], ...) operate on the calling thread's instance
//!   and route misuse through [`fatal::terminate`](crate::fatal::terminate).
//!
//! # Frame Records
//!
//! Registering a frame copies its catch clauses into an [`ActiveFrame`] record,
//! so the context never holds a pointer into the region's storage. The frame's
//! address is kept only as a number for the validator.

use std::cell::RefCell;

use crate::{
    engine::{
        frame::{CatchClause, FrameId, HandlerFrame},
        handler::select_target,
        unwinder::Transfer,
        validator::{find_stack_direction, StackDirection},
    },
    error::DisciplineViolation,
    exception::{Exception, SourceLocation},
    fatal, EngineConfig, Error, Result,
};

thread_local! {
    pub(crate) static CONTEXT: RefCell<ExecutionContext> = RefCell::new(ExecutionContext::new());
}

/// Record of a registered frame.
#[derive(Debug)]
pub struct ActiveFrame {
    id: FrameId,
    address: usize,
    clauses: Vec<CatchClause>,
    registered_at: SourceLocation,
    /// Dispatched to this frame and not landed yet
    pending: Option<Exception>,
}

impl ActiveFrame {
    fn new(frame: &HandlerFrame, registered_at: SourceLocation) -> Self {
        Self {
            id: frame.id(),
            address: frame.address(),
            clauses: frame.clauses().to_vec(),
            registered_at,
            pending: None,
        }
    }

    /// Identity of the registered frame.
    #[must_use]
    pub fn id(&self) -> FrameId {
        self.id
    }

    /// Storage address the frame had when it was registered.
    #[must_use]
    pub fn address(&self) -> usize {
        self.address
    }

    /// The frame's catch clauses in declaration order.
    #[must_use]
    pub fn clauses(&self) -> &[CatchClause] {
        &self.clauses
    }

    /// Call site of the `begin_block` that registered the frame.
    #[must_use]
    pub fn registered_at(&self) -> SourceLocation {
        self.registered_at
    }

    /// The exception dispatched to this frame, until the frame is unregistered.
    #[must_use]
    pub fn pending(&self) -> Option<&Exception> {
        self.pending.as_ref()
    }
}

/// Exception handling state of one thread.
///
/// # Examples
///
/// ```rust
/// use exceptscope::{
///     engine::{ExecutionContext, HandlerFrame},
///     EngineConfig, SourceLocation,
/// };
///
/// let mut ctx = ExecutionContext::with_config(EngineConfig::release());
/// let a = HandlerFrame::new();
/// let b = HandlerFrame::new();
///
/// ctx.push(&a, SourceLocation::new("f.c", 1))?;
/// assert!(ctx.pop(&b, SourceLocation::new("f.c", 2)).is_err());
/// ctx.pop(&a, SourceLocation::new("f.c", 3))?;
/// assert_eq!(ctx.depth(), 0);
/// # Ok::<(), exceptscope::Error>(())
/// ```
#[derive(Debug)]
pub struct ExecutionContext {
    /// Active frames, innermost last
    frames: Vec<ActiveFrame>,
    /// The landed exception of a hand-written construct, or an uncaught one
    current: Option<Exception>,
    /// Let go of under a borrow; dropped by the caller afterwards
    displaced: Vec<Exception>,
    /// Probed on the first validated push
    direction: Option<StackDirection>,
    config: EngineConfig,
}

impl ExecutionContext {
    /// Creates an empty context using the process-wide configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::global())
    }

    /// Creates an empty context with an explicit configuration.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            frames: Vec::new(),
            current: None,
            displaced: Vec::new(),
            direction: None,
            config,
        }
    }

    /// The context's configuration.
    #[must_use]
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Replaces the context's configuration.
    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    /// Registers `frame` as the new innermost frame.
    ///
    /// With [`EngineConfig::check_stack`] set, the first call probes and caches
    /// the stack direction, and every call requires `frame` to be deeper in the
    /// call stack than the current top frame.
    ///
    /// # Arguments
    ///
    /// * `frame`    - The frame to register; must stay in place until popped
    /// * `location` - Call site reported on violation
    ///
    /// # Errors
    ///
    /// - [`Error::StackDiscipline`] with [`DisciplineViolation::OutOfOrder`]
    /// - [`Error::StackDirectionUnknown`] if the direction probe fails
    pub fn push(&mut self, frame: &HandlerFrame, location: SourceLocation) -> Result<()> {
        if self.config.check_stack {
            let direction = self.stack_direction()?;
            if let Some(top) = self.frames.last() {
                if !direction.is_deeper(frame.address(), top.address) {
                    return Err(misuse_error!(DisciplineViolation::OutOfOrder, location));
                }
            }
        }

        self.frames.push(ActiveFrame::new(frame, location));
        log::trace!(
            "begin {} at {location} (depth {})",
            frame.id(),
            self.frames.len()
        );
        Ok(())
    }

    /// Unregisters `frame`, which must be the innermost frame.
    ///
    /// # Returns
    ///
    /// The exception dispatched to `frame`, if one was thrown to it. The
    /// caller owns it from here on.
    ///
    /// # Errors
    ///
    /// [`Error::StackDiscipline`] with [`DisciplineViolation::EmptyStack`] or
    /// [`DisciplineViolation::NotTopFrame`]; the stack is left untouched.
    pub fn pop(
        &mut self,
        frame: &HandlerFrame,
        location: SourceLocation,
    ) -> Result<Option<Exception>> {
        match self.frames.last() {
            None => Err(misuse_error!(DisciplineViolation::EmptyStack, location)),
            Some(top) if top.id != frame.id() => {
                Err(misuse_error!(DisciplineViolation::NotTopFrame, location))
            }
            Some(_) => {
                let landed = self.frames.pop().and_then(|top| top.pending);
                log::trace!(
                    "end {} at {location} (depth {})",
                    frame.id(),
                    self.frames.len()
                );
                Ok(landed)
            }
        }
    }

    /// Pops every frame down to and including `id`, without discipline checks.
    ///
    /// Only meant for scope guards running while a Rust panic unwinds through
    /// their region, where the inner regions' guards have already run or never
    /// will. Does nothing if `id` is not registered.
    ///
    /// # Returns
    ///
    /// The number of frames removed.
    pub fn unwind_to(&mut self, id: FrameId) -> usize {
        let Some(position) = self.frames.iter().rposition(|frame| frame.id == id) else {
            return 0;
        };
        let removed = self.frames.len() - position;
        let pending = self.frames.drain(position..).filter_map(|frame| frame.pending);
        self.displaced.extend(pending);
        log::trace!("unwound {removed} frame(s) through {id}");
        removed
    }

    /// The innermost registered frame.
    #[must_use]
    pub fn top(&self) -> Option<&ActiveFrame> {
        self.frames.last()
    }

    /// Number of registered frames.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The stack direction, probing it on first use.
    ///
    /// # Errors
    ///
    /// [`Error::StackDirectionUnknown`] if the probe is inconclusive.
    pub fn stack_direction(&mut self) -> Result<StackDirection> {
        if let Some(direction) = self.direction {
            return Ok(direction);
        }

        let direction = find_stack_direction()?;
        log::debug!("stack grows {direction}");
        self.direction = Some(direction);
        Ok(direction)
    }

    /// Binds `exception` to the innermost frame and picks its landing site.
    ///
    /// This is the decision half of [`throw`](crate::engine::throw): the
    /// innermost frame's clauses are tried in order, falling back to the finally
    /// target. The frame stays registered and holds the exception until it is
    /// popped.
    ///
    /// # Errors
    ///
    /// [`Error::Uncaught`] with the throw site if no frame is registered. The
    /// exception is parked in the current-exception slot.
    pub fn dispatch(&mut self, exception: Exception) -> Result<Transfer> {
        let location = exception.location();

        let Some(top) = self.frames.last_mut() else {
            self.park(exception);
            return Err(Error::Uncaught(location));
        };

        let target = select_target(&top.clauses, &exception);
        if self.config.trace_dispatch {
            log::trace!(
                "dispatch {} from {location} to {target} of {}",
                exception.exception_type(),
                top.id
            );
        }

        let transfer = Transfer {
            frame: top.id,
            target,
        };
        if let Some(previous) = top.pending.replace(exception) {
            self.displaced.push(previous);
        }
        Ok(transfer)
    }

    /// Makes `exception` the current exception.
    ///
    /// An exception still in the slot is moved to the displaced list.
    pub fn park(&mut self, exception: Exception) {
        if let Some(previous) = self.current.replace(exception) {
            self.displaced.push(previous);
        }
    }

    /// Exceptions the context has let go of since the last call.
    ///
    /// The thread-level functions drop these once the context is no longer
    /// borrowed. A directly created context keeps them until asked.
    pub fn take_displaced(&mut self) -> Vec<Exception> {
        std::mem::take(&mut self.displaced)
    }

    /// The current exception: landed by a hand-written construct, or uncaught.
    #[must_use]
    pub fn current_exception(&self) -> Option<&Exception> {
        self.current.as_ref()
    }

    /// Removes and returns the current exception; the caller now owns it.
    pub fn take_current_exception(&mut self) -> Option<Exception> {
        self.current.take()
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Registers `frame` on the calling thread; see [`ExecutionContext::push`].
///
/// Misuse is fatal and reported at the caller's location.
#[track_caller]
pub fn begin_block(frame: &HandlerFrame) {
    begin_block_at(frame, SourceLocation::caller());
}

/// Unregisters `frame` on the calling thread; see [`ExecutionContext::pop`].
///
/// Misuse is fatal and reported at the caller's location.
#[track_caller]
pub fn end_block(frame: &HandlerFrame) {
    end_block_at(frame, SourceLocation::caller());
}

/// [`begin_block`] with an explicit call-site location.
pub fn begin_block_at(frame: &HandlerFrame, location: SourceLocation) {
    if let Err(error) = with_context!(|ctx: &mut ExecutionContext| ctx.push(frame, location)) {
        fatal::terminate(error);
    }
}

/// [`end_block`] with an explicit call-site location.
///
/// An exception thrown to `frame` becomes the current exception.
pub fn end_block_at(frame: &HandlerFrame, location: SourceLocation) {
    let popped = with_context!(|ctx: &mut ExecutionContext| -> Result<()> {
        if let Some(exception) = ctx.pop(frame, location)? {
            ctx.park(exception);
        }
        Ok(())
    });
    if let Err(error) = popped {
        fatal::terminate(error);
    }
}

/// [`end_block_at`] that hands the exception thrown to `frame` to the caller
/// instead of parking it.
pub(crate) fn end_block_taking(
    frame: &HandlerFrame,
    location: SourceLocation,
) -> Option<Exception> {
    match with_context!(|ctx: &mut ExecutionContext| ctx.pop(frame, location)) {
        Ok(landed) => landed,
        Err(error) => fatal::terminate(error),
    }
}

/// See [`ExecutionContext::unwind_to`].
pub fn unwind_to(id: FrameId) -> usize {
    with_context!(|ctx: &mut ExecutionContext| ctx.unwind_to(id))
}

/// Runs `f` with the current exception, if any.
///
/// `f` must not call back into the engine; the context is borrowed for the
/// duration of the call.
pub fn with_current_exception<R>(f: impl FnOnce(Option<&Exception>) -> R) -> R {
    with_context!(|ctx: &mut ExecutionContext| f(ctx.current_exception()))
}

/// Takes ownership of the current exception, leaving the slot empty.
///
/// This is how a hand-written construct obtains the exception after
/// [`end_block`]. [`ProtectedRegion`](crate::engine::ProtectedRegion) handlers
/// receive theirs as an argument instead.
pub fn take_current_exception() -> Option<Exception> {
    with_context!(|ctx: &mut ExecutionContext| ctx.take_current_exception())
}

/// Returns `true` if the current-exception slot is occupied.
pub fn has_current_exception() -> bool {
    with_context!(|ctx: &mut ExecutionContext| ctx.current_exception().is_some())
}

/// Releases the current exception, if any.
pub fn clear_current_exception() {
    if let Some(exception) = take_current_exception() {
        exception.release();
    }
}

/// Number of frames registered on the calling thread.
pub fn frame_depth() -> usize {
    with_context!(|ctx: &mut ExecutionContext| ctx.depth())
}

/// The calling thread's stack direction, probing it on first use.
///
/// An inconclusive probe is fatal.
pub fn stack_direction() -> StackDirection {
    match with_context!(|ctx: &mut ExecutionContext| ctx.stack_direction()) {
        Ok(direction) => direction,
        Err(error) => fatal::terminate(error),
    }
}

/// Overrides the configuration of the calling thread.
pub fn configure(config: EngineConfig) {
    with_context!(|ctx: &mut ExecutionContext| ctx.set_config(config));
}

/// The configuration of the calling thread.
///
/// Falls back to the process-wide default while the thread's context is being
/// torn down.
pub fn config() -> EngineConfig {
    CONTEXT
        .try_with(|cell| cell.try_borrow().map(|ctx| ctx.config()).ok())
        .ok()
        .flatten()
        .unwrap_or_else(EngineConfig::global)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::frame::ResumeTarget,
        typesystem::{ExceptionType, BASE_EXCEPTION},
    };

    static BASE: ExceptionType = ExceptionType::root("Base");
    static DERIVED: ExceptionType = ExceptionType::derived("Derived", &BASE);
    static UNRELATED: ExceptionType = ExceptionType::root("Unrelated");

    fn loc(line: u32) -> SourceLocation {
        SourceLocation::new("ctx.rs", line)
    }

    fn unchecked() -> ExecutionContext {
        ExecutionContext::with_config(EngineConfig::release())
    }

    #[test]
    fn sequential_frames_never_violate() {
        let mut ctx = ExecutionContext::with_config(EngineConfig::debug());
        let a = HandlerFrame::new();
        ctx.push(&a, loc(1)).unwrap();
        ctx.pop(&a, loc(2)).unwrap();

        let b = HandlerFrame::new();
        ctx.push(&b, loc(3)).unwrap();
        ctx.pop(&b, loc(4)).unwrap();
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn pop_of_non_top_frame_is_reported_at_call_site() {
        let mut ctx = unchecked();
        let a = HandlerFrame::new();
        let b = HandlerFrame::new();
        ctx.push(&a, loc(1)).unwrap();

        let err = ctx.pop(&b, loc(7)).unwrap_err();
        assert!(matches!(
            err,
            Error::StackDiscipline {
                kind: DisciplineViolation::NotTopFrame,
                location,
            } if location == loc(7)
        ));
        assert_eq!(ctx.depth(), 1);
        assert_eq!(ctx.top().map(ActiveFrame::id), Some(a.id()));
    }

    #[test]
    fn pop_on_empty_stack() {
        let mut ctx = unchecked();
        let a = HandlerFrame::new();
        assert!(matches!(
            ctx.pop(&a, loc(1)),
            Err(Error::StackDiscipline {
                kind: DisciplineViolation::EmptyStack,
                ..
            })
        ));
    }

    #[inline(never)]
    fn push_nested(ctx: &mut ExecutionContext) -> Result<()> {
        let inner = HandlerFrame::new();
        ctx.push(&inner, loc(20))?;
        ctx.pop(&inner, loc(21)).map(drop)
    }

    #[inline(never)]
    fn push_from_callee_then_leave(ctx: &mut ExecutionContext) -> FrameId {
        let leaked = HandlerFrame::new();
        ctx.push(&leaked, loc(30)).unwrap();
        leaked.id()
    }

    #[test]
    fn nested_call_frames_are_accepted() {
        let mut ctx = ExecutionContext::with_config(EngineConfig::debug());
        let outer = HandlerFrame::new();
        ctx.push(&outer, loc(10)).unwrap();
        push_nested(&mut ctx).unwrap();
        ctx.pop(&outer, loc(11)).unwrap();
    }

    #[test]
    fn frame_outliving_its_region_is_detected() {
        let mut ctx = ExecutionContext::with_config(EngineConfig::debug());
        let stale = push_from_callee_then_leave(&mut ctx);

        // The callee returned without unregistering; a frame in this shallower
        // activation record is not deeper than the stale top.
        let shallow = HandlerFrame::new();
        let err = ctx.push(&shallow, loc(40)).unwrap_err();
        assert!(matches!(
            err,
            Error::StackDiscipline {
                kind: DisciplineViolation::OutOfOrder,
                location,
            } if location == loc(40)
        ));
        assert_eq!(ctx.unwind_to(stale), 1);
    }

    #[test]
    fn unwind_to_removes_frame_and_everything_above() {
        let mut ctx = unchecked();
        let a = HandlerFrame::new();
        let b = HandlerFrame::new();
        let c = HandlerFrame::new();
        ctx.push(&a, loc(1)).unwrap();
        ctx.push(&b, loc(2)).unwrap();
        ctx.push(&c, loc(3)).unwrap();

        assert_eq!(ctx.unwind_to(b.id()), 2);
        assert_eq!(ctx.depth(), 1);
        assert_eq!(ctx.unwind_to(b.id()), 0);
        assert_eq!(ctx.top().unwrap().registered_at(), loc(1));
    }

    #[test]
    fn dispatch_without_frames_is_uncaught() {
        let mut ctx = unchecked();
        let e = Exception::at(&DERIVED, (), SourceLocation::new("f.c", 10));
        let err = ctx.dispatch(e).unwrap_err();
        assert_eq!(err.to_string(), "ERROR: Uncaught exception at f.c:10");
        assert!(ctx.current_exception().is_some());
    }

    #[test]
    fn dispatch_selects_matching_clause_of_innermost_frame() {
        let mut ctx = unchecked();
        let mut outer = HandlerFrame::new();
        outer.add_catch(&BASE_EXCEPTION);
        let mut inner = HandlerFrame::new();
        let l1 = inner.add_catch(&DERIVED);
        ctx.push(&outer, loc(1)).unwrap();
        ctx.push(&inner, loc(2)).unwrap();

        let transfer = ctx.dispatch(Exception::new(&DERIVED, ())).unwrap();
        assert_eq!(transfer.frame, inner.id());
        assert_eq!(transfer.target, ResumeTarget::Catch(l1));

        let transfer = ctx.dispatch(Exception::new(&UNRELATED, 3_i32)).unwrap();
        assert_eq!(transfer.frame, inner.id());
        assert_eq!(transfer.target, ResumeTarget::Finally);
        assert_eq!(ctx.depth(), 2);
        assert_eq!(ctx.take_displaced().len(), 1);
        assert!(ctx.current_exception().is_none());

        let landed = ctx.pop(&inner, loc(3)).unwrap().unwrap();
        assert_eq!(landed.payload::<i32>(), Some(&3));
        assert!(ctx.pop(&outer, loc(4)).unwrap().is_none());
    }

    #[test]
    fn dispatched_exception_stays_with_its_frame() {
        let mut ctx = unchecked();
        let outer = HandlerFrame::new().with_catch(&BASE);
        let inner = HandlerFrame::new().with_catch(&UNRELATED);
        ctx.push(&outer, loc(1)).unwrap();
        ctx.dispatch(Exception::new(&DERIVED, 7_i32)).unwrap();

        // A nested frame registered while the transfer is under way throws and
        // lands its own exception.
        ctx.push(&inner, loc(2)).unwrap();
        ctx.dispatch(Exception::new(&UNRELATED, ())).unwrap();
        let nested = ctx.pop(&inner, loc(3)).unwrap().unwrap();
        assert!(nested.is_a(&UNRELATED));

        let held = ctx.top().and_then(ActiveFrame::pending);
        assert_eq!(held.map(|e| e.exception_type().name()), Some("Derived"));
        let landed = ctx.pop(&outer, loc(4)).unwrap().unwrap();
        assert_eq!(landed.payload::<i32>(), Some(&7));
        assert!(ctx.take_displaced().is_empty());
    }

    #[test]
    fn unwound_frames_give_up_their_exceptions() {
        let mut ctx = unchecked();
        let a = HandlerFrame::new();
        let b = HandlerFrame::new();
        ctx.push(&a, loc(1)).unwrap();
        ctx.push(&b, loc(2)).unwrap();
        ctx.dispatch(Exception::new(&DERIVED, ())).unwrap();

        assert_eq!(ctx.unwind_to(a.id()), 2);
        let displaced = ctx.take_displaced();
        assert_eq!(displaced.len(), 1);
        assert!(displaced[0].is_a(&BASE));
    }

    #[test]
    fn payload_drop_may_use_the_engine() {
        use std::cell::Cell;

        thread_local! {
            static SEEN_DEPTH: Cell<Option<usize>> = const { Cell::new(None) };
        }

        struct ReportsDepth;
        impl Drop for ReportsDepth {
            fn drop(&mut self) {
                SEEN_DEPTH.with(|seen| seen.set(Some(frame_depth())));
            }
        }

        configure(EngineConfig::release());
        let frame = HandlerFrame::new();
        begin_block(&frame);
        with_context!(|ctx: &mut ExecutionContext| ctx.park(Exception::new(&BASE, ReportsDepth)));
        // Replacing the parked exception drops its payload.
        with_context!(|ctx: &mut ExecutionContext| ctx.park(Exception::new(&BASE, ())));

        assert_eq!(SEEN_DEPTH.with(Cell::get), Some(1));
        end_block(&frame);
        clear_current_exception();
    }

    #[test]
    fn thread_level_functions_share_one_context() {
        configure(EngineConfig::release());
        let frame = HandlerFrame::new();
        begin_block(&frame);
        assert_eq!(frame_depth(), 1);
        end_block(&frame);
        assert_eq!(frame_depth(), 0);
        assert!(!config().check_stack);
        assert!(!has_current_exception());
        clear_current_exception();
    }
}
