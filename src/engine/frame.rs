//! Handler frames: the registered shape of one protected region.
//!
//! A [`HandlerFrame`] lists the region's catch clauses in declaration order.
//! Each clause pairs an exception type with a [`ResumePoint`], the label the
//! region uses to find the code that handles it. The finally target is implicit:
//! every frame has exactly one, and dispatch falls back to it when no clause
//! matches.
//!
//! # Identity and Placement
//!
//! Every frame gets a process-unique [`FrameId`] when it is created. The id is
//! what [`end_block`](crate::engine::end_block) compares against the top of the
//! stack and what a control transfer is addressed to.
//!
//! When the stack discipline validator is on, the frame's *address* also
//! matters: frames must live in the stack frame of the function running the
//! region (a plain local), so that nested regions sit deeper in the call stack
//! than their enclosing ones. Frames kept on the heap will be reported as out of
//! order.

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::typesystem::TypeRef;

/// Process-unique identity of a handler frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(u64);

impl FrameId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        FrameId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw id value.
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

/// Label of a catch clause within its frame.
///
/// Resume points are numbered in declaration order starting at 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResumePoint(usize);

impl ResumePoint {
    /// The clause's position in its frame.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ResumePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Where a dispatch sends control inside the innermost frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResumeTarget {
    /// The catch clause with this resume point matched.
    Catch(ResumePoint),
    /// No clause matched; run the frame's finally path.
    Finally,
}

impl fmt::Display for ResumeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResumeTarget::Catch(point) => write!(f, "catch {point}"),
            ResumeTarget::Finally => f.write_str("finally"),
        }
    }
}

/// One `(type, resume point)` pair of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CatchClause {
    /// Exceptions of this type or a descendant select the clause
    pub ty: TypeRef,
    /// Label of the handling code
    pub resume: ResumePoint,
}

/// The registered state of one protected region.
///
/// # Examples
///
/// ```rust
/// use exceptscope::{engine::HandlerFrame, ExceptionType, BASE_EXCEPTION};
///
/// static IO_ERROR: ExceptionType = ExceptionType::derived("IoError", &BASE_EXCEPTION);
///
/// let mut frame = HandlerFrame::new();
/// let on_io = frame.add_catch(&IO_ERROR);
/// let on_any = frame.add_catch(&BASE_EXCEPTION);
/// assert_eq!(on_io.index(), 0);
/// assert_eq!(on_any.index(), 1);
/// assert_eq!(frame.clauses().len(), 2);
/// ```
#[derive(Debug)]
pub struct HandlerFrame {
    id: FrameId,
    clauses: Vec<CatchClause>,
}

impl HandlerFrame {
    /// Creates a frame without catch clauses; only its finally target exists.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: FrameId::next(),
            clauses: Vec::new(),
        }
    }

    /// Appends a catch clause and returns its resume point.
    ///
    /// Clauses are tried in the order they are added and the first match wins,
    /// so more specific types have to be added before more general ones.
    pub fn add_catch(&mut self, ty: TypeRef) -> ResumePoint {
        let resume = ResumePoint(self.clauses.len());
        self.clauses.push(CatchClause { ty, resume });
        resume
    }

    /// Builder form of [`add_catch`](Self::add_catch).
    #[must_use]
    pub fn with_catch(mut self, ty: TypeRef) -> Self {
        self.add_catch(ty);
        self
    }

    /// The frame's identity.
    #[must_use]
    pub fn id(&self) -> FrameId {
        self.id
    }

    /// The catch clauses in declaration order.
    #[must_use]
    pub fn clauses(&self) -> &[CatchClause] {
        &self.clauses
    }

    /// Address of the frame's storage, used by the stack discipline validator.
    pub(crate) fn address(&self) -> usize {
        self as *const Self as usize
    }
}

impl Default for HandlerFrame {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typesystem::{ASSERT_EXCEPTION, BASE_EXCEPTION};

    #[test]
    fn ids_are_unique() {
        let a = HandlerFrame::new();
        let b = HandlerFrame::new();
        assert_ne!(a.id(), b.id());
        assert!(b.id().value() > a.id().value());
    }

    #[test]
    fn clauses_keep_declaration_order() {
        let frame = HandlerFrame::new()
            .with_catch(&ASSERT_EXCEPTION)
            .with_catch(&BASE_EXCEPTION);
        let clauses = frame.clauses();
        assert_eq!(clauses[0].ty, &ASSERT_EXCEPTION);
        assert_eq!(clauses[0].resume.index(), 0);
        assert_eq!(clauses[1].ty, &BASE_EXCEPTION);
        assert_eq!(clauses[1].resume.index(), 1);
    }

    #[test]
    fn display_forms() {
        let mut frame = HandlerFrame::new();
        let point = frame.add_catch(&BASE_EXCEPTION);
        assert_eq!(ResumeTarget::Catch(point).to_string(), "catch L0");
        assert_eq!(ResumeTarget::Finally.to_string(), "finally");
    }
}
