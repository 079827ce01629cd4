//! Throwing and handler selection.
//!
//! [`throw`] hands the exception to the thread's innermost frame, picks a
//! landing site among its clauses with [`select_target`] and transfers control
//! there. Frames further out are never consulted by a single dispatch:
//! when the innermost frame has no matching clause its finally path runs and is
//! expected to rethrow, which dispatches again one frame further out.

use crate::{
    engine::{
        context::{take_current_exception, ExecutionContext},
        frame::{CatchClause, ResumeTarget},
        unwinder,
    },
    exception::{Exception, SourceLocation},
    fatal, Error,
};

/// Picks where `exception` lands among a frame's clauses.
///
/// Clauses are tried in declaration order; the first one whose type is an
/// ancestor-or-self of the exception's type wins. Without a match the frame's
/// finally target is selected.
///
/// # Arguments
///
/// * `clauses`   - The frame's catch clauses in declaration order
/// * `exception` - The exception being dispatched
///
/// # Examples
///
/// ```rust
/// use exceptscope::{
///     engine::{select_target, HandlerFrame, ResumeTarget},
///     Exception, ExceptionType, BASE_EXCEPTION,
/// };
///
/// static PARSE: ExceptionType = ExceptionType::derived("Parse", &BASE_EXCEPTION);
/// static OTHER: ExceptionType = ExceptionType::root("Other");
///
/// let mut frame = HandlerFrame::new();
/// let on_base = frame.add_catch(&BASE_EXCEPTION);
/// frame.add_catch(&PARSE);
///
/// let parse = Exception::new(&PARSE, ());
/// assert_eq!(select_target(frame.clauses(), &parse), ResumeTarget::Catch(on_base));
///
/// let other = Exception::new(&OTHER, ());
/// assert_eq!(select_target(frame.clauses(), &other), ResumeTarget::Finally);
/// ```
#[must_use]
pub fn select_target(clauses: &[CatchClause], exception: &Exception) -> ResumeTarget {
    clauses
        .iter()
        .find(|clause| exception.is_a(clause.ty))
        .map_or(ResumeTarget::Finally, |clause| ResumeTarget::Catch(clause.resume))
}

/// Throws `exception` to the innermost handler frame of the calling thread.
///
/// The innermost frame holds the exception until its region lands and
/// unregisters it. Control resumes at the selected catch clause or finally
/// path of that frame; Rust values owned by the code in between are dropped on
/// the way.
///
/// With no frame registered the throw is fatal: `ERROR: Uncaught exception at
/// <file>:<line>` is reported with the exception's recorded location.
pub fn throw(exception: Exception) -> ! {
    let decision = with_context!(|ctx: &mut ExecutionContext| ctx.dispatch(exception));
    match decision {
        Ok(transfer) => unwinder::transfer(transfer),
        Err(error) => fatal::terminate(error),
    }
}

/// Throws the current exception again.
///
/// For hand-written constructs: after [`end_block`](crate::engine::end_block)
/// has moved the landed exception into the current-exception slot, a catch
/// clause that declines it or a finally path propagates it outward with this.
/// The exception keeps its original throw location.
///
/// [`ProtectedRegion`](crate::engine::ProtectedRegion) handlers receive their
/// exception by value and it never enters the slot; they propagate it with
/// [`throw`] instead.
///
/// An empty current-exception slot is fatal and reported at the caller's
/// location.
#[track_caller]
pub fn rethrow() -> ! {
    let location = SourceLocation::caller();
    match take_current_exception() {
        Some(exception) => throw(exception),
        None => fatal::terminate(Error::NothingToRethrow(location)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::frame::HandlerFrame,
        typesystem::{ExceptionType, ASSERT_EXCEPTION, BASE_EXCEPTION},
    };

    static A: ExceptionType = ExceptionType::derived("A", &BASE_EXCEPTION);
    static B: ExceptionType = ExceptionType::derived("B", &A);
    static C: ExceptionType = ExceptionType::derived("C", &B);
    static LONE: ExceptionType = ExceptionType::root("Lone");

    #[test]
    fn first_matching_clause_wins() {
        let mut frame = HandlerFrame::new();
        let on_b = frame.add_catch(&B);
        let _on_a = frame.add_catch(&A);

        let e = Exception::new(&C, ());
        assert_eq!(select_target(frame.clauses(), &e), ResumeTarget::Catch(on_b));
    }

    #[test]
    fn general_clause_first_shadows_specific() {
        let mut frame = HandlerFrame::new();
        let on_a = frame.add_catch(&A);
        let _on_c = frame.add_catch(&C);

        let e = Exception::new(&C, ());
        assert_eq!(select_target(frame.clauses(), &e), ResumeTarget::Catch(on_a));
    }

    #[test]
    fn ancestor_exception_does_not_match_descendant_clause() {
        let frame = HandlerFrame::new().with_catch(&C);
        let e = Exception::new(&A, ());
        assert_eq!(select_target(frame.clauses(), &e), ResumeTarget::Finally);
    }

    #[test]
    fn no_clauses_means_finally() {
        let e = Exception::new(&LONE, ());
        assert_eq!(select_target(&[], &e), ResumeTarget::Finally);

        let frame = HandlerFrame::new().with_catch(&BASE_EXCEPTION);
        assert_eq!(select_target(frame.clauses(), &e), ResumeTarget::Finally);
    }

    #[test]
    fn assert_exception_is_a_base_exception() {
        let mut frame = HandlerFrame::new();
        let on_base = frame.add_catch(&BASE_EXCEPTION);
        let e = Exception::new(&ASSERT_EXCEPTION, "x > 0");
        assert_eq!(select_target(frame.clauses(), &e), ResumeTarget::Catch(on_base));
    }
}
