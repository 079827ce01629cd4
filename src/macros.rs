/// Helper macro for working on the calling thread's execution context
///
/// ```rust, ignore
///  let depth = with_context!(|ctx: &mut ExecutionContext| ctx.depth());
/// ```
///
/// The closure must not call back into the engine; the context stays borrowed
/// until it returns. Exceptions the context displaced meanwhile are dropped
/// after the borrow ends.
macro_rules! with_context {
    ($closure:expr) => {{
        crate::engine::context::CONTEXT.with(|cell| {
            let (result, displaced) = {
                let mut guard = cell.borrow_mut();
                let result = $closure(&mut *guard);
                (result, guard.take_displaced())
            };
            drop(displaced);
            result
        })
    }};
}

/// The source location of the macro's invocation site.
///
/// ```rust
/// let here = exceptscope::location!();
/// assert_eq!(here.line, line!() - 1);
/// ```
#[macro_export]
macro_rules! location {
    () => {
        $crate::SourceLocation::new(file!(), line!())
    };
}

/// Creates an exception at the invocation site and throws it.
///
/// The payload defaults to `()`.
///
/// ```rust
/// use exceptscope::{engine::ProtectedRegion, throw, BASE_EXCEPTION};
///
/// let line = ProtectedRegion::new(|| -> u32 { throw!(&BASE_EXCEPTION, "bad input") })
///     .catch(&BASE_EXCEPTION, |e| e.line())
///     .run();
/// assert!(line > 0);
/// ```
#[macro_export]
macro_rules! throw {
    ($ty:expr) => {
        $crate::throw!($ty, ())
    };
    ($ty:expr, $payload:expr) => {
        $crate::engine::throw($crate::Exception::at(
            $ty,
            $payload,
            $crate::location!(),
        ))
    };
}

/// Throws an `AssertException` if the condition does not hold.
///
/// The payload is the condition's source text as a `&'static str`.
///
/// ```rust
/// use exceptscope::{engine::ProtectedRegion, except_assert, ASSERT_EXCEPTION};
///
/// let failed = ProtectedRegion::new(|| {
///     except_assert!(1 + 1 == 3);
///     None
/// })
/// .catch(&ASSERT_EXCEPTION, |e| e.payload::<&str>().copied())
/// .run();
/// assert_eq!(failed, Some("1 + 1 == 3"));
/// ```
#[macro_export]
macro_rules! except_assert {
    ($cond:expr) => {
        if !$cond {
            $crate::throw!(&$crate::ASSERT_EXCEPTION, stringify!($cond));
        }
    };
}
