//! Process-level behavior of fatal misuse under the default exit policy.
//!
//! Each scenario re-runs this test binary with only `child_entry` selected and
//! an environment variable naming the scenario, then inspects the exit status
//! and stderr of that child.

use std::{
    env,
    process::{Command, Output},
};

use exceptscope::{
    engine::{self, HandlerFrame},
    EngineConfig, Exception, ExceptionType, SourceLocation, BASE_EXCEPTION,
};

const SCENARIO_VAR: &str = "EXCEPTSCOPE_FATAL_SCENARIO";

static DERIVED: ExceptionType = ExceptionType::derived("Derived", &BASE_EXCEPTION);

fn run_scenario(name: &str) -> Output {
    let exe = env::current_exe().expect("test binary path");
    Command::new(exe)
        .args(["child_entry", "--exact", "--nocapture", "--test-threads=1"])
        .env(SCENARIO_VAR, name)
        .output()
        .expect("child test process starts")
}

fn assert_fatal(output: &Output, needle: &str) {
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success(), "child succeeded, stderr: {stderr}");
    #[cfg(unix)]
    assert_eq!(output.status.code(), Some(255), "stderr: {stderr}");
    assert!(stderr.contains(needle), "missing {needle:?} in stderr: {stderr}");
}

#[inline(never)]
fn leave_frame_registered() {
    let frame = HandlerFrame::new();
    engine::begin_block(&frame);
}

#[test]
fn child_entry() {
    let Ok(scenario) = env::var(SCENARIO_VAR) else {
        return;
    };
    engine::configure(EngineConfig::debug());

    match scenario.as_str() {
        "uncaught" => {
            engine::throw(Exception::at(&DERIVED, (), SourceLocation::new("f.c", 10)));
        }
        "wrong_frame" => {
            let a = HandlerFrame::new();
            let b = HandlerFrame::new();
            engine::begin_block(&a);
            engine::end_block_at(&b, SourceLocation::new("region.c", 42));
        }
        "stale_frame" => {
            leave_frame_registered();
            let frame = HandlerFrame::new();
            engine::begin_block_at(&frame, SourceLocation::new("stale.c", 5));
        }
        "empty_rethrow" => {
            engine::rethrow();
        }
        other => panic!("unknown scenario {other}"),
    }
}

#[test]
fn uncaught_exception_exits_with_throw_site() {
    let output = run_scenario("uncaught");
    assert_fatal(&output, "ERROR: Uncaught exception at f.c:10");
}

#[test]
fn ending_non_top_frame_exits_with_call_site() {
    let output = run_scenario("wrong_frame");
    assert_fatal(&output, "region.c:42: BUG detected");
}

#[test]
fn frame_left_behind_is_detected_on_next_begin() {
    let output = run_scenario("stale_frame");
    assert_fatal(&output, "stale.c:5: BUG detected: frame registered out of call-stack order");
}

#[test]
fn rethrow_without_exception_exits() {
    let output = run_scenario("empty_rethrow");
    assert_fatal(&output, "no current exception to rethrow");
}
