//! Benchmarks for the exception engine hot paths.
//!
//! - Is-a checks against shallow and deep ancestor chains
//! - Clause selection over frames of growing size
//! - Region entry/exit without a throw
//! - Full throw/catch round trips, direct and through nested regions

extern crate exceptscope;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use exceptscope::{
    engine::{self, select_target, HandlerFrame},
    EngineConfig, Exception, ExceptionType, ProtectedRegion, TypeRef, TypeRegistry,
    BASE_EXCEPTION,
};
use std::hint::black_box;

static SHALLOW: ExceptionType = ExceptionType::derived("Shallow", &BASE_EXCEPTION);
static UNRELATED: ExceptionType = ExceptionType::root("Unrelated");

/// Declares a linear chain of `depth` types below `BaseException` and returns its leaf.
fn deep_chain(registry: &TypeRegistry, depth: usize) -> TypeRef {
    let mut parent: TypeRef = &BASE_EXCEPTION;
    for level in 0..depth {
        parent = registry
            .declare(format!("Level{level}"), Some(parent))
            .expect("fresh registry");
    }
    parent
}

/// Benchmark is-a against the root for a direct child and a 64-deep leaf.
fn bench_is_a(c: &mut Criterion) {
    let registry = TypeRegistry::new();
    let leaf = deep_chain(&registry, 64);

    c.bench_function("is_a_shallow", |b| {
        b.iter(|| black_box(&SHALLOW).is_a(black_box(&BASE_EXCEPTION)));
    });
    c.bench_function("is_a_deep_hit", |b| {
        b.iter(|| black_box(leaf).is_a(black_box(&BASE_EXCEPTION)));
    });
    c.bench_function("is_a_deep_miss", |b| {
        b.iter(|| black_box(leaf).is_a(black_box(&UNRELATED)));
    });
}

/// Benchmark clause selection where only the last clause matches.
fn bench_select_target(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_target_last_clause");
    for clauses in [1_usize, 4, 16] {
        let mut frame = HandlerFrame::new();
        for _ in 1..clauses {
            frame.add_catch(&UNRELATED);
        }
        frame.add_catch(&BASE_EXCEPTION);
        let exception = Exception::new(&SHALLOW, ());

        group.bench_with_input(BenchmarkId::from_parameter(clauses), &frame, |b, frame| {
            b.iter(|| select_target(black_box(frame.clauses()), black_box(&exception)));
        });
    }
    group.finish();
}

/// Benchmark begin/end of a region whose body completes normally.
fn bench_region_no_throw(c: &mut Criterion) {
    engine::configure(EngineConfig::release());
    c.bench_function("region_no_throw", |b| {
        b.iter(|| {
            ProtectedRegion::new(|| black_box(1_u32))
                .catch(&SHALLOW, |_| 0)
                .run()
        });
    });
}

/// Benchmark a throw caught by the innermost region.
fn bench_throw_catch(c: &mut Criterion) {
    engine::configure(EngineConfig::release());
    c.bench_function("throw_catch_direct", |b| {
        b.iter(|| {
            ProtectedRegion::new(|| -> u32 { engine::throw(Exception::new(&SHALLOW, 7_u32)) })
                .catch(&BASE_EXCEPTION, |e| *e.payload::<u32>().unwrap_or(&0))
                .run()
        });
    });
}

/// Benchmark a throw that passes one finally path before it is caught.
fn bench_throw_through_finally(c: &mut Criterion) {
    engine::configure(EngineConfig::release());
    c.bench_function("throw_through_finally", |b| {
        b.iter(|| {
            ProtectedRegion::new(|| {
                ProtectedRegion::new(|| -> u32 { engine::throw(Exception::new(&SHALLOW, ())) })
                    .catch(&UNRELATED, |_| 1)
                    .finally(|| {
                        black_box(());
                    })
                    .run()
            })
            .catch(&SHALLOW, |_| 2)
            .run()
        });
    });
}

criterion_group!(
    benches,
    bench_is_a,
    bench_select_target,
    bench_region_no_throw,
    bench_throw_catch,
    bench_throw_through_finally
);
criterion_main!(benches);
