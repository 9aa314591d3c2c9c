//! Benchmarks for the pause-coordination primitives.
//!
//! Measures:
//! - Uncontended semaphore release/acquire pairs
//! - A full two-thread rendezvous cycle (signal, wait, release, resume)
//! - A complete pause/suspend/inspect/resume session against the shadow runtime

extern crate framescope;

use criterion::{criterion_group, criterion_main, Criterion};
use framescope::prelude::*;
use std::hint::black_box;

/// Benchmark an uncontended release/acquire pair on a single thread.
fn bench_semaphore_uncontended(c: &mut Criterion) {
    let semaphore = Semaphore::new(0);

    c.bench_function("semaphore_release_acquire", |b| {
        b.iter(|| {
            semaphore.release();
            black_box(semaphore.acquire().unwrap());
        });
    });
}

/// Benchmark a full rendezvous cycle including worker-thread spawn.
fn bench_rendezvous_cycle(c: &mut Criterion) {
    c.bench_function("rendezvous_full_cycle", |b| {
        b.iter(|| {
            let (controller, worker) = RendezvousBarrier::create();
            let handle = std::thread::spawn(move || worker.pause());
            controller.wait_until_paused().unwrap();
            controller.release_worker();
            handle.join().unwrap().unwrap();
        });
    });
}

/// Benchmark a complete session: spawn, pause, suspend, one slot read, resume, join.
fn bench_full_session(c: &mut Criterion) {
    let runtime = ShadowRuntime::new();
    let target = runtime.register_routine("target", Vec::new());

    c.bench_function("session_single_get", |b| {
        b.iter(|| {
            let operations = vec![slot_operation(
                SlotKind::Int,
                SlotDescriptor::new(0, SlotKind::Int),
                Access::Get,
            )];
            let frame_routine = target.clone();
            let reports = run_with_pause(
                &runtime,
                &target,
                "bench-GetInt",
                move |cx| {
                    cx.thread
                        .push_frame(&frame_routine, vec![SlotValue::Int(42)], 0)?;
                    cx.pause()?;
                    cx.thread.pop_frame()
                },
                &operations,
            )
            .unwrap();
            black_box(reports)
        });
    });
}

criterion_group!(
    benches,
    bench_semaphore_uncontended,
    bench_rendezvous_cycle,
    bench_full_session
);
criterion_main!(benches);
