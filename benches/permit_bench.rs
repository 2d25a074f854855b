//! Benchmark suite for permit grant/wait throughput under varying
//! contention.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use permit_sync::{NonConsumingPermit, Permit, SimplePermit};
use std::sync::Arc;
use std::thread;

fn bench_uncontended_try_wait(c: &mut Criterion) {
    c.bench_function("simple_permit/uncontended/try_wait", |b| {
        let permit = SimplePermit::new(true);
        b.iter(|| {
            permit.grant().unwrap();
            black_box(permit.try_wait());
        });
    });
}

fn bench_uncontended_grant_wait(c: &mut Criterion) {
    c.bench_function("simple_permit/uncontended/grant_wait", |b| {
        let permit = SimplePermit::new(false);
        b.iter(|| {
            permit.grant().unwrap();
            black_box(permit.wait().unwrap());
        });
    });
}

fn bench_contended_varying_concurrency(c: &mut Criterion) {
    let mut group = c.benchmark_group("permit/contended");

    for concurrency in [2, 4, 8, 16, 32, 64].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(concurrency),
            concurrency,
            |b, &concurrency| {
                b.iter(|| {
                    let permit = Arc::new(Permit::new(false));
                    let done = Arc::new(std::sync::atomic::AtomicUsize::new(0));
                    let handles: Vec<_> = (0..concurrency)
                        .map(|_| {
                            let permit = permit.clone();
                            let done = done.clone();
                            thread::spawn(move || {
                                black_box(permit.wait().unwrap());
                                done.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                            })
                        })
                        .collect();

                    // A consuming grant releases at most one waiter, so
                    // keep re-granting until every spawned waiter has
                    // claimed one rather than firing a fixed batch.
                    while done.load(std::sync::atomic::Ordering::Relaxed) < concurrency {
                        permit.grant().unwrap();
                        thread::yield_now();
                    }
                    for h in handles {
                        h.join().unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_grant_wait_cycles(c: &mut Criterion) {
    c.bench_function("simple_permit/cycles/1000_iterations", |b| {
        b.iter(|| {
            let permit = SimplePermit::new(false);
            for _ in 0..1000 {
                permit.grant().unwrap();
                permit.wait().unwrap();
            }
        });
    });
}

fn bench_non_consuming_broadcast(c: &mut Criterion) {
    c.bench_function("non_consuming_permit/broadcast/64_waiters", |b| {
        b.iter(|| {
            let permit = Arc::new(NonConsumingPermit::new(false));
            let handles: Vec<_> = (0..64)
                .map(|_| {
                    let permit = permit.clone();
                    thread::spawn(move || {
                        black_box(permit.wait().unwrap());
                    })
                })
                .collect();

            permit.grant().unwrap();
            for h in handles {
                h.join().unwrap();
            }
        });
    });
}

criterion_group!(
    benches,
    bench_uncontended_try_wait,
    bench_uncontended_grant_wait,
    bench_contended_varying_concurrency,
    bench_grant_wait_cycles,
    bench_non_consuming_broadcast
);
criterion_main!(benches);
