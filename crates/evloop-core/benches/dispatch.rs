use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use evloop_core::{EventLoop, LoopConfig, TaskKind};
use std::time::Duration;

fn bench_round_trip(c: &mut Criterion) {
    let event_loop = EventLoop::new("bench-round-trip").unwrap();

    c.bench_function("submit_get_round_trip", |b| {
        b.iter(|| {
            let handle = event_loop
                .submit(TaskKind::Compute, || black_box(1 + 1))
                .unwrap();
            handle.get().unwrap()
        });
    });

    event_loop.shutdown().wait();
}

fn bench_immediate_burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("immediate_burst");
    let event_loop =
        EventLoop::with_config(LoopConfig::new("bench-burst").with_max_queue_size(100_000))
            .unwrap();

    for size in [10_u64, 100, 1_000] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let handles: Vec<_> = (0..size)
                    .map(|i| event_loop.submit("burst", move || black_box(i)).unwrap())
                    .collect();
                for handle in handles {
                    handle.get().unwrap();
                }
            });
        });
    }

    group.finish();
    event_loop.shutdown().wait();
}

fn bench_due_scheduled(c: &mut Criterion) {
    let event_loop = EventLoop::new("bench-scheduled").unwrap();

    c.bench_function("schedule_zero_delay", |b| {
        b.iter(|| {
            let handle = event_loop
                .schedule(TaskKind::Compute, || black_box(2 * 21), Duration::ZERO)
                .unwrap();
            handle.get().unwrap()
        });
    });

    event_loop.shutdown().wait();
}

criterion_group!(benches, bench_round_trip, bench_immediate_burst, bench_due_scheduled);
criterion_main!(benches);
