//! Buddy free-list benchmarks
//!
//! Target: steady-state alloc/free well under 100ns
//!
//! Run with: cargo bench --bench alloc_bench
//!
//! The engine only does pointer arithmetic over seeded regions, so the
//! benchmarks run on synthetic addresses and need no hugepage pool.

use std::hint::black_box;
use std::ptr::NonNull;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hugepool_core::classes::{class_of, MAX_CLASS_SIZE};
use hugepool_core::BuddyEngine;

const BASE: usize = 0x7000_0000;

fn seeded_engine(regions: usize) -> BuddyEngine {
    let mut engine = BuddyEngine::new();
    for i in 0..regions {
        let base = NonNull::new((BASE + i * MAX_CLASS_SIZE) as *mut u8).unwrap();
        engine.seed_region(base, MAX_CLASS_SIZE, 1);
    }
    engine
}

/// Benchmark the size-class lookup (on every alloc path)
fn bench_class_of(c: &mut Criterion) {
    let mut group = c.benchmark_group("class_of");
    group.throughput(Throughput::Elements(1));

    for size in [64usize, 100, 4096, 65_536, MAX_CLASS_SIZE] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| class_of(black_box(size)));
        });
    }

    group.finish();
}

/// Benchmark the steady-state same-class hit path (the RPC workload)
fn bench_alloc_free_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("alloc_free_hit");
    group.throughput(Throughput::Elements(1));

    for size in [64usize, 4096, 65_536] {
        let mut engine = seeded_engine(4);
        let target = class_of(size);

        // Warm the class so the hot loop never splits.
        let warm = engine.alloc(target).unwrap();
        engine.free(warm);

        group.bench_function(BenchmarkId::from_parameter(size), |b| {
            b.iter(|| {
                let buffer = engine.alloc(black_box(target)).unwrap();
                engine.free(black_box(buffer));
            });
        });
    }

    group.finish();
}

/// Benchmark the miss path: a full split chain from the largest class
fn bench_split_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_chain");
    group.throughput(Throughput::Elements(1));

    group.bench_function("largest_to_64B", |b| {
        b.iter_with_setup(
            || seeded_engine(1),
            |mut engine| {
                let buffer = engine.alloc(black_box(0)).unwrap();
                black_box(buffer);
            },
        );
    });

    group.finish();
}

criterion_group!(benches, bench_class_of, bench_alloc_free_hit, bench_split_chain);
criterion_main!(benches);
