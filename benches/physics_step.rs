//! Benchmarks for the CPU-side frame loop.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use plume::color::color_for;
use plume::prelude::*;

const FRAME: f32 = 1.0 / 60.0;

/// A system with `count` particles, all active.
fn active_system(count: usize) -> ParticleSystem {
    let config = SimConfig::default();
    let tons = count as f64 * config.tons_per_particle;
    let mut system = ParticleSystem::with_seed(config, 1).unwrap();
    system.set_total_emissions(tons);
    system.set_active_entities(
        (0..10)
            .map(|i| EntityRecord::new(&format!("Q{i}"), "bench", tons / 10.0, 2022))
            .collect(),
    );
    while system.field().count(SlotState::Pending) > 0 {
        system.step(FRAME);
    }
    system
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("step");

    for count in [1_000, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::new("active", count), &count, |b, &count| {
            let mut system = active_system(count);
            b.iter(|| black_box(system.step(FRAME)))
        });
    }

    group.finish();
}

fn bench_regenerate(c: &mut Criterion) {
    let mut group = c.benchmark_group("regenerate");

    for count in [1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("carry_forward", count), &count, |b, &count| {
            let mut system = active_system(count);
            let total = system.total_emissions();
            b.iter(|| system.set_total_emissions(black_box(total)))
        });
    }

    group.finish();
}

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("export");

    group.bench_function("vertex_bytes_10k", |b| {
        let system = active_system(10_000);
        b.iter(|| black_box(system.field().vertex_bytes(0.01)))
    });

    group.bench_function("color_for", |b| {
        b.iter(|| black_box(color_for(black_box("Q1234567"))))
    });

    group.finish();
}

criterion_group!(benches, bench_step, bench_regenerate, bench_export);
criterion_main!(benches);
