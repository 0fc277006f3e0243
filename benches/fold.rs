//! Benchmarks for the host reference pooling algorithms.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use foldpool::config::KMaxConfig;
use foldpool::pooling::{kmax_select, max_fold, sum_fold};

fn input(rows: usize, cols: usize) -> Vec<f32> {
    (0..rows * cols).map(|i| ((i * 37) % 101) as f32 - 50.0).collect()
}

fn bench_sum_fold(c: &mut Criterion) {
    let mut group = c.benchmark_group("sum_fold");
    for &(rows, cols) in &[(64, 48), (256, 300), (1024, 300)] {
        let x = input(rows, cols);
        let mut out = vec![0.0f32; rows / 2 * cols];
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{rows}x{cols}")),
            &(rows, cols),
            |b, &(rows, cols)| {
                b.iter(|| sum_fold(black_box(&x), rows, cols, &mut out));
            },
        );
    }
    group.finish();
}

fn bench_max_fold(c: &mut Criterion) {
    let mut group = c.benchmark_group("max_fold");
    for &(rows, cols) in &[(64, 48), (256, 300), (1024, 300)] {
        let x = input(rows, cols);
        let mut out = vec![0.0f32; rows / 2 * cols];
        let mut switches = vec![0.0f32; rows * cols];
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{rows}x{cols}")),
            &(rows, cols),
            |b, &(rows, cols)| {
                b.iter(|| max_fold(black_box(&x), rows, cols, &mut out, &mut switches));
            },
        );
    }
    group.finish();
}

fn bench_kmax(c: &mut Criterion) {
    let mut group = c.benchmark_group("kmax_select");
    for &(rows, cols, k, gs) in &[(64, 48, 4, 8), (256, 300, 5, 16), (1024, 300, 8, 32)] {
        let config = KMaxConfig::new(k, gs).unwrap();
        let x = input(rows, cols);
        let out_len = config.output_rows(rows) * cols;
        let mut out = vec![0.0f32; out_len];
        let mut indices = vec![0u32; out_len];
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{rows}x{cols}/k{k}g{gs}")),
            &(rows, cols),
            |b, &(rows, cols)| {
                b.iter(|| {
                    kmax_select(black_box(&x), rows, cols, &config, &mut out, &mut indices)
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_sum_fold, bench_max_fold, bench_kmax);
criterion_main!(benches);
