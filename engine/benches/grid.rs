//! Benchmarks for indicator precomputation and grid search

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quant_engine::config::{IndicatorConfig, ParameterGrid, ScoreWeights, SimConfig};
use quant_engine::data::Candle;
use quant_engine::indicators::IndicatorFrame;
use quant_engine::optimize::run_grid;

fn wave(n: usize) -> Vec<Candle> {
    let t0 = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();
    (0..n)
        .map(|i| {
            let c = 100.0 + 8.0 * (i as f64 / 20.0).sin() + 3.0 * (i as f64 / 7.0).cos() + i as f64 * 0.01;
            Candle::new(c - 0.3, c + 0.9, c - 0.9, c, 1.0, t0 + Duration::minutes(15 * i as i64))
        })
        .collect()
}

fn benchmark_indicator_frame(c: &mut Criterion) {
    let candles = wave(5_000);
    let config = IndicatorConfig::default();
    c.bench_function("indicator_frame_5000", |b| {
        b.iter(|| IndicatorFrame::compute(black_box(&candles), &config).unwrap())
    });
}

fn benchmark_grid(c: &mut Criterion) {
    let grid = ParameterGrid::default();
    let indicators = IndicatorConfig::default();
    let weights = ScoreWeights::default();
    let sim = SimConfig::default();

    let mut group = c.benchmark_group("run_grid");
    group.sample_size(10);
    for size in [1_000usize, 5_000].iter() {
        let candles = wave(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &candles, |b, candles| {
            b.iter(|| run_grid(black_box(candles), &grid, &indicators, &weights, &sim).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_indicator_frame, benchmark_grid);
criterion_main!(benches);
