//! Criterion benchmarks for the alignment kernels and instance merge.
//!
//! Benchmarks:
//! 1. Nearest-with-tolerance downsampling (4 Sa/s mag onto a ~7 s SPAN-i grid)
//! 2. Scatter of sparse hammerhead events onto a dense grid
//! 3. Gap segmentation of a series with periodic data gaps
//! 4. Merge of overlapping instances

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use plotbot_core::align::{
    downsample_nearest_index, downsample_nearest_with_tolerance, segment_by_time_gap,
    upsample_scatter,
};
use plotbot_core::domain::{DataTypeInstance, DataTypeKey, Field, RawData};

// ── Helpers ──────────────────────────────────────────────────────────

fn grid(n: usize, cadence: f64, jitter: f64) -> Vec<f64> {
    (0..n)
        .map(|i| i as f64 * cadence + (i as f64 * 0.37).sin() * jitter)
        .collect()
}

fn mag_instance(start_secs: i64, n: usize) -> DataTypeInstance {
    let base = Utc.with_ymd_and_hms(2023, 9, 28, 0, 0, 0).unwrap();
    let times = (0..n)
        .map(|i| base + Duration::milliseconds(start_secs * 1000 + i as i64 * 874))
        .collect();
    let br: Vec<f64> = (0..n).map(|i| (i as f64 * 0.01).sin() * 50.0).collect();
    let raw = RawData::new(times).with_field("br", Field::scalar(br));
    DataTypeInstance::from_raw(DataTypeKey::MagRtn4sa, raw).unwrap()
}

// ── 1. Downsampling ─────────────────────────────────────────────────

fn bench_downsample(c: &mut Criterion) {
    let mut group = c.benchmark_group("downsample");

    for &n in &[10_000usize, 100_000] {
        let source = grid(n, 0.874, 0.05);
        let values: Vec<f64> = source.iter().map(|t| t.cos()).collect();
        let target = grid(n / 8, 6.99, 0.0);

        group.bench_with_input(BenchmarkId::new("with_tolerance", n), &n, |b, _| {
            b.iter(|| {
                downsample_nearest_with_tolerance(
                    black_box(&source),
                    black_box(&values),
                    black_box(&target),
                    None,
                )
            });
        });
        group.bench_with_input(BenchmarkId::new("nearest_index", n), &n, |b, _| {
            b.iter(|| {
                downsample_nearest_index(black_box(&source), black_box(&values), black_box(&target))
            });
        });
    }

    group.finish();
}

// ── 2. Scatter ──────────────────────────────────────────────────────

fn bench_scatter(c: &mut Criterion) {
    let source = grid(500, 173.0, 20.0);
    let values: Vec<f64> = (0..500).map(|i| 1.0 + i as f64).collect();
    let target = grid(86_400 / 7, 6.99, 0.0);

    c.bench_function("upsample_scatter_500_events", |b| {
        b.iter(|| upsample_scatter(black_box(&source), black_box(&values), black_box(&target)));
    });
}

// ── 3. Segmentation ─────────────────────────────────────────────────

fn bench_segment(c: &mut Criterion) {
    let mut times = Vec::new();
    for block in 0..20 {
        let start = block as f64 * 20_000.0;
        times.extend((0..5_000).map(|i| start + i as f64 * 0.874));
    }

    c.bench_function("segment_by_time_gap_100k", |b| {
        b.iter(|| segment_by_time_gap(black_box(&times), None));
    });
}

// ── 4. Merge ────────────────────────────────────────────────────────

fn bench_merge(c: &mut Criterion) {
    let existing = mag_instance(0, 50_000);
    let incoming = mag_instance(20_000, 50_000);

    c.bench_function("merge_overlapping_50k", |b| {
        b.iter(|| {
            let mut target = existing.clone();
            target.merge(black_box(&incoming))
        });
    });
}

criterion_group!(benches, bench_downsample, bench_scatter, bench_segment, bench_merge);
criterion_main!(benches);
