//! Benchmarks for the per-poll timing work
//!
//! Covers what runs on every snapshot:
//! - Gap computation for full fields (33 cars) and oversized fields
//! - Decoding the car state table from raw memory
//! - Best lap classification
//!
//! Platform: Cross-platform (synthetic snapshots, CI-safe)

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use icr2_timing::gap::{GapColors, compute_gaps, format_time_diff};
use icr2_timing::laps::{BestLapTracker, LapDisplayMode};
use icr2_timing::memory::decode::decode_car_states;
use icr2_timing::memory::layout::CAR_STATE_SIZE;
use icr2_timing::test_utils::{RaceBuilder, timed_car};
use icr2_timing::{PIT_LANE_PHASE, RaceState};
use std::hint::black_box;

/// A field of `cars` running cars with a mix of lapped, pitting and retired entries.
fn race_field(cars: usize) -> RaceState {
    let mut builder = RaceBuilder::new();
    for idx in 1..=cars {
        let laps = 120 - (idx as u32 % 3);
        let end = 0xFFFF_F000u32.wrapping_add(idx as u32 * 731);
        let mut car = timed_car(idx, laps, end.wrapping_sub(41_000), end);
        match idx % 11 {
            4 => car.laps_down = 2,
            7 => car.current_lp = PIT_LANE_PHASE,
            9 => car.car_status = 2,
            _ => {}
        }
        builder = builder.car(car);
    }
    builder.track_length(2.5).build()
}

fn bench_compute_gaps(c: &mut Criterion) {
    let colors = GapColors::default();
    let mut group = c.benchmark_group("compute_gaps");

    for cars in [33usize, 64, 200] {
        let state = race_field(cars);
        group.throughput(Throughput::Elements(cars as u64));
        group.bench_with_input(BenchmarkId::from_parameter(cars), &state, |b, state| {
            b.iter(|| black_box(compute_gaps(black_box(state), &colors)))
        });
    }

    group.finish();
}

fn bench_format_time_diff(c: &mut Criterion) {
    c.bench_function("format_time_diff", |b| {
        b.iter(|| {
            black_box(format_time_diff(black_box(12_345)));
            black_box(format_time_diff(black_box(-65_250)))
        })
    });
}

fn bench_decode_car_states(c: &mut Criterion) {
    let raw_count = 34;
    let blob: Vec<u8> = (0..raw_count * CAR_STATE_SIZE).map(|i| (i % 251) as u8).collect();

    let mut group = c.benchmark_group("decode_car_states");
    group.throughput(Throughput::Bytes(blob.len() as u64));
    group.bench_function("full_field", |b| {
        b.iter(|| black_box(decode_car_states(black_box(&blob), raw_count)))
    });
    group.finish();
}

fn bench_last_laps(c: &mut Criterion) {
    let state = race_field(33);
    let mut tracker = BestLapTracker::default();
    tracker.update_from_snapshot(&state);

    let mut group = c.benchmark_group("last_laps");
    group.bench_function("time", |b| {
        b.iter(|| black_box(tracker.last_laps(black_box(&state), LapDisplayMode::Time)))
    });
    group.bench_function("speed", |b| {
        b.iter(|| black_box(tracker.last_laps(black_box(&state), LapDisplayMode::Speed)))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_compute_gaps,
    bench_format_time_diff,
    bench_decode_car_states,
    bench_last_laps
);
criterion_main!(benches);
