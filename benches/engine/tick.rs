//! Benchmarks for advancing the engine clock.

use std::hint::black_box;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion};
use polyrobin::io::{NullSink, SampleBank};
use polyrobin::{EngineConfig, TransportController};

use crate::TRACK_COUNTS;

const TICK: Duration = Duration::from_millis(125);

fn build_engine(tracks: usize) -> TransportController {
    let mut engine = TransportController::new(
        EngineConfig::default(),
        Box::new(NullSink),
        Box::new(SampleBank::new()),
    );
    engine.init();
    for index in 0..tracks {
        for sample in ["a", "b", "c"] {
            let _ = engine.add_sample(index, sample);
        }
        let _ = engine.set_pattern(index, "0 0.5 1 1.75 2 2.5 3 3.75");
    }
    let _ = engine.start_global();
    engine
}

pub fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/tick");

    for &tracks in TRACK_COUNTS {
        let mut engine = build_engine(tracks);
        group.bench_with_input(BenchmarkId::new("one_bar", tracks), &tracks, |b, _| {
            b.iter(|| engine.advance_by(black_box(TICK * 16)))
        });

        let mut engine = build_engine(tracks);
        for index in 0..tracks {
            let _ = engine.start_track(index);
        }
        group.bench_with_input(BenchmarkId::new("one_bar_with_track_loops", tracks), &tracks, |b, _| {
            b.iter(|| engine.advance_by(black_box(TICK * 16)))
        });
    }

    group.finish();
}
