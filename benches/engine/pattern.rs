//! Benchmarks for pattern parsing, matching and transforms.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polyrobin::sequencing::{matches, parse, presets, transform, TransformKind, DEFAULT_TOLERANCE};
use rand::rngs::StdRng;
use rand::SeedableRng;

pub fn bench_pattern(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/pattern");

    for name in ["quarter", "jungle", "sixteenth"] {
        let text = presets::get(name).unwrap_or("0");
        let positions = parse(text);

        group.bench_with_input(BenchmarkId::new("parse", name), &text, |b, text| {
            b.iter(|| parse(black_box(text)))
        });

        // One bar of sixteenth steps against the pattern
        group.bench_with_input(BenchmarkId::new("match_bar", name), &positions, |b, positions| {
            b.iter(|| {
                (0..16)
                    .filter(|step| matches(black_box(*step as f32 / 4.0), positions, DEFAULT_TOLERANCE))
                    .count()
            })
        });
    }

    let positions = parse(presets::get("sixteenth").unwrap_or("0"));
    let mut rng = StdRng::seed_from_u64(3);
    for kind in [TransformKind::Reverse, TransformKind::Rotate(3), TransformKind::Randomize] {
        group.bench_function(BenchmarkId::new("transform", kind.name()), |b| {
            b.iter(|| transform(black_box(&positions), kind, &mut rng))
        });
    }

    group.finish();
}
