//! Benchmarks for the audio-thread voice mixer.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion};
use polyrobin::io::output::{Mixer, VoiceCommand, MAX_VOICES};
use polyrobin::io::{SampleBuffer, SampleSource, SyntheticSound};

const BLOCK_SIZES: &[usize] = &[128, 512];

pub fn bench_mixer(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/mixer");
    let buffer = Arc::new(SampleBuffer::new(vec![0.1; 48_000], 44_100));

    for &size in BLOCK_SIZES {
        let mut data = vec![0.0f32; size * 2];

        group.bench_with_input(BenchmarkId::new("full_pool", size), &size, |b, _| {
            b.iter(|| {
                let mut mixer = Mixer::new(48_000.0);
                for i in 0..MAX_VOICES {
                    let source = if i % 2 == 0 {
                        SampleSource::Buffer(buffer.clone())
                    } else {
                        SampleSource::Synthetic(SyntheticSound::from_name("hihat"))
                    };
                    mixer.handle(VoiceCommand::Play {
                        track: i % 8,
                        source,
                        gain: 0.5,
                        seed: i as u64,
                    });
                }
                mixer.render(black_box(&mut data), 2);
            })
        });
    }

    group.finish();
}
