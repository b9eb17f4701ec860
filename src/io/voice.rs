use std::f32::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::sample_bank::{SampleSource, SyntheticKind, SyntheticSound};

/// One playing sample on the audio thread.
///
/// Buffers play back at their own rate (resampled by stepping a fractional
/// read position); synthetic sounds are generated per sample.
#[derive(Debug)]
pub struct Voice {
    pub track: usize,
    pub gain: f32,
    pub active: bool,
    source: SampleSource,
    /// Buffer read position in source frames, or elapsed seconds for synths
    pos: f64,
    phase: f32,
    noise: StdRng,
}

impl Voice {
    pub fn new(track: usize, source: SampleSource, gain: f32, seed: u64) -> Self {
        Self {
            track,
            gain,
            active: true,
            source,
            pos: 0.0,
            phase: 0.0,
            noise: StdRng::seed_from_u64(seed),
        }
    }

    /// Mix this voice into `out` (mono), deactivating when it runs out.
    pub fn render_into(&mut self, out: &mut [f32], sample_rate: f32) {
        if !self.active || sample_rate <= 0.0 {
            return;
        }

        match &self.source {
            SampleSource::Buffer(buffer) => {
                let data = &buffer.samples;
                if data.is_empty() {
                    self.active = false;
                    return;
                }
                let step = buffer.sample_rate as f64 / sample_rate as f64;

                for frame in out.iter_mut() {
                    let idx = self.pos.floor() as usize;
                    if idx >= data.len() {
                        self.active = false;
                        break;
                    }
                    // The last frame has nothing to interpolate towards
                    let sample = match data.get(idx + 1) {
                        Some(&next) => {
                            let frac = (self.pos - idx as f64) as f32;
                            data[idx] * (1.0 - frac) + next * frac
                        }
                        None => data[idx],
                    };
                    *frame += sample * self.gain;
                    self.pos += step;
                }
            }
            SampleSource::Synthetic(sound) => {
                let sound = *sound;
                let dt = 1.0 / sample_rate as f64;

                for frame in out.iter_mut() {
                    let t = self.pos as f32;
                    if t >= sound.duration_secs {
                        self.active = false;
                        break;
                    }
                    *frame += self.synth_sample(&sound, t, sample_rate) * sound.volume * self.gain;
                    self.pos += dt;
                }
            }
        }
    }

    fn synth_sample(&mut self, sound: &SyntheticSound, t: f32, sample_rate: f32) -> f32 {
        let env = (-t / sound.decay_secs.max(1e-3)).exp();

        let freq = match sound.kind {
            // Pitch sweeps down into the fundamental
            SyntheticKind::Membrane => sound.pitch_hz * (1.0 + 2.0 * (-t / 0.05).exp()),
            SyntheticKind::Bass => sound.pitch_hz * 0.5,
            _ => sound.pitch_hz,
        };
        self.phase = (self.phase + freq / sample_rate) % 1.0;

        match sound.kind {
            SyntheticKind::Membrane | SyntheticKind::Bass | SyntheticKind::Tone => {
                (self.phase * TAU).sin() * env
            }
            SyntheticKind::Metal => {
                let noise: f32 = self.noise.gen_range(-1.0..1.0);
                let square = if self.phase < 0.5 { 1.0 } else { -1.0 };
                (noise * 0.7 + square * 0.3) * env * env
            }
            SyntheticKind::Pluck => {
                let triangle = 4.0 * (self.phase - 0.5).abs() - 1.0;
                triangle * env * env
            }
        }
    }
}
