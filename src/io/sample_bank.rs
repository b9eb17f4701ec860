use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use super::{SampleId, SampleLibrary};

/// Drum names registered by [`SampleBank::preload_defaults`] with their file
/// names.
pub const DEFAULT_DRUMS: &[(&str, &str)] = &[
    ("kick", "bd.wav"),
    ("snare", "sd.wav"),
    ("hihat", "hh.wav"),
    ("clap", "cp.wav"),
    ("tom", "tom.wav"),
    ("rim", "rim.wav"),
    ("cowbell", "cowbell.wav"),
    ("perc", "perc.wav"),
];

/// Numbered samples `sample1..=sample24` load from `1.wav..=24.wav`.
pub const NUMBERED_SAMPLES: u32 = 24;

/// Decoded audio, mixed down to mono.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Load a WAV file from disk, averaging channels into one.
    pub fn load_wav(path: &Path) -> Result<Self, hound::Error> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let max = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        let channels = spec.channels.max(1) as usize;
        let samples = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();

        Ok(Self::new(samples, spec.sample_rate))
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Voice shape used when a sample has no decoded audio.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyntheticKind {
    Membrane,
    Metal,
    Bass,
    Pluck,
    Tone,
}

/// Stand-in sound derived from a sample's name, so every name sounds
/// distinct and repeatable even with no file behind it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyntheticSound {
    pub kind: SyntheticKind,
    /// 100..500 Hz
    pub pitch_hz: f32,
    /// 0.1..0.35 s
    pub duration_secs: f32,
    /// 0.1..0.3 s
    pub decay_secs: f32,
    pub volume: f32,
}

impl SyntheticSound {
    pub fn from_name(name: &str) -> Self {
        let name_sum: u32 = name.chars().map(|c| c as u32).sum();

        let kind = if name.contains("kit") || name.contains("snare") {
            SyntheticKind::Membrane
        } else if name.contains("hihat") || name.contains("hat") {
            SyntheticKind::Metal
        } else if name.contains("bass") || name.contains("kick") {
            SyntheticKind::Bass
        } else if name.contains("sample") {
            match first_number(name) % 5 {
                0 => SyntheticKind::Membrane,
                1 => SyntheticKind::Metal,
                2 => SyntheticKind::Bass,
                3 => SyntheticKind::Pluck,
                _ => SyntheticKind::Tone,
            }
        } else {
            SyntheticKind::Membrane
        };

        Self {
            kind,
            pitch_hz: 100.0 + (name_sum % 400) as f32,
            duration_secs: 0.1 + (name_sum % 10) as f32 / 40.0,
            decay_secs: 0.1 + (name_sum % 5) as f32 / 20.0,
            volume: 0.8,
        }
    }
}

fn first_number(name: &str) -> u64 {
    name.chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}

#[derive(Clone, Debug)]
pub enum SampleSource {
    Buffer(Arc<SampleBuffer>),
    Synthetic(SyntheticSound),
}

#[derive(Clone, Debug)]
pub struct SampleHandle {
    pub id: SampleId,
    pub source: SampleSource,
}

impl SampleHandle {
    pub fn is_synthetic(&self) -> bool {
        matches!(self.source, SampleSource::Synthetic(_))
    }
}

/// Shared, thread-safe sample registry.
///
/// Clones share the same storage, so one clone can sit in the engine while
/// another feeds the audio sink.
#[derive(Clone, Debug, Default)]
pub struct SampleBank {
    samples: Arc<RwLock<BTreeMap<String, SampleHandle>>>,
}

impl SampleBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_buffer(&self, name: &str, buffer: SampleBuffer) -> SampleHandle {
        self.insert(name, SampleSource::Buffer(Arc::new(buffer)))
    }

    pub fn register_synthetic(&self, name: &str) -> SampleHandle {
        self.insert(name, SampleSource::Synthetic(SyntheticSound::from_name(name)))
    }

    /// Register the numbered samples and the drum kit.
    ///
    /// With a directory, each is decoded from its file there; missing files
    /// fall back to synthetic sounds. Returns how many were decoded.
    pub fn preload_defaults(&mut self, dir: Option<&Path>) -> usize {
        let mut entries: Vec<(String, String)> = (1..=NUMBERED_SAMPLES)
            .map(|i| (format!("sample{}", i), format!("{}.wav", i)))
            .collect();
        entries.extend(
            DEFAULT_DRUMS
                .iter()
                .map(|(name, file)| (name.to_string(), file.to_string())),
        );

        let mut decoded = 0;
        for (name, file) in &entries {
            let handle = match dir {
                Some(dir) => self.load_sample(name, &dir.join(file)),
                None => self.register_synthetic(name),
            };
            if !handle.is_synthetic() {
                decoded += 1;
            }
        }

        info!(
            total = entries.len(),
            decoded,
            synthetic = entries.len() - decoded,
            "Preloaded default samples"
        );
        decoded
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn insert(&self, name: &str, source: SampleSource) -> SampleHandle {
        let handle = SampleHandle {
            id: SampleId::from(name),
            source,
        };
        self.write().insert(name.to_string(), handle.clone());
        handle
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, SampleHandle>> {
        self.samples.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, SampleHandle>> {
        self.samples.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SampleLibrary for SampleBank {
    fn load_sample(&mut self, name: &str, source: &Path) -> SampleHandle {
        if let Some(existing) = self.get(name) {
            if !existing.is_synthetic() {
                debug!(sample = name, "Sample already loaded");
                return existing;
            }
        }

        match SampleBuffer::load_wav(source) {
            Ok(buffer) => {
                debug!(
                    sample = name,
                    path = %source.display(),
                    secs = buffer.duration_secs(),
                    "Decoded sample"
                );
                self.register_buffer(name, buffer)
            }
            Err(err) => {
                warn!(
                    sample = name,
                    path = %source.display(),
                    error = %err,
                    "Could not decode sample, using synthetic sound"
                );
                self.register_synthetic(name)
            }
        }
    }

    fn available_samples(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    fn get(&self, name: &str) -> Option<SampleHandle> {
        self.read().get(name).cloned()
    }
}
