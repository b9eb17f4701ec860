// Purpose - collaborators at the engine boundary: sample playback and sample loading

#[cfg(feature = "rtrb")]
pub mod output;
pub mod sample_bank;
pub mod voice;

use std::fmt;
use std::path::Path;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::graph::Route;

#[cfg(feature = "rtrb")]
pub use output::CpalSink;
pub use sample_bank::{SampleBank, SampleBuffer, SampleHandle, SampleSource, SyntheticKind, SyntheticSound};

/// Name a sample is registered under.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SampleId(String);

impl SampleId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SampleId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for SampleId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sample playback collaborator.
///
/// `play_sample` is called from the tick path and must return without
/// blocking; errors are logged by the caller and never stop the clock.
pub trait AudioSink: Send {
    /// Bring the output up, giving up after `timeout`.
    ///
    /// Default implementation does nothing (sinks without a device).
    fn open(&mut self, _timeout: Duration) -> Result<(), OutputError> {
        Ok(())
    }

    fn play_sample(&mut self, sample: &SampleId, route: &Route) -> Result<(), PlaybackError>;

    /// Mirror a chain change (volume, effect swap) for a track.
    fn update_route(&mut self, _track: usize, _route: &Route) {
        // Default: do nothing
    }
}

/// Sample decoding and lookup collaborator.
pub trait SampleLibrary: Send {
    /// Decode `source` and register it as `name`.
    ///
    /// Never fails: an unreadable source is replaced with a synthetic sound.
    fn load_sample(&mut self, name: &str, source: &Path) -> SampleHandle;

    fn available_samples(&self) -> Vec<String>;

    fn get(&self, name: &str) -> Option<SampleHandle>;
}

/// Sink that accepts everything and plays nothing. Used in degraded mode and
/// for headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn play_sample(&mut self, _sample: &SampleId, _route: &Route) -> Result<(), PlaybackError> {
        Ok(())
    }
}

/// Errors raised when triggering a sample
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// The sample was never loaded
    UnknownSample(SampleId),
    /// The audio thread's command queue is full
    QueueFull,
    /// The output went away
    Unavailable,
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackError::UnknownSample(id) => write!(f, "Unknown sample: {}", id),
            PlaybackError::QueueFull => write!(f, "Playback queue is full"),
            PlaybackError::Unavailable => write!(f, "Audio output is unavailable"),
        }
    }
}

impl std::error::Error for PlaybackError {}

/// Errors raised while bringing up an audio output
#[derive(Debug, Clone, PartialEq)]
pub enum OutputError {
    /// No default output device
    NoDevice,
    /// Device refused to report a config
    Config(String),
    /// Stream could not be built or started
    Stream(String),
    UnsupportedFormat(String),
    /// Output did not come up within the allowed time
    Timeout(Duration),
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputError::NoDevice => write!(f, "No output device available"),
            OutputError::Config(msg) => write!(f, "Output config error: {}", msg),
            OutputError::Stream(msg) => write!(f, "Output stream error: {}", msg),
            OutputError::UnsupportedFormat(format) => {
                write!(f, "Unsupported sample format: {}", format)
            }
            OutputError::Timeout(waited) => {
                write!(f, "Output did not start within {} ms", waited.as_millis())
            }
        }
    }
}

impl std::error::Error for OutputError {}
