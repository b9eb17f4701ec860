use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::clock::{MAX_BPM, MIN_BPM};
use crate::sequencing::DEFAULT_TOLERANCE;
use crate::{MAX_SAMPLES_PER_TRACK, MAX_TRACKS};

/// Engine construction settings.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Number of tracks created at startup (1..=8). Default: 8.
    pub num_tracks: usize,
    /// Samples a track can rotate through. Default: 4.
    pub max_samples_per_track: usize,
    /// Tempo used until `set_bpm` is called (1..=999). Default: 120.
    pub default_bpm: f64,
    /// Pattern text new and cleared tracks start with. Default: "0 1".
    pub default_pattern: String,
    /// Default: 16.
    pub default_division: u32,
    /// Default: 1.0.
    pub default_volume: f32,
    /// Pattern matching window in beats. Default: 0.05.
    pub tolerance: f32,
    /// Modulus of the master and per-track tick counters. Default: 16.
    pub master_steps: u32,
    /// Upper bound on how long `init` waits for the audio sink, in ms.
    pub init_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_tracks: MAX_TRACKS,
            max_samples_per_track: MAX_SAMPLES_PER_TRACK,
            default_bpm: 120.0,
            default_pattern: "0 1".to_string(),
            default_division: 16,
            default_volume: 1.0,
            tolerance: DEFAULT_TOLERANCE,
            master_steps: 16,
            init_timeout_ms: 2000,
        }
    }
}

impl EngineConfig {
    /// Clamp every field into its usable range.
    pub fn validate(mut self) -> Self {
        let defaults = Self::default();

        self.num_tracks = self.num_tracks.clamp(1, MAX_TRACKS);
        self.max_samples_per_track = self.max_samples_per_track.max(1);

        self.default_bpm = if self.default_bpm.is_finite() && self.default_bpm > 0.0 {
            self.default_bpm.clamp(MIN_BPM, MAX_BPM)
        } else {
            defaults.default_bpm
        };
        self.default_division = self.default_division.max(1);

        self.default_volume = if self.default_volume.is_finite() {
            self.default_volume.clamp(0.0, 1.0)
        } else {
            defaults.default_volume
        };

        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            self.tolerance = defaults.tolerance;
        }
        self.master_steps = self.master_steps.max(1);

        self
    }

    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }
}
