use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::transport::TransportState;
use crate::graph::EffectKind;
use crate::sequencing::BEATS_PER_BAR;

/// Read-only view of one track for displays.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSnapshot {
    pub index: usize,
    pub samples: Vec<String>,
    pub cursor: usize,
    pub pattern: String,
    pub positions: Vec<f32>,
    pub division: u32,
    pub volume: f32,
    pub muted: bool,
    pub is_playing: bool,
    pub effect: Option<EffectKind>,
    /// Step of the track's own loop, if it is running and has ticked
    pub current_step: Option<u32>,
    pub last_triggered_at: Option<Duration>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub state: TransportState,
    pub bpm: f64,
    pub master_step: Option<u32>,
    /// Modulus of the master counter: steps per bar
    pub master_steps: u32,
    pub active: Vec<usize>,
    pub now: Duration,
    pub tracks: Vec<TrackSnapshot>,
}

impl EngineSnapshot {
    /// Beat position of the master loop within the bar, for a playhead.
    pub fn master_beat(&self) -> Option<f32> {
        let steps = self.master_steps.max(1) as f32;
        self.master_step
            .map(|step| step as f32 / steps * BEATS_PER_BAR)
    }
}
