//! Track - one lane of the sequencer
//!
//! A track holds up to `capacity` samples it cycles through, the pattern it
//! fires on and its mixer settings. Timing lives in the scheduler; the track
//! only answers "would I fire on this step?" and "which sample is next?".

use std::time::Duration;

use crate::graph::EffectSpec;
use crate::io::SampleId;
use crate::sequencing::{Division, Pattern};

#[derive(Debug, Clone)]
pub struct Track {
    samples: Vec<SampleId>,
    capacity: usize,
    /// Next sample to play; always a valid index, or 0 when empty
    cursor: usize,
    pattern: Pattern,
    division: Division,
    volume: f32,
    muted: bool,
    /// Independent loop flag, orthogonal to global playback
    is_playing: bool,
    effect: Option<EffectSpec>,
    last_triggered_at: Option<Duration>,
}

impl Track {
    pub fn new(pattern: &str, division: Division, volume: f32, capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
            pattern: Pattern::parse(pattern),
            division,
            volume: volume.clamp(0.0, 1.0),
            muted: false,
            is_playing: false,
            effect: None,
            last_triggered_at: None,
        }
    }

    pub fn samples(&self) -> &[SampleId] {
        &self.samples
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn division(&self) -> Division {
        self.division
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn effect(&self) -> Option<&EffectSpec> {
        self.effect.as_ref()
    }

    pub fn last_triggered_at(&self) -> Option<Duration> {
        self.last_triggered_at
    }

    pub fn has_samples(&self) -> bool {
        !self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    /// Append a sample to the rotation. Returns false when full.
    pub fn add_sample(&mut self, sample: SampleId) -> bool {
        if self.is_full() {
            return false;
        }
        self.samples.push(sample);
        true
    }

    /// Remove the sample at `index`, keeping the cursor on a valid slot.
    pub fn remove_sample(&mut self, index: usize) -> Option<SampleId> {
        if index >= self.samples.len() {
            return None;
        }
        let removed = self.samples.remove(index);
        self.clamp_cursor();
        Some(removed)
    }

    /// Replace the rotation wholesale. Returns false (and changes nothing)
    /// when `samples` exceeds the capacity.
    pub fn set_samples(&mut self, samples: Vec<SampleId>) -> bool {
        if samples.len() > self.capacity {
            return false;
        }
        self.samples = samples;
        self.clamp_cursor();
        true
    }

    /// Round-robin pick: returns the sample under the cursor and advances it.
    pub fn next_sample(&mut self) -> Option<SampleId> {
        let sample = self.samples.get(self.cursor)?.clone();
        self.cursor = (self.cursor + 1) % self.samples.len();
        Some(sample)
    }

    /// Whether this track fires on counter value `step`.
    ///
    /// Muted or empty tracks never fire.
    pub fn should_fire(&self, step: u32, tolerance: f32) -> bool {
        if self.muted || self.samples.is_empty() {
            return false;
        }
        self.pattern
            .matches(self.division.beat_position(step), tolerance)
    }

    pub fn set_pattern(&mut self, pattern: Pattern) {
        self.pattern = pattern;
    }

    pub fn set_division(&mut self, division: Division) {
        self.division = division;
    }

    pub fn set_volume(&mut self, volume: f32) {
        if volume.is_finite() {
            self.volume = volume.clamp(0.0, 1.0);
        }
    }

    /// Flip the mute flag, returning the new state.
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.muted
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.is_playing = playing;
    }

    pub fn set_effect(&mut self, effect: Option<EffectSpec>) {
        self.effect = effect;
    }

    pub fn mark_triggered(&mut self, at: Duration) {
        self.last_triggered_at = Some(at);
    }

    /// Back to an empty lane with `pattern`. Mixer settings are kept.
    pub fn clear(&mut self, pattern: &str) {
        self.samples.clear();
        self.cursor = 0;
        self.pattern = Pattern::parse(pattern);
        self.is_playing = false;
        self.effect = None;
        self.last_triggered_at = None;
    }

    fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.samples.len().saturating_sub(1));
    }
}
