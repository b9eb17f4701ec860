/*
Beat Patterns
=============

A pattern is the set of beat offsets inside one bar at which a track fires.
At the boundary a pattern is plain text, whitespace separated numbers:

    "0 1 2 3"            = four on the floor
    "0.5 1.5 2.5 3.5"    = offbeats
    "0 1.33 2.66"        = tresillo

A bar is always 4 beats long. Positions outside [0, 4) are folded back into the
bar when matching, so "4" and "0" hit the same spot.

Matching is tolerant: a beat position matches a pattern position when they are
within `tolerance` beats of each other, measured the short way around the bar
(3.98 is 0.02 away from 0).

Parsing never fails. Tokens that are not numbers are dropped:

    parse("0 1.5 x 2") == [0.0, 1.5, 2.0]
*/

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Length of one bar in beats.
pub const BEATS_PER_BAR: f32 = 4.0;

/// Matching window used by the scheduler, in beats.
pub const DEFAULT_TOLERANCE: f32 = 0.05;

/// Parse pattern text into beat positions.
///
/// Splits on whitespace and keeps every token that parses as a finite float,
/// in order. Empty or whitespace-only text yields an empty pattern.
pub fn parse(text: &str) -> Vec<f32> {
    text.split_whitespace()
        .filter_map(|token| token.parse::<f32>().ok())
        .filter(|position| position.is_finite())
        .collect()
}

/// Check whether `beat_position` lands on any of `positions`.
///
/// Both sides are folded into one bar first; the distance wraps at the bar
/// boundary.
pub fn matches(beat_position: f32, positions: &[f32], tolerance: f32) -> bool {
    let beat = beat_position.rem_euclid(BEATS_PER_BAR);

    positions.iter().any(|&position| {
        let diff = (beat - position.rem_euclid(BEATS_PER_BAR)).abs();
        diff <= tolerance || BEATS_PER_BAR - diff <= tolerance
    })
}

/// Linearly rescale positions so the smallest maps to `min` and the largest
/// to `max`. A pattern whose positions are all equal collapses onto `min`.
pub fn normalize(positions: &[f32], min: f32, max: f32) -> Vec<f32> {
    if positions.is_empty() {
        return Vec::new();
    }

    let lo = positions.iter().copied().fold(f32::INFINITY, f32::min);
    let hi = positions.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    if lo == hi {
        return vec![min; positions.len()];
    }

    positions
        .iter()
        .map(|&position| {
            let unit = (position - lo) / (hi - lo);
            unit * (max - min) + min
        })
        .collect()
}

/// Parsed pattern that remembers the text it came from.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pattern {
    text: String,
    positions: Vec<f32>,
}

impl Pattern {
    /// Parse pattern text, keeping the source text for display.
    pub fn parse(text: &str) -> Self {
        Self {
            text: text.to_string(),
            positions: parse(text),
        }
    }

    /// Build a pattern from positions (e.g. the output of a transform).
    pub fn from_positions(positions: Vec<f32>) -> Self {
        let text = positions
            .iter()
            .map(|position| position.to_string())
            .collect::<Vec<_>>()
            .join(" ");

        Self { text, positions }
    }

    /// Look up one of the named presets.
    pub fn preset(name: &str) -> Option<Self> {
        super::presets::get(name).map(Self::parse)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// See [`matches`].
    pub fn matches(&self, beat_position: f32, tolerance: f32) -> bool {
        matches(beat_position, &self.positions, tolerance)
    }
}
