/*
Track Effects
=============

An effect is an opaque node spliced between a track's gain and the master
bus. The chain never processes audio itself; it maps the user's normalized
parameters (0..1) onto the physical values a renderer would use.

| kind       | inputs (default)                       | mapped                                   |
|------------|----------------------------------------|------------------------------------------|
| delay      | delay_time .25, feedback .5, wet_dry .5 | seconds direct (<= 1s), feedback <= 0.9  |
| reverb     | decay .5, wet_dry .5                   | decay * 5 s, pre-delay 10 ms             |
| distortion | distortion .5, wet_dry .5              | amount direct, 4x oversample             |
| lowpass    | frequency .5, q .1                     | 100 + f * 15000 Hz, Q = q * 10           |
| highpass   | frequency .5, q .1                     | 20 + f * 10000 Hz, Q = q * 10            |
| chorus     | depth .7, rate .5, wet_dry .5          | rate Hz direct, depth direct, 4 ms delay |
| phaser     | rate .5, depth .6, wet_dry .5          | rate * 10 Hz, 3 octaves from 1000 Hz     |

Input names may also be written in camelCase (`delayTime`, `wetDry`). Unknown
names are logged and ignored. Inputs outside [0, 1] are clamped. A NaN or
infinite input fails construction.
*/

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::node::{next_node_id, AudioNode, NodeId};

pub const DELAY_TIME: &str = "delay_time";
pub const FEEDBACK: &str = "feedback";
pub const WET_DRY: &str = "wet_dry";
pub const DECAY: &str = "decay";
pub const DISTORTION: &str = "distortion";
pub const FREQUENCY: &str = "frequency";
pub const Q: &str = "q";
pub const DEPTH: &str = "depth";
pub const RATE: &str = "rate";

/// Longest delay line a delay node allocates, in seconds.
pub const MAX_DELAY_SECONDS: f32 = 1.0;
/// Feedback above this self-oscillates.
pub const MAX_FEEDBACK: f32 = 0.9;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Delay,
    Reverb,
    Distortion,
    Lowpass,
    Highpass,
    Chorus,
    Phaser,
}

impl EffectKind {
    pub const ALL: [EffectKind; 7] = [
        EffectKind::Delay,
        EffectKind::Reverb,
        EffectKind::Distortion,
        EffectKind::Lowpass,
        EffectKind::Highpass,
        EffectKind::Chorus,
        EffectKind::Phaser,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EffectKind::Delay => "delay",
            EffectKind::Reverb => "reverb",
            EffectKind::Distortion => "distortion",
            EffectKind::Lowpass => "lowpass",
            EffectKind::Highpass => "highpass",
            EffectKind::Chorus => "chorus",
            EffectKind::Phaser => "phaser",
        }
    }

    /// Default normalized inputs for this kind.
    pub fn defaults(&self) -> &'static [(&'static str, f32)] {
        match self {
            EffectKind::Delay => &[(DELAY_TIME, 0.25), (FEEDBACK, 0.5), (WET_DRY, 0.5)],
            EffectKind::Reverb => &[(DECAY, 0.5), (WET_DRY, 0.5)],
            EffectKind::Distortion => &[(DISTORTION, 0.5), (WET_DRY, 0.5)],
            EffectKind::Lowpass | EffectKind::Highpass => &[(FREQUENCY, 0.5), (Q, 0.1)],
            EffectKind::Chorus => &[(DEPTH, 0.7), (RATE, 0.5), (WET_DRY, 0.5)],
            EffectKind::Phaser => &[(RATE, 0.5), (DEPTH, 0.6), (WET_DRY, 0.5)],
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EffectKind {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        EffectKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or(ChainError::UnknownEffect(s.to_string()))
    }
}

/// Normalized effect inputs by name. Missing names take the kind's default.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EffectParams(BTreeMap<String, f32>);

impl EffectParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names are stored in snake_case; `delayTime` and `delay_time` are the
    /// same input.
    pub fn with(mut self, name: &str, value: f32) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: f32) {
        self.0.insert(param_key(name), value);
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        let key = param_key(name);
        self.0
            .iter()
            .find(|(stored, _)| param_key(stored) == key)
            .map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

/// Canonical form of a parameter name: camelCase folds to snake_case.
fn param_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len() + 2);
    for c in name.trim().chars() {
        if c.is_ascii_uppercase() {
            if !key.is_empty() && !key.ends_with('_') {
                key.push('_');
            }
            key.push(c.to_ascii_lowercase());
        } else {
            key.push(c);
        }
    }
    key
}

/// An effect request: which kind and with what inputs.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EffectSpec {
    pub kind: EffectKind,
    pub params: EffectParams,
}

impl EffectSpec {
    pub fn new(kind: EffectKind, params: EffectParams) -> Self {
        Self { kind, params }
    }
}

/// Physical parameters after mapping the normalized inputs.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectSettings {
    Delay {
        delay_seconds: f32,
        max_delay_seconds: f32,
        feedback: f32,
        wet_dry: f32,
    },
    Reverb {
        decay_seconds: f32,
        pre_delay_seconds: f32,
        wet_dry: f32,
    },
    Distortion {
        amount: f32,
        oversample: u32,
        wet_dry: f32,
    },
    Lowpass {
        cutoff_hz: f32,
        q: f32,
    },
    Highpass {
        cutoff_hz: f32,
        q: f32,
    },
    Chorus {
        rate_hz: f32,
        depth: f32,
        delay_ms: f32,
        wet_dry: f32,
    },
    Phaser {
        rate_hz: f32,
        depth: f32,
        octaves: u32,
        base_hz: f32,
        wet_dry: f32,
    },
}

impl EffectSettings {
    pub fn from_params(kind: EffectKind, params: &EffectParams) -> Result<Self, ChainError> {
        for (name, _) in params.iter() {
            let key = param_key(name);
            if !kind.defaults().iter().any(|(known, _)| *known == key) {
                warn!(effect = %kind, param = name, "Ignoring unknown effect parameter");
            }
        }

        let input = |name: &'static str| -> Result<f32, ChainError> {
            let value = match params.get(name) {
                Some(value) => value,
                None => kind
                    .defaults()
                    .iter()
                    .find(|(default, _)| *default == name)
                    .map(|(_, value)| *value)
                    .unwrap_or(0.0),
            };
            if !value.is_finite() {
                return Err(ChainError::InvalidParam {
                    effect: kind,
                    param: name,
                    value,
                });
            }
            Ok(value.clamp(0.0, 1.0))
        };

        let settings = match kind {
            EffectKind::Delay => EffectSettings::Delay {
                delay_seconds: input(DELAY_TIME)?.min(MAX_DELAY_SECONDS),
                max_delay_seconds: MAX_DELAY_SECONDS,
                feedback: input(FEEDBACK)?.min(MAX_FEEDBACK),
                wet_dry: input(WET_DRY)?,
            },
            EffectKind::Reverb => EffectSettings::Reverb {
                decay_seconds: input(DECAY)? * 5.0,
                pre_delay_seconds: 0.01,
                wet_dry: input(WET_DRY)?,
            },
            EffectKind::Distortion => EffectSettings::Distortion {
                amount: input(DISTORTION)?,
                oversample: 4,
                wet_dry: input(WET_DRY)?,
            },
            EffectKind::Lowpass => EffectSettings::Lowpass {
                cutoff_hz: 100.0 + input(FREQUENCY)? * 15000.0,
                q: input(Q)? * 10.0,
            },
            EffectKind::Highpass => EffectSettings::Highpass {
                cutoff_hz: 20.0 + input(FREQUENCY)? * 10000.0,
                q: input(Q)? * 10.0,
            },
            EffectKind::Chorus => EffectSettings::Chorus {
                rate_hz: input(RATE)?,
                depth: input(DEPTH)?,
                delay_ms: 4.0,
                wet_dry: input(WET_DRY)?,
            },
            EffectKind::Phaser => EffectSettings::Phaser {
                rate_hz: input(RATE)? * 10.0,
                depth: input(DEPTH)?,
                octaves: 3,
                base_hz: 1000.0,
                wet_dry: input(WET_DRY)?,
            },
        };

        Ok(settings)
    }

    pub fn kind(&self) -> EffectKind {
        match self {
            EffectSettings::Delay { .. } => EffectKind::Delay,
            EffectSettings::Reverb { .. } => EffectKind::Reverb,
            EffectSettings::Distortion { .. } => EffectKind::Distortion,
            EffectSettings::Lowpass { .. } => EffectKind::Lowpass,
            EffectSettings::Highpass { .. } => EffectKind::Highpass,
            EffectSettings::Chorus { .. } => EffectKind::Chorus,
            EffectSettings::Phaser { .. } => EffectKind::Phaser,
        }
    }
}

/// Constructed effect node. Only exists with valid settings.
#[derive(Debug, Clone)]
pub struct EffectNode {
    id: NodeId,
    spec: EffectSpec,
    settings: EffectSettings,
    released: bool,
}

impl EffectNode {
    pub fn build(spec: &EffectSpec) -> Result<Self, ChainError> {
        let settings = EffectSettings::from_params(spec.kind, &spec.params)?;
        Ok(Self {
            id: next_node_id(),
            spec: spec.clone(),
            settings,
            released: false,
        })
    }

    pub fn kind(&self) -> EffectKind {
        self.spec.kind
    }

    pub fn spec(&self) -> &EffectSpec {
        &self.spec
    }

    pub fn settings(&self) -> EffectSettings {
        self.settings
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl AudioNode for EffectNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn label(&self) -> &'static str {
        self.spec.kind.name()
    }

    fn release(&mut self) {
        self.released = true;
    }
}

/// Signal chain construction and wiring failures
#[derive(Debug, Clone, PartialEq)]
pub enum ChainError {
    /// A parameter was NaN or infinite
    InvalidParam {
        effect: EffectKind,
        param: &'static str,
        value: f32,
    },
    /// No effect with this name
    UnknownEffect(String),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainError::InvalidParam {
                effect,
                param,
                value,
            } => write!(f, "Invalid {} parameter {}: {}", effect, param, value),
            ChainError::UnknownEffect(name) => write!(f, "Unknown effect: {:?}", name),
        }
    }
}

impl std::error::Error for ChainError {}
