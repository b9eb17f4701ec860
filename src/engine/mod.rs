pub mod clock;
pub mod scheduler;
pub mod snapshot;
pub mod track;
pub mod transport;

use std::fmt;

pub use self::scheduler::Scheduler;
pub use self::snapshot::{EngineSnapshot, TrackSnapshot};
pub use self::track::Track;
pub use self::transport::{TransportController, TransportState};

use crate::graph::ChainError;

/// Errors returned by the public engine API
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Playback was requested before `init`
    NotInitialized,
    /// Track index out of range
    InvalidTrack { index: usize, count: usize },
    /// Sample slot out of range on a track
    InvalidSample {
        track: usize,
        index: usize,
        count: usize,
    },
    /// Track already holds its maximum number of samples
    TrackFull { track: usize, capacity: usize },
    /// Division must be at least 1
    InvalidDivision(u32),
    /// Tempo must be finite and within 1..=999
    InvalidBpm(f64),
    /// Effect could not be built; the track now routes direct
    Chain { track: usize, source: ChainError },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::NotInitialized => write!(f, "Engine is not initialized"),
            EngineError::InvalidTrack { index, count } => {
                write!(f, "Invalid track {}: engine has {} tracks", index, count)
            }
            EngineError::InvalidSample {
                track,
                index,
                count,
            } => write!(
                f,
                "Invalid sample {} on track {}: track has {} samples",
                index, track, count
            ),
            EngineError::TrackFull { track, capacity } => {
                write!(f, "Track {} is full ({} samples)", track, capacity)
            }
            EngineError::InvalidDivision(division) => {
                write!(f, "Invalid division: {}", division)
            }
            EngineError::InvalidBpm(bpm) => write!(f, "Invalid bpm: {}", bpm),
            EngineError::Chain { track, source } => {
                write!(f, "Signal chain error on track {}: {}", track, source)
            }
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Chain { source, .. } => Some(source),
            _ => None,
        }
    }
}
