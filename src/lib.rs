pub mod config; // Engine defaults and limits
pub mod engine; // Tracks, tick loops, scheduler and transport
pub mod graph; // Per-track signal chains
pub mod io; // Playback and sample collaborators
pub mod runtime; // Wall-clock driver thread
pub mod sequencing; // Pattern parsing, transforms and rhythm generators

pub use config::EngineConfig;
pub use engine::{EngineError, TransportController, TransportState};

/// Hard upper bound on the number of tracks an engine can hold.
pub const MAX_TRACKS: usize = 8;
/// Default number of samples a track can rotate through.
pub const MAX_SAMPLES_PER_TRACK: usize = 4;
