//! Per-track signal chains.
//!
//! Each track owns a gain node wired to a shared master bus, with at most one
//! effect spliced in between. Nodes carry identity and parameters; the audio
//! sink does the rendering.

/// Gain -> effect -> master wiring and the effect swap.
pub mod chain;
/// Effect kinds, parameter mapping and chain errors.
pub mod effect;
/// Node identity and the core node trait.
pub mod node;

pub use chain::{Connection, Route, SignalChain};
pub use effect::{ChainError, EffectKind, EffectNode, EffectParams, EffectSettings, EffectSpec};
pub use node::{AudioNode, GainNode, MasterBus, NodeId};
