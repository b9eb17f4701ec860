use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::effect::{ChainError, EffectNode, EffectSettings, EffectSpec};
use super::node::{AudioNode, GainNode, NodeId};

/// One directed edge in a track's chain.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub from: NodeId,
    pub to: NodeId,
}

/// Snapshot of a track's chain, handed to the playback collaborator as the
/// destination of a triggered sample.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub track: usize,
    pub volume_node: NodeId,
    pub gain: f32,
    pub effect: Option<EffectSettings>,
}

/// Per-track node path: gain -> optional effect -> master.
///
/// There is always exactly one path from the gain node to the master bus,
/// either direct or through the single active effect.
#[derive(Debug)]
pub struct SignalChain {
    volume: GainNode,
    master: NodeId,
    effect: Option<EffectNode>,
    connections: Vec<Connection>,
}

impl SignalChain {
    pub fn new(master: NodeId, volume: f32) -> Self {
        let volume = GainNode::new(volume);
        let connections = vec![Connection {
            from: volume.id(),
            to: master,
        }];

        Self {
            volume,
            master,
            effect: None,
            connections,
        }
    }

    pub fn volume_node(&self) -> NodeId {
        self.volume.id()
    }

    pub fn gain(&self) -> f32 {
        self.volume.gain()
    }

    /// Update the gain in place; the wiring is untouched.
    pub fn set_volume(&mut self, level: f32) {
        self.volume.set_gain(level);
    }

    pub fn active_effect(&self) -> Option<&EffectNode> {
        self.effect.as_ref()
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Node ids from the gain node to the master bus, in signal order.
    pub fn path(&self) -> Vec<NodeId> {
        let mut path = vec![self.volume.id()];
        let mut current = self.volume.id();
        while let Some(edge) = self.connections.iter().find(|edge| edge.from == current) {
            path.push(edge.to);
            current = edge.to;
        }
        path
    }

    /// Replace the active effect.
    ///
    /// The new node is built before anything is detached, so a failed build
    /// leaves no half-wired state. On failure the previous effect is still
    /// released and the chain routes direct.
    ///
    /// Returns the id of the released effect, if there was one.
    pub fn apply_effect(&mut self, spec: Option<&EffectSpec>) -> Result<Option<NodeId>, ChainError> {
        let built = spec.map(EffectNode::build).transpose();
        let released = self.detach_effect();

        match built {
            Ok(Some(node)) => {
                debug!(effect = %node.kind(), node = %node.id(), "Splicing effect into chain");
                self.connections = vec![
                    Connection {
                        from: self.volume.id(),
                        to: node.id(),
                    },
                    Connection {
                        from: node.id(),
                        to: self.master,
                    },
                ];
                self.effect = Some(node);
                Ok(released)
            }
            Ok(None) => {
                self.connect_direct();
                Ok(released)
            }
            Err(err) => {
                warn!(error = %err, "Effect construction failed, routing direct");
                self.connect_direct();
                Err(err)
            }
        }
    }

    /// Remove any effect and route direct.
    pub fn clear_effect(&mut self) -> Option<NodeId> {
        let released = self.detach_effect();
        self.connect_direct();
        released
    }

    /// Tear down everything the chain owns beyond the gain node.
    pub fn release(&mut self) -> Option<NodeId> {
        self.clear_effect()
    }

    pub fn route(&self, track: usize) -> Route {
        Route {
            track,
            volume_node: self.volume.id(),
            gain: self.volume.gain(),
            effect: self.effect.as_ref().map(EffectNode::settings),
        }
    }

    fn detach_effect(&mut self) -> Option<NodeId> {
        let mut old = self.effect.take()?;
        old.release();
        debug!(effect = %old.kind(), node = %old.id(), "Released effect");
        Some(old.id())
    }

    fn connect_direct(&mut self) {
        self.connections = vec![Connection {
            from: self.volume.id(),
            to: self.master,
        }];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::effect::{EffectKind, EffectParams, DECAY};
    use crate::graph::node::MasterBus;

    fn spec(kind: EffectKind) -> EffectSpec {
        EffectSpec::new(kind, EffectParams::new())
    }

    #[test]
    fn test_starts_direct() {
        let master = MasterBus::new();
        let chain = SignalChain::new(master.id(), 0.8);
        assert_eq!(chain.path(), vec![chain.volume_node(), master.id()]);
        assert_eq!(chain.gain(), 0.8);
        assert!(chain.active_effect().is_none());
    }

    #[test]
    fn test_effect_spliced_between_gain_and_master() {
        let master = MasterBus::new();
        let mut chain = SignalChain::new(master.id(), 1.0);

        let released = chain.apply_effect(Some(&spec(EffectKind::Reverb))).unwrap();
        assert!(released.is_none());

        let effect_id = chain.active_effect().map(|node| node.id()).unwrap();
        assert_eq!(chain.path(), vec![chain.volume_node(), effect_id, master.id()]);
        assert_eq!(chain.connections().len(), 2);
    }

    #[test]
    fn test_swap_releases_previous_effect() {
        let master = MasterBus::new();
        let mut chain = SignalChain::new(master.id(), 1.0);

        chain.apply_effect(Some(&spec(EffectKind::Delay))).unwrap();
        let first = chain.active_effect().map(|node| node.id()).unwrap();

        let released = chain.apply_effect(Some(&spec(EffectKind::Lowpass))).unwrap();
        assert_eq!(released, Some(first));

        let active = chain.active_effect().unwrap();
        assert_eq!(active.kind(), EffectKind::Lowpass);
        assert!(!chain.path().contains(&first));
        assert!(!chain
            .connections()
            .iter()
            .any(|edge| edge.from == first || edge.to == first));
    }

    #[test]
    fn test_none_routes_direct() {
        let master = MasterBus::new();
        let mut chain = SignalChain::new(master.id(), 1.0);
        chain.apply_effect(Some(&spec(EffectKind::Chorus))).unwrap();

        assert!(chain.apply_effect(None).unwrap().is_some());
        assert_eq!(chain.path(), vec![chain.volume_node(), master.id()]);
    }

    #[test]
    fn test_failed_build_falls_back_to_direct() {
        let master = MasterBus::new();
        let mut chain = SignalChain::new(master.id(), 1.0);
        chain.apply_effect(Some(&spec(EffectKind::Phaser))).unwrap();

        let bad = EffectSpec::new(
            EffectKind::Reverb,
            EffectParams::new().with(DECAY, f32::NAN),
        );
        assert!(chain.apply_effect(Some(&bad)).is_err());
        assert!(chain.active_effect().is_none());
        assert_eq!(chain.path(), vec![chain.volume_node(), master.id()]);
    }

    #[test]
    fn test_volume_does_not_rewire() {
        let master = MasterBus::new();
        let mut chain = SignalChain::new(master.id(), 1.0);
        chain.apply_effect(Some(&spec(EffectKind::Distortion))).unwrap();
        let before = chain.connections().to_vec();

        chain.set_volume(0.3);
        assert_eq!(chain.gain(), 0.3);
        assert_eq!(chain.connections(), before.as_slice());
        assert_eq!(chain.route(2).gain, 0.3);
        assert_eq!(chain.route(2).track, 2);
    }

    #[test]
    fn test_release_returns_to_direct() {
        let master = MasterBus::new();
        let mut chain = SignalChain::new(master.id(), 1.0);
        chain.apply_effect(Some(&spec(EffectKind::Highpass))).unwrap();
        assert!(chain.release().is_some());
        assert!(chain.route(0).effect.is_none());
        assert!(chain.release().is_none());
    }
}
