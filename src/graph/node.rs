use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique handle for a signal chain node.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Allocate a fresh node id.
pub fn next_node_id() -> NodeId {
    NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
}

/// Core trait for nodes that live in a track's signal chain
///
/// A node only exists once it has been fully constructed, so holding one means
/// it is valid. Rendering happens in the playback collaborator; the chain only
/// tracks identity, parameters and wiring.
pub trait AudioNode: Send + fmt::Debug {
    fn id(&self) -> NodeId;

    /// Short name for logs and snapshots
    fn label(&self) -> &'static str;

    /// Called when the node is detached for good.
    ///
    /// Default implementation does nothing (stateless nodes).
    fn release(&mut self) {
        // Default: do nothing
    }
}

/// Per-track volume control. Gain is always within [0, 1].
#[derive(Debug, Clone)]
pub struct GainNode {
    id: NodeId,
    gain: f32,
}

impl GainNode {
    pub fn new(gain: f32) -> Self {
        let mut node = Self {
            id: next_node_id(),
            gain: 1.0,
        };
        node.set_gain(gain);
        node
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Non-finite levels are ignored.
    pub fn set_gain(&mut self, gain: f32) {
        if gain.is_finite() {
            self.gain = gain.clamp(0.0, 1.0);
        }
    }
}

impl AudioNode for GainNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn label(&self) -> &'static str {
        "gain"
    }
}

/// Shared output every track chain terminates in.
#[derive(Debug, Clone)]
pub struct MasterBus {
    id: NodeId,
}

impl MasterBus {
    pub fn new() -> Self {
        Self { id: next_node_id() }
    }
}

impl Default for MasterBus {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioNode for MasterBus {
    fn id(&self) -> NodeId {
        self.id
    }

    fn label(&self) -> &'static str {
        "master"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_ids_are_unique() {
        let a = GainNode::new(1.0);
        let b = GainNode::new(1.0);
        let master = MasterBus::new();
        assert_ne!(a.id(), b.id());
        assert_ne!(a.id(), master.id());
    }

    #[test]
    fn test_gain_clamped() {
        let mut node = GainNode::new(1.5);
        assert_eq!(node.gain(), 1.0);
        node.set_gain(-0.2);
        assert_eq!(node.gain(), 0.0);
        node.set_gain(0.4);
        node.set_gain(f32::NAN);
        assert_eq!(node.gain(), 0.4);
    }
}
