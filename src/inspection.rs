//! Read-only snapshots of a [`crate::graph::Graph`]'s structure, for
//! diagnostics, UIs and tests. Building one allocates and walks every node,
//! so it's meant for the control thread, never the audio thread.

use crate::graph::NodeKey;

/// A snapshot of one node's shape and scheduling state at the moment
/// [`crate::graph::Graph::inspect`] was called.
#[derive(Debug, Clone)]
pub struct NodeInspection {
    pub key: NodeKey,
    pub name: String,
    pub n_inputs: usize,
    pub n_outputs: usize,
    pub should_perform: bool,
    pub topological_index: u32,
}

/// A snapshot of the whole graph.
#[derive(Debug, Clone)]
pub struct GraphInspection {
    pub node_count: usize,
    pub link_count: usize,
    pub compiled: bool,
    pub sample_rate: u32,
    pub block_size: usize,
    pub nodes: Vec<NodeInspection>,
}

impl GraphInspection {
    /// The nodes in compiled topological order. Empty (not an error) if the
    /// graph isn't currently compiled.
    pub fn execution_order(&self) -> Vec<&NodeInspection> {
        let mut order: Vec<&NodeInspection> = self.nodes.iter().filter(|n| n.should_perform).collect();
        order.sort_by_key(|n| n.topological_index);
        order
    }
}
