//! [`Link`] — an immutable descriptor of one edge in the graph.

use crate::graph::NodeKey;

/// A directed edge from one node's output port to another node's input
/// port. Created by the user, owned by the [`crate::graph::Graph`], and
/// uniquely identified by its four fields — duplicates are rejected by
/// `Graph::add_link`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Link {
    pub from_node: NodeKey,
    pub from_output: usize,
    pub to_node: NodeKey,
    pub to_input: usize,
}

impl Link {
    pub fn new(from_node: NodeKey, from_output: usize, to_node: NodeKey, to_input: usize) -> Self {
        Self {
            from_node,
            from_output,
            to_node,
            to_input,
        }
    }
}
