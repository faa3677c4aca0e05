//! A block-synchronous DSP graph compiler and scheduler.
//!
//! A [`graph::Graph`] owns a set of user-supplied [`node::NodeCallback`]s,
//! wires them together with [`link::Link`]s, and turns that structure into
//! a topologically ordered schedule of `perform` calls — resolving fan-in
//! summation and in-place buffer reuse along the way. Structural edits
//! (`add_node`, `add_link`, `remove_link`, `compile`, `stop`) and the
//! per-block `tick` all go through the same lock, so a `Graph` can be
//! shared between a control thread and an audio thread behind a plain
//! `Arc` with no additional synchronization at the call site.
//!
//! ```no_run
//! use dspgraph::{Graph, Link};
//!
//! # struct Silence;
//! # impl dspgraph::NodeCallback for Silence {
//! #     fn name(&self) -> &str { "silence" }
//! #     fn n_inputs(&self) -> usize { 0 }
//! #     fn n_outputs(&self) -> usize { 1 }
//! #     fn prepare(&mut self, _node: &dspgraph::Node) {}
//! #     fn perform(&mut self, _node: &dspgraph::Node) {}
//! # }
//! let graph = Graph::new();
//! let source = graph.add_node(Box::new(Silence)).unwrap();
//! graph.compile(48_000, 128).unwrap();
//! graph.tick().unwrap();
//! ```

mod buffer;
mod error;
mod inspection;
mod link;
mod logging;
mod node;
mod port;
mod sample;

pub mod graph;

#[cfg(test)]
mod tests;

pub use buffer::Buffer;
pub use error::GraphError;
pub use graph::{Graph, NodeKey};
pub use inspection::{GraphInspection, NodeInspection};
pub use link::Link;
pub use node::{Node, NodeCallback};
pub use port::{InputPort, OutputPort};
pub use sample::Sample;
