//! [`Graph`] — the compiler and scheduler tying nodes and links together.
//!
//! Grounded on `original_source/DspContext.cpp` (`sortDspNodes`'s recursive,
//! cycle-checked depth-first visit and its compile/tick/stop state machine)
//! and `knaster_graph/src/graph.rs` (the `slotmap`-keyed node table and the
//! split between a structural edit API and a realtime tick). This crate
//! takes the "mutex-always" option from SPEC_FULL.md §5: there is no
//! lock-free control/audio handoff, every operation — including `tick` —
//! takes the same structural lock. A block-synchronous DSP graph ticks far
//! below the rate at which a short, uncontended `Mutex` would show up in a
//! profile, so the simplicity is worth it.

use std::collections::HashSet;
use std::sync::Mutex;

use slotmap::SlotMap;

use crate::buffer::Buffer;
use crate::error::GraphError;
use crate::inspection::{GraphInspection, NodeInspection};
use crate::link::Link;
use crate::logging;
use crate::node::{Node, NodeCallback, NodeSlot};

slotmap::new_key_type! {
    /// A stable handle to one node: a slot index plus a generation counter,
    /// so a key from a node that no longer exists can never silently
    /// resolve to whatever node now occupies its old slot.
    pub struct NodeKey;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GraphState {
    Editable,
    Compiled,
}

struct GraphInner {
    nodes: SlotMap<NodeKey, NodeSlot>,
    links: Vec<Link>,
    executed: Vec<NodeKey>,
    state: GraphState,
    sample_rate: u32,
    block_size: usize,
}

/// A DSP processing graph: a set of nodes, the links between their ports,
/// and the compiled schedule that turns that structure into an ordered
/// sequence of `perform` calls.
///
/// Every method takes the same internal lock, so a `Graph` shared behind an
/// `Arc` can be edited from a control thread while an audio thread ticks
/// it without any additional synchronization at the call site.
pub struct Graph {
    inner: Mutex<GraphInner>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(GraphInner {
                nodes: SlotMap::with_key(),
                links: Vec::new(),
                executed: Vec::new(),
                state: GraphState::Editable,
                sample_rate: 0,
                block_size: 0,
            }),
        }
    }

    /// Insert a new node, returning the handle to address it by. Valid in
    /// either graph state; a newly added node simply takes no part in the
    /// schedule until the next `compile`.
    pub fn add_node(&self, callback: Box<dyn NodeCallback>) -> Result<NodeKey, GraphError> {
        let mut inner = self.inner.lock().unwrap();
        let slot = NodeSlot::new(callback);
        let name = slot.node.name().to_owned();
        let key = inner.nodes.insert(slot);
        logging::node_added(key, &name);
        Ok(key)
    }

    /// Connect one node's output port to another node's input port.
    /// Requires the graph to be [`GraphState::Editable`] — call `stop`
    /// first if it's currently compiled.
    pub fn add_link(&self, link: Link) -> Result<(), GraphError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != GraphState::Editable {
            return Err(GraphError::NotEditable);
        }
        if link.from_node == link.to_node {
            return Err(GraphError::SelfConnection);
        }
        let from_n_outputs = inner
            .nodes
            .get(link.from_node)
            .ok_or(GraphError::NodeNotInGraph)?
            .node
            .n_outputs();
        let to_n_inputs = inner
            .nodes
            .get(link.to_node)
            .ok_or(GraphError::NodeNotInGraph)?
            .node
            .n_inputs();
        if link.from_output >= from_n_outputs || link.to_input >= to_n_inputs {
            return Err(GraphError::IndexOutOfRange);
        }
        let already_linked = inner.nodes[link.from_node]
            .node
            .output(link.from_output)
            .subscribers()
            .contains(&link.to_node);
        if already_linked {
            return Err(GraphError::DuplicateConnection);
        }
        inner.nodes[link.from_node]
            .node
            .output_mut(link.from_output)
            .add_subscriber(link.to_node)?;
        inner.nodes[link.to_node]
            .node
            .input_mut(link.to_input)
            .add_subscriber(link.from_node)?;
        inner.links.push(link);
        logging::link_added(link);
        Ok(())
    }

    /// Remove a previously added link. Symmetric with `add_link`; the exact
    /// same `(from_node, from_output, to_node, to_input)` tuple must match.
    pub fn remove_link(&self, link: Link) -> Result<(), GraphError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != GraphState::Editable {
            return Err(GraphError::NotEditable);
        }
        let position = inner.links.iter().position(|l| *l == link).ok_or(GraphError::LinkNotFound)?;
        inner.links.remove(position);
        inner.nodes[link.from_node]
            .node
            .output_mut(link.from_output)
            .remove_subscriber(link.to_node);
        inner.nodes[link.to_node]
            .node
            .input_mut(link.to_input)
            .remove_subscriber(link.from_node);
        logging::link_removed(link);
        Ok(())
    }

    /// Topologically sort the graph, resolve every port's buffers, and call
    /// each node's `prepare` in upstream-to-downstream order. If the graph
    /// is currently compiled, it is stopped first (SPEC_FULL.md §4.5).
    pub fn compile(&self, sample_rate: u32, block_size: usize) -> Result<(), GraphError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == GraphState::Compiled {
            stop_locked(&mut inner);
        }
        logging::compile_started(sample_rate, block_size);
        let mut prepared = Vec::new();
        match compile_locked(&mut inner, sample_rate, block_size, &mut prepared) {
            Ok(()) => {
                logging::compile_finished(inner.executed.len(), inner.nodes.len());
                Ok(())
            }
            Err(err) => {
                // Abort rolls back to a clean Editable state: no node keeps
                // a buffer or a topological index from the attempt that
                // failed partway through (SPEC_FULL.md §7's propagation
                // policy).
                rollback_failed_compile(&mut inner, &prepared);
                logging::compile_failed(&err);
                Err(err)
            }
        }
    }

    /// Run one audio block: sum every input's fan-in, then call `perform`
    /// on every node that opted in during `prepare`, in topological order.
    pub fn tick(&self) -> Result<(), GraphError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != GraphState::Compiled {
            return Err(GraphError::NotCompiled);
        }
        let order = inner.executed.clone();
        for key in order {
            inner.nodes[key].tick();
        }
        Ok(())
    }

    /// Release every node's buffers and return the graph to `Editable`.
    /// A no-op if the graph isn't currently compiled.
    pub fn stop(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == GraphState::Compiled {
            stop_locked(&mut inner);
        }
    }

    /// Run `f` against one node's live state under the structural lock.
    /// Meant for the control thread — tests, tooling, anything that wants
    /// to peek at a port's buffer without racing the audio thread's tick.
    pub fn with_node<R>(&self, key: NodeKey, f: impl FnOnce(&Node) -> R) -> Result<R, GraphError> {
        let inner = self.inner.lock().unwrap();
        let slot = inner.nodes.get(key).ok_or(GraphError::InvalidHandle)?;
        Ok(f(&slot.node))
    }

    /// A read-only, control-thread-only snapshot of the graph's current
    /// structure and state, for diagnostics and UIs.
    pub fn inspect(&self) -> GraphInspection {
        let inner = self.inner.lock().unwrap();
        let nodes = inner
            .nodes
            .iter()
            .map(|(key, slot)| NodeInspection {
                key,
                name: slot.node.name().to_owned(),
                n_inputs: slot.node.n_inputs(),
                n_outputs: slot.node.n_outputs(),
                should_perform: slot.node.should_perform(),
                topological_index: slot.node.topological_index(),
            })
            .collect();
        GraphInspection {
            node_count: inner.nodes.len(),
            link_count: inner.links.len(),
            compiled: inner.state == GraphState::Compiled,
            sample_rate: inner.sample_rate,
            block_size: inner.block_size,
            nodes,
        }
    }
}

fn stop_locked(inner: &mut GraphInner) {
    for (_, slot) in inner.nodes.iter_mut() {
        slot.stop();
    }
    inner.executed.clear();
    inner.state = GraphState::Editable;
    logging::graph_stopped();
}

/// Undo whatever partial progress a failed `compile_locked` made: release
/// any buffers already installed on the nodes whose `prepare` actually ran
/// this attempt (`prepared` — built incrementally by `compile_locked` as it
/// goes, so it reflects exactly the nodes touched before the error, never
/// the ones after it in topological order), clear every topological index
/// back to "unvisited", and drop the executed list. `inner.state` is
/// already `Editable` — `compile_locked` only flips it to `Compiled` on
/// success — so this just erases the partial schedule, leaving the graph
/// exactly as it was before `compile` was called. This deliberately does
/// not call `NodeSlot::stop` (and so never invokes the user callback's
/// `release` hook) — see `NodeSlot::abort_prepare`'s doc comment.
fn rollback_failed_compile(inner: &mut GraphInner, prepared: &[NodeKey]) {
    for &key in prepared {
        if let Some(slot) = inner.nodes.get_mut(key) {
            slot.abort_prepare();
        }
    }
    for (_, slot) in inner.nodes.iter_mut() {
        slot.node.set_topological_index(0);
    }
    inner.executed.clear();
}

fn compile_locked(
    inner: &mut GraphInner,
    sample_rate: u32,
    block_size: usize,
    prepared: &mut Vec<NodeKey>,
) -> Result<(), GraphError> {
    let order = topological_order(inner)?;
    let live_keys: HashSet<NodeKey> = inner.nodes.keys().collect();

    inner.executed.clear();
    for (index, &key) in order.iter().enumerate() {
        inner.nodes[key].node.set_topological_index(index as u32);
    }

    for &key in &order {
        inner.nodes.get_mut(key).unwrap().prepare(sample_rate, block_size);
        prepared.push(key);
        if !inner.nodes[key].node.should_perform() {
            let name = inner.nodes[key].node.name().to_owned();
            logging::should_perform_disabled(key, &name);
        }

        let n_inputs = inner.nodes[key].node.n_inputs();
        let downstream_rate = inner.nodes[key].node.sample_rate();
        let downstream_block = inner.nodes[key].node.block_size();
        for input_index in 0..n_inputs {
            inner.nodes[key]
                .node
                .input_mut(input_index)
                .prune_dead(|candidate| live_keys.contains(&candidate));
            let upstream_keys: Vec<NodeKey> = inner.nodes[key]
                .node
                .input(input_index)
                .subscribers()
                .to_vec();
            let mut sources = Vec::with_capacity(upstream_keys.len());
            for upstream_key in upstream_keys {
                let upstream = &inner.nodes[upstream_key].node;
                if upstream.sample_rate() != downstream_rate {
                    return Err(GraphError::SampleRateMismatch {
                        upstream: upstream_key,
                        downstream: key,
                    });
                }
                if upstream.block_size() != downstream_block {
                    return Err(GraphError::BlockSizeMismatch {
                        upstream: upstream_key,
                        downstream: key,
                    });
                }
                let output_index = upstream
                    .outputs()
                    .iter()
                    .position(|output| output.subscribers().contains(&key));
                let output_index = output_index.ok_or(GraphError::MissingBackReference {
                    upstream: upstream_key,
                    downstream: key,
                })?;
                let buffer = upstream
                    .output(output_index)
                    .buffer()
                    .expect("upstream output prepared earlier in topological order")
                    .clone();
                sources.push(buffer);
            }
            inner.nodes[key]
                .node
                .input_mut(input_index)
                .finish_prepare(sources, block_size)?;
        }

        // A node with no inputs at all that still requests `inplace` isn't an
        // error (SPEC_FULL.md §9): every output index is then `>= N_in`, so
        // the branch below falls through to a fresh allocation for all of
        // them, same as any other output past the last input.
        let requests_inplace = inner.nodes[key].node.is_inplace();
        let n_outputs = inner.nodes[key].node.n_outputs();
        for output_index in 0..n_outputs {
            let buffer = if requests_inplace && output_index < n_inputs {
                let aliased = inner.nodes[key]
                    .node
                    .input(output_index)
                    .buffer()
                    .expect("input buffer prepared just above")
                    .clone();
                Buffer::alias(&aliased, true)
            } else {
                Buffer::allocate(block_size)?
            };
            inner.nodes[key].node.output_mut(output_index).install_buffer(buffer);
        }

        if inner.nodes[key].node.should_perform() {
            inner.executed.push(key);
        }
    }

    inner.state = GraphState::Compiled;
    inner.sample_rate = sample_rate;
    inner.block_size = block_size;
    Ok(())
}

/// Depth-first topological sort over the "feeds into" relation, with cycle
/// detection via a gray/black visiting set — the same shape as
/// `original_source/DspContext.cpp`'s `sortDspNodes`.
fn topological_order(inner: &GraphInner) -> Result<Vec<NodeKey>, GraphError> {
    let mut visiting = HashSet::new();
    let mut visited = HashSet::new();
    let mut post_order = Vec::with_capacity(inner.nodes.len());

    for key in inner.nodes.keys() {
        if !visited.contains(&key) {
            visit(key, inner, &mut visiting, &mut visited, &mut post_order)?;
        }
    }

    post_order.reverse();
    Ok(post_order)
}

fn visit(
    key: NodeKey,
    inner: &GraphInner,
    visiting: &mut HashSet<NodeKey>,
    visited: &mut HashSet<NodeKey>,
    post_order: &mut Vec<NodeKey>,
) -> Result<(), GraphError> {
    visiting.insert(key);
    let successors: Vec<NodeKey> = inner.nodes[key]
        .node
        .outputs()
        .iter()
        .flat_map(|output| output.subscribers().iter().copied())
        .collect();
    for successor in successors {
        if visiting.contains(&successor) {
            return Err(GraphError::CycleDetected(key, successor));
        }
        if !visited.contains(&successor) {
            visit(successor, inner, visiting, visited, post_order)?;
        }
    }
    visiting.remove(&key);
    visited.insert(key);
    post_order.push(key);
    Ok(())
}
