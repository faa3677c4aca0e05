//! [`InputPort`] and [`OutputPort`] — per-node endpoints.
//!
//! A port's subscriber set only ever names *nodes*, never (node, port)
//! pairs — that's a direct carry-over from `original_source/Node.h`'s
//! `vector<NodeSet> m_inputs_nodes` / `m_outputs_nodes`, and it's what
//! makes the backreference search in [`crate::graph::Graph::compile`]
//! node-granular rather than port-granular (SPEC_FULL.md §4.3).
//!
//! Cross-node resolution (pruning dead upstreams, checking sample
//! rate/block size, finding the matching upstream output) needs the whole
//! node table, so it lives in [`crate::graph::Graph`]; this module owns the
//! parts that are purely local to one port.

use smallvec::SmallVec;

use crate::buffer::Buffer;
use crate::error::GraphError;
use crate::graph::NodeKey;
use crate::sample::{add_into, copy_into};

/// Most ports connect to a handful of peers; inline storage avoids a heap
/// allocation for the overwhelmingly common case.
type Subscribers = SmallVec<[NodeKey; 4]>;

fn add_subscriber(set: &mut Subscribers, node: NodeKey) -> Result<(), GraphError> {
    if set.contains(&node) {
        return Err(GraphError::DuplicateConnection);
    }
    set.push(node);
    Ok(())
}

fn remove_subscriber(set: &mut Subscribers, node: NodeKey) -> bool {
    if let Some(pos) = set.iter().position(|&n| n == node) {
        set.remove(pos);
        true
    } else {
        false
    }
}

/// A node's output endpoint: a write buffer and the set of downstream
/// nodes reading from it.
pub struct OutputPort {
    index: usize,
    subscribers: Subscribers,
    buffer: Option<Buffer>,
}

impl OutputPort {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            subscribers: SmallVec::new(),
            buffer: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_connected(&self) -> bool {
        !self.subscribers.is_empty()
    }

    pub fn subscribers(&self) -> &[NodeKey] {
        &self.subscribers
    }

    pub(crate) fn add_subscriber(&mut self, node: NodeKey) -> Result<(), GraphError> {
        add_subscriber(&mut self.subscribers, node)
    }

    pub(crate) fn remove_subscriber(&mut self, node: NodeKey) -> bool {
        remove_subscriber(&mut self.subscribers, node)
    }

    /// Install the buffer this output will write into for the compiled
    /// lifetime of the graph. The actual choice (fresh allocation vs.
    /// aliasing a sibling input, per §4.2) is made by `Graph::compile`,
    /// which has the node-wide view needed to find the matching input.
    pub(crate) fn install_buffer(&mut self, buffer: Buffer) {
        self.buffer = Some(buffer);
    }

    pub(crate) fn release_buffer(&mut self) {
        self.buffer = None;
    }

    pub fn buffer(&self) -> Option<&Buffer> {
        self.buffer.as_ref()
    }

    /// The slice a node callback writes its samples into during `perform`.
    pub fn write_view(&self) -> std::sync::MutexGuard<'_, Vec<crate::sample::Sample>> {
        self.buffer
            .as_ref()
            .expect("output port has no buffer outside Compiled state")
            .write_view()
    }

    /// A read-only view of the same buffer, for inspection after a tick.
    pub fn read_view(&self) -> std::sync::MutexGuard<'_, Vec<crate::sample::Sample>> {
        self.buffer
            .as_ref()
            .expect("output port has no buffer outside Compiled state")
            .read_view()
    }
}

/// A node's input endpoint: a fan-in summation buffer and the resolved
/// read-views into upstream output buffers.
pub struct InputPort {
    index: usize,
    subscribers: Subscribers,
    sources: Vec<Buffer>,
    summation: Option<Buffer>,
}

impl InputPort {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            subscribers: SmallVec::new(),
            sources: Vec::new(),
            summation: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_connected(&self) -> bool {
        !self.subscribers.is_empty()
    }

    pub fn subscribers(&self) -> &[NodeKey] {
        &self.subscribers
    }

    pub(crate) fn add_subscriber(&mut self, node: NodeKey) -> Result<(), GraphError> {
        add_subscriber(&mut self.subscribers, node)
    }

    pub(crate) fn remove_subscriber(&mut self, node: NodeKey) -> bool {
        remove_subscriber(&mut self.subscribers, node)
    }

    /// Drop any upstream subscriber no longer present in the live node set.
    /// Mirrors `original_source/DspNode.cpp`'s dead-weak-pointer pruning,
    /// adapted to "no longer present in the slot map" since this crate has
    /// no weak references to begin with.
    pub(crate) fn prune_dead(&mut self, is_live: impl Fn(NodeKey) -> bool) {
        self.subscribers.retain(|&n| is_live(n));
    }

    /// Replace the resolved source list and (re)allocate the summation
    /// buffer. Called once per `compile` by `Graph`, after it has resolved
    /// each upstream node's matching output buffer.
    pub(crate) fn finish_prepare(
        &mut self,
        sources: Vec<Buffer>,
        block_size: usize,
    ) -> Result<(), GraphError> {
        let buffer = Buffer::allocate(block_size)?;
        self.sources = sources;
        self.summation = Some(buffer);
        Ok(())
    }

    pub(crate) fn release_buffer(&mut self) {
        self.sources.clear();
        self.summation = None;
    }

    pub fn buffer(&self) -> Option<&Buffer> {
        self.summation.as_ref()
    }

    /// The slice a node callback reads from during `perform`.
    pub fn read_view(&self) -> std::sync::MutexGuard<'_, Vec<crate::sample::Sample>> {
        self.summation
            .as_ref()
            .expect("input port has no buffer outside Compiled state")
            .read_view()
    }

    /// Resolve this tick's fan-in: copy the first live source, then add the
    /// rest. A disconnected input is left untouched (SPEC_FULL.md §9).
    pub(crate) fn sum(&self) {
        let Some(summation) = &self.summation else {
            return;
        };
        let mut sources = self.sources.iter();
        let Some(first) = sources.next() else {
            return;
        };
        {
            let mut dst = summation.write_view();
            let src = first.read_view();
            copy_into(&mut dst, &src);
        }
        for source in sources {
            let mut dst = summation.write_view();
            let src = source.read_view();
            add_into(&mut dst, &src);
        }
    }
}
