//! [`NodeCallback`], [`Node`] and the internal [`NodeSlot`].
//!
//! Grounded on `original_source/Process.h` (the callback's `const`-qualified
//! `prepare`/`perform`/`release` triad) and `original_source/DspNode.cpp`
//! (the should-perform flag and the owning-node state it reads/writes
//! during `prepare`). The callback sees only `&Node`, never `&mut Node`: in
//! the original, `perform(scNode)` takes the node by const reference, so a
//! callback can read its own port buffers and arity but cannot restructure
//! the node itself. The flags it *is* allowed to flip (`should_perform`,
//! `inplace`) live behind `Cell` for exactly that reason.

use std::cell::Cell;

use crate::port::{InputPort, OutputPort};

/// User-supplied unit of signal processing. One object implements one DSP
/// algorithm; the graph owns it and drives it through `prepare`, `perform`
/// and `release` at the appropriate times.
pub trait NodeCallback: Send {
    /// A short, human-readable name used in diagnostics and inspection.
    fn name(&self) -> &str;

    fn n_inputs(&self) -> usize;

    fn n_outputs(&self) -> usize;

    /// Called once per `Graph::compile`, in topological order, before any
    /// `perform`. `node` exposes this callback's own ports, sample rate and
    /// block size. Implementations that find they have nothing useful to do
    /// at this rate/block size may call `node.set_should_perform(false)` to
    /// be skipped for the remainder of the compiled lifetime.
    fn prepare(&mut self, node: &Node);

    /// Called once per audio block, in topological order, with every input
    /// port's fan-in already summed. The callback reads `node.input(i)` and
    /// writes `node.output(i)`.
    fn perform(&mut self, node: &Node);

    /// Called once, when the graph is stopped or recompiled, symmetric with
    /// `prepare`.
    fn release(&mut self, node: &Node) {
        let _ = node;
    }
}

/// The engine-owned state attached to one callback: its ports and the flags
/// the compiler and the callback itself read and write across `prepare` /
/// `perform`.
pub struct Node {
    name: String,
    inputs: Vec<InputPort>,
    outputs: Vec<OutputPort>,
    sample_rate: Cell<u32>,
    block_size: Cell<usize>,
    topological_index: Cell<u32>,
    inplace: Cell<bool>,
    should_perform: Cell<bool>,
}

impl Node {
    pub(crate) fn new(name: String, n_inputs: usize, n_outputs: usize) -> Self {
        Self {
            name,
            inputs: (0..n_inputs).map(InputPort::new).collect(),
            outputs: (0..n_outputs).map(OutputPort::new).collect(),
            sample_rate: Cell::new(0),
            block_size: Cell::new(0),
            topological_index: Cell::new(0),
            inplace: Cell::new(false),
            should_perform: Cell::new(true),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn n_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn n_outputs(&self) -> usize {
        self.outputs.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.get()
    }

    pub fn block_size(&self) -> usize {
        self.block_size.get()
    }

    pub fn topological_index(&self) -> u32 {
        self.topological_index.get()
    }

    pub fn is_inplace(&self) -> bool {
        self.inplace.get()
    }

    /// A callback may call this during `prepare` to ask that its output
    /// ports alias the correspondingly-indexed input port's buffer rather
    /// than get a fresh allocation (SPEC_FULL.md §4.2). Outputs past the
    /// last input index always get a fresh buffer regardless; requesting
    /// in-place on a node with no inputs at all is a configuration error
    /// the compiler rejects.
    pub fn request_inplace(&self, value: bool) {
        self.inplace.set(value);
    }

    /// A callback may call this during `prepare` to request that its
    /// `perform` be skipped this compiled lifetime (SPEC_FULL.md §4.4).
    pub fn set_should_perform(&self, value: bool) {
        self.should_perform.set(value);
    }

    pub fn should_perform(&self) -> bool {
        self.should_perform.get()
    }

    pub(crate) fn set_inplace(&self, value: bool) {
        self.inplace.set(value);
    }

    /// Override the rate this node reports to the compiler's fan-in
    /// resolution (SPEC_FULL.md §4.3). Defaults to the Graph's own
    /// `compile` argument; a node wrapping an internal resampler can call
    /// this during `prepare` to report the rate it actually runs at, so a
    /// mismatched neighbour is caught as `SampleRateMismatch` rather than
    /// silently mixing incompatible buffers.
    pub fn set_sample_rate(&self, value: u32) {
        self.sample_rate.set(value);
    }

    /// Override the block size this node reports to the compiler. See
    /// `set_sample_rate`.
    pub fn set_block_size(&self, value: usize) {
        self.block_size.set(value);
    }

    pub(crate) fn set_topological_index(&self, value: u32) {
        self.topological_index.set(value);
    }

    pub fn input(&self, index: usize) -> &InputPort {
        &self.inputs[index]
    }

    pub fn output(&self, index: usize) -> &OutputPort {
        &self.outputs[index]
    }

    pub(crate) fn input_mut(&mut self, index: usize) -> &mut InputPort {
        &mut self.inputs[index]
    }

    pub(crate) fn output_mut(&mut self, index: usize) -> &mut OutputPort {
        &mut self.outputs[index]
    }

    pub(crate) fn inputs(&self) -> &[InputPort] {
        &self.inputs
    }

    pub(crate) fn outputs(&self) -> &[OutputPort] {
        &self.outputs
    }

    pub(crate) fn inputs_mut(&mut self) -> &mut [InputPort] {
        &mut self.inputs
    }

    pub(crate) fn outputs_mut(&mut self) -> &mut [OutputPort] {
        &mut self.outputs
    }

    pub fn is_input_connected(&self, index: usize) -> bool {
        self.inputs[index].is_connected()
    }

    pub fn is_output_connected(&self, index: usize) -> bool {
        self.outputs[index].is_connected()
    }
}

/// A node together with the callback driving it. Kept as two separate
/// struct fields (rather than wrapping the callback in a `RefCell`) so that
/// `callback.perform(&node)` borrows them independently: Rust's borrow
/// checker treats disjoint fields of `self` as disjoint borrows, so a
/// `&mut self.callback` call that takes `&self.node` compiles without any
/// interior mutability around the callback itself.
pub(crate) struct NodeSlot {
    pub(crate) callback: Box<dyn NodeCallback>,
    pub(crate) node: Node,
}

impl NodeSlot {
    pub(crate) fn new(callback: Box<dyn NodeCallback>) -> Self {
        let name = callback.name().to_owned();
        let n_inputs = callback.n_inputs();
        let n_outputs = callback.n_outputs();
        Self {
            callback,
            node: Node::new(name, n_inputs, n_outputs),
        }
    }

    /// `prepare` per SPEC_FULL.md §4.4: reset `should_perform`, hand the
    /// callback its node, then let the caller (the graph, which alone knows
    /// whether to keep this node in the executed list) inspect the result.
    pub(crate) fn prepare(&mut self, sample_rate: u32, block_size: usize) {
        self.node.set_sample_rate(sample_rate);
        self.node.set_block_size(block_size);
        self.node.should_perform.set(true);
        self.callback.prepare(&self.node);
    }

    pub(crate) fn tick(&mut self) {
        for input in self.node.inputs() {
            input.sum();
        }
        self.callback.perform(&self.node);
    }

    pub(crate) fn stop(&mut self) {
        self.callback.release(&self.node);
        self.node.should_perform.set(false);
        for input in self.node.inputs_mut() {
            input.release_buffer();
        }
        for output in self.node.outputs_mut() {
            output.release_buffer();
        }
        self.node.set_inplace(false);
    }

    /// Undo a partial `prepare` from a `compile` attempt that errored out
    /// after this node's own `prepare` ran. Releases whatever port buffers
    /// this node picked up so far, but does *not* call the user callback's
    /// `release` hook: that hook's contract (SPEC_FULL.md §6) is "frees any
    /// resources `prepare` allocated", and it only ever pairs with a
    /// `prepare` the graph is committing to, not one it's discarding because
    /// a sibling node's port resolution failed. `original_source/
    /// DspContext.cpp` matches this: a thrown compile never calls `release`
    /// on any node, prepared or not.
    pub(crate) fn abort_prepare(&mut self) {
        for input in self.node.inputs_mut() {
            input.release_buffer();
        }
        for output in self.node.outputs_mut() {
            output.release_buffer();
        }
        self.node.set_inplace(false);
    }
}
