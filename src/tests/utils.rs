//! Fixture [`NodeCallback`]s used across the scenario tests.

use std::cell::Cell;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Once};

use crate::{Node, NodeCallback, Sample};

static LOGGER_INIT: Once = Once::new();

/// Installs `env_logger` once per test binary (`Once` rather than a
/// per-test `try_init()` call, since a second `env_logger::init()` in the
/// same process panics). Call this at the top of every test so a developer
/// running `RUST_LOG=debug cargo test` sees the structural-edit trail
/// `src/logging.rs` emits (SPEC_FULL.md's test-tooling paragraph).
pub fn init_logger() {
    LOGGER_INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Fills its single output with a constant value every block.
pub struct ConstantSource {
    pub value: Sample,
}

impl NodeCallback for ConstantSource {
    fn name(&self) -> &str {
        "constant_source"
    }
    fn n_inputs(&self) -> usize {
        0
    }
    fn n_outputs(&self) -> usize {
        1
    }
    fn prepare(&mut self, _node: &Node) {}
    fn perform(&mut self, node: &Node) {
        node.output(0).write_view().fill(self.value);
    }
}

/// `output = input + addend`. Never requests in-place, so its input and
/// output buffers are always distinct allocations.
pub struct ScalarAdd {
    pub addend: Sample,
}

impl NodeCallback for ScalarAdd {
    fn name(&self) -> &str {
        "scalar_add"
    }
    fn n_inputs(&self) -> usize {
        1
    }
    fn n_outputs(&self) -> usize {
        1
    }
    fn prepare(&mut self, _node: &Node) {}
    fn perform(&mut self, node: &Node) {
        let input = node.input(0).read_view();
        let mut output = node.output(0).write_view();
        for (o, i) in output.iter_mut().zip(input.iter()) {
            *o = *i + self.addend;
        }
    }
}

/// Doubles its input in place. Always requests in-place during `prepare`,
/// so the compiler must alias output 0 onto input 0's buffer.
pub struct InPlaceDoubler;

impl NodeCallback for InPlaceDoubler {
    fn name(&self) -> &str {
        "inplace_doubler"
    }
    fn n_inputs(&self) -> usize {
        1
    }
    fn n_outputs(&self) -> usize {
        1
    }
    fn prepare(&mut self, node: &Node) {
        node.request_inplace(true);
    }
    fn perform(&mut self, node: &Node) {
        for sample in node.output(0).write_view().iter_mut() {
            *sample *= 2.0;
        }
    }
}

/// Two ports in, two ports out, requested in-place on both. Stands in for
/// a stereo effect that processes each channel independently.
pub struct StereoPassthrough;

impl NodeCallback for StereoPassthrough {
    fn name(&self) -> &str {
        "stereo_passthrough"
    }
    fn n_inputs(&self) -> usize {
        2
    }
    fn n_outputs(&self) -> usize {
        2
    }
    fn prepare(&mut self, node: &Node) {
        node.request_inplace(true);
    }
    fn perform(&mut self, _node: &Node) {}
}

/// Disables itself during `prepare` unless the graph was compiled at the
/// expected sample rate — exercises the `should_perform` opt-out path.
pub struct RateProbe {
    pub expected_rate: u32,
    pub saw_mismatch: Cell<bool>,
}

impl RateProbe {
    pub fn new(expected_rate: u32) -> Self {
        Self {
            expected_rate,
            saw_mismatch: Cell::new(false),
        }
    }
}

impl NodeCallback for RateProbe {
    fn name(&self) -> &str {
        "rate_probe"
    }
    fn n_inputs(&self) -> usize {
        0
    }
    fn n_outputs(&self) -> usize {
        1
    }
    fn prepare(&mut self, node: &Node) {
        if node.sample_rate() != self.expected_rate {
            self.saw_mismatch.set(true);
            node.set_should_perform(false);
        }
    }
    fn perform(&mut self, node: &Node) {
        node.output(0).write_view().fill(1.0);
    }
}

/// `output = input0 + input1`, two distinct input ports (not port-level
/// fan-in). Stands in for the `vector_plus` node in the end-to-end
/// "scalar add then vector add" scenario.
pub struct VectorAdd;

impl NodeCallback for VectorAdd {
    fn name(&self) -> &str {
        "vector_add"
    }
    fn n_inputs(&self) -> usize {
        2
    }
    fn n_outputs(&self) -> usize {
        1
    }
    fn prepare(&mut self, _node: &Node) {}
    fn perform(&mut self, node: &Node) {
        let a = node.input(0).read_view();
        let b = node.input(1).read_view();
        let mut out = node.output(0).write_view();
        for ((o, a), b) in out.iter_mut().zip(a.iter()).zip(b.iter()) {
            *o = *a + *b;
        }
    }
}

/// Reports a sample rate of its own choosing during `prepare`, rather than
/// accepting the graph's, so a mismatch against an ordinary upstream node
/// is actually detected by the compiler rather than sidestepped via
/// `should_perform`.
pub struct FixedRateNode {
    pub reported_rate: u32,
}

impl NodeCallback for FixedRateNode {
    fn name(&self) -> &str {
        "fixed_rate_node"
    }
    fn n_inputs(&self) -> usize {
        1
    }
    fn n_outputs(&self) -> usize {
        1
    }
    fn prepare(&mut self, node: &Node) {
        node.set_sample_rate(self.reported_rate);
    }
    fn perform(&mut self, node: &Node) {
        let input = node.input(0).read_view();
        let mut output = node.output(0).write_view();
        output.copy_from_slice(&input);
    }
}

/// Requests in-place with zero inputs — a legal, if unusual, configuration
/// (SPEC_FULL.md §9): every output index is then `>= N_in`, so it must fall
/// through to an ordinary fresh buffer rather than erroring out.
pub struct InplaceWithNoInputs {
    pub value: Sample,
}

impl NodeCallback for InplaceWithNoInputs {
    fn name(&self) -> &str {
        "inplace_with_no_inputs"
    }
    fn n_inputs(&self) -> usize {
        0
    }
    fn n_outputs(&self) -> usize {
        1
    }
    fn prepare(&mut self, node: &Node) {
        node.request_inplace(true);
    }
    fn perform(&mut self, node: &Node) {
        node.output(0).write_view().fill(self.value);
    }
}

/// Counts calls to its own `release` hook via a shared atomic, so a test can
/// observe from outside the graph whether this node's `release` ever ran.
pub struct ReleaseTracker {
    pub release_calls: Arc<AtomicU32>,
}

impl NodeCallback for ReleaseTracker {
    fn name(&self) -> &str {
        "release_tracker"
    }
    fn n_inputs(&self) -> usize {
        0
    }
    fn n_outputs(&self) -> usize {
        1
    }
    fn prepare(&mut self, _node: &Node) {}
    fn perform(&mut self, _node: &Node) {}
    fn release(&mut self, _node: &Node) {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Terminal node with no outputs, for scenarios that just need a sink.
pub struct Sink {
    pub n_inputs: usize,
}

impl NodeCallback for Sink {
    fn name(&self) -> &str {
        "sink"
    }
    fn n_inputs(&self) -> usize {
        self.n_inputs
    }
    fn n_outputs(&self) -> usize {
        0
    }
    fn prepare(&mut self, _node: &Node) {}
    fn perform(&mut self, _node: &Node) {}
}
