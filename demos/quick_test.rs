//! A non-realtime stand-in for the audio driver boundary (SPEC_FULL.md
//! §6): builds a small graph, compiles it, and ticks it a handful of times
//! with plain `Vec<Sample>` "device" buffers in place of whatever an actual
//! `cpal`/`jack` callback would hand in. Grounded on
//! `knaster_graph/examples/quick_test.rs` (same name, same role), trimmed
//! of everything that needs a real audio backend.

use dspgraph::{Graph, Link, Node, NodeCallback, Sample};

struct Noise {
    state: u32,
}

impl Noise {
    fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    fn next_sample(&mut self) -> Sample {
        // xorshift32, deterministic so the demo's printed output is stable
        // across runs.
        self.state ^= self.state << 13;
        self.state ^= self.state >> 17;
        self.state ^= self.state << 5;
        (self.state as Sample / u32::MAX as Sample) * 2.0 - 1.0
    }
}

impl NodeCallback for Noise {
    fn name(&self) -> &str {
        "noise"
    }
    fn n_inputs(&self) -> usize {
        0
    }
    fn n_outputs(&self) -> usize {
        1
    }
    fn prepare(&mut self, _node: &Node) {}
    fn perform(&mut self, node: &Node) {
        for sample in node.output(0).write_view().iter_mut() {
            *sample = self.next_sample();
        }
    }
}

struct Gain {
    amount: Sample,
}

impl NodeCallback for Gain {
    fn name(&self) -> &str {
        "gain"
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
            *sample *= self.amount;
        }
    }
}

fn main() {
    env_logger::init();

    let graph = Graph::new();
    let noise = graph.add_node(Box::new(Noise::new(12_345))).unwrap();
    let gain = graph.add_node(Box::new(Gain { amount: 0.2 })).unwrap();
    graph.add_link(Link::new(noise, 0, gain, 0)).unwrap();

    let sample_rate = 48_000;
    let block_size = 8;
    graph.compile(sample_rate, block_size).expect("compile");

    for block in 0..4 {
        graph.tick().expect("tick");
        graph
            .with_node(gain, |node| {
                let out = node.output(0).read_view();
                println!("block {block}: {out:?}");
            })
            .unwrap();
    }

    graph.stop();
}
