//! The `Hose` trait: one operator node with indexed input and output ports.
//!
//! Nodes never hold references to their neighbours. The owning `Graph` keeps the
//! edge tables and hands each call a `Ports` view scoped to the active node, through
//! which it pulls from its inputs and pushes or terminates its outputs.

use serfun_core::error::Result;
use serfun_core::{Endpoint, SeriesValue};

use crate::graph::Ports;

/// Trait that all operator nodes implement.
///
/// Invariants:
/// - Port indices handed to a node are always in range; the graph checks them.
/// - A node's mutable state belongs to exactly one evaluation at a time.
pub trait Hose: Send + 'static {
    /// Human-readable operator name (stable).
    fn name(&self) -> &str;

    /// Number of input ports.
    fn inputs(&self) -> usize;

    /// Number of output ports.
    fn outputs(&self) -> usize;

    /// Optional aliases for output ports, used to resolve `x["key"]` selectors.
    fn output_keys(&self) -> Vec<String> {
        vec![String::new(); self.outputs()]
    }

    /// An input that stands in for another node's input. The graph sends binds,
    /// pushes and terminations addressed to it straight to the target.
    fn forward_input(&self, _input: usize) -> Option<Endpoint> {
        None
    }

    /// Produce the next value on `output`, or `None` once the stream has ended.
    fn pull_value(&mut self, output: usize, ports: &mut Ports<'_>) -> Result<Option<SeriesValue>>;

    /// Accept a value arriving on `input`.
    fn push_value(&mut self, value: SeriesValue, input: usize, ports: &mut Ports<'_>)
        -> Result<()>;

    /// The producer feeding `input` has ended.
    fn terminate_stream(&mut self, input: usize, ports: &mut Ports<'_>) -> Result<()>;

    fn is_terminated(&self) -> bool;
}
