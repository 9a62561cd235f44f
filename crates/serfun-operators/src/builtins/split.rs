//! `split`: replicate one stream onto `fan` independent outputs.

use std::collections::VecDeque;

use serfun_core::error::{Error, Result};
use serfun_core::{NodeId, SeriesValue};

use crate::arg::HoseArg;
use crate::builtins::{count_arg, expect_arity};
use crate::graph::{Graph, Ports};
use crate::traits::Hose;

/// Fan-out with one FIFO backlog per branch.
///
/// Every upstream value lands in every backlog, so branches see the same values in
/// the same order and may only differ in how far they have read.
pub struct Split {
    backlogs: Vec<VecDeque<SeriesValue>>,
    terminated: bool,
}

impl Split {
    pub fn new(fan: usize) -> Self {
        Self {
            backlogs: vec![VecDeque::new(); fan],
            terminated: false,
        }
    }

    fn enqueue(&mut self, value: SeriesValue) {
        for backlog in &mut self.backlogs {
            backlog.push_back(value.clone());
        }
    }

    fn flush(&mut self, ports: &mut Ports<'_>) -> Result<()> {
        for i in 0..self.backlogs.len() {
            while let Some(v) = self.backlogs[i].pop_front() {
                ports.push(i, v)?;
            }
        }
        Ok(())
    }
}

impl Hose for Split {
    fn name(&self) -> &str {
        "split"
    }

    fn inputs(&self) -> usize {
        1
    }

    fn outputs(&self) -> usize {
        self.backlogs.len()
    }

    fn output_keys(&self) -> Vec<String> {
        (0..self.backlogs.len()).map(|i| format!("out{i}")).collect()
    }

    fn pull_value(&mut self, output: usize, ports: &mut Ports<'_>) -> Result<Option<SeriesValue>> {
        if self.backlogs[output].is_empty() && !self.terminated {
            match ports.pull(0)? {
                Some(v) => self.enqueue(v),
                None => self.terminated = true,
            }
        }
        Ok(self.backlogs[output].pop_front())
    }

    fn push_value(&mut self, value: SeriesValue, _input: usize, ports: &mut Ports<'_>) -> Result<()> {
        self.enqueue(value);
        self.flush(ports)
    }

    fn terminate_stream(&mut self, _input: usize, ports: &mut Ports<'_>) -> Result<()> {
        if self.terminated {
            return Ok(());
        }
        self.terminated = true;
        self.flush(ports)?;
        for i in 0..self.backlogs.len() {
            ports.terminate(i)?;
        }
        Ok(())
    }

    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

pub(crate) fn make(args: Vec<HoseArg>, graph: &mut Graph) -> Result<NodeId> {
    expect_arity("split", &args, 2, 2)?;
    let fan = count_arg("split", "fan", &args[1], 2)?;
    if !args[0].is_series() {
        return Err(Error::ArityOrType(format!(
            "split input must be a stream, got {}",
            args[0].kind()
        )));
    }
    let id = graph.add_node(Split::new(fan));
    args[0].bind_to(graph, id, 0)?;
    Ok(id)
}
