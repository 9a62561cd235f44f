//! `Runner`: the live node of one program instantiation.
//!
//! Ports of a runner for a program with `N` inputs and `M` outputs:
//!
//! - inputs `0..N` are the declared parameters. Stream parameters forward to their
//!   placeholder node, so values pushed or bound there enter the program body.
//! - inputs `N..N+M` are return ports, bound to whatever each output variable names.
//! - outputs `0..M` are the declared outputs, keyed by their names.

use serfun_core::error::{Error, Result};
use serfun_core::{Endpoint, NodeId, SeriesValue};
use serfun_operators::{Hose, Ports};

pub struct Runner {
    name: String,
    input_names: Vec<String>,
    output_names: Vec<String>,
    placeholders: Vec<Option<NodeId>>,
    ended: Vec<bool>,
}

impl Runner {
    /// `placeholders[i]` is the entry node of input `i`, or `None` for scalar parameters.
    pub fn new(
        name: impl Into<String>,
        input_names: Vec<String>,
        output_names: Vec<String>,
        placeholders: Vec<Option<NodeId>>,
    ) -> Self {
        let ended = vec![false; output_names.len()];
        Self {
            name: name.into(),
            input_names,
            output_names,
            placeholders,
            ended,
        }
    }

    fn arity(&self) -> usize {
        self.input_names.len()
    }

    /// Entry node for input `i`, if it is a stream parameter.
    pub fn placeholder(&self, input: usize) -> Option<NodeId> {
        self.placeholders.get(input).copied().flatten()
    }

    fn end(&mut self, output: usize, ports: &mut Ports<'_>) -> Result<()> {
        if std::mem::replace(&mut self.ended[output], true) {
            return Ok(());
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(program = %self.name, output = %self.output_names[output], "output ended");

        ports.terminate(output)
    }
}

impl Hose for Runner {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> usize {
        self.arity() + self.output_names.len()
    }

    fn outputs(&self) -> usize {
        self.output_names.len()
    }

    fn output_keys(&self) -> Vec<String> {
        self.output_names.clone()
    }

    fn forward_input(&self, input: usize) -> Option<Endpoint> {
        self.placeholder(input).map(|node| Endpoint::new(node, 0))
    }

    fn pull_value(&mut self, output: usize, ports: &mut Ports<'_>) -> Result<Option<SeriesValue>> {
        let next = ports.pull(self.arity() + output)?;
        if next.is_none() {
            self.ended[output] = true;
        }
        Ok(next)
    }

    fn push_value(&mut self, value: SeriesValue, input: usize, ports: &mut Ports<'_>) -> Result<()> {
        match input.checked_sub(self.arity()) {
            Some(output) => ports.push(output, value),
            // stream inputs are forwarded by the graph, so only scalars land here
            None => Err(Error::ArityOrType(format!(
                "input '{}' of '{}' is a scalar parameter and cannot take pushed values",
                self.input_names[input], self.name
            ))),
        }
    }

    fn terminate_stream(&mut self, input: usize, ports: &mut Ports<'_>) -> Result<()> {
        match input.checked_sub(self.arity()) {
            Some(output) => self.end(output, ports),
            None => Ok(()),
        }
    }

    fn is_terminated(&self) -> bool {
        self.ended.iter().all(|done| *done)
    }
}
