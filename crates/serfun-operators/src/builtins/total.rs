//! `total`: running sum.

use serfun_core::error::Result;
use serfun_core::{NodeId, SeriesValue, Value};

use crate::arg::HoseArg;
use crate::base::{Simple, SimpleHose};
use crate::builtins::expect_arity;
use crate::graph::{Graph, Ports};

/// Emits the cumulative sum so far for every input, under the input's column.
///
/// The sum stays a long while every input is a long and it fits; otherwise it
/// continues as a decimal. Pull and push share the same accumulator.
#[derive(Debug)]
pub struct RunningTotal {
    total: Value,
}

impl Default for RunningTotal {
    fn default() -> Self {
        Self {
            total: Value::Long(0),
        }
    }
}

impl RunningTotal {
    pub fn new() -> Self {
        Self::default()
    }

    fn accumulate(&mut self, input: SeriesValue) -> Result<SeriesValue> {
        self.total = match (&self.total, &input.value) {
            (Value::Long(acc), Value::Long(x)) => match acc.checked_add(*x) {
                Some(sum) => Value::Long(sum),
                None => Value::Decimal(*acc as f64 + *x as f64),
            },
            (acc, x) => Value::Decimal(acc.as_double()? + x.as_double()?),
        };
        Ok(SeriesValue {
            column: input.column,
            value: self.total.clone(),
        })
    }
}

impl SimpleHose for RunningTotal {
    fn name(&self) -> &str {
        "total"
    }

    fn pull(&mut self, ports: &mut Ports<'_>) -> Result<Option<SeriesValue>> {
        match ports.pull(0)? {
            Some(v) => self.accumulate(v).map(Some),
            None => Ok(None),
        }
    }

    fn push(&mut self, value: SeriesValue, ports: &mut Ports<'_>) -> Result<()> {
        let out = self.accumulate(value)?;
        ports.push(0, out)
    }
}

pub(crate) fn make(args: Vec<HoseArg>, graph: &mut Graph) -> Result<NodeId> {
    expect_arity("total", &args, 1, 1)?;
    let id = graph.add_node(Simple::new(RunningTotal::new()));
    args[0].bind_to(graph, id, 0)?;
    Ok(id)
}
