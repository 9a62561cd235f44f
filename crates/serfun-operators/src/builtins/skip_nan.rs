//! `skipNaN`: drop samples with no numeric reading.

use serfun_core::error::Result;
use serfun_core::{NodeId, SeriesValue};

use crate::arg::HoseArg;
use crate::base::{Simple, SimpleHose};
use crate::builtins::expect_arity;
use crate::graph::{Graph, Ports};

/// Numeric and string samples whose decimal reading is NaN are dropped; everything
/// else passes through untouched.
#[derive(Debug, Default)]
pub struct SkipNaN;

impl SkipNaN {
    pub fn new() -> Self {
        Self
    }
}

fn is_nan(v: &SeriesValue) -> bool {
    (v.is_number() || v.is_string()) && v.as_double().map_or(false, f64::is_nan)
}

impl SimpleHose for SkipNaN {
    fn name(&self) -> &str {
        "skipNaN"
    }

    fn pull(&mut self, ports: &mut Ports<'_>) -> Result<Option<SeriesValue>> {
        while let Some(v) = ports.pull(0)? {
            if !is_nan(&v) {
                return Ok(Some(v));
            }
        }
        Ok(None)
    }

    fn push(&mut self, value: SeriesValue, ports: &mut Ports<'_>) -> Result<()> {
        if is_nan(&value) {
            return Ok(());
        }
        ports.push(0, value)
    }
}

pub(crate) fn make(args: Vec<HoseArg>, graph: &mut Graph) -> Result<NodeId> {
    expect_arity("skipNaN", &args, 1, 1)?;
    let id = graph.add_node(Simple::new(SkipNaN::new()));
    args[0].bind_to(graph, id, 0)?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::VecSource;
    use serfun_core::Endpoint;

    #[test]
    fn nan_and_text_are_dropped() {
        let mut g = Graph::new();
        let src = g.add_node(Simple::new(VecSource::new(
            "src",
            vec![
                SeriesValue::new("1", 1.0),
                SeriesValue::new("2", f64::NAN),
                SeriesValue::new("3", "n/a"),
                SeriesValue::new("4", 4i64),
                SeriesValue::new("5", true),
            ],
        )));
        let id = make(vec![HoseArg::stream(src)], &mut g).unwrap();
        let cols: Vec<String> = std::iter::from_fn(|| g.pull(Endpoint::new(id, 0)).unwrap())
            .map(|v| v.column.to_string())
            .collect();
        assert_eq!(cols, vec!["1", "4", "5"]);
    }
}
