//! `mavg`: fixed-size sliding-window mean.

use std::collections::VecDeque;

use serfun_core::error::{Error, Result};
use serfun_core::{Column, NodeId, SeriesValue, Value};

use crate::arg::HoseArg;
use crate::base::{Simple, SimpleHose};
use crate::builtins::{count_arg, expect_arity};
use crate::graph::{Graph, Ports};

/// Mean of the last `range` inputs, keyed by the newest input's column.
///
/// Nothing is emitted until the window is full. Both modes subtract the evicted
/// value before adding the incoming one, so pull and push produce bit-identical
/// output sequences for the same input.
pub struct MovingAverage {
    range: usize,
    window: VecDeque<(Column, f64)>,
    sum: f64,
}

impl MovingAverage {
    pub fn new(range: usize) -> Result<Self> {
        if range == 0 {
            return Err(Error::ArityOrType("mavg range must be at least 1".into()));
        }
        Ok(Self {
            range,
            window: VecDeque::with_capacity(range),
            sum: 0.0,
        })
    }

    fn admit(&mut self, value: &SeriesValue) -> Result<()> {
        let x = value.as_double()?;
        self.window.push_back((value.column.clone(), x));
        self.sum += x;
        Ok(())
    }

    fn evict(&mut self) {
        if let Some((_, old)) = self.window.pop_front() {
            self.sum -= old;
        }
    }

    fn mean(&self) -> SeriesValue {
        let column = self
            .window
            .back()
            .map(|(c, _)| c.clone())
            .unwrap_or_default();
        SeriesValue {
            column,
            value: Value::Decimal(self.sum / self.range as f64),
        }
    }
}

impl SimpleHose for MovingAverage {
    fn name(&self) -> &str {
        "mavg"
    }

    fn pull(&mut self, ports: &mut Ports<'_>) -> Result<Option<SeriesValue>> {
        while self.window.len() < self.range {
            match ports.pull(0)? {
                Some(v) => self.admit(&v)?,
                None => return Ok(None),
            }
        }
        let out = self.mean();
        self.evict();
        Ok(Some(out))
    }

    fn push(&mut self, value: SeriesValue, ports: &mut Ports<'_>) -> Result<()> {
        if self.window.len() == self.range {
            self.evict();
        }
        self.admit(&value)?;
        if self.window.len() == self.range {
            ports.push(0, self.mean())?;
        }
        Ok(())
    }
}

pub(crate) fn make(args: Vec<HoseArg>, graph: &mut Graph) -> Result<NodeId> {
    expect_arity("mavg", &args, 2, 2)?;
    let range = count_arg("mavg", "range", &args[1], 1)?;
    let id = graph.add_node(Simple::new(MovingAverage::new(range)?));
    args[0].bind_to(graph, id, 0)?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Collector, VecSource};
    use serfun_core::Endpoint;

    fn pull_all(values: &[f64], range: usize) -> Vec<SeriesValue> {
        let mut g = Graph::new();
        let src = g.add_node(Simple::new(VecSource::decimals("src", values)));
        let id = make(
            vec![HoseArg::stream(src), HoseArg::scalar(range as i64)],
            &mut g,
        )
        .unwrap();
        std::iter::from_fn(|| g.pull(Endpoint::new(id, 0)).unwrap()).collect()
    }

    #[test]
    fn emits_mean_of_each_full_window() {
        let out = pull_all(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        let means: Vec<f64> = out.iter().map(|v| v.as_double().unwrap()).collect();
        assert_eq!(means, vec![2.0, 3.0, 4.0]);
        assert_eq!(out[0].column, Column::new("000002"));
        assert_eq!(out[2].column, Column::new("000004"));
    }

    #[test]
    fn partial_window_emits_nothing() {
        assert!(pull_all(&[1.0, 2.0], 3).is_empty());
    }

    #[test]
    fn push_matches_pull() {
        let input = [0.1, 0.7, 0.2, 1e9, -3.3, 0.3, 2.5];
        let pulled = pull_all(&input, 3);

        let mut g = Graph::new();
        let id = g.add_node(Simple::new(MovingAverage::new(3).unwrap()));
        let (sink, seen) = Collector::new();
        let sink = g.add_node(Simple::new(sink));
        g.bind(Endpoint::new(id, 0), sink, 0).unwrap();
        for (i, x) in input.iter().enumerate() {
            g.push(id, 0, SeriesValue::new(format!("{i:06}"), *x)).unwrap();
        }
        assert_eq!(seen.values(), pulled);
    }

    #[test]
    fn factory_validates_range() {
        let mut g = Graph::new();
        let src = g.add_node(Simple::new(VecSource::longs("src", &[1])));
        assert!(make(vec![HoseArg::stream(src), HoseArg::scalar(0i64)], &mut g).is_err());
        assert!(make(vec![HoseArg::stream(src)], &mut g).is_err());
        assert!(matches!(
            make(vec![HoseArg::scalar(1i64), HoseArg::scalar(2i64)], &mut g),
            Err(Error::ArityOrType(_))
        ));
    }
}
