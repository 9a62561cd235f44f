//! `sample`: keep every `rate`-th value.

use serfun_core::error::{Error, Result};
use serfun_core::{NodeId, SeriesValue};

use crate::arg::HoseArg;
use crate::base::{Simple, SimpleHose};
use crate::builtins::{count_arg, expect_arity};
use crate::graph::{Graph, Ports};

/// Decimation by `rate`: inputs at positions `rate-1, 2*rate-1, ...` pass through verbatim.
///
/// Pull drains a whole group and returns its last member; push counts arrivals and
/// forwards the one that completes a group.
pub struct Sample {
    rate: usize,
    seen: usize,
}

impl Sample {
    pub fn new(rate: usize) -> Result<Self> {
        if rate < 2 {
            return Err(Error::ArityOrType(format!(
                "sample rate must be at least 2, got {rate}"
            )));
        }
        Ok(Self { rate, seen: 0 })
    }
}

impl SimpleHose for Sample {
    fn name(&self) -> &str {
        "sample"
    }

    fn pull(&mut self, ports: &mut Ports<'_>) -> Result<Option<SeriesValue>> {
        let mut last = None;
        for _ in 0..self.rate {
            match ports.pull(0)? {
                Some(v) => last = Some(v),
                None => return Ok(None),
            }
        }
        Ok(last)
    }

    fn push(&mut self, value: SeriesValue, ports: &mut Ports<'_>) -> Result<()> {
        self.seen += 1;
        if self.seen == self.rate {
            self.seen = 0;
            ports.push(0, value)?;
        }
        Ok(())
    }
}

pub(crate) fn make(args: Vec<HoseArg>, graph: &mut Graph) -> Result<NodeId> {
    expect_arity("sample", &args, 2, 2)?;
    let rate = count_arg("sample", "rate", &args[1], 2)?;
    let id = graph.add_node(Simple::new(Sample::new(rate)?));
    args[0].bind_to(graph, id, 0)?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Collector, VecSource};
    use serfun_core::Endpoint;

    #[test]
    fn pull_returns_last_of_each_group() {
        let input: Vec<i64> = (0..10).collect();
        let mut g = Graph::new();
        let src = g.add_node(Simple::new(VecSource::longs("src", &input)));
        let id = make(vec![HoseArg::stream(src), HoseArg::scalar(3i64)], &mut g).unwrap();
        let got: Vec<i64> = std::iter::from_fn(|| g.pull(Endpoint::new(id, 0)).unwrap())
            .map(|v| v.as_long().unwrap())
            .collect();
        assert_eq!(got, vec![2, 5, 8]);
    }

    #[test]
    fn push_forwards_group_boundaries() {
        let mut g = Graph::new();
        let id = g.add_node(Simple::new(Sample::new(2).unwrap()));
        let (sink, seen) = Collector::new();
        let sink = g.add_node(Simple::new(sink));
        g.bind(Endpoint::new(id, 0), sink, 0).unwrap();
        for i in 0..5i64 {
            g.push(id, 0, SeriesValue::new(i.to_string(), i)).unwrap();
        }
        let got: Vec<i64> = seen.values().iter().map(|v| v.as_long().unwrap()).collect();
        assert_eq!(got, vec![1, 3]);
    }

    #[test]
    fn push_matches_pull() {
        // 23 is prime, so every rate below leaves a partial trailing group
        let input: Vec<i64> = (0..23).map(|i| i * 7 - 40).collect();
        for rate in 2..=6usize {
            let mut g = Graph::new();
            let src = g.add_node(Simple::new(VecSource::longs("src", &input)));
            let id = make(
                vec![HoseArg::stream(src), HoseArg::scalar(rate as i64)],
                &mut g,
            )
            .unwrap();
            let pulled: Vec<SeriesValue> =
                std::iter::from_fn(|| g.pull(Endpoint::new(id, 0)).unwrap()).collect();

            let mut g = Graph::new();
            let id = g.add_node(Simple::new(Sample::new(rate).unwrap()));
            let (sink, seen) = Collector::new();
            let sink = g.add_node(Simple::new(sink));
            g.bind(Endpoint::new(id, 0), sink, 0).unwrap();
            for (i, x) in input.iter().enumerate() {
                g.push(id, 0, SeriesValue::new(format!("{i:06}"), *x)).unwrap();
            }

            assert_eq!(pulled.len(), input.len() / rate, "rate {rate}");
            assert_eq!(seen.values(), pulled, "rate {rate}");
        }
    }

    #[test]
    fn rate_below_two_is_rejected() {
        assert!(Sample::new(1).is_err());
        let mut g = Graph::new();
        let src = g.add_node(Simple::new(VecSource::longs("src", &[1])));
        assert!(matches!(
            make(vec![HoseArg::stream(src), HoseArg::scalar(1i64)], &mut g),
            Err(Error::ArityOrType(_))
        ));
    }
}
