//! Base operator kinds.
//!
//! - `Simple<K>` adapts a single-input/single-output kernel (`SimpleHose`) to the
//!   port-indexed `Hose` trait: it rejects port indices other than 0, tracks
//!   termination, and forwards end-of-stream downstream.
//! - Multi-port ("complex") operators implement `Hose` directly; see `Split`,
//!   `CsvMux` and the planner's `Runner`.

use serfun_core::error::{Error, Result};
use serfun_core::SeriesValue;

use crate::graph::Ports;
use crate::traits::Hose;

/// One logical input (port 0, or none for sources) and one logical output.
pub trait SimpleHose: Send + 'static {
    fn name(&self) -> &str;

    /// Sources override this with 0.
    fn inputs(&self) -> usize {
        1
    }

    fn pull(&mut self, ports: &mut Ports<'_>) -> Result<Option<SeriesValue>>;

    fn push(&mut self, value: SeriesValue, ports: &mut Ports<'_>) -> Result<()>;

    /// Runs once when the upstream ends, before termination is forwarded.
    fn finish(&mut self, _ports: &mut Ports<'_>) -> Result<()> {
        Ok(())
    }
}

pub struct Simple<K> {
    kernel: K,
    terminated: bool,
}

impl<K: SimpleHose> Simple<K> {
    pub fn new(kernel: K) -> Self {
        Self {
            kernel,
            terminated: false,
        }
    }

    fn check(&self, port: usize, what: &str) -> Result<()> {
        if port == 0 {
            Ok(())
        } else {
            Err(Error::BadWiring(format!(
                "'{}' has a single {what}, got index {port}",
                self.kernel.name()
            )))
        }
    }
}

impl<K: SimpleHose> Hose for Simple<K> {
    fn name(&self) -> &str {
        self.kernel.name()
    }

    fn inputs(&self) -> usize {
        self.kernel.inputs()
    }

    fn outputs(&self) -> usize {
        1
    }

    fn pull_value(&mut self, output: usize, ports: &mut Ports<'_>) -> Result<Option<SeriesValue>> {
        self.check(output, "output")?;
        if self.terminated {
            return Ok(None);
        }
        let next = self.kernel.pull(ports)?;
        if next.is_none() {
            self.terminated = true;
        }
        Ok(next)
    }

    fn push_value(
        &mut self,
        value: SeriesValue,
        input: usize,
        ports: &mut Ports<'_>,
    ) -> Result<()> {
        self.check(input, "input")?;
        self.kernel.push(value, ports)
    }

    fn terminate_stream(&mut self, input: usize, ports: &mut Ports<'_>) -> Result<()> {
        self.check(input, "input")?;
        if self.terminated {
            return Ok(());
        }
        self.terminated = true;
        self.kernel.finish(ports)?;
        ports.terminate(0)
    }

    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

/// Identity node. Programs use one per declared input as the placeholder that
/// caller arguments are bound to.
#[derive(Debug, Default)]
pub struct Passthrough;

impl Passthrough {
    pub fn new() -> Self {
        Self
    }
}

impl SimpleHose for Passthrough {
    fn name(&self) -> &str {
        "arg"
    }

    fn pull(&mut self, ports: &mut Ports<'_>) -> Result<Option<SeriesValue>> {
        ports.pull(0)
    }

    fn push(&mut self, value: SeriesValue, ports: &mut Ports<'_>) -> Result<()> {
        ports.push(0, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::testing::{Collector, VecSource};

    use serfun_core::Endpoint;

    #[test]
    fn rejects_non_zero_ports() {
        let mut g = Graph::new();
        let src = g.add_node(Simple::new(VecSource::longs("src", &[1])));
        assert!(matches!(
            g.pull(Endpoint::new(src, 1)),
            Err(Error::BadWiring(_))
        ));
    }

    #[test]
    fn termination_is_forwarded_once() {
        let mut g = Graph::new();
        let pass = g.add_node(Simple::new(Passthrough::new()));
        let (sink, seen) = Collector::new();
        let sink = g.add_node(Simple::new(sink));
        g.bind(Endpoint::new(pass, 0), sink, 0).unwrap();

        // the placeholder input is unbound; push and terminate drive it directly
        g.push(pass, 0, SeriesValue::new("1", 1i64)).unwrap();
        g.terminate(pass, 0).unwrap();
        g.terminate(pass, 0).unwrap();

        assert_eq!(seen.values(), vec![SeriesValue::new("1", 1i64)]);
        assert_eq!(seen.terminations(), 1);
        assert!(g.is_terminated(pass));
        assert!(g.is_terminated(sink));
    }
}
