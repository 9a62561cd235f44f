//! In-memory source and sink nodes for driving graphs without a store.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serfun_core::error::Result;
use serfun_core::{SeriesValue, Value};

use crate::base::SimpleHose;
use crate::graph::Ports;

/// Source that replays a fixed list of values, then ends.
pub struct VecSource {
    name: String,
    values: VecDeque<SeriesValue>,
}

impl VecSource {
    pub fn new(name: impl Into<String>, values: Vec<SeriesValue>) -> Self {
        Self {
            name: name.into(),
            values: values.into(),
        }
    }

    /// Values keyed by zero-padded position so that key order matches list order.
    pub fn keyed<V: Into<Value>>(name: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        let values = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| SeriesValue::new(format!("{i:06}"), v))
            .collect();
        Self::new(name, values)
    }

    pub fn longs(name: impl Into<String>, values: &[i64]) -> Self {
        Self::keyed(name, values.iter().copied())
    }

    pub fn decimals(name: impl Into<String>, values: &[f64]) -> Self {
        Self::keyed(name, values.iter().copied())
    }
}

impl SimpleHose for VecSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> usize {
        0
    }

    fn pull(&mut self, _ports: &mut Ports<'_>) -> Result<Option<SeriesValue>> {
        Ok(self.values.pop_front())
    }

    fn push(&mut self, _value: SeriesValue, _ports: &mut Ports<'_>) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct Seen {
    values: Vec<SeriesValue>,
    terminations: usize,
}

/// Shared view of what a `Collector` received.
#[derive(Clone, Default)]
pub struct Collected(Arc<Mutex<Seen>>);

impl Collected {
    pub fn values(&self) -> Vec<SeriesValue> {
        self.0
            .lock()
            .map(|seen| seen.values.clone())
            .unwrap_or_default()
    }

    pub fn terminations(&self) -> usize {
        self.0.lock().map(|seen| seen.terminations).unwrap_or(0)
    }
}

/// Terminal sink for push-mode tests. Pulling through it forwards and records too.
pub struct Collector {
    seen: Collected,
}

impl Collector {
    pub fn new() -> (Self, Collected) {
        let seen = Collected::default();
        (Self { seen: seen.clone() }, seen)
    }

    fn record(&self, value: &SeriesValue) {
        if let Ok(mut seen) = self.seen.0.lock() {
            seen.values.push(value.clone());
        }
    }
}

impl SimpleHose for Collector {
    fn name(&self) -> &str {
        "collect"
    }

    fn pull(&mut self, ports: &mut Ports<'_>) -> Result<Option<SeriesValue>> {
        let next = ports.pull(0)?;
        if let Some(v) = &next {
            self.record(v);
        }
        Ok(next)
    }

    fn push(&mut self, value: SeriesValue, _ports: &mut Ports<'_>) -> Result<()> {
        self.record(&value);
        Ok(())
    }

    fn finish(&mut self, _ports: &mut Ports<'_>) -> Result<()> {
        if let Ok(mut seen) = self.seen.0.lock() {
            seen.terminations += 1;
        }
        Ok(())
    }
}
