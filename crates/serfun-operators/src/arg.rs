//! `HoseArg`: an argument handed to an operator factory.
//!
//! An argument is either a scalar literal or a reference to one output port of a node
//! already in the graph. Output selectors (`x[1]`, `x["hi"]`) are resolved here,
//! against the producer's declared outputs, before the factory ever sees the argument.

use std::fmt;

use serfun_core::error::{Error, Result};
use serfun_core::{Endpoint, NodeId, SeriesValue, Value};

use crate::graph::Graph;

/// Output-port selector applied to a stream-valued expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Index(usize),
    Key(String),
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Index(i) => write!(f, "[{i}]"),
            Selector::Key(k) => write!(f, "[\"{k}\"]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HoseArg {
    Scalar(SeriesValue),
    Stream(Endpoint),
}

impl HoseArg {
    pub fn scalar(value: impl Into<Value>) -> Self {
        HoseArg::Scalar(SeriesValue::unkeyed(value))
    }

    /// Output 0 of `node`.
    pub fn stream(node: NodeId) -> Self {
        HoseArg::Stream(Endpoint::new(node, 0))
    }

    /// Build an argument from a value, applying an optional output selector.
    ///
    /// Stream values resolve the selector against the producer's outputs. A scalar
    /// has exactly one output, so any selector on it is a wiring error.
    pub fn resolve(graph: &Graph, value: SeriesValue, selector: Option<&Selector>) -> Result<Self> {
        if let Value::Stream(ep) = value.value {
            let port = match selector {
                Some(sel) => resolve_port(graph, ep.node, sel)?,
                None => ep.port,
            };
            return Ok(HoseArg::Stream(Endpoint::new(ep.node, port)));
        }
        match selector {
            None => Ok(HoseArg::Scalar(value)),
            Some(sel) => Err(Error::BadWiring(format!(
                "{} value '{}' does not support multiple outputs (selector {sel})",
                value.kind(),
                value
            ))),
        }
    }

    /// Re-point this argument at another output of the same producer.
    pub fn select(self, graph: &Graph, selector: &Selector) -> Result<Self> {
        let value = self.into_value();
        Self::resolve(graph, value, Some(selector))
    }

    pub fn into_value(self) -> SeriesValue {
        match self {
            HoseArg::Scalar(v) => v,
            HoseArg::Stream(ep) => SeriesValue::unkeyed(ep),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            HoseArg::Scalar(v) => v.kind(),
            HoseArg::Stream(_) => "stream",
        }
    }

    pub fn is_series(&self) -> bool {
        matches!(self, HoseArg::Stream(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, HoseArg::Scalar(v) if v.is_string())
    }

    pub fn as_stream(&self) -> Result<Endpoint> {
        match self {
            HoseArg::Stream(ep) => Ok(*ep),
            HoseArg::Scalar(v) => Err(Error::WrongVariant {
                attempted: "stream",
                actual: v.kind(),
            }),
        }
    }

    pub fn as_string(&self) -> Result<String> {
        self.scalar_ref("string")?.as_string()
    }

    pub fn as_long(&self) -> Result<i64> {
        self.scalar_ref("long")?.as_long()
    }

    pub fn as_double(&self) -> Result<f64> {
        self.scalar_ref("decimal")?.as_double()
    }

    pub fn as_boolean(&self) -> Result<bool> {
        self.scalar_ref("boolean")?.as_boolean()
    }

    fn scalar_ref(&self, attempted: &'static str) -> Result<&SeriesValue> {
        match self {
            HoseArg::Scalar(v) => Ok(v),
            HoseArg::Stream(_) => Err(Error::WrongVariant {
                attempted,
                actual: "stream",
            }),
        }
    }

    /// Next value of the argument. A scalar answers with itself every time.
    pub fn pull(&self, graph: &mut Graph) -> Result<Option<SeriesValue>> {
        match self {
            HoseArg::Scalar(v) => Ok(Some(v.clone())),
            HoseArg::Stream(ep) => graph.pull(*ep),
        }
    }

    /// Wire this argument into `input` of `consumer`. Only streams can be wired.
    pub fn bind_to(&self, graph: &mut Graph, consumer: NodeId, input: usize) -> Result<()> {
        match self {
            HoseArg::Stream(ep) => graph.bind(*ep, consumer, input),
            HoseArg::Scalar(v) => Err(Error::ArityOrType(format!(
                "'{}' input {input} needs a stream, got {} '{}'",
                graph.name(consumer)?,
                v.kind(),
                v
            ))),
        }
    }
}

fn resolve_port(graph: &Graph, node: NodeId, selector: &Selector) -> Result<usize> {
    match selector {
        Selector::Index(i) => {
            let outputs = graph.outputs(node)?;
            if *i < outputs {
                Ok(*i)
            } else {
                Err(Error::BadWiring(format!(
                    "output index {i} out of range for '{}' ({outputs} outputs)",
                    graph.name(node)?
                )))
            }
        }
        Selector::Key(key) => graph
            .output_keys(node)?
            .iter()
            .position(|k| k == key)
            .ok_or_else(|| {
                Error::BadWiring(format!(
                    "unknown output key '{key}' for '{}'",
                    graph.name(node).unwrap_or("?")
                ))
            }),
    }
}
