//! Runtime: owns the store and the function registry, compiles programs, and hands
//! out independent evaluations.
//!
//! - Built-ins are registered once, in `Engine::new`/`Engine::with_store`.
//! - `define` compiles a program and registers it under its own name so later
//!   programs can call it.
//! - Every `evaluate` builds a fresh `Graph`. Evaluations share the store but no
//!   operator state, so they may run on different threads.

use std::fmt::Write as _;
use std::sync::Arc;

use thiserror::Error;

use serfun_core::error::Error;
use serfun_core::{EngineConfig, Endpoint, NodeId, SeriesValue, Value};
use serfun_io::{build_store_from_config, SeriesStore};
use serfun_operators::{Graph, HoseArg, HoseFactory, Registry};
use serfun_planner::{compile, ArgSpec, Program};

use crate::metrics::emit_span;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Series(#[from] Error),
    #[error("'{program}' has no output {output}")]
    NoSuchOutput { program: String, output: usize },
    #[error("ingest: {0}")]
    Ingest(String),
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
}

/// A program argument as supplied from outside a graph.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptArg {
    /// A stored series path; becomes a `load` node.
    Series(String),
    Scalar(Value),
}

impl From<ArgSpec> for ScriptArg {
    fn from(spec: ArgSpec) -> Self {
        match spec {
            ArgSpec::Stream { path } => ScriptArg::Series(path),
            ArgSpec::Long { value } => ScriptArg::Scalar(Value::Long(value)),
            ArgSpec::Decimal { value } => ScriptArg::Scalar(Value::Decimal(value)),
            ArgSpec::String { value } => ScriptArg::Scalar(Value::String(value)),
            ArgSpec::Boolean { value } => ScriptArg::Scalar(Value::Boolean(value)),
        }
    }
}

/// Engine owns the store collaborator and the function registry.
pub struct Engine {
    cfg: EngineConfig,
    store: Arc<dyn SeriesStore>,
    registry: Registry,
}

impl Engine {
    /// Build the store named by `cfg` and register the built-ins against it.
    pub fn new(cfg: EngineConfig) -> Result<Self, ExecError> {
        let store = build_store_from_config(&cfg.store_config())?;
        Self::with_store(cfg, store)
    }

    pub fn with_store(cfg: EngineConfig, store: Arc<dyn SeriesStore>) -> Result<Self, ExecError> {
        let registry = Registry::with_builtins(Arc::clone(&store), cfg.page_size)?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            page_size = cfg.page_size,
            store = cfg.store_uri.as_deref().unwrap_or(cfg.store_dir.as_str()),
            functions = registry.len(),
            "engine ready"
        );

        Ok(Self {
            cfg,
            store,
            registry,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn store(&self) -> Arc<dyn SeriesStore> {
        Arc::clone(&self.store)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Add a custom operator factory. Names are never redefined.
    pub fn register(&mut self, name: &str, factory: Arc<dyn HoseFactory>) -> Result<(), ExecError> {
        Ok(self.registry.register(name, factory)?)
    }

    pub fn compile(&self, source: &str) -> Result<Program, ExecError> {
        Ok(compile(source, &self.registry)?)
    }

    /// Compile `source` and make it callable by name from later programs.
    pub fn define(&mut self, source: &str) -> Result<Arc<Program>, ExecError> {
        let program = Arc::new(self.compile(source)?);
        let factory: Arc<dyn HoseFactory> = program.clone();
        self.registry.register(program.name(), factory)?;
        Ok(program)
    }

    /// Instantiate `program` on a fresh graph with `args` bound to its inputs.
    pub fn evaluate(&self, program: &Program, args: Vec<ScriptArg>) -> Result<Evaluation, ExecError> {
        let mut graph = Graph::new();
        let mut bound = Vec::with_capacity(args.len());
        for arg in args {
            bound.push(match arg {
                ScriptArg::Series(path) => {
                    let load = self
                        .registry
                        .call("load", vec![HoseArg::scalar(path)], &mut graph)?;
                    HoseArg::stream(load)
                }
                ScriptArg::Scalar(value) => HoseArg::scalar(value),
            });
        }
        let root = program.instantiate(bound, &mut graph, &self.registry)?;
        Ok(Evaluation::new(program, graph, root))
    }

    /// Instantiate `program` with its stream inputs left open for `Evaluation::push`.
    pub fn evaluate_open(&self, program: &Program) -> Result<Evaluation, ExecError> {
        let mut graph = Graph::new();
        let root = program.instantiate_open(&mut graph, &self.registry)?;
        Ok(Evaluation::new(program, graph, root))
    }

    /// Compile, instantiate and drain output 0.
    pub fn run_script(&self, source: &str, args: Vec<ScriptArg>) -> Result<Vec<SeriesValue>, ExecError> {
        let program = self.compile(source)?;
        let mut eval = self.evaluate(&program, args)?;
        let values = eval.drain(0)?;
        emit_span(
            "run_script",
            &[
                ("program", program.name().to_string()),
                ("nodes", eval.graph().len().to_string()),
                ("values", values.len().to_string()),
            ],
        );
        Ok(values)
    }

    /// Program text plus the node and edge lists of one instantiation.
    pub fn explain(&self, program: &Program, args: Vec<ScriptArg>) -> Result<String, ExecError> {
        let eval = self.evaluate(program, args)?;
        let graph = eval.graph();
        let mut out = program.to_string();
        // writing into a String cannot fail
        let _ = writeln!(out, "nodes:");
        for id in graph.node_ids() {
            let marker = if id == eval.root() { "  <- root" } else { "" };
            let _ = writeln!(
                out,
                "  {id} {} ({} in, {} out){marker}",
                graph.name(id)?,
                graph.inputs(id)?,
                graph.outputs(id)?
            );
        }
        let _ = writeln!(out, "edges:");
        for edge in graph.edges() {
            let _ = writeln!(out, "  {} -> {}", edge.from, edge.to);
        }
        Ok(out)
    }
}

/// One live instantiation of a program and the graph that owns its nodes.
pub struct Evaluation {
    program: String,
    graph: Graph,
    root: NodeId,
}

impl Evaluation {
    fn new(program: &Program, graph: Graph, root: NodeId) -> Self {
        Self {
            program: program.name().to_string(),
            graph,
            root,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    fn output(&self, output: usize) -> Result<Endpoint, ExecError> {
        if output < self.graph.outputs(self.root)? {
            Ok(Endpoint::new(self.root, output))
        } else {
            Err(ExecError::NoSuchOutput {
                program: self.program.clone(),
                output,
            })
        }
    }

    pub fn pull(&mut self, output: usize) -> Result<Option<SeriesValue>, ExecError> {
        let from = self.output(output)?;
        Ok(self.graph.pull(from)?)
    }

    /// Feed `value` into program input `input`.
    pub fn push(&mut self, input: usize, value: SeriesValue) -> Result<(), ExecError> {
        Ok(self.graph.push(self.root, input, value)?)
    }

    pub fn terminate(&mut self, input: usize) -> Result<(), ExecError> {
        Ok(self.graph.terminate(self.root, input)?)
    }

    pub fn is_terminated(&self) -> bool {
        self.graph.is_terminated(self.root)
    }

    /// Pull `output` until it ends.
    pub fn drain(&mut self, output: usize) -> Result<Vec<SeriesValue>, ExecError> {
        let from = self.output(output)?;
        let mut out = Vec::new();
        while let Some(v) = self.graph.pull(from)? {
            out.push(v);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(program = %self.program, output, values = out.len(), "drained");

        Ok(out)
    }
}
