#![forbid(unsafe_code)]
//! serfun-exec: the engine that ties store, registry and compiler together.
//!
//! - `runtime`: `Engine`, `Evaluation`, `ExecError`
//! - `ingest`: CSV files into stored series
//! - `metrics`: span hooks, inert unless the `tracing` feature is on

pub mod ingest;
pub mod metrics;
pub mod runtime;

pub use ingest::{sanitize_header, Binding, ColumnKind, CsvIngest, IngestReport};
pub use runtime::{Engine, Evaluation, ExecError, ScriptArg};
