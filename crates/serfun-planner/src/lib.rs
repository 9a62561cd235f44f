#![forbid(unsafe_code)]
//! serfun-planner: series program text → compiled `Program` → wired `Runner`.
//!
//! - `dsl`: lexer, syntax tree, parser
//! - `program`: name checking against a registry, and per-call instantiation
//! - `runner`: the node that exposes a program instance's outputs
//! - `job`: YAML manifests used by the CLI
//!
//! The registry is always passed in explicitly; compiling the same text against two
//! registries may give two different answers.

pub mod dsl;
pub mod job;
pub mod program;
pub mod runner;

pub use dsl::{parse, ParamType};
pub use job::{parse_job, ArgSpec, Job, JobConfig};
pub use program::{compile, Program};
pub use runner::Runner;
