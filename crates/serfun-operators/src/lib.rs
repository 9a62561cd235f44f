#![forbid(unsafe_code)]
//! serfun-operators: the operator graph and the built-in series operators.
//!
//! Design intent:
//! - Nodes live in a `Graph` arena and refer to each other only by `NodeId`.
//! - Evaluation is synchronous and cooperative: a pull walks upstream, a push walks
//!   downstream, both on the caller's thread.
//! - Factories are looked up by name in a `Registry` value that callers pass around
//!   explicitly.

pub mod arg;
pub mod base;
pub mod builtins;
pub mod graph;
pub mod registry;
pub mod testing;
pub mod traits;

pub use arg::{HoseArg, Selector};
pub use base::{Passthrough, Simple, SimpleHose};
pub use builtins::register_builtins;
pub use graph::{Edge, Graph, Ports};
pub use registry::{HoseFactory, Registry};
pub use traits::Hose;
