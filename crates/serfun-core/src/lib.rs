#![forbid(unsafe_code)]
//! serfun-core: the series value model, typed graph ids, engine config, and the
//! shared error type.
//!
//! Everything above this crate (storage, operators, the DSL compiler, the engine)
//! speaks in `SeriesValue`s keyed by `Column`s and addresses graph nodes by `NodeId`.

pub mod config;
pub mod error;
pub mod id;
pub mod prelude;
pub mod structure;
pub mod value;

pub use config::{EngineConfig, StoreConfig};
pub use error::{Error, Result};
pub use id::{Endpoint, NodeId};
pub use structure::Structure;
pub use value::{Column, SeriesValue, Value};
