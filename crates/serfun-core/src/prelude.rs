//! Convenience re-exports for downstream crates.

pub use crate::config::{EngineConfig, StoreConfig};
pub use crate::error::{Error, Result};
pub use crate::id::{Endpoint, NodeId};
pub use crate::structure::Structure;
pub use crate::value::{Column, SeriesValue, Value};
