//! Series storage collaborators consumed by `load` and `store`.
//!
//! - `fs`: one text file per series path under a root directory (default).
//! - `MemorySeriesStore` (crate root): process-local maps for tests and `memory://`.
//!
//! `build_store_from_config` picks the backend from the configured store URI.

mod fs;
pub use fs::FsSeriesStore;

use std::sync::Arc;

use serfun_core::config::StoreConfig;
use serfun_core::error::{Error, Result};
use serfun_core::SeriesValue;

use crate::memory_store::MemorySeriesStore;

/// Paginated, key-ordered access to named series.
///
/// Implementations must be shareable between every operator of a graph and across
/// independent evaluations, hence `Send + Sync` and `&self` receivers.
pub trait SeriesStore: Send + Sync {
    /// Up to `page_size` points with column strictly greater than `after`, ascending.
    fn get_points_after(
        &self,
        path: &str,
        after: Option<&str>,
        page_size: usize,
    ) -> Result<Vec<SeriesValue>>;

    /// Insert or replace the point at `value.column`. Null columns are rejected.
    fn add_point_to_series(&self, path: &str, value: &SeriesValue) -> Result<()>;

    fn add_points_to_series(&self, path: &str, values: &[SeriesValue]) -> Result<()> {
        for v in values {
            self.add_point_to_series(path, v)?;
        }
        Ok(())
    }

    fn get_points(&self, path: &str) -> Result<Vec<SeriesValue>> {
        self.get_points_after(path, None, usize::MAX)
    }

    fn delete_series(&self, path: &str) -> Result<()>;
}

/// Column key of a point about to be stored.
pub(crate) fn required_column(value: &SeriesValue) -> Result<&str> {
    value
        .column
        .as_str()
        .ok_or_else(|| Error::Storage("Null column not allowed".into()))
}

/// Build the correct store backend using the provided configuration.
pub fn build_store_from_config(cfg: &StoreConfig) -> Result<Arc<dyn SeriesStore>> {
    match cfg.scheme() {
        Some("memory") | Some("mem") => Ok(Arc::new(MemorySeriesStore::new())),
        Some("file") | None => Ok(Arc::new(FsSeriesStore::new(&cfg.root))),
        Some(other) => Err(Error::Config(format!("unsupported store scheme '{other}'"))),
    }
}
