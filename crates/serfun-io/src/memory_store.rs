//! In-memory series store for tests and `memory://` configurations.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{Arc, Mutex, MutexGuard};

use serfun_core::error::{Error, Result};
use serfun_core::{SeriesValue, Value};

use crate::store::{required_column, SeriesStore};

type Series = BTreeMap<String, Value>;

/// Thread-safe in-memory store: one sorted map per series path.
#[derive(Clone, Default)]
pub struct MemorySeriesStore {
    data: Arc<Mutex<HashMap<String, Series>>>,
}

impl MemorySeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Series>>> {
        self.data
            .lock()
            .map_err(|_| Error::Storage("memory store lock poisoned".into()))
    }

    /// Number of points held for `path`.
    pub fn len(&self, path: &str) -> usize {
        self.lock()
            .map(|data| data.get(path).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lock()
            .map(|data| data.contains_key(path))
            .unwrap_or(false)
    }

    /// Paths currently holding a series, sorted.
    pub fn series_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .lock()
            .map(|data| data.keys().cloned().collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }
}

impl SeriesStore for MemorySeriesStore {
    fn get_points_after(
        &self,
        path: &str,
        after: Option<&str>,
        page_size: usize,
    ) -> Result<Vec<SeriesValue>> {
        let data = self.lock()?;
        let Some(series) = data.get(path) else {
            return Ok(Vec::new());
        };
        let lower = match after {
            Some(key) => Bound::Excluded(key),
            None => Bound::Unbounded,
        };
        Ok(series
            .range::<str, _>((lower, Bound::Unbounded))
            .take(page_size)
            .map(|(column, value)| SeriesValue::new(column.as_str(), value.clone()))
            .collect())
    }

    fn add_point_to_series(&self, path: &str, value: &SeriesValue) -> Result<()> {
        let column = required_column(value)?;
        let mut data = self.lock()?;
        data.entry(path.to_string())
            .or_default()
            .insert(column.to_string(), value.value.clone());
        Ok(())
    }

    fn delete_series(&self, path: &str) -> Result<()> {
        self.lock()?.remove(path);
        Ok(())
    }
}
