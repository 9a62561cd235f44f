//! `load`: page points out of the series store.

use std::collections::VecDeque;
use std::sync::Arc;

use serfun_core::error::Result;
use serfun_core::{NodeId, SeriesValue};
use serfun_io::SeriesStore;

use crate::arg::HoseArg;
use crate::base::{Simple, SimpleHose};
use crate::builtins::series_path;
use crate::graph::{Graph, Ports};

/// Source over one stored series, fetched `page_size` points at a time.
///
/// Each fetch asks for points strictly after the last key delivered. Anything at or
/// before that key is dropped as well, so a store that answers inclusively cannot
/// cause a repeat. A fetch that yields no new point ends the stream for good.
pub struct Load {
    store: Arc<dyn SeriesStore>,
    path: String,
    page_size: usize,
    page: VecDeque<SeriesValue>,
    last: Option<String>,
    exhausted: bool,
    fetches: usize,
}

impl Load {
    /// Primes the first page immediately, so a broken store fails at wiring time.
    pub fn new(store: Arc<dyn SeriesStore>, path: impl Into<String>, page_size: usize) -> Result<Self> {
        let mut load = Self {
            store,
            path: path.into(),
            page_size: page_size.max(1),
            page: VecDeque::new(),
            last: None,
            exhausted: false,
            fetches: 0,
        };
        load.refill()?;
        Ok(load)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Store round trips made so far.
    pub fn fetches(&self) -> usize {
        self.fetches
    }

    fn refill(&mut self) -> Result<()> {
        let page = self
            .store
            .get_points_after(&self.path, self.last.as_deref(), self.page_size)?;
        self.fetches += 1;
        let fetched = page.len();

        let last = self.last.as_deref();
        self.page = page
            .into_iter()
            .filter(|p| match (p.column.as_str(), last) {
                (Some(col), Some(last)) => col > last,
                (Some(_), None) => true,
                (None, _) => false,
            })
            .collect();
        if self.page.is_empty() {
            self.exhausted = true;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            path = %self.path,
            after = ?self.last,
            fetched,
            fresh = self.page.len(),
            "load page"
        );
        #[cfg(not(feature = "tracing"))]
        let _ = fetched;

        Ok(())
    }
}

impl SimpleHose for Load {
    fn name(&self) -> &str {
        "load"
    }

    fn inputs(&self) -> usize {
        0
    }

    fn pull(&mut self, _ports: &mut Ports<'_>) -> Result<Option<SeriesValue>> {
        if self.page.is_empty() && !self.exhausted {
            self.refill()?;
        }
        match self.page.pop_front() {
            Some(point) => {
                self.last = point.column.as_str().map(str::to_string);
                Ok(Some(point))
            }
            None => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }

    /// A source has no input; pushed values are ignored.
    fn push(&mut self, _value: SeriesValue, _ports: &mut Ports<'_>) -> Result<()> {
        Ok(())
    }
}

pub(crate) fn make(
    store: Arc<dyn SeriesStore>,
    page_size: usize,
    args: Vec<HoseArg>,
    graph: &mut Graph,
) -> Result<NodeId> {
    let path = series_path("load", &args)?;
    let load = Load::new(store, path, page_size)?;
    Ok(graph.add_node(Simple::new(load)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serfun_core::Endpoint;
    use serfun_io::MemorySeriesStore;

    fn store_with(n: usize) -> Arc<MemorySeriesStore> {
        let store = Arc::new(MemorySeriesStore::new());
        for i in 0..n {
            store
                .add_point_to_series("t/s", &SeriesValue::new(format!("{i:05}"), i as i64))
                .unwrap();
        }
        store
    }

    #[test]
    fn pages_through_without_repeats() {
        let store = store_with(7);
        let mut g = Graph::new();
        let id = g.add_node(Simple::new(Load::new(store, "t/s", 3).unwrap()));
        let mut got = Vec::new();
        while let Some(v) = g.pull(Endpoint::new(id, 0)).unwrap() {
            got.push(v.as_long().unwrap());
        }
        assert_eq!(got, (0..7).collect::<Vec<_>>());
        assert!(g.is_terminated(id));
        assert!(g.pull(Endpoint::new(id, 0)).unwrap().is_none());
    }

    #[test]
    fn single_point_series_is_delivered() {
        let store = store_with(1);
        let mut g = Graph::new();
        let id = g.add_node(Simple::new(Load::new(store, "t/s", 1000).unwrap()));
        assert!(g.pull(Endpoint::new(id, 0)).unwrap().is_some());
        assert!(g.pull(Endpoint::new(id, 0)).unwrap().is_none());
    }

    #[test]
    fn empty_series_ends_immediately() {
        let load = Load::new(Arc::new(MemorySeriesStore::new()), "t/none", 10).unwrap();
        assert_eq!(load.fetches(), 1);
        let mut g = Graph::new();
        let id = g.add_node(Simple::new(load));
        assert!(g.pull(Endpoint::new(id, 0)).unwrap().is_none());
    }

    #[test]
    fn factory_joins_authority_and_path() {
        let store = store_with(2);
        let mut g = Graph::new();
        let id = make(
            store,
            1000,
            vec![HoseArg::scalar("t"), HoseArg::scalar("s")],
            &mut g,
        )
        .unwrap();
        assert_eq!(g.name(id).unwrap(), "load");
        assert_eq!(g.pull(Endpoint::new(id, 0)).unwrap().unwrap().as_long().unwrap(), 0);
        assert!(make(Arc::new(MemorySeriesStore::new()), 10, vec![], &mut g).is_err());
    }
}
