//! `store`: write every value that passes through to a stored series.

use std::sync::Arc;

use serfun_core::error::{Error, Result};
use serfun_core::{NodeId, SeriesValue};
use serfun_io::SeriesStore;

use crate::arg::HoseArg;
use crate::base::{Simple, SimpleHose};
use crate::builtins::series_path;
use crate::graph::{Graph, Ports};

/// One write per value. Pulled values are forwarded; pushed values stop here.
pub struct Store {
    store: Arc<dyn SeriesStore>,
    path: String,
}

impl Store {
    pub fn new(store: Arc<dyn SeriesStore>, path: impl Into<String>) -> Self {
        Self {
            store,
            path: path.into(),
        }
    }

    fn write(&mut self, value: &SeriesValue) -> Result<()> {
        self.store.add_point_to_series(&self.path, value)?;

        #[cfg(feature = "tracing")]
        tracing::trace!(path = %self.path, column = %value.column, "store point");

        Ok(())
    }
}

impl SimpleHose for Store {
    fn name(&self) -> &str {
        "store"
    }

    fn pull(&mut self, ports: &mut Ports<'_>) -> Result<Option<SeriesValue>> {
        let next = ports.pull(0)?;
        if let Some(v) = &next {
            self.write(v)?;
        }
        Ok(next)
    }

    fn push(&mut self, value: SeriesValue, _ports: &mut Ports<'_>) -> Result<()> {
        self.write(&value)
    }
}

pub(crate) fn make(store: Arc<dyn SeriesStore>, args: Vec<HoseArg>, graph: &mut Graph) -> Result<NodeId> {
    let Some((input, path_args)) = args.split_first() else {
        return Err(Error::ArityOrType(
            "store expects a stream followed by a path".into(),
        ));
    };
    let path = series_path("store", path_args)?;
    if !input.is_series() {
        return Err(Error::ArityOrType(format!(
            "store input must be a stream, got {}",
            input.kind()
        )));
    }
    let id = graph.add_node(Simple::new(Store::new(store, path)));
    input.bind_to(graph, id, 0)?;
    Ok(id)
}
