//! Name → factory registry for operators callable from the DSL.
//!
//! A registry is an ordinary value: the engine builds one, hands it to the compiler
//! and to every instantiation, and nothing is process-global.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use serfun_core::error::{Error, Result};
use serfun_core::NodeId;

use crate::arg::HoseArg;
use crate::graph::Graph;

/// Builds one operator node (or subgraph) from call arguments.
///
/// Factories validate argument count and types eagerly and fail with
/// `Error::ArityOrType` before adding anything that could see a value.
/// The returned node's outputs are the call's outputs.
pub trait HoseFactory: Send + Sync {
    fn make(&self, args: Vec<HoseArg>, graph: &mut Graph, registry: &Registry) -> Result<NodeId>;
}

impl<F> HoseFactory for F
where
    F: Fn(Vec<HoseArg>, &mut Graph, &Registry) -> Result<NodeId> + Send + Sync,
{
    fn make(&self, args: Vec<HoseArg>, graph: &mut Graph, registry: &Registry) -> Result<NodeId> {
        self(args, graph, registry)
    }
}

#[derive(Clone, Default)]
pub struct Registry {
    factories: IndexMap<String, Arc<dyn HoseFactory>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails if `name` is already defined; definitions are never replaced.
    pub fn register(&mut self, name: impl Into<String>, factory: Arc<dyn HoseFactory>) -> Result<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(Error::Compile(format!("duplicate definition of '{name}'")));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(function = %name, "register");

        self.factories.insert(name, factory);
        Ok(())
    }

    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F) -> Result<()>
    where
        F: Fn(Vec<HoseArg>, &mut Graph, &Registry) -> Result<NodeId> + Send + Sync + 'static,
    {
        self.register(name, Arc::new(f))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn HoseFactory>> {
        self.factories.get(name).cloned()
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Instantiate `name` with `args` inside `graph`.
    pub fn call(&self, name: &str, args: Vec<HoseArg>, graph: &mut Graph) -> Result<NodeId> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::Compile(format!("unknown function '{name}'")))?;
        factory.make(args, graph, self)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("functions", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
