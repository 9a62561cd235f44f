//! Arena of operator nodes plus their edge tables.
//!
//! Every edge is recorded twice: the producer's downstream slot names
//! `(consumer, input)` and the consumer's upstream slot names `(producer, output)`.
//! `bind` writes both or neither, so the two views always agree.
//!
//! Dispatch moves the active node out of its slot for the duration of the call. A
//! call that reaches the same node again (a cycle) finds the slot empty and fails
//! with `BadWiring` instead of recursing forever.
//!
//! A node may declare some inputs as forwarded (`Hose::forward_input`). Binds,
//! pushes and terminations addressed to such an input are routed to the target
//! without dispatching the node itself, so a program runner can accept pushes on
//! its inputs while its own outputs are still reachable from inside.

use serfun_core::error::{Error, Result};
use serfun_core::{Endpoint, NodeId, SeriesValue};

use crate::traits::Hose;

struct Slot {
    hose: Option<Box<dyn Hose>>,
    name: String,
    output_keys: Vec<String>,
    /// Per input: the producer endpoint feeding it.
    upstream: Vec<Option<Endpoint>>,
    /// Per output: the consumer endpoint (node, input) it feeds.
    downstream: Vec<Option<Endpoint>>,
    /// Per input: where the node forwards it, if anywhere.
    forwards: Vec<Option<Endpoint>>,
}

/// Owner of every node in one evaluation.
#[derive(Default)]
pub struct Graph {
    nodes: Vec<Slot>,
}

/// One bound edge, as reported by `Graph::edges`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: Endpoint,
    pub to: Endpoint,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(|i| NodeId::new(i as u32))
    }

    /// Move a node into the arena. Its ports start unbound.
    pub fn add(&mut self, hose: Box<dyn Hose>) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(Slot {
            name: hose.name().to_string(),
            output_keys: hose.output_keys(),
            upstream: vec![None; hose.inputs()],
            downstream: vec![None; hose.outputs()],
            forwards: (0..hose.inputs()).map(|i| hose.forward_input(i)).collect(),
            hose: Some(hose),
        });
        id
    }

    pub fn add_node<H: Hose>(&mut self, hose: H) -> NodeId {
        self.add(Box::new(hose))
    }

    fn slot(&self, id: NodeId) -> Result<&Slot> {
        self.nodes
            .get(id.index())
            .ok_or_else(|| Error::BadWiring(format!("no such node {id}")))
    }

    fn slot_mut(&mut self, id: NodeId) -> Result<&mut Slot> {
        self.nodes
            .get_mut(id.index())
            .ok_or_else(|| Error::BadWiring(format!("no such node {id}")))
    }

    pub fn name(&self, id: NodeId) -> Result<&str> {
        Ok(self.slot(id)?.name.as_str())
    }

    pub fn inputs(&self, id: NodeId) -> Result<usize> {
        Ok(self.slot(id)?.upstream.len())
    }

    pub fn outputs(&self, id: NodeId) -> Result<usize> {
        Ok(self.slot(id)?.downstream.len())
    }

    pub fn output_keys(&self, id: NodeId) -> Result<&[String]> {
        Ok(&self.slot(id)?.output_keys)
    }

    /// Producer feeding `input` of `id`, if bound.
    pub fn upstream(&self, id: NodeId, input: usize) -> Result<Option<Endpoint>> {
        let slot = self.slot(id)?;
        slot.upstream.get(input).copied().ok_or_else(|| {
            Error::BadWiring(format!("'{}' has no input {input}", slot.name))
        })
    }

    /// Consumer fed by `output` of `id`, if bound.
    pub fn downstream(&self, id: NodeId, output: usize) -> Result<Option<Endpoint>> {
        let slot = self.slot(id)?;
        slot.downstream.get(output).copied().ok_or_else(|| {
            Error::BadWiring(format!("'{}' has no output {output}", slot.name))
        })
    }

    /// Follow forwarded inputs until reaching one the node handles itself.
    fn route(&self, id: NodeId, input: usize) -> Result<Endpoint> {
        let mut at = Endpoint::new(id, input);
        for _ in 0..=self.nodes.len() {
            self.upstream(at.node, at.port)?;
            match self.slot(at.node)?.forwards[at.port] {
                Some(next) => at = next,
                None => return Ok(at),
            }
        }
        Err(Error::BadWiring(format!(
            "input {input} of '{}' forwards in a loop",
            self.name(id)?
        )))
    }

    /// Connect `from` (producer node, output port) to `input` of `consumer`.
    pub fn bind(&mut self, from: Endpoint, consumer: NodeId, input: usize) -> Result<()> {
        let Endpoint { node: consumer, port: input } = self.route(consumer, input)?;
        if self.downstream(from.node, from.port)?.is_some() {
            return Err(Error::BadWiring(format!(
                "output {} of '{}' is already bound",
                from.port,
                self.name(from.node)?
            )));
        }
        if self.upstream(consumer, input)?.is_some() {
            return Err(Error::BadWiring(format!(
                "input {input} of '{}' is already bound",
                self.name(consumer)?
            )));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            producer = %from,
            consumer = %consumer,
            input,
            "bind"
        );

        self.slot_mut(from.node)?.downstream[from.port] = Some(Endpoint::new(consumer, input));
        self.slot_mut(consumer)?.upstream[input] = Some(from);
        Ok(())
    }

    /// Every bound edge, ordered by producer.
    pub fn edges(&self) -> Vec<Edge> {
        let mut out = Vec::new();
        for (i, slot) in self.nodes.iter().enumerate() {
            for (port, to) in slot.downstream.iter().enumerate() {
                if let Some(to) = to {
                    out.push(Edge {
                        from: Endpoint::new(NodeId::new(i as u32), port),
                        to: *to,
                    });
                }
            }
        }
        out
    }

    fn dispatch<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut dyn Hose, &mut Ports<'_>) -> Result<R>,
    ) -> Result<R> {
        let slot = self.slot_mut(id)?;
        let mut hose = match slot.hose.take() {
            Some(h) => h,
            None => {
                return Err(Error::BadWiring(format!(
                    "cycle detected: '{}' ({id}) re-entered while active",
                    slot.name
                )))
            }
        };
        let result = {
            let mut ports = Ports { graph: self, me: id };
            f(hose.as_mut(), &mut ports)
        };
        if let Some(slot) = self.nodes.get_mut(id.index()) {
            slot.hose = Some(hose);
        }
        result
    }

    /// Pull the next value produced on `from`.
    pub fn pull(&mut self, from: Endpoint) -> Result<Option<SeriesValue>> {
        self.downstream(from.node, from.port)?;
        self.dispatch(from.node, |hose, ports| hose.pull_value(from.port, ports))
    }

    /// Push `value` into `input` of `id`.
    pub fn push(&mut self, id: NodeId, input: usize, value: SeriesValue) -> Result<()> {
        let to = self.route(id, input)?;
        self.dispatch(to.node, |hose, ports| hose.push_value(value, to.port, ports))
    }

    /// Signal that the producer feeding `input` of `id` has ended.
    pub fn terminate(&mut self, id: NodeId, input: usize) -> Result<()> {
        let to = self.route(id, input)?;
        self.dispatch(to.node, |hose, ports| hose.terminate_stream(to.port, ports))
    }

    /// False for unknown nodes and for nodes currently mid-call.
    pub fn is_terminated(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.index())
            .and_then(|slot| slot.hose.as_ref())
            .map_or(false, |hose| hose.is_terminated())
    }
}

/// A node's view of its own edges during one `pull_value`/`push_value`/`terminate_stream` call.
pub struct Ports<'g> {
    graph: &'g mut Graph,
    me: NodeId,
}

impl Ports<'_> {
    pub fn id(&self) -> NodeId {
        self.me
    }

    /// Pull from whatever feeds `input`. Unbound inputs are a wiring error.
    pub fn pull(&mut self, input: usize) -> Result<Option<SeriesValue>> {
        match self.graph.upstream(self.me, input)? {
            Some(from) => self.graph.pull(from),
            None => Err(Error::BadWiring(format!(
                "input {input} of '{}' is not bound",
                self.graph.name(self.me)?
            ))),
        }
    }

    /// Push to whatever `output` feeds; a no-op when nothing is bound there.
    pub fn push(&mut self, output: usize, value: SeriesValue) -> Result<()> {
        match self.graph.downstream(self.me, output)? {
            Some(to) => self.graph.push(to.node, to.port, value),
            None => Ok(()),
        }
    }

    /// Forward end-of-stream on `output`; a no-op when nothing is bound there.
    pub fn terminate(&mut self, output: usize) -> Result<()> {
        match self.graph.downstream(self.me, output)? {
            Some(to) => self.graph.terminate(to.node, to.port),
            None => Ok(()),
        }
    }

    /// Whether the producer feeding `input` reports itself terminated.
    pub fn upstream_terminated(&self, input: usize) -> bool {
        match self.graph.upstream(self.me, input) {
            Ok(Some(from)) => self.graph.is_terminated(from.node),
            _ => false,
        }
    }

    /// The whole graph, for nodes that drive an inner subgraph.
    pub fn graph(&mut self) -> &mut Graph {
        self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{Passthrough, Simple};
    use crate::testing::VecSource;

    #[test]
    fn bind_records_both_directions() {
        let mut g = Graph::new();
        let src = g.add_node(Simple::new(VecSource::longs("src", &[1, 2])));
        let pass = g.add_node(Simple::new(Passthrough::new()));
        g.bind(Endpoint::new(src, 0), pass, 0).unwrap();

        assert_eq!(g.downstream(src, 0).unwrap(), Some(Endpoint::new(pass, 0)));
        assert_eq!(g.upstream(pass, 0).unwrap(), Some(Endpoint::new(src, 0)));
        assert_eq!(g.edges().len(), 1);
    }

    #[test]
    fn double_bind_is_rejected_without_side_effects() {
        let mut g = Graph::new();
        let src = g.add_node(Simple::new(VecSource::longs("src", &[1])));
        let a = g.add_node(Simple::new(Passthrough::new()));
        let b = g.add_node(Simple::new(Passthrough::new()));
        g.bind(Endpoint::new(src, 0), a, 0).unwrap();

        let err = g.bind(Endpoint::new(src, 0), b, 0).unwrap_err();
        assert!(matches!(err, Error::BadWiring(_)));
        assert_eq!(g.upstream(b, 0).unwrap(), None);
        assert!(g.bind(Endpoint::new(src, 1), b, 0).is_err());
    }

    #[test]
    fn pull_walks_the_chain() {
        let mut g = Graph::new();
        let src = g.add_node(Simple::new(VecSource::longs("src", &[7, 8])));
        let pass = g.add_node(Simple::new(Passthrough::new()));
        g.bind(Endpoint::new(src, 0), pass, 0).unwrap();

        let out = Endpoint::new(pass, 0);
        assert_eq!(g.pull(out).unwrap().unwrap().as_long().unwrap(), 7);
        assert_eq!(g.pull(out).unwrap().unwrap().as_long().unwrap(), 8);
        assert!(g.pull(out).unwrap().is_none());
        assert!(g.is_terminated(pass));
    }

    #[test]
    fn unbound_input_is_a_wiring_error() {
        let mut g = Graph::new();
        let pass = g.add_node(Simple::new(Passthrough::new()));
        assert!(matches!(
            g.pull(Endpoint::new(pass, 0)),
            Err(Error::BadWiring(_))
        ));
    }

    #[test]
    fn cycles_fail_instead_of_recursing() {
        let mut g = Graph::new();
        let a = g.add_node(Simple::new(Passthrough::new()));
        let b = g.add_node(Simple::new(Passthrough::new()));
        g.bind(Endpoint::new(a, 0), b, 0).unwrap();
        g.bind(Endpoint::new(b, 0), a, 0).unwrap();
        let err = g.pull(Endpoint::new(b, 0)).unwrap_err();
        assert!(err.to_string().contains("cycle"));
        // both nodes are back in place after the failed call
        assert!(!g.is_terminated(a));
        assert_eq!(g.name(a).unwrap(), "arg");
    }
}
