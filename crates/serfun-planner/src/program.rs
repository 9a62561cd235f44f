//! Compiled programs and their instantiation.
//!
//! `compile` parses a script and checks every name against the registry it is given:
//! variables must be declared before use and at most once, functions must be
//! registered, and every declared output must be assigned. The resulting `Program`
//! is an immutable template. Each `make`/`instantiate` call walks its statements
//! again and wires a fresh set of nodes, ending in a `Runner`, into the caller's graph.

use std::collections::HashMap;
use std::fmt;

use serfun_core::error::{Error, Result};
use serfun_core::NodeId;
use serfun_operators::{Graph, HoseArg, HoseFactory, Passthrough, Registry, Simple};

use crate::dsl::{parse, Expr, Param, ParamType, Script, Statement};
use crate::runner::Runner;

/// Name → link table scoped to one compilation or one instantiation.
struct Links<T> {
    table: HashMap<String, T>,
}

impl<T: Clone> Links<T> {
    fn new() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    fn add_link(&mut self, name: &str, link: T) -> Result<()> {
        if self.table.contains_key(name) {
            return Err(Error::Compile(format!(
                "duplicate variable declaration '{name}'"
            )));
        }
        self.table.insert(name.to_string(), link);
        Ok(())
    }

    fn get_link(&self, name: &str) -> Result<T> {
        self.table
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Compile(format!("unknown variable '{name}'")))
    }
}

fn at_line(line: usize, err: Error) -> Error {
    match err {
        Error::Compile(msg) => Error::Compile(format!("line {line}: {msg}")),
        other => other,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    name: String,
    inputs: Vec<Param>,
    outputs: Vec<Param>,
    statements: Vec<Statement>,
}

/// Parse `source` and check it against `registry`.
pub fn compile(source: &str, registry: &Registry) -> Result<Program> {
    let program = Program::from(parse(source)?);
    program.check(registry)?;

    #[cfg(feature = "tracing")]
    tracing::debug!(
        program = %program.name,
        inputs = program.inputs.len(),
        outputs = program.outputs.len(),
        statements = program.statements.len(),
        "compiled"
    );

    Ok(program)
}

impl From<Script> for Program {
    fn from(script: Script) -> Self {
        Self {
            name: script.header.name,
            inputs: script.header.inputs,
            outputs: script.header.outputs,
            statements: script.statements,
        }
    }
}

impl Program {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[Param] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Param] {
        &self.outputs
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    fn check(&self, registry: &Registry) -> Result<()> {
        let mut links = Links::new();
        for param in &self.inputs {
            links.add_link(&param.name, ())?;
        }
        let mut seen = Links::new();
        for param in &self.outputs {
            seen.add_link(&param.name, ())?;
        }
        for stmt in &self.statements {
            check_expr(&stmt.expr, &links, registry).map_err(|e| at_line(stmt.line, e))?;
            links
                .add_link(&stmt.target, ())
                .map_err(|e| at_line(stmt.line, e))?;
        }
        for param in &self.outputs {
            links.get_link(&param.name).map_err(|_| {
                Error::Compile(format!(
                    "output '{}' of '{}' is never assigned",
                    param.name, self.name
                ))
            })?;
        }
        Ok(())
    }

    /// Wire a runner whose inputs are bound to `args`, positionally.
    pub fn instantiate(
        &self,
        args: Vec<HoseArg>,
        graph: &mut Graph,
        registry: &Registry,
    ) -> Result<NodeId> {
        if args.len() != self.inputs.len() {
            return Err(Error::ArityOrType(format!(
                "'{}' expects {} argument(s), got {}",
                self.name,
                self.inputs.len(),
                args.len()
            )));
        }
        for (param, arg) in self.inputs.iter().zip(&args) {
            check_arg(&self.name, param, arg)?;
        }
        self.wire(args.into_iter().map(Some).collect(), graph, registry)
    }

    /// Wire a runner with every stream input left open for pushing.
    ///
    /// Only programs whose inputs are all streams can be opened this way.
    pub fn instantiate_open(&self, graph: &mut Graph, registry: &Registry) -> Result<NodeId> {
        self.wire(vec![None; self.inputs.len()], graph, registry)
    }

    fn wire(
        &self,
        args: Vec<Option<HoseArg>>,
        graph: &mut Graph,
        registry: &Registry,
    ) -> Result<NodeId> {
        let mut links = Links::new();
        let mut placeholders = Vec::with_capacity(self.inputs.len());
        for (param, arg) in self.inputs.iter().zip(args) {
            match (param.ty, arg) {
                (ParamType::Stream, arg) => {
                    let entry = graph.add_node(Simple::new(Passthrough::new()));
                    if let Some(arg) = arg {
                        arg.bind_to(graph, entry, 0)?;
                    }
                    links.add_link(&param.name, HoseArg::stream(entry))?;
                    placeholders.push(Some(entry));
                }
                (_, Some(arg)) => {
                    links.add_link(&param.name, arg)?;
                    placeholders.push(None);
                }
                (ty, None) => {
                    return Err(Error::ArityOrType(format!(
                        "{ty} parameter '{}' of '{}' needs a value",
                        param.name, self.name
                    )))
                }
            }
        }

        for stmt in &self.statements {
            let value = eval(&stmt.expr, &links, graph, registry).map_err(|e| at_line(stmt.line, e))?;
            links
                .add_link(&stmt.target, value)
                .map_err(|e| at_line(stmt.line, e))?;
        }

        let runner = graph.add_node(Runner::new(
            self.name.clone(),
            self.inputs.iter().map(|p| p.name.clone()).collect(),
            self.outputs.iter().map(|p| p.name.clone()).collect(),
            placeholders,
        ));
        let returns = self.inputs.len();
        for (j, param) in self.outputs.iter().enumerate() {
            match links.get_link(&param.name)? {
                HoseArg::Stream(ep) => graph.bind(ep, runner, returns + j)?,
                HoseArg::Scalar(v) => {
                    return Err(Error::BadWiring(format!(
                        "output '{}' of '{}' is the {} constant '{v}', not a stream",
                        param.name,
                        self.name,
                        v.kind()
                    )))
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(program = %self.name, runner = %runner, nodes = graph.len(), "instantiated");

        Ok(runner)
    }
}

impl HoseFactory for Program {
    fn make(&self, args: Vec<HoseArg>, graph: &mut Graph, registry: &Registry) -> Result<NodeId> {
        self.instantiate(args, graph, registry)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = |params: &[Param]| {
            params
                .iter()
                .map(Param::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        writeln!(
            f,
            "({}) <- {}({})",
            list(&self.outputs),
            self.name,
            list(&self.inputs)
        )?;
        for stmt in &self.statements {
            writeln!(f, "  {stmt}")?;
        }
        Ok(())
    }
}

fn check_arg(program: &str, param: &Param, arg: &HoseArg) -> Result<()> {
    let ok = match (param.ty, arg) {
        (ParamType::Stream, HoseArg::Stream(_)) => true,
        (ParamType::Long, HoseArg::Scalar(v)) => v.is_long(),
        (ParamType::Decimal, HoseArg::Scalar(v)) => v.is_number(),
        (ParamType::String, HoseArg::Scalar(v)) => v.is_string(),
        (ParamType::Boolean, HoseArg::Scalar(v)) => v.is_boolean(),
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(Error::ArityOrType(format!(
            "parameter '{}' of '{program}' is {}, got {}",
            param.name,
            param.ty,
            arg.kind()
        )))
    }
}

fn check_expr(expr: &Expr, links: &Links<()>, registry: &Registry) -> Result<()> {
    match expr {
        Expr::Long(_) | Expr::Decimal(_) | Expr::Str(_) => Ok(()),
        Expr::StreamRef { .. } => known_function("load", registry),
        Expr::Var(name) => links.get_link(name),
        Expr::Call { name, args } => {
            known_function(name, registry)?;
            args.iter().try_for_each(|arg| check_expr(arg, links, registry))
        }
        Expr::Select { base, .. } => check_expr(base, links, registry),
    }
}

fn known_function(name: &str, registry: &Registry) -> Result<()> {
    if registry.contains(name) {
        Ok(())
    } else {
        Err(Error::Compile(format!("unknown function '{name}'")))
    }
}

fn eval(
    expr: &Expr,
    links: &Links<HoseArg>,
    graph: &mut Graph,
    registry: &Registry,
) -> Result<HoseArg> {
    match expr {
        Expr::Long(n) => Ok(HoseArg::scalar(*n)),
        Expr::Decimal(d) => Ok(HoseArg::scalar(*d)),
        Expr::Str(s) => Ok(HoseArg::scalar(s.as_str())),
        Expr::StreamRef { authority, path } => {
            let args = vec![
                HoseArg::scalar(authority.as_str()),
                HoseArg::scalar(path.as_str()),
            ];
            registry.call("load", args, graph).map(HoseArg::stream)
        }
        Expr::Var(name) => links.get_link(name),
        Expr::Call { name, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval(arg, links, graph, registry)?);
            }
            registry.call(name, values, graph).map(HoseArg::stream)
        }
        Expr::Select { base, selector } => {
            eval(base, links, graph, registry)?.select(graph, selector)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serfun_core::{Endpoint, SeriesValue};
    use serfun_io::{MemorySeriesStore, SeriesStore};
    use serfun_operators::testing::{Collector, VecSource};

    use super::*;

    fn setup() -> (Arc<MemorySeriesStore>, Registry) {
        let store = Arc::new(MemorySeriesStore::new());
        let registry = Registry::with_builtins(store.clone(), 1000).unwrap();
        (store, registry)
    }

    fn source(graph: &mut Graph, values: &[i64]) -> HoseArg {
        HoseArg::stream(graph.add_node(Simple::new(VecSource::longs("src", values))))
    }

    fn drain(graph: &mut Graph, from: Endpoint) -> Vec<f64> {
        let mut out = Vec::new();
        while let Some(v) = graph.pull(from).unwrap() {
            out.push(v.as_double().unwrap());
        }
        out
    }

    fn compile_err(src: &str) -> String {
        let (_, registry) = setup();
        match compile(src, &registry) {
            Err(Error::Compile(msg)) => msg,
            other => panic!("expected a compile error, got {other:?}"),
        }
    }

    #[test]
    fn name_errors_are_reported_at_compile_time() {
        assert!(compile_err("(o) <- p(x)\no <- x;\no <- x")
            .contains("line 3: duplicate variable declaration 'o'"));
        assert!(compile_err("(o) <- p(x)\no <- mavg(y, 2)").contains("unknown variable 'y'"));
        assert!(compile_err("(o) <- p(x)\no <- smooth(x)").contains("unknown function 'smooth'"));
        assert!(compile_err("(o) <- p(x)\ntmp <- x").contains("output 'o' of 'p' is never assigned"));
        assert!(compile_err("(o) <- p(x, x)\no <- x").contains("duplicate variable declaration 'x'"));
    }

    #[test]
    fn use_before_declaration_is_unknown() {
        let msg = compile_err("(o) <- p(x)\no <- total(t);\nt <- x");
        assert!(msg.contains("unknown variable 't'"), "{msg}");
    }

    #[test]
    fn runner_pulls_through_the_body() {
        let (_, registry) = setup();
        let program = compile("(o) <- smooth(x, long n)\no <- mavg(x, n)", &registry).unwrap();
        assert_eq!(program.inputs().len(), 2);

        let mut graph = Graph::new();
        let x = source(&mut graph, &[1, 2, 3, 4]);
        let runner = program
            .instantiate(vec![x, HoseArg::scalar(2i64)], &mut graph, &registry)
            .unwrap();

        assert_eq!(graph.name(runner).unwrap(), "smooth");
        assert_eq!(drain(&mut graph, Endpoint::new(runner, 0)), vec![1.5, 2.5, 3.5]);
        assert!(graph.is_terminated(runner));
    }

    #[test]
    fn stream_reference_loads_from_the_store() {
        let (store, registry) = setup();
        let points = (1..=3)
            .map(|i| SeriesValue::new(format!("d{i}"), i as f64))
            .collect::<Vec<_>>();
        store.add_points_to_series("acme/px", &points).unwrap();

        let program = compile("(o) <- p()\no <- total(@acme:px);", &registry).unwrap();
        let mut graph = Graph::new();
        let runner = program.instantiate(vec![], &mut graph, &registry).unwrap();
        assert_eq!(drain(&mut graph, Endpoint::new(runner, 0)), vec![1.0, 3.0, 6.0]);
    }

    #[test]
    fn programs_nest_and_outputs_are_selectable_by_name() {
        let (_, mut registry) = setup();
        let pair = compile(
            "(evens, sums) <- pair(x)\ns <- split(x, 2);\nevens <- sample(s[0], 2);\nsums <- total(s.out1)",
            &registry,
        )
        .unwrap();
        registry.register("pair", Arc::new(pair)).unwrap();

        let outer = compile("(o) <- outer(x)\no <- pair(x).sums", &registry).unwrap();
        let mut graph = Graph::new();
        let x = source(&mut graph, &[1, 2, 3]);
        let runner = outer.instantiate(vec![x], &mut graph, &registry).unwrap();
        assert_eq!(drain(&mut graph, Endpoint::new(runner, 0)), vec![1.0, 3.0, 6.0]);
    }

    #[test]
    fn each_instantiation_owns_its_nodes() {
        let (_, registry) = setup();
        let program = compile("(o) <- p(x)\no <- total(x)", &registry).unwrap();
        let mut graph = Graph::new();
        let a = source(&mut graph, &[1, 1]);
        let b = source(&mut graph, &[10, 10]);
        let ra = program.instantiate(vec![a], &mut graph, &registry).unwrap();
        let rb = program.instantiate(vec![b], &mut graph, &registry).unwrap();
        assert_eq!(drain(&mut graph, Endpoint::new(rb, 0)), vec![10.0, 20.0]);
        assert_eq!(drain(&mut graph, Endpoint::new(ra, 0)), vec![1.0, 2.0]);
    }

    #[test]
    fn open_runner_accepts_pushes() {
        let (_, registry) = setup();
        let program = compile("(o) <- p(x)\no <- total(x)", &registry).unwrap();
        let mut graph = Graph::new();
        let runner = program.instantiate_open(&mut graph, &registry).unwrap();
        let (sink, seen) = Collector::new();
        let sink = graph.add_node(Simple::new(sink));
        graph.bind(Endpoint::new(runner, 0), sink, 0).unwrap();

        for v in [1i64, 2, 3] {
            graph.push(runner, 0, SeriesValue::unkeyed(v)).unwrap();
        }
        assert!(!graph.is_terminated(runner));
        graph.terminate(runner, 0).unwrap();

        let totals = seen.values().iter().map(|v| v.as_long().unwrap()).collect::<Vec<_>>();
        assert_eq!(totals, vec![1, 3, 6]);
        assert_eq!(seen.terminations(), 1);
        assert!(graph.is_terminated(runner));
    }

    #[test]
    fn arguments_are_checked_against_parameters() {
        let (_, registry) = setup();
        let program = compile("(o) <- p(x, long n)\no <- mavg(x, n)", &registry).unwrap();
        let mut graph = Graph::new();
        let x = source(&mut graph, &[1]);

        let err = program
            .instantiate(vec![x.clone()], &mut graph, &registry)
            .unwrap_err();
        assert!(matches!(err, Error::ArityOrType(_)));
        let err = program
            .instantiate(vec![x, HoseArg::scalar("3")], &mut graph, &registry)
            .unwrap_err();
        assert!(err.to_string().contains("parameter 'n' of 'p' is long, got string"), "{err}");
        assert!(program.instantiate_open(&mut graph, &registry).is_err());
    }

    #[test]
    fn constant_outputs_are_a_wiring_error() {
        let (_, registry) = setup();
        let program = compile("(o) <- p()\no <- 5", &registry).unwrap();
        let err = program.instantiate(vec![], &mut Graph::new(), &registry).unwrap_err();
        assert!(matches!(err, Error::BadWiring(_)), "{err}");
    }

    #[test]
    fn selector_on_a_scalar_is_a_wiring_error() {
        let (_, registry) = setup();
        let program = compile("(o) <- p(x)\nk <- 'a'[1];\no <- x", &registry).unwrap();
        let mut graph = Graph::new();
        let x = source(&mut graph, &[1]);
        let err = program.instantiate(vec![x], &mut graph, &registry).unwrap_err();
        assert!(matches!(err, Error::BadWiring(_)), "{err}");
    }

    #[test]
    fn display_round_trips_through_the_parser() {
        let (_, registry) = setup();
        let src = "(o) <- p(x, decimal w)\ns <- split(x, 2);\no <- series2csv('A', s[0], 'B', s[1])";
        let program = compile(src, &registry).unwrap();
        let reparsed = compile(&program.to_string(), &registry).unwrap();
        assert_eq!(program, reparsed);
    }
}
