//! Syntax tree for series programs.

use std::fmt;

use serfun_operators::Selector;

/// Declared type of a program parameter. An omitted type means `Stream`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Stream,
    Long,
    Decimal,
    String,
    Boolean,
}

impl ParamType {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "stream" => Some(ParamType::Stream),
            "long" => Some(ParamType::Long),
            "decimal" => Some(ParamType::Decimal),
            "string" => Some(ParamType::String),
            "boolean" => Some(ParamType::Boolean),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            ParamType::Stream => "stream",
            ParamType::Long => "long",
            ParamType::Decimal => "decimal",
            ParamType::String => "string",
            ParamType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub ty: ParamType,
    pub name: String,
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ty, self.name)
    }
}

/// `( outputs ) <- name( inputs )`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub outputs: Vec<Param>,
    pub inputs: Vec<Param>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Long(i64),
    Decimal(f64),
    Str(String),
    /// `@authority:path`
    StreamRef { authority: String, path: String },
    Var(String),
    Call { name: String, args: Vec<Expr> },
    Select { base: Box<Expr>, selector: Selector },
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Long(n) => write!(f, "{n}"),
            Expr::Decimal(d) => write!(f, "{d:?}"),
            Expr::Str(s) => write!(f, "{s:?}"),
            Expr::StreamRef { authority, path } => write!(f, "@{authority}:{path}"),
            Expr::Var(name) => f.write_str(name),
            Expr::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Expr::Select { base, selector } => write!(f, "{base}{selector}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub target: String,
    pub expr: Expr,
    /// 1-based source line of the target.
    pub line: usize,
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <- {};", self.target, self.expr)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub header: Header,
    pub statements: Vec<Statement>,
}
