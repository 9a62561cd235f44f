//! The series program language: tokens, syntax tree, parser.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{Expr, Header, Param, ParamType, Script, Statement};
pub use parser::parse;
