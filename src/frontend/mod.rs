/**
 * Source-to-AST front end: a `pest` grammar plus the `Pair` tree walk that
 * turns a parse into `ast::Stmt`/`ast::Expr` nodes.
 */

pub mod parser;

pub use parser::{parse_program, read_source, Rule};
