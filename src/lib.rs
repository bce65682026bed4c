//! condconf: parser, simplifier and evaluator for conditional config files.
//!
//! A unit consists of an optional block of variable assignments followed by
//! a configuration body: some unconditional lines, then any number of
//! sections, each guarded by a predicate. Predicates support:
//!
//! - `or` / `and` with short-circuit, value-returning semantics.
//! - `not`.
//! - `==`, `!=` and `in` (list membership or substring).
//! - String, boolean and list literals, variables and parentheses.
//!
//! Turning raw text into tokens is out of scope: callers supply any
//! [`TokenSource`], for example a [`TokenStream`] over their lexer's output.
//!
//! ```text
//! tokens ─▶ parse ─▶ Root ─▶ Root::render(context) ─▶ lines
//!                      └───▶ undefined_variables(node, known)
//! ```
//!
//! A parsed [`Root`] is immutable and can be evaluated any number of times,
//! from any number of threads, against different contexts.

pub mod ast;
pub mod error;
pub mod eval;
pub mod lookahead;
pub mod parser;
pub mod simplify;
mod stack;
pub mod token;

pub use ast::{
    Assignment, BinaryTest, Config, Expr, Operands, Root, Section, VarAssignments, Variable,
};
pub use error::{Error, EvalError, ParseError, TypeError};
pub use eval::{evaluate, undefined_variables, Context, References, Value};
pub use parser::{parse, parse_with, ParseOptions, Parser};
pub use simplify::{simplify, simplify_root};
pub use token::{Position, Token, TokenKind, TokenSource, TokenStream};

/// Parse `source` and render it against `context` in one step.
pub fn render<S: TokenSource>(source: S, context: &Context) -> Result<Vec<String>, Error> {
    let root = parse(source)?;
    Ok(root.render(context)?)
}
