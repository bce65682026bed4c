//! Error types for parsing and evaluation.
//!
//! Everything here is terminal: the first error aborts the parse or the
//! evaluation and is handed back to the caller unchanged.

use thiserror::Error;

use crate::token::{Position, TokenKind};

/// Syntactic failure while building the tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{position}: expected {expected}, found {found}")]
    UnexpectedToken {
        position: Position,
        expected: String,
        found: TokenKind,
    },
    #[error("{position}: unexpected end of input, expected {expected}")]
    UnexpectedEof { position: Position, expected: String },
}

impl ParseError {
    pub fn position(&self) -> Position {
        match self {
            ParseError::UnexpectedToken { position, .. }
            | ParseError::UnexpectedEof { position, .. } => *position,
        }
    }

    pub fn expected(&self) -> &str {
        match self {
            ParseError::UnexpectedToken { expected, .. }
            | ParseError::UnexpectedEof { expected, .. } => expected,
        }
    }
}

/// A value had the wrong shape for the operation applied to it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TypeError {
    message: String,
}

impl TypeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Semantic failure while evaluating an expression against a context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("{position}: undefined variable `{name}`")]
    UndefinedVariable { name: String, position: Position },
    #[error("{position}: right-hand side of `in` is not a container")]
    InTestType {
        position: Position,
        #[source]
        source: TypeError,
    },
}

impl EvalError {
    pub fn position(&self) -> Position {
        match self {
            EvalError::UndefinedVariable { position, .. }
            | EvalError::InTestType { position, .. } => *position,
        }
    }
}

/// Either stage failing, for callers that parse and render in one go.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}
