//! Error types for parsing and evaluation.

use thiserror::Error;

use super::cell_ref::CellRef;

/// Malformed source text. Line and column are 1-based.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Syntax error: {message} (line {line}, column {col})")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

/// Errors raised while evaluating an expression.
///
/// Errors are `Clone` because the cell store keeps a failed evaluation as the
/// cell's value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The head of a list did not evaluate to something callable.
    #[error("{0} is not a function")]
    NotCallable(String),

    /// A special form received structurally invalid arguments.
    #[error("{0}")]
    Validation(String),

    #[error("Type error: {0}")]
    Type(String),

    #[error("{name} expected {expected} arguments, got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },

    #[error("invalid range {0}")]
    InvalidRange(String),

    #[error("circular reference: {}", format_path(.0))]
    Cycle(Vec<CellRef>),

    /// A referenced cell holds an error.
    #[error("{cell}: {message}")]
    Cell { cell: CellRef, message: String },

    /// A macro expansion produced a value that has no source form.
    #[error("cannot convert {0} back into code")]
    Syntax(String),
}

impl EvalError {
    pub fn arity(name: &str, expected: impl Into<String>, got: usize) -> Self {
        EvalError::Arity {
            name: name.to_string(),
            expected: expected.into(),
            got,
        }
    }
}

fn format_path(path: &[CellRef]) -> String {
    path.iter()
        .map(|cell| cell.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

pub type EvalResult<T> = std::result::Result<T, EvalError>;
