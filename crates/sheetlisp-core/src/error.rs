//! Error types for the sheetlisp cell store.

use thiserror::Error;

use sheetlisp_engine::engine::EvalError;

#[derive(Error, Debug)]
pub enum SheetError {
    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("Invalid cell reference: {0}")]
    InvalidCellRef(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A library file failed to parse or evaluate.
    #[error("Error in library {path}: {message}")]
    Prelude { path: String, message: String },
}

pub type Result<T> = std::result::Result<T, SheetError>;
