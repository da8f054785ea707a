//! Expression language API.

mod atom;
mod cell_ref;
mod cycle;
mod deps;
mod env;
mod error;
mod eval;
mod format;
mod parser;
mod special;
mod value;

pub use atom::Atom;
pub use cell_ref::{CellRange, CellRef, cell_key, col_from_letters};
pub use cycle::detect_cycle;
pub use deps::{MAX_DEPENDENCY_RANGE_CELLS, extract_dependencies};
pub use env::{Captured, Env, Scope};
pub use error::{EvalError, EvalResult, ParseError};
pub use eval::{
    Bindings, CellResolver, Engine, EvalOptions, Interpreter, MAX_EVAL_DEPTH, check_range_size,
    create_engine, evaluate,
};
pub use format::{format_number, format_result, format_value};
pub use parser::{MAX_PARSE_DEPTH, ParserOptions, parse, parse_all, parse_with};
pub use special::{SpecialForm, SpecialForms, SpecialHandler};
pub use value::{Builtin, Lambda, Macro, NativeFn, Resource, Value};
