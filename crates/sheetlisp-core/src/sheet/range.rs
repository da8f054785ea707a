//! Rectangular ranges of cells.
//!
//! A formula names a range either as the identifier `A1:B2` (resolved by the
//! evaluator's cell fallback) or with the `:` form, whose corners may be
//! coordinate symbols, strings or expressions producing strings:
//! `(: A1 B2)`, `(: "A1" "B2")`, `(: (+ col "1") "B2")`.
//! Values come back column-major: A1, A2, B1, B2.

use super::Sheet;
use sheetlisp_engine::engine::{
    Atom, CellRange, CellRef, CellResolver, Engine, Env, EvalError, EvalResult, Interpreter,
    Value, format_value,
};

pub(crate) fn register_range_special(engine: &mut Engine) {
    engine.register_special(":", range_form);
}

fn range_form(args: &[Atom], env: &Env, interp: &Interpreter<'_>) -> EvalResult<Value> {
    let [from, to] = args else {
        return Err(EvalError::arity(":", "2", args.len()));
    };
    let from = corner(from, env, interp)?;
    let to = corner(to, env, interp)?;
    let range = parse_range(&from, &to)?;
    match interp.cells() {
        Some(cells) => cells.range_values(&range).map(Value::List),
        None => Err(EvalError::Validation(format!(
            "range {range} needs a cell store"
        ))),
    }
}

/// A corner key: coordinate symbols are taken literally, anything else is
/// evaluated and its display form used as the key.
fn corner(atom: &Atom, env: &Env, interp: &Interpreter<'_>) -> EvalResult<String> {
    if let Atom::Symbol(name) = atom
        && CellRef::from_symbol(name).is_some()
    {
        return Ok(name.clone());
    }
    match interp.eval(atom, env)? {
        Value::Str(key) | Value::Symbol(key) => Ok(key),
        other => Ok(format_value(&other)),
    }
}

fn parse_range(from: &str, to: &str) -> EvalResult<CellRange> {
    CellRange::from_corners(from.trim(), to.trim())
        .ok_or_else(|| EvalError::InvalidRange(format!("(: {from} {to})")))
}

impl Sheet {
    /// Values of the cells between two corner keys, column-major.
    pub fn resolve_range(&self, from: &str, to: &str) -> EvalResult<Vec<Value>> {
        let range = parse_range(from, to)?;
        self.range_values(&range)
    }
}
