//! Tree-walking evaluation.
//!
//! [`Interpreter`] carries everything an evaluation needs besides the
//! environment: the special-form table, an optional [`CellResolver`] for
//! coordinate-like identifiers, and the depth limit. [`Engine`] bundles a
//! library environment, specials and parser options for embedders.

use std::cell::Cell;

use tracing::trace;

use super::atom::Atom;
use super::cell_ref::{CellRange, CellRef};
use super::deps::MAX_DEPENDENCY_RANGE_CELLS;
use super::env::{Env, Scope};
use super::error::{EvalError, EvalResult, ParseError};
use super::format::format_value;
use super::parser::{ParserOptions, parse_all, parse_with};
use super::special::{SpecialForms, SpecialHandler};
use super::value::{Macro, Value};

/// Maximum nesting of evaluations before giving up.
pub const MAX_EVAL_DEPTH: usize = 256;

/// Second-phase resolution for identifiers the environment does not bind.
///
/// The cell store implements this so that `B3` or `A1:B2` inside a formula
/// read other cells.
pub trait CellResolver {
    fn cell_value(&self, cell: &CellRef) -> EvalResult<Value>;

    /// Values of a range in column-major order.
    fn range_values(&self, range: &CellRange) -> EvalResult<Vec<Value>> {
        check_range_size(range)?;
        range.cells().map(|cell| self.cell_value(&cell)).collect()
    }
}

/// Reject ranges too large to walk.
pub fn check_range_size(range: &CellRange) -> EvalResult<()> {
    let count = range.cell_count();
    if count > MAX_DEPENDENCY_RANGE_CELLS {
        return Err(EvalError::InvalidRange(format!(
            "{range} ({count} cells, max {MAX_DEPENDENCY_RANGE_CELLS})"
        )));
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvalOptions {
    pub max_depth: usize,
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions {
            max_depth: MAX_EVAL_DEPTH,
        }
    }
}

pub struct Interpreter<'a> {
    specials: &'a SpecialForms,
    cells: Option<&'a dyn CellResolver>,
    options: EvalOptions,
    depth: Cell<usize>,
}

struct DepthGuard<'a>(&'a Cell<usize>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

impl<'a> Interpreter<'a> {
    pub fn new(specials: &'a SpecialForms) -> Self {
        Interpreter {
            specials,
            cells: None,
            options: EvalOptions::default(),
            depth: Cell::new(0),
        }
    }

    pub fn with_cells(mut self, cells: &'a dyn CellResolver) -> Self {
        self.cells = Some(cells);
        self
    }

    pub fn with_options(mut self, options: EvalOptions) -> Self {
        self.options = options;
        self
    }

    pub fn specials(&self) -> &SpecialForms {
        self.specials
    }

    pub fn cells(&self) -> Option<&'a dyn CellResolver> {
        self.cells
    }

    fn enter(&self) -> EvalResult<DepthGuard<'_>> {
        let depth = self.depth.get();
        if depth >= self.options.max_depth {
            return Err(EvalError::Validation(format!(
                "Evaluation depth limit exceeded (max: {})",
                self.options.max_depth
            )));
        }
        self.depth.set(depth + 1);
        Ok(DepthGuard(&self.depth))
    }

    pub fn eval(&self, atom: &Atom, env: &Env) -> EvalResult<Value> {
        let _guard = self.enter()?;
        trace!(expr = %atom, "eval");
        match atom {
            Atom::List(items) => self.eval_list(items, env),
            Atom::Str(text) => Ok(Value::Str(text.clone())),
            Atom::Symbol(name) => match atom.as_number() {
                Some(n) => Ok(Value::Number(n)),
                None => self.lookup(name, env),
            },
        }
    }

    fn eval_list(&self, items: &[Atom], env: &Env) -> EvalResult<Value> {
        let Some((head, tail)) = items.split_first() else {
            return Ok(Value::List(Vec::new()));
        };

        if let Atom::Symbol(name) = head
            && let Some(form) = self.specials.get(name)
        {
            trace!(special = %name, "dispatch");
            return form.apply(tail, env, self);
        }

        match self.eval(head, env)? {
            Value::Macro(mac) => self.expand(&mac, tail, env),
            callee @ (Value::Builtin(_) | Value::Lambda(_)) => {
                let args = tail
                    .iter()
                    .map(|arg| self.eval(arg, env))
                    .collect::<EvalResult<Vec<_>>>()?;
                self.apply(&callee, args)
            }
            _ => Err(EvalError::NotCallable(head.to_string())),
        }
    }

    /// Static environment first, then the cell store for coordinate-shaped
    /// names. Anything else unbound is [`Value::Undefined`].
    fn lookup(&self, name: &str, env: &Env) -> EvalResult<Value> {
        if let Some(value) = env.get(name) {
            return Ok(value);
        }
        if let Some(cells) = self.cells {
            if let Some(range) = CellRange::from_symbol(name) {
                return cells.range_values(&range).map(Value::List);
            }
            if let Some(cell) = CellRef::from_symbol(name) {
                return cells.cell_value(&cell);
            }
        }
        Ok(Value::Undefined)
    }

    /// Call a function value with already evaluated arguments.
    ///
    /// Lambda parameters bind by position in a child of the closure's
    /// environment; missing arguments are undefined and extras are ignored.
    pub fn apply(&self, func: &Value, args: Vec<Value>) -> EvalResult<Value> {
        match func {
            Value::Builtin(builtin) => (builtin.func)(self, args),
            Value::Lambda(lambda) => {
                let Some(captured) = lambda.env.env() else {
                    return Err(EvalError::Validation(
                        "closure outlived its environment".into(),
                    ));
                };
                let scope = Scope::child(&captured);
                let mut args = args.into_iter();
                for param in &lambda.params {
                    scope.define(param.clone(), args.next().unwrap_or(Value::Undefined));
                }
                self.eval(&lambda.body, &scope)
            }
            Value::Macro(mac) => Err(EvalError::NotCallable(format!(
                "macro {} applied to values",
                mac.name
            ))),
            other => Err(EvalError::NotCallable(format_value(other))),
        }
    }

    /// Two-stage macro expansion: evaluate the body with the parameters bound
    /// to the argument trees, then evaluate the result in the caller's
    /// environment.
    fn expand(&self, mac: &Macro, args: &[Atom], env: &Env) -> EvalResult<Value> {
        let Some(captured) = mac.env.env() else {
            return Err(EvalError::Validation(format!(
                "macro {} outlived its environment",
                mac.name
            )));
        };
        let scope = Scope::child(&captured);
        let mut args = args.iter();
        for param in &mac.params {
            let arg = args.next().map(Value::from).unwrap_or(Value::Undefined);
            scope.define(param.clone(), arg);
        }
        let expansion = self.eval(&mac.body, &scope)?.to_atom()?;
        trace!(name = %mac.name, expansion = %expansion, "expanded macro");
        self.eval(&expansion, env)
    }
}

/// A library environment, special-form table and parser settings bundled for
/// repeated evaluation.
pub struct Engine {
    env: Env,
    specials: SpecialForms,
    parser: ParserOptions,
    options: EvalOptions,
}

impl Engine {
    /// Default bindings, the standard special forms and default options.
    pub fn new() -> Self {
        Engine::with_parts(&Default::default(), &SpecialForms::empty())
    }

    /// Embedder bindings layered over the default environment and embedder
    /// specials layered over the standard table.
    pub fn with_parts(bindings: &Bindings, specials: &SpecialForms) -> Self {
        let env = Scope::extend(
            &crate::builtins::default_env(),
            bindings.iter().map(|(name, value)| (name.clone(), value.clone())),
        );
        Engine {
            env,
            specials: SpecialForms::standard().merged(specials),
            parser: ParserOptions::default(),
            options: EvalOptions::default(),
        }
    }

    pub fn with_parser_options(mut self, parser: ParserOptions) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_options(mut self, options: EvalOptions) -> Self {
        self.options = options;
        self
    }

    /// The shared library environment.
    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn specials(&self) -> &SpecialForms {
        &self.specials
    }

    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.env.define(name, value);
    }

    pub fn register_special<H>(&mut self, name: impl Into<String>, handler: H)
    where
        H: SpecialHandler + 'static,
    {
        self.specials.register(name, handler);
    }

    pub fn parse(&self, source: &str) -> Result<Atom, ParseError> {
        parse_with(source, &self.parser)
    }

    fn interpreter<'a>(&'a self, cells: Option<&'a dyn CellResolver>) -> Interpreter<'a> {
        let interp = Interpreter::new(&self.specials).with_options(self.options);
        match cells {
            Some(cells) => interp.with_cells(cells),
            None => interp,
        }
    }

    /// Evaluate a parsed tree in a fresh frame over the library environment,
    /// so `def` inside it stays local to this evaluation.
    pub fn eval_atom(&self, atom: &Atom, cells: Option<&dyn CellResolver>) -> EvalResult<Value> {
        let scope = Scope::child(&self.env);
        self.interpreter(cells).eval(atom, &scope)
    }

    pub fn eval(&self, source: &str) -> EvalResult<Value> {
        self.eval_with_cells(source, None)
    }

    pub fn eval_with_cells(
        &self,
        source: &str,
        cells: Option<&dyn CellResolver>,
    ) -> EvalResult<Value> {
        let atom = self.parse(source)?;
        self.eval_atom(&atom, cells)
    }

    /// Evaluate every top-level expression of `source` directly in the
    /// library environment, returning the last value.
    pub fn load(&self, source: &str) -> EvalResult<Value> {
        let exprs = parse_all(source, &self.parser)?;
        let interp = self.interpreter(None);
        let mut last = Value::Undefined;
        for expr in &exprs {
            last = interp.eval(expr, &self.env)?;
        }
        Ok(last)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Embedder-supplied name/value bindings.
pub type Bindings = std::collections::HashMap<String, Value>;

/// Create an engine with the default bindings and standard special forms.
pub fn create_engine() -> Engine {
    Engine::new()
}

/// Parse and evaluate `source` with `bindings` over the default environment
/// and `specials` over the standard special forms.
pub fn evaluate(source: &str, bindings: &Bindings, specials: &SpecialForms) -> EvalResult<Value> {
    Engine::with_parts(bindings, specials).eval(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str) -> EvalResult<Value> {
        create_engine().eval(source)
    }

    fn num(source: &str) -> f64 {
        match eval(source) {
            Ok(Value::Number(n)) => n,
            other => panic!("expected a number from {source}, got {other:?}"),
        }
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(num("(+ 1 2 3)"), 6.0);
        assert_eq!(num("(* 2 (- 5 1))"), 8.0);
        assert_eq!(num(".5"), 0.5);
    }

    #[test]
    fn test_if_uses_canonical_booleans() {
        assert_eq!(num("(if t 1 2)"), 1.0);
        assert_eq!(num("(if nil 1 2)"), 2.0);
        assert_eq!(num("(if 0 1 2)"), 1.0);
        assert_eq!(num("(if undefined-name 1 2)"), 2.0);
        assert_eq!(eval("(if nil 1)").unwrap(), Value::Undefined);
    }

    #[test]
    fn test_lambda_application() {
        assert_eq!(num("((λ (x) (* x x)) 5)"), 25.0);
        assert_eq!(num("((lambda (a b) (- a b)) 7 2)"), 5.0);
    }

    #[test]
    fn test_lambda_closes_over_defining_environment() {
        let src = "(do (def make (λ (n) (λ (x) (+ x n)))) (def add2 (make 2)) (add2 40))";
        assert_eq!(num(src), 42.0);
    }

    #[test]
    fn test_lambda_missing_arguments_are_undefined() {
        assert_eq!(eval("((λ (a b) b) 1)").unwrap(), Value::Undefined);
    }

    #[test]
    fn test_lambda_rejects_non_symbol_params() {
        let err = eval("(λ (x 1 \"y\") x)").unwrap_err();
        assert!(matches!(err, EvalError::Validation(_)));
        assert!(matches!(eval("(λ x x)"), Err(EvalError::Validation(_))));
    }

    #[test]
    fn test_def_and_do() {
        assert_eq!(num("(do (def x 5) (* x x))"), 25.0);
        // A fresh evaluation does not see the previous definition.
        assert_eq!(eval("x").unwrap(), Value::Undefined);
        assert_eq!(eval("(do)").unwrap(), Value::Undefined);
    }

    #[test]
    fn test_def_requires_symbol() {
        assert!(matches!(eval("(def \"x\" 1)"), Err(EvalError::Validation(_))));
        assert!(matches!(eval("(def (x) 1)"), Err(EvalError::Validation(_))));
    }

    #[test]
    fn test_def_inside_lambda_is_local() {
        let src = "(do (def x 1) ((λ () (def x 2))) x)";
        assert_eq!(num(src), 1.0);
    }

    #[test]
    fn test_not_a_function() {
        let err = eval("(1 2)").unwrap_err();
        assert_eq!(err, EvalError::NotCallable("1".into()));
        assert!(err.to_string().contains("1 is not a function"));

        let err = eval("((+ 1 1) 2)").unwrap_err();
        assert_eq!(err.to_string(), "(+ 1 1) is not a function");
    }

    #[test]
    fn test_strings_and_symbols_evaluate_differently() {
        assert_eq!(eval("t").unwrap(), Value::Bool(true));
        assert_eq!(eval("\"t\"").unwrap(), Value::Str("t".into()));
        assert_eq!(eval("\"12\"").unwrap(), Value::Str("12".into()));
    }

    #[test]
    fn test_unbound_symbol_is_undefined() {
        assert_eq!(eval("nothing-here").unwrap(), Value::Undefined);
        // Coordinates without a sheet are plain unbound names.
        assert_eq!(eval("A1").unwrap(), Value::Undefined);
    }

    #[test]
    fn test_quote_returns_tree() {
        assert_eq!(
            eval("'(a \"b\")").unwrap(),
            Value::List(vec![Value::Symbol("a".into()), Value::Str("b".into())])
        );
        assert_eq!(eval("(quote x)").unwrap(), Value::Symbol("x".into()));
    }

    #[test]
    fn test_quasiquote_unquote() {
        assert_eq!(
            eval("`(a ,(+ 1 2) (b ,(* 2 2)))").unwrap(),
            Value::List(vec![
                Value::Symbol("a".into()),
                Value::Number(3.0),
                Value::List(vec![Value::Symbol("b".into()), Value::Number(4.0)]),
            ])
        );
        assert_eq!(eval("`,(+ 1 1)").unwrap(), Value::Number(2.0));
    }

    #[test]
    fn test_quasiquote_splicing() {
        assert_eq!(
            eval("`(1 ,@(list 2 3) 4)").unwrap(),
            Value::List(vec![
                Value::Symbol("1".into()),
                Value::Number(2.0),
                Value::Number(3.0),
                Value::Symbol("4".into()),
            ])
        );
        assert!(matches!(eval("`(,@5)"), Err(EvalError::Type(_))));
    }

    #[test]
    fn test_macro_expands_in_calling_environment() {
        let src = "(do
            (macro unless (c body) `(if ,c nil ,body))
            (def x 3)
            (unless (> x 5) (* x 2)))";
        assert_eq!(num(src), 6.0);
    }

    #[test]
    fn test_macro_receives_unevaluated_arguments() {
        let src = "(do (macro first-sym (a b) `(quote ,a)) (first-sym hello (this is not called)))";
        assert_eq!(eval(src).unwrap(), Value::Symbol("hello".into()));
    }

    #[test]
    fn test_empty_list_evaluates_to_empty_list() {
        assert_eq!(eval("()").unwrap(), Value::List(vec![]));
    }

    #[test]
    fn test_depth_limit() {
        let engine = create_engine().with_options(EvalOptions { max_depth: 16 });
        let err = engine
            .eval("(do (def f (λ (n) (f (+ n 1)))) (f 0))")
            .unwrap_err();
        assert!(err.to_string().contains("depth limit"));
    }

    #[test]
    fn test_parse_errors_surface() {
        assert!(matches!(eval("(+ 1"), Err(EvalError::Parse(_))));
    }

    fn when(args: &[Atom], env: &Env, interp: &Interpreter<'_>) -> EvalResult<Value> {
        match args {
            [cond, body] if interp.eval(cond, env)?.is_truthy() => interp.eval(body, env),
            _ => Ok(Value::Undefined),
        }
    }

    #[test]
    fn test_external_special_form() {
        let mut specials = SpecialForms::empty();
        specials.register("when", when);
        let mut bindings = Bindings::new();
        bindings.insert("answer".into(), Value::Number(42.0));

        assert_eq!(
            evaluate("(when t answer)", &bindings, &specials).unwrap(),
            Value::Number(42.0)
        );
        assert_eq!(
            evaluate("(when nil (1 2))", &bindings, &specials).unwrap(),
            Value::Undefined
        );
        // Standard forms are still present.
        assert_eq!(
            evaluate("(if t answer 0)", &bindings, &specials).unwrap(),
            Value::Number(42.0)
        );
    }

    #[test]
    fn test_load_defines_into_library() {
        let engine = create_engine();
        engine
            .load("(def square (λ (x) (* x x)))\n(def ten 10)")
            .unwrap();
        assert_eq!(engine.eval("(square ten)").unwrap(), Value::Number(100.0));
    }

    struct FixedCells;

    impl CellResolver for FixedCells {
        fn cell_value(&self, cell: &CellRef) -> EvalResult<Value> {
            Ok(Value::Number((cell.col * 10 + cell.row) as f64))
        }
    }

    #[test]
    fn test_cell_fallback_after_environment() {
        let engine = create_engine();
        let cells = FixedCells;
        assert_eq!(
            engine.eval_with_cells("B3", Some(&cells)).unwrap(),
            Value::Number(12.0)
        );
        assert_eq!(
            engine.eval_with_cells("A1:B2", Some(&cells)).unwrap(),
            Value::List(vec![
                Value::Number(0.0),
                Value::Number(1.0),
                Value::Number(10.0),
                Value::Number(11.0),
            ])
        );
        // Bound names win over the cell store.
        assert_eq!(
            engine
                .eval_with_cells("(do (def B3 1) B3)", Some(&cells))
                .unwrap(),
            Value::Number(1.0)
        );
    }

    #[test]
    fn test_oversized_range_is_rejected() {
        let engine = create_engine();
        let cells = FixedCells;
        assert!(matches!(
            engine.eval_with_cells("A1:ZZZZ99999999", Some(&cells)),
            Err(EvalError::InvalidRange(_))
        ));
        let limit = CellRange::parse("A1:A1000000").unwrap();
        assert!(check_range_size(&limit).is_ok());
        let over = CellRange::parse("A1:B500001").unwrap();
        assert!(check_range_size(&over).is_err());
    }
}
