//! Runtime values produced by evaluation.

use std::fmt;
use std::sync::Arc;

use super::atom::Atom;
use super::env::Captured;
use super::error::{EvalError, EvalResult};
use super::eval::Interpreter;
use super::format::format_value;

/// Signature of functions implemented in Rust.
///
/// Builtins receive the running [`Interpreter`] so they can call back into
/// user functions (see `∘`).
pub type NativeFn = dyn Fn(&Interpreter<'_>, Vec<Value>) -> EvalResult<Value> + Send + Sync;

/// An opaque handle owned by a value, e.g. a live external resource.
///
/// `dispose` is the hook the cell store calls when a cell holding the
/// value is replaced, cleared or invalidated.
pub trait Resource: Send + Sync {
    fn type_name(&self) -> &str;

    fn describe(&self) -> String {
        format!("#<{}>", self.type_name())
    }

    fn dispose(&self) {}
}

#[derive(Clone)]
pub enum Value {
    /// The absent value: unbound symbols, empty `do`, missing arguments.
    Undefined,
    Bool(bool),
    Number(f64),
    Str(String),
    /// A symbol as data (the result of quoting).
    Symbol(String),
    List(Vec<Value>),
    Builtin(Builtin),
    Lambda(Arc<Lambda>),
    Macro(Arc<Macro>),
    Native(Arc<dyn Resource>),
}

#[derive(Clone)]
pub struct Builtin {
    pub name: String,
    pub func: Arc<NativeFn>,
}

impl Builtin {
    pub fn new<F>(name: impl Into<String>, func: F) -> Builtin
    where
        F: Fn(&Interpreter<'_>, Vec<Value>) -> EvalResult<Value> + Send + Sync + 'static,
    {
        Builtin {
            name: name.into(),
            func: Arc::new(func),
        }
    }
}

/// A user function closing over its defining environment.
pub struct Lambda {
    pub params: Vec<String>,
    pub body: Arc<Atom>,
    pub env: Captured,
}

/// A user macro: its parameters bind the unevaluated argument trees.
pub struct Macro {
    pub name: String,
    pub params: Vec<String>,
    pub body: Arc<Atom>,
    pub env: Captured,
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false) | Value::Undefined)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Builtin(_) | Value::Lambda(_) | Value::Macro(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::Builtin(_) | Value::Lambda(_) => "function",
            Value::Macro(_) => "macro",
            Value::Native(_) => "native",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Convert data back into code, as needed when a macro's expansion is
    /// evaluated.
    pub fn to_atom(&self) -> EvalResult<Atom> {
        match self {
            Value::Symbol(name) => Ok(Atom::Symbol(name.clone())),
            Value::Str(text) => Ok(Atom::Str(text.clone())),
            Value::Bool(true) => Ok(Atom::symbol("t")),
            Value::Bool(false) => Ok(Atom::symbol("nil")),
            Value::Number(n) if n.is_finite() && *n < 0.0 => Ok(Atom::list([
                Atom::symbol("-"),
                Atom::Symbol((-n).to_string()),
            ])),
            Value::Number(n) if n.is_finite() => Ok(Atom::Symbol(n.to_string())),
            Value::List(items) => items.iter().map(Value::to_atom).collect::<EvalResult<_>>().map(Atom::List),
            other => Err(EvalError::Syntax(format_value(other))),
        }
    }

    /// Release any resources reachable from this value.
    pub fn dispose(&self) {
        match self {
            Value::Native(resource) => resource.dispose(),
            Value::List(items) => items.iter().for_each(Value::dispose),
            _ => {}
        }
    }
}

/// Quoting turns syntax into data without evaluating it.
impl From<&Atom> for Value {
    fn from(atom: &Atom) -> Self {
        match atom {
            Atom::Symbol(name) => Value::Symbol(name.clone()),
            Atom::Str(text) => Value::Str(text.clone()),
            Atom::List(items) => Value::List(items.iter().map(Value::from).collect()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Builtin(a), Value::Builtin(b)) => Arc::ptr_eq(&a.func, &b.func),
            (Value::Lambda(a), Value::Lambda(b)) => {
                Arc::ptr_eq(&a.body, &b.body) && a.env.same_frame(&b.env)
            }
            (Value::Macro(a), Value::Macro(b)) => {
                Arc::ptr_eq(&a.body, &b.body) && a.env.same_frame(&b.env)
            }
            (Value::Native(a), Value::Native(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "Undefined"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Symbol(s) => write!(f, "Symbol({s})"),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Builtin(b) => write!(f, "Builtin({})", b.name),
            Value::Lambda(l) => write!(f, "Lambda(params={:?}, body={})", l.params, l.body),
            Value::Macro(m) => write!(f, "Macro({})", m.name),
            Value::Native(r) => write!(f, "Native({})", r.type_name()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_value(self))
    }
}
