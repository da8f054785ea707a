//! Special forms.
//!
//! A special form receives its argument trees unevaluated and decides what to
//! evaluate and in which environment. The table is passed explicitly to every
//! evaluation; embedders add their own forms through
//! [`SpecialForm::External`].

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use super::atom::Atom;
use super::env::{Captured, Env};
use super::error::{EvalError, EvalResult};
use super::eval::Interpreter;
use super::value::{Lambda, Macro, Value};

/// An embedder-supplied special form.
pub trait SpecialHandler: Send + Sync {
    fn call(&self, args: &[Atom], env: &Env, interp: &Interpreter<'_>) -> EvalResult<Value>;
}

impl<F> SpecialHandler for F
where
    F: Fn(&[Atom], &Env, &Interpreter<'_>) -> EvalResult<Value> + Send + Sync,
{
    fn call(&self, args: &[Atom], env: &Env, interp: &Interpreter<'_>) -> EvalResult<Value> {
        self(args, env, interp)
    }
}

#[derive(Clone)]
pub enum SpecialForm {
    Quote,
    Quasiquote,
    If,
    Lambda,
    Def,
    Do,
    Macro,
    External(Arc<dyn SpecialHandler>),
}

impl SpecialForm {
    pub fn apply(&self, args: &[Atom], env: &Env, interp: &Interpreter<'_>) -> EvalResult<Value> {
        match self {
            SpecialForm::Quote => quote(args),
            SpecialForm::Quasiquote => {
                let [template] = args else {
                    return Err(EvalError::Validation(
                        "quasiquote expects exactly one argument".into(),
                    ));
                };
                quasiquote(template, env, interp)
            }
            SpecialForm::If => if_form(args, env, interp),
            SpecialForm::Lambda => lambda(args, env),
            SpecialForm::Def => def(args, env, interp),
            SpecialForm::Do => {
                let mut last = Value::Undefined;
                for expr in args {
                    last = interp.eval(expr, env)?;
                }
                Ok(last)
            }
            SpecialForm::Macro => macro_form(args, env),
            SpecialForm::External(handler) => handler.call(args, env, interp),
        }
    }
}

/// Name-to-form table consulted before ordinary application.
#[derive(Clone, Default)]
pub struct SpecialForms {
    forms: HashMap<String, SpecialForm>,
}

impl SpecialForms {
    /// A table with no forms at all.
    pub fn empty() -> Self {
        SpecialForms::default()
    }

    /// The built-in forms: `quote`, `quasiquote`, `if`, `λ`/`lambda`, `def`,
    /// `do` and `macro`.
    pub fn standard() -> Self {
        let mut forms = SpecialForms::empty();
        forms.insert("quote", SpecialForm::Quote);
        forms.insert("quasiquote", SpecialForm::Quasiquote);
        forms.insert("if", SpecialForm::If);
        forms.insert("λ", SpecialForm::Lambda);
        forms.insert("lambda", SpecialForm::Lambda);
        forms.insert("def", SpecialForm::Def);
        forms.insert("do", SpecialForm::Do);
        forms.insert("macro", SpecialForm::Macro);
        forms
    }

    pub fn insert(&mut self, name: impl Into<String>, form: SpecialForm) {
        self.forms.insert(name.into(), form);
    }

    /// Register an embedder special form.
    pub fn register<H>(&mut self, name: impl Into<String>, handler: H)
    where
        H: SpecialHandler + 'static,
    {
        self.insert(name, SpecialForm::External(Arc::new(handler)));
    }

    pub fn get(&self, name: &str) -> Option<&SpecialForm> {
        self.forms.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.forms.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.forms.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// This table with `other` layered on top; `other` wins on conflicts.
    pub fn merged(&self, other: &SpecialForms) -> SpecialForms {
        let mut forms = self.clone();
        for (name, form) in &other.forms {
            forms.forms.insert(name.clone(), form.clone());
        }
        forms
    }
}

fn quote(args: &[Atom]) -> EvalResult<Value> {
    match args {
        [quoted] => Ok(Value::from(quoted)),
        _ => Err(EvalError::Validation(
            "quote expects exactly one argument".into(),
        )),
    }
}

fn quasiquote(template: &Atom, env: &Env, interp: &Interpreter<'_>) -> EvalResult<Value> {
    let Atom::List(items) = template else {
        return Ok(Value::from(template));
    };

    if let Some(expr) = unquoted(items, "unquote")? {
        return interp.eval(expr, env);
    }

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let spliced = match item {
            Atom::List(inner) => unquoted(inner, "unquote-splicing")?,
            _ => None,
        };
        match spliced {
            Some(expr) => match interp.eval(expr, env)? {
                Value::List(values) => out.extend(values),
                Value::Undefined => {}
                other => {
                    return Err(EvalError::Type(format!(
                        "unquote-splicing expects a list, got {}",
                        other.type_name()
                    )));
                }
            },
            None => out.push(quasiquote(item, env, interp)?),
        }
    }
    Ok(Value::List(out))
}

/// The expression of `(marker expr)`, if `items` has that shape.
fn unquoted<'a>(items: &'a [Atom], marker: &str) -> EvalResult<Option<&'a Atom>> {
    match items {
        [Atom::Symbol(head), expr] if head == marker => Ok(Some(expr)),
        [Atom::Symbol(head), ..] if head == marker => Err(EvalError::Validation(format!(
            "{marker} expects exactly one argument"
        ))),
        _ => Ok(None),
    }
}

fn if_form(args: &[Atom], env: &Env, interp: &Interpreter<'_>) -> EvalResult<Value> {
    let (cond, then, otherwise) = match args {
        [cond, then] => (cond, then, None),
        [cond, then, otherwise] => (cond, then, Some(otherwise)),
        _ => {
            return Err(EvalError::Validation(
                "if expects a condition, a then branch and an optional else branch".into(),
            ));
        }
    };

    if interp.eval(cond, env)?.is_truthy() {
        interp.eval(then, env)
    } else {
        match otherwise {
            Some(expr) => interp.eval(expr, env),
            None => Ok(Value::Undefined),
        }
    }
}

/// A symbol usable as a binding name; numeric literals do not qualify.
fn binding_name(atom: &Atom) -> Option<&str> {
    match atom.as_number() {
        Some(_) => None,
        None => atom.as_symbol(),
    }
}

fn param_names(params: &Atom, form: &str) -> EvalResult<Vec<String>> {
    let names = params.as_list().and_then(|items| {
        items
            .iter()
            .map(|p| binding_name(p).map(str::to_string))
            .collect::<Option<Vec<_>>>()
    });
    names.ok_or_else(|| {
        EvalError::Validation(format!("{form} argnames must be a bare list of symbols"))
    })
}

fn lambda(args: &[Atom], env: &Env) -> EvalResult<Value> {
    let [params, body] = args else {
        return Err(EvalError::Validation(
            "λ expects a parameter list and a body".into(),
        ));
    };
    let params = param_names(params, "λ")?;
    trace!(?params, "closing over environment");
    Ok(Value::Lambda(Arc::new(Lambda {
        params,
        body: Arc::new(body.clone()),
        env: Captured::from(env.clone()),
    })))
}

fn def(args: &[Atom], env: &Env, interp: &Interpreter<'_>) -> EvalResult<Value> {
    let [name, expr] = args else {
        return Err(EvalError::Validation(
            "def expects a name and a value".into(),
        ));
    };
    let Some(name) = binding_name(name) else {
        return Err(EvalError::Validation(format!(
            "def name must be a symbol, got {name}"
        )));
    };
    let value = interp.eval(expr, env)?;
    env.define(name, value.clone());
    Ok(value)
}

fn macro_form(args: &[Atom], env: &Env) -> EvalResult<Value> {
    let [name, params, body] = args else {
        return Err(EvalError::Validation(
            "macro expects a name, a parameter list and a body".into(),
        ));
    };
    let Some(name) = binding_name(name) else {
        return Err(EvalError::Validation(format!(
            "macro name must be a symbol, got {name}"
        )));
    };
    let value = Value::Macro(Arc::new(Macro {
        name: name.to_string(),
        params: param_names(params, "macro")?,
        body: Arc::new(body.clone()),
        env: Captured::from(env.clone()),
    }));
    env.define(name, value.clone());
    Ok(value)
}
