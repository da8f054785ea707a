//! Lexical environments.
//!
//! A [`Scope`] is one frame of bindings with an optional parent. Lookups walk
//! outwards and never mutate; `def` writes into the frame it is evaluated in.
//! Frames are shared through [`Env`] handles so closures can keep the frame
//! they were created in alive.
//!
//! A closure bound into the frame it closes over would form a reference
//! cycle, so the frame stores it with a [`Captured::Weak`] handle and hands a
//! strong one back out on lookup.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use super::error::EvalResult;
use super::eval::Interpreter;
use super::value::{Builtin, Lambda, Macro, Value};

pub type Env = Arc<Scope>;

#[derive(Default)]
pub struct Scope {
    vars: RwLock<HashMap<String, Value>>,
    parent: Option<Env>,
}

/// The frame a closure or macro was created in.
#[derive(Clone)]
pub enum Captured {
    Strong(Env),
    /// Held by the frame itself.
    Weak(Weak<Scope>),
}

impl Captured {
    /// The frame, if it is still alive.
    pub fn env(&self) -> Option<Env> {
        match self {
            Captured::Strong(env) => Some(env.clone()),
            Captured::Weak(weak) => weak.upgrade(),
        }
    }

    fn as_ptr(&self) -> *const Scope {
        match self {
            Captured::Strong(env) => Arc::as_ptr(env),
            Captured::Weak(weak) => weak.as_ptr(),
        }
    }

    /// Whether both handles point at the same frame.
    pub fn same_frame(&self, other: &Captured) -> bool {
        std::ptr::eq(self.as_ptr(), other.as_ptr())
    }

    fn is_strong_to(&self, scope: &Scope) -> bool {
        matches!(self, Captured::Strong(_)) && std::ptr::eq(self.as_ptr(), scope)
    }

    fn downgrade(&self) -> Captured {
        match self {
            Captured::Strong(env) => Captured::Weak(Arc::downgrade(env)),
            weak => weak.clone(),
        }
    }

    fn upgrade(&self) -> Captured {
        match self {
            Captured::Weak(weak) => weak
                .upgrade()
                .map(Captured::Strong)
                .unwrap_or_else(|| self.clone()),
            strong => strong.clone(),
        }
    }
}

impl From<Env> for Captured {
    fn from(env: Env) -> Self {
        Captured::Strong(env)
    }
}

impl Scope {
    /// A frame with no parent.
    pub fn root() -> Env {
        Arc::new(Scope::default())
    }

    /// A new empty frame that falls back to `parent`.
    pub fn child(parent: &Env) -> Env {
        Arc::new(Scope {
            vars: RwLock::new(HashMap::new()),
            parent: Some(parent.clone()),
        })
    }

    /// A child of `parent` pre-populated with `bindings`.
    pub fn extend<I, K>(parent: &Env, bindings: I) -> Env
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let env = Scope::child(parent);
        for (name, value) in bindings {
            env.define(name, value);
        }
        env
    }

    pub fn parent(&self) -> Option<&Env> {
        self.parent.as_ref()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Value>> {
        self.vars.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Value>> {
        self.vars.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.read().get(name) {
            return Some(attach(value));
        }
        self.parent.as_ref().and_then(|parent| parent.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name) || self.parent.as_ref().is_some_and(|p| p.contains(name))
    }

    /// Bind `name` in this frame, shadowing any outer binding.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        let value = self.detach(value);
        // The replaced value is dropped after the lock is released.
        let previous = self.write().insert(name.into(), value);
        drop(previous);
    }

    /// Bind a Rust function under `name`.
    pub fn register_fn<F>(&self, name: &str, func: F)
    where
        F: Fn(&Interpreter<'_>, Vec<Value>) -> EvalResult<Value> + Send + Sync + 'static,
    {
        self.define(name, Value::Builtin(Builtin::new(name, func)));
    }

    /// All visible bindings, inner frames overriding outer ones, sorted by name.
    pub fn bindings(&self) -> Vec<(String, Value)> {
        let mut all = BTreeMap::new();
        self.collect_into(&mut all);
        all.into_iter().collect()
    }

    fn collect_into(&self, all: &mut BTreeMap<String, Value>) {
        if let Some(parent) = &self.parent {
            parent.collect_into(all);
        }
        for (name, value) in self.read().iter() {
            all.insert(name.clone(), attach(value));
        }
    }

    /// Weaken closures that capture this very frame before storing them here.
    fn detach(&self, value: Value) -> Value {
        match value {
            Value::Lambda(lambda) if lambda.env.is_strong_to(self) => {
                Value::Lambda(Arc::new(Lambda {
                    params: lambda.params.clone(),
                    body: lambda.body.clone(),
                    env: lambda.env.downgrade(),
                }))
            }
            Value::Macro(mac) if mac.env.is_strong_to(self) => Value::Macro(Arc::new(Macro {
                name: mac.name.clone(),
                params: mac.params.clone(),
                body: mac.body.clone(),
                env: mac.env.downgrade(),
            })),
            Value::List(items) => Value::List(items.into_iter().map(|v| self.detach(v)).collect()),
            other => other,
        }
    }
}

/// Re-strengthen closures on their way out of a frame.
fn attach(value: &Value) -> Value {
    match value {
        Value::Lambda(lambda) if matches!(lambda.env, Captured::Weak(_)) => {
            Value::Lambda(Arc::new(Lambda {
                params: lambda.params.clone(),
                body: lambda.body.clone(),
                env: lambda.env.upgrade(),
            }))
        }
        Value::Macro(mac) if matches!(mac.env, Captured::Weak(_)) => Value::Macro(Arc::new(Macro {
            name: mac.name.clone(),
            params: mac.params.clone(),
            body: mac.body.clone(),
            env: mac.env.upgrade(),
        })),
        Value::List(items) => Value::List(items.iter().map(attach).collect()),
        other => other.clone(),
    }
}
