//! Default bindings (Rust) and their metadata.
//!
//! Conventions:
//! - Every name registered by `register_builtins` has an entry in `BUILTINS`
//!   so front ends can list it.
//! - Builtins receive evaluated arguments; anything needing unevaluated
//!   arguments belongs in the special-form table instead.

use rand::Rng;
use tracing::info;

use crate::engine::{
    Builtin, Env, EvalError, EvalResult, Interpreter, Scope, Value, format_value,
};

pub struct BuiltinInfo {
    pub name: &'static str,
    pub description: &'static str,
}

pub const BUILTINS: &[BuiltinInfo] = &[
    BuiltinInfo {
        name: "t",
        description: "Canonical true",
    },
    BuiltinInfo {
        name: "nil",
        description: "Canonical false",
    },
    BuiltinInfo {
        name: "+",
        description: "Sum of numbers; concatenation if any argument is a string",
    },
    BuiltinInfo {
        name: "-",
        description: "Negate one number or subtract the second from the first",
    },
    BuiltinInfo {
        name: "*",
        description: "Product of numbers",
    },
    BuiltinInfo {
        name: "/",
        description: "Divide the first number by the second",
    },
    BuiltinInfo {
        name: ">",
        description: "Greater than (numbers or strings)",
    },
    BuiltinInfo {
        name: "<",
        description: "Less than (numbers or strings)",
    },
    BuiltinInfo {
        name: ">=",
        description: "Greater than or equal (numbers or strings)",
    },
    BuiltinInfo {
        name: "<=",
        description: "Less than or equal (numbers or strings)",
    },
    BuiltinInfo {
        name: "=",
        description: "Structural equality of two values",
    },
    BuiltinInfo {
        name: "p",
        description: "Log the arguments and return them as a list",
    },
    BuiltinInfo {
        name: "list",
        description: "A list of the arguments",
    },
    BuiltinInfo {
        name: "i",
        description: "Identity: the first argument",
    },
    BuiltinInfo {
        name: "∘",
        description: "Compose functions left to right",
    },
    BuiltinInfo {
        name: "rand",
        description: "Random number in [0, 1)",
    },
];

/// A fresh root environment holding the default bindings.
pub fn default_env() -> Env {
    let env = Scope::root();
    register_builtins(&env);
    env
}

pub fn register_builtins(env: &Env) {
    env.define("t", Value::Bool(true));
    env.define("nil", Value::Bool(false));

    env.register_fn("+", |_, args| add(args));
    env.register_fn("*", |_, args| {
        let mut product = 1.0;
        for arg in &args {
            product *= number("*", arg)?;
        }
        Ok(Value::Number(product))
    });
    env.register_fn("-", |_, args| match args.as_slice() {
        [x] => Ok(Value::Number(-number("-", x)?)),
        [a, b] => Ok(Value::Number(number("-", a)? - number("-", b)?)),
        _ => Err(EvalError::arity("-", "1 or 2", args.len())),
    });
    env.register_fn("/", |_, args| match args.as_slice() {
        [a, b] => Ok(Value::Number(number("/", a)? / number("/", b)?)),
        _ => Err(EvalError::arity("/", "2", args.len())),
    });

    env.register_fn(">", |_, args| compare(">", &args, |o| o.is_gt()));
    env.register_fn("<", |_, args| compare("<", &args, |o| o.is_lt()));
    env.register_fn(">=", |_, args| compare(">=", &args, |o| o.is_ge()));
    env.register_fn("<=", |_, args| compare("<=", &args, |o| o.is_le()));
    env.register_fn("=", |_, args| match args.as_slice() {
        [a, b] => Ok(Value::Bool(a == b)),
        _ => Err(EvalError::arity("=", "2", args.len())),
    });

    env.register_fn("p", |_, args| {
        let shown: Vec<String> = args.iter().map(format_value).collect();
        info!(target: "sheetlisp::p", "{}", shown.join(" "));
        Ok(Value::List(args))
    });
    env.register_fn("list", |_, args| Ok(Value::List(args)));
    env.register_fn("i", |_, args| {
        Ok(args.into_iter().next().unwrap_or(Value::Undefined))
    });
    env.register_fn("∘", |_, args| compose(args));

    // rand(): random float in [0.0, 1.0)
    env.register_fn("rand", |_, _| {
        Ok(Value::Number(rand::thread_rng().r#gen::<f64>()))
    });
}

fn number(name: &str, value: &Value) -> EvalResult<f64> {
    value.as_number().ok_or_else(|| {
        EvalError::Type(format!(
            "{name} expects numbers, got {} {}",
            value.type_name(),
            format_value(value)
        ))
    })
}

fn add(args: Vec<Value>) -> EvalResult<Value> {
    if args.iter().any(|v| matches!(v, Value::Str(_))) {
        return Ok(Value::Str(args.iter().map(format_value).collect()));
    }
    let mut sum = 0.0;
    for arg in &args {
        sum += number("+", arg)?;
    }
    Ok(Value::Number(sum))
}

fn compare(
    name: &str,
    args: &[Value],
    pick: fn(std::cmp::Ordering) -> bool,
) -> EvalResult<Value> {
    let ordering = match args {
        [Value::Number(a), Value::Number(b)] => a.partial_cmp(b),
        [Value::Str(a), Value::Str(b)] => Some(a.cmp(b)),
        [a, b] => {
            return Err(EvalError::Type(format!(
                "{name} expects two numbers or two strings, got {} and {}",
                a.type_name(),
                b.type_name()
            )));
        }
        _ => return Err(EvalError::arity(name, "2", args.len())),
    };
    // NaN compares false against everything.
    Ok(Value::Bool(ordering.is_some_and(pick)))
}

/// `(∘ f g h)` is a function that applies `f` to its arguments, then `g` to
/// that result, then `h`.
fn compose(funcs: Vec<Value>) -> EvalResult<Value> {
    if let Some(bad) = funcs
        .iter()
        .find(|f| !matches!(f, Value::Builtin(_) | Value::Lambda(_)))
    {
        return Err(EvalError::Type(format!(
            "∘ expects functions, got {}",
            bad.type_name()
        )));
    }
    Ok(Value::Builtin(Builtin::new(
        "∘",
        move |interp: &Interpreter<'_>, args: Vec<Value>| {
            let mut funcs = funcs.iter();
            let Some(first) = funcs.next() else {
                return Ok(args.into_iter().next().unwrap_or(Value::Undefined));
            };
            let mut value = interp.apply(first, args)?;
            for func in funcs {
                value = interp.apply(func, vec![value])?;
            }
            Ok(value)
        },
    )))
}
