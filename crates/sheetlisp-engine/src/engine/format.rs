use super::error::EvalResult;
use super::value::Value;

/// Format a value for display. Total: every value has a text form.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Undefined => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(*n),
        Value::Str(s) | Value::Symbol(s) => s.clone(),
        Value::List(items) => {
            let items: Vec<String> = items.iter().map(format_value).collect();
            format!("({})", items.join(" "))
        }
        Value::Builtin(b) => format!("#<builtin {}>", b.name),
        Value::Lambda(l) => format!("#<λ ({})>", l.params.join(" ")),
        Value::Macro(m) => format!("#<macro {}>", m.name),
        Value::Native(r) => r.describe(),
    }
}

/// Format a number for display.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "#NAN!".to_string()
    } else if n.is_infinite() {
        "#INF!".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        format!("{:.3}", n)
    }
}

/// Display form of an evaluation outcome; errors render as `#ERR: <message>`.
pub fn format_result(result: &EvalResult<Value>) -> String {
    match result {
        Ok(value) => format_value(value),
        Err(e) => format!("#ERR: {e}"),
    }
}
