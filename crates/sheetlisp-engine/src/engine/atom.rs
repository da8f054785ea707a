//! Parsed syntax tree.
//!
//! An [`Atom`] is either a leaf token or a list of atoms. String literals keep
//! their own variant so the symbol `t` and the string `"t"` never collapse
//! into the same thing.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use super::parser::ParserOptions;

#[derive(Clone, Debug, PartialEq)]
pub enum Atom {
    /// A bare token: an identifier or a numeric literal kept as text.
    Symbol(String),
    /// A double-quoted string literal, escapes already resolved.
    Str(String),
    List(Vec<Atom>),
}

fn number_re() -> &'static Regex {
    static NUMBER_RE: OnceLock<Regex> = OnceLock::new();
    NUMBER_RE.get_or_init(|| Regex::new(r"^[0-9]*(\.[0-9]+)?$").expect("number regex must compile"))
}

impl Atom {
    pub fn symbol(name: impl Into<String>) -> Atom {
        Atom::Symbol(name.into())
    }

    pub fn string(text: impl Into<String>) -> Atom {
        Atom::Str(text.into())
    }

    pub fn list(items: impl IntoIterator<Item = Atom>) -> Atom {
        Atom::List(items.into_iter().collect())
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Atom::Symbol(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Atom]> {
        match self {
            Atom::List(items) => Some(items),
            _ => None,
        }
    }

    /// The numeric value of a bare token such as `12`, `0.5` or `.5`.
    ///
    /// Signs and exponents are not part of the literal syntax; `-1` is a
    /// symbol.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Atom::Symbol(text) if !text.is_empty() && number_re().is_match(text) => {
                text.parse().ok()
            }
            _ => None,
        }
    }

    /// Render the atom as source text that parses back to an equal tree.
    pub fn to_source(&self) -> String {
        self.to_source_with(&ParserOptions::default())
    }

    /// Like [`Atom::to_source`], for a parser configured with `options`; an
    /// extra quote character inside a symbol is escaped.
    pub fn to_source_with(&self, options: &ParserOptions) -> String {
        let extra_quote = options.extra_quote.as_ref().map(|(q, _)| *q);
        let mut out = String::new();
        self.write_source(&mut out, extra_quote);
        out
    }

    fn write_source(&self, out: &mut String, extra_quote: Option<char>) {
        match self {
            Atom::Symbol(name) => {
                for c in name.chars() {
                    if is_delimiter(c) || c == '\\' || Some(c) == extra_quote {
                        out.push('\\');
                    }
                    out.push(c);
                }
            }
            Atom::Str(text) => {
                out.push('"');
                for c in text.chars() {
                    match c {
                        '"' => out.push_str("\\\""),
                        '\\' => out.push_str("\\\\"),
                        '\r' => out.push_str("\\r"),
                        '\t' => out.push_str("\\t"),
                        '\n' => out.push_str("\\n"),
                        '\x0C' => out.push_str("\\f"),
                        '\x08' => out.push_str("\\b"),
                        c => out.push(c),
                    }
                }
                out.push('"');
            }
            Atom::List(items) => {
                out.push('(');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    item.write_source(out, extra_quote);
                }
                out.push(')');
            }
        }
    }
}

/// Characters that end a bare token.
pub(crate) fn is_delimiter(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n' | '(' | ')' | '"' | '\'' | '`' | ',')
}

/// The printable form used in diagnostics: symbols and numbers as written,
/// strings as their raw characters, lists parenthesised.
impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Symbol(text) | Atom::Str(text) => f.write_str(text),
            Atom::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}
