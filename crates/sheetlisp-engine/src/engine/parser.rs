//! Source text to [`Atom`] trees.
//!
//! A small recursive-descent reader over characters that tracks line and
//! column for diagnostics. Quote characters desugar into two-element lists:
//! `'x` becomes `(quote x)`, `` `x `` becomes `(quasiquote x)`, `,x` becomes
//! `(unquote x)` and `,@x` becomes `(unquote-splicing x)`.

use super::atom::{Atom, is_delimiter};
use super::error::ParseError;

/// Maximum list nesting accepted by the parser.
pub const MAX_PARSE_DEPTH: usize = 512;

/// Embedder knobs for the parser.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParserOptions {
    /// An additional quote character and the symbol it expands to.
    pub extra_quote: Option<(char, String)>,
}

impl ParserOptions {
    pub fn with_quote(ch: char, name: impl Into<String>) -> Self {
        ParserOptions {
            extra_quote: Some((ch, name.into())),
        }
    }
}

/// Parse exactly one expression; anything but whitespace after it is an error.
pub fn parse(text: &str) -> Result<Atom, ParseError> {
    parse_with(text, &ParserOptions::default())
}

pub fn parse_with(text: &str, options: &ParserOptions) -> Result<Atom, ParseError> {
    let mut parser = Parser::new(text, options);
    let expr = parser.expr()?;
    parser.skip_whitespace();
    if let Some(c) = parser.peek() {
        return Err(parser.error(format!("Superfluous characters after expression: `{c}`")));
    }
    Ok(expr)
}

/// Parse every top-level expression in `text` (used for library files).
pub fn parse_all(text: &str, options: &ParserOptions) -> Result<Vec<Atom>, ParseError> {
    let mut parser = Parser::new(text, options);
    let mut exprs = Vec::new();
    loop {
        parser.skip_whitespace();
        if parser.peek().is_none() {
            return Ok(exprs);
        }
        exprs.push(parser.expr()?);
    }
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    depth: usize,
    options: &'a ParserOptions,
}

impl<'a> Parser<'a> {
    fn new(text: &str, options: &'a ParserOptions) -> Self {
        Parser {
            chars: text.chars().collect(),
            pos: 0,
            line: 0,
            col: 0,
            depth: 0,
            options,
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            line: self.line + 1,
            col: self.col + 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn consume(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        match c {
            '\r' => {
                if self.peek() == Some('\n') {
                    self.pos += 1;
                }
                self.line += 1;
                self.col = 0;
            }
            '\n' => {
                self.line += 1;
                self.col = 0;
            }
            _ => self.col += 1,
        }
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r' | '\n')) {
            self.consume();
        }
    }

    fn quote_name(&self, c: char) -> Option<&str> {
        match c {
            '\'' => Some("quote"),
            '`' => Some("quasiquote"),
            ',' => Some("unquote"),
            _ => match &self.options.extra_quote {
                Some((q, name)) if *q == c => Some(name),
                _ => None,
            },
        }
    }

    fn ends_atom(&self, c: char) -> bool {
        is_delimiter(c) || self.quote_name(c).is_some()
    }

    fn expr(&mut self) -> Result<Atom, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(self.error("Unexpected end of input")),
            Some(c) if self.quote_name(c).is_some() => self.quoted(),
            Some('(') => self.list(),
            Some(')') => Err(self.error("Unexpected `)`")),
            Some('"') => self.string(),
            Some(_) => self.bare(),
        }
    }

    /// Quote prefixes nest like lists and share their limit.
    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_PARSE_DEPTH {
            return Err(self.error(format!(
                "Expression too deeply nested (max depth: {MAX_PARSE_DEPTH})"
            )));
        }
        Ok(())
    }

    fn quoted(&mut self) -> Result<Atom, ParseError> {
        let Some(q) = self.consume() else {
            return Err(self.error("Unexpected end of input"));
        };
        let mut shown = q.to_string();
        let mut name = self.quote_name(q).unwrap_or("quote").to_string();
        if q == ',' && self.peek() == Some('@') {
            self.consume();
            name = "unquote-splicing".to_string();
            shown.push('@');
        }

        self.skip_whitespace();
        match self.peek() {
            None => return Err(self.error(format!("Unexpected end of input after `{shown}`"))),
            Some(')') => return Err(self.error(format!("Unexpected `)` after `{shown}`"))),
            Some(_) => {}
        }
        self.enter()?;
        let quoted = self.expr()?;
        self.depth -= 1;
        Ok(Atom::List(vec![Atom::Symbol(name), quoted]))
    }

    fn list(&mut self) -> Result<Atom, ParseError> {
        self.consume();
        self.enter()?;

        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(self.error("Expected `)` - saw end of input")),
                Some(')') => {
                    self.consume();
                    break;
                }
                Some(_) => items.push(self.expr()?),
            }
        }

        self.depth -= 1;
        Ok(Atom::List(items))
    }

    fn string(&mut self) -> Result<Atom, ParseError> {
        self.consume();
        let mut text = String::new();
        loop {
            match self.consume() {
                None => return Err(self.error("Unterminated string literal")),
                Some('"') => break,
                Some('\\') => match self.consume() {
                    None => return Err(self.error("Unterminated string literal")),
                    Some('r') => text.push('\r'),
                    Some('t') => text.push('\t'),
                    Some('n') => text.push('\n'),
                    Some('f') => text.push('\x0C'),
                    Some('b') => text.push('\x08'),
                    Some(c) => text.push(c),
                },
                Some(c) => text.push(c),
            }
        }
        Ok(Atom::Str(text))
    }

    fn bare(&mut self) -> Result<Atom, ParseError> {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if self.ends_atom(c) {
                break;
            }
            self.consume();
            if c == '\\' {
                match self.consume() {
                    Some(escaped) => text.push(escaped),
                    None => return Err(self.error("Unexpected end of input after `\\`")),
                }
            } else {
                text.push(c);
            }
        }
        Ok(Atom::Symbol(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(name: &str) -> Atom {
        Atom::symbol(name)
    }

    #[test]
    fn test_parse_list_of_symbols() {
        let atom = parse("(a b c)").unwrap();
        assert_eq!(atom, Atom::list([sym("a"), sym("b"), sym("c")]));
    }

    #[test]
    fn test_parse_quote_desugars() {
        let atom = parse("'(a b)").unwrap();
        assert_eq!(
            atom,
            Atom::list([sym("quote"), Atom::list([sym("a"), sym("b")])])
        );
        assert_eq!(
            parse("`(a ,b ,@c)").unwrap(),
            Atom::list([
                sym("quasiquote"),
                Atom::list([
                    sym("a"),
                    Atom::list([sym("unquote"), sym("b")]),
                    Atom::list([sym("unquote-splicing"), sym("c")]),
                ]),
            ])
        );
    }

    #[test]
    fn test_parse_quote_allows_whitespace_before_expression() {
        assert_eq!(
            parse("' x").unwrap(),
            Atom::list([sym("quote"), sym("x")])
        );
    }

    #[test]
    fn test_parse_quote_needs_expression() {
        let err = parse("'").unwrap_err();
        assert!(err.message.contains("after `'`"));
        let err = parse("(a ')").unwrap_err();
        assert!(err.message.contains("Unexpected `)`"));
    }

    #[test]
    fn test_parse_string_escapes() {
        assert_eq!(parse("\"a\\\"b\"").unwrap(), Atom::string("a\"b"));
        assert_eq!(
            parse(r#""\r\t\n\f\b\q""#).unwrap(),
            Atom::string("\r\t\n\x0C\x08q")
        );
    }

    #[test]
    fn test_string_and_symbol_stay_distinct() {
        assert_eq!(parse("t").unwrap(), sym("t"));
        assert_eq!(parse("\"t\"").unwrap(), Atom::string("t"));
    }

    #[test]
    fn test_parse_bare_atom_escapes() {
        assert_eq!(parse(r"a\ b").unwrap(), sym("a b"));
        assert_eq!(parse(r"a\(b").unwrap(), sym("a(b"));
    }

    #[test]
    fn test_bare_atom_stops_at_quote_characters() {
        assert_eq!(
            parse("(a'b)").unwrap(),
            Atom::list([sym("a"), Atom::list([sym("quote"), sym("b")])])
        );
    }

    #[test]
    fn test_unterminated_string() {
        let err = parse("\"abc").unwrap_err();
        assert!(err.message.contains("Unterminated string"));
    }

    #[test]
    fn test_missing_close_paren_reports_position() {
        let err = parse("(a\n  (b c)").unwrap_err();
        assert!(err.message.contains("Expected `)`"));
        assert_eq!(err.line, 2);
        assert_eq!(err.col, 8);
    }

    #[test]
    fn test_unmatched_close_paren() {
        let err = parse(")").unwrap_err();
        assert_eq!((err.line, err.col), (1, 1));
    }

    #[test]
    fn test_superfluous_characters() {
        let err = parse("(a) b").unwrap_err();
        assert!(err.message.contains("Superfluous"));
        assert_eq!(err.col, 5);
        assert!(parse("  (a)  \n").is_ok());
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(parse("").is_err());
        assert!(parse("   ").is_err());
    }

    #[test]
    fn test_extra_quote_character() {
        let options = ParserOptions::with_quote('~', "seq");
        assert_eq!(
            parse_with("~(a b)", &options).unwrap(),
            Atom::list([sym("seq"), Atom::list([sym("a"), sym("b")])])
        );
        assert_eq!(parse("~a").unwrap(), sym("~a"));
    }

    #[test]
    fn test_extra_quote_character_round_trips() {
        let options = ParserOptions::with_quote('~', "seq");
        let atom = parse_with(r"(a\~b ~c)", &options).unwrap();
        assert_eq!(
            atom,
            Atom::list([sym("a~b"), Atom::list([sym("seq"), sym("c")])])
        );
        let source = atom.to_source_with(&options);
        assert_eq!(parse_with(&source, &options).unwrap(), atom);
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}x{}", "(".repeat(MAX_PARSE_DEPTH + 1), ")".repeat(MAX_PARSE_DEPTH + 1));
        let err = parse(&deep).unwrap_err();
        assert!(err.message.contains("too deeply nested"));

        let ok = format!("{}x{}", "(".repeat(MAX_PARSE_DEPTH), ")".repeat(MAX_PARSE_DEPTH));
        assert!(parse(&ok).is_ok());
    }

    #[test]
    fn test_quote_prefixes_share_the_nesting_limit() {
        let err = parse(&format!("{}x", "'".repeat(200_000))).unwrap_err();
        assert!(err.message.contains("too deeply nested"));
        let err = parse(&format!("{}x", "`,".repeat(100_000))).unwrap_err();
        assert!(err.message.contains("too deeply nested"));
        assert!(parse(&format!("{}x", "'".repeat(MAX_PARSE_DEPTH))).is_ok());
    }

    #[test]
    fn test_parse_all() {
        let exprs = parse_all("(def x 1)\n(def y 2)\n", &ParserOptions::default()).unwrap();
        assert_eq!(exprs.len(), 2);
        assert!(parse_all("  ", &ParserOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn test_to_source_round_trips() {
        for src in [
            "(a \"b c\" 'd)",
            r#"(p "tab\there" x\ y)"#,
            "`(1 ,(+ 1 2) ,@(list 3))",
        ] {
            let atom = parse(src).unwrap();
            assert_eq!(parse(&atom.to_source()).unwrap(), atom);
        }
    }
}
