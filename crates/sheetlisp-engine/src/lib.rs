//! sheetlisp_engine - S-expression language for spreadsheet cells.

pub mod builtins;
pub mod engine;

#[cfg(test)]
mod tests {
    use crate::engine::*;

    fn eval(source: &str) -> EvalResult<Value> {
        evaluate(source, &Bindings::new(), &SpecialForms::empty())
    }

    #[test]
    fn test_parse_list_of_three_symbols() {
        let atom = parse("(a b c)").unwrap();
        let items = atom.as_list().unwrap();
        assert_eq!(items.len(), 3);
        let names: Vec<&str> = items.iter().filter_map(Atom::as_symbol).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_quote_shape() {
        assert_eq!(
            parse("'(a b)").unwrap(),
            Atom::list([
                Atom::symbol("quote"),
                Atom::list([Atom::symbol("a"), Atom::symbol("b")]),
            ])
        );
    }

    #[test]
    fn test_parse_escaped_quote_in_string() {
        assert_eq!(parse("\"a\\\"b\"").unwrap(), Atom::string("a\"b"));
    }

    #[test]
    fn test_evaluate_basics() {
        assert_eq!(eval("(+ 1 2 3)").unwrap(), Value::Number(6.0));
        assert_eq!(eval("(if t 1 2)").unwrap(), Value::Number(1.0));
        assert_eq!(eval("((λ (x) (* x x)) 5)").unwrap(), Value::Number(25.0));
    }

    #[test]
    fn test_def_does_not_leak_between_evaluations() {
        assert_eq!(eval("(do (def x 5) (* x x))").unwrap(), Value::Number(25.0));
        assert_eq!(eval("x").unwrap(), Value::Undefined);
    }

    #[test]
    fn test_engine_evaluations_are_isolated() {
        let engine = create_engine();
        engine.eval("(def x 5)").unwrap();
        assert_eq!(engine.eval("x").unwrap(), Value::Undefined);
    }

    #[test]
    fn test_not_a_function_mentions_head() {
        let err = eval("(1 2)").unwrap_err();
        assert!(matches!(err, EvalError::NotCallable(_)));
        assert!(err.to_string().contains('1'));
    }

    #[test]
    fn test_source_round_trip_evaluates_the_same() {
        for src in [
            "(+ 1 2 3)",
            "(do (def s \"a \\\"quoted\\\" word\") (+ s \"!\"))",
            "((λ (x y) (if (> x y) x y)) 3 7)",
            "`(1 ,(+ 1 1) ,@(list 3 4))",
            "(p \"tab\\there\" 'sym)",
            "(do (macro twice (e) `(list ,e ,e)) (twice (* 2 3)))",
        ] {
            let atom = parse(src).unwrap();
            let reparsed = parse(&atom.to_source()).unwrap();
            assert_eq!(reparsed, atom, "{src}");
            assert_eq!(
                eval(&atom.to_source()).unwrap(),
                eval(src).unwrap(),
                "{src}"
            );
        }
    }

    #[test]
    fn test_pure_evaluation_is_idempotent() {
        let src = "(do (def sq (λ (x) (* x x))) (list (sq 3) (+ \"a\" \"b\") (> 2 1)))";
        assert_eq!(eval(src).unwrap(), eval(src).unwrap());
    }

    #[test]
    fn test_parse_error_carries_position() {
        match eval("(+ 1\n  \"oops") {
            Err(EvalError::Parse(e)) => {
                assert_eq!(e.line, 2);
                assert!(e.message.contains("Unterminated"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(eval("(def 1 2)"), Err(EvalError::Validation(_))));
        assert!(matches!(eval("(λ (1) 2)"), Err(EvalError::Validation(_))));
        assert!(matches!(eval("(if)"), Err(EvalError::Validation(_))));
    }

    #[test]
    fn test_every_value_has_a_display_form() {
        let engine = create_engine();
        for src in ["+", "(λ (a b) a)", "(macro m (x) x)", "()", "(list 1 (list))", "nope"] {
            let value = engine.eval(src).unwrap();
            let _ = format_value(&value);
        }
        assert_eq!(format_value(&engine.eval("+").unwrap()), "#<builtin +>");
        assert_eq!(format_value(&engine.eval("(λ (a b) a)").unwrap()), "#<λ (a b)>");
    }

    #[test]
    fn test_embedder_bindings_shadow_defaults() {
        let mut bindings = Bindings::new();
        bindings.insert("t".into(), Value::Number(9.0));
        let value = evaluate("t", &bindings, &SpecialForms::empty()).unwrap();
        assert_eq!(value, Value::Number(9.0));
    }

    #[test]
    fn test_custom_quote_character() {
        let engine = create_engine().with_parser_options(ParserOptions::with_quote('~', "list"));
        assert_eq!(
            engine.eval("~(+ 1 1)").unwrap(),
            Value::List(vec![Value::Number(2.0)])
        );
    }
}
