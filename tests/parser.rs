#[cfg(test)]
mod parser_tests {
    use rox::ast::{Expr, Stmt};
    use rox::ast_printer::AstPrinter;
    use rox::error::LoxError;
    use rox::parser::Parser;
    use rox::scanner::scan;

    fn parse(source: &str) -> Result<Vec<Stmt>, Vec<LoxError>> {
        let (tokens, errors) = scan(source);
        assert!(errors.is_empty(), "unexpected scan errors: {:?}", errors);
        Parser::new(&tokens).parse()
    }

    fn print(source: &str) -> Vec<String> {
        parse(source)
            .expect("program should parse")
            .iter()
            .map(AstPrinter::print_stmt)
            .collect()
    }

    fn messages(source: &str) -> Vec<String> {
        parse(source)
            .expect_err("program should not parse")
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            print("print 1 + 2 * 3 - 4 / (5 - 6);"),
            vec!["(print (- (+ 1.0 (* 2.0 3.0)) (/ 4.0 (group (- 5.0 6.0)))))"]
        );
    }

    #[test]
    fn test_comparison_binds_tighter_than_equality_and_logic() {
        assert_eq!(
            print("a == b < c or d and !e;"),
            vec!["(; (or (== a (< b c)) (and d (! e))))"]
        );
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_eq!(print("a = b = 3;"), vec!["(; (= a (= b 3.0)))"]);
    }

    #[test]
    fn test_property_set_keeps_receiver_expression() {
        assert_eq!(
            print("f().x = -1;"),
            vec!["(; (= (. (call f) x) (- 1.0)))"]
        );
    }

    #[test]
    fn test_for_is_desugared_to_while() {
        assert_eq!(
            print("for (var i = 0; i < 3; i = i + 1) print i;"),
            vec!["(block (var i 0.0) (while (< i 3.0) (block (print i) (; (= i (+ i 1.0))))))"]
        );

        // Empty clauses: no initializer block, condition defaults to true.
        assert_eq!(
            print("for (;;) break;"),
            vec!["(while true (break))"]
        );
    }

    #[test]
    fn test_class_with_superclass_and_methods() {
        assert_eq!(
            print("class B < A { init(x) { this.x = x; } greet() { return super.greet(); } }"),
            vec!["(class B < A (method init(x) (; (= (. this x) x))) (method greet() (return (call (super greet)))))"]
        );
    }

    #[test]
    fn test_function_declaration() {
        assert_eq!(
            print("fun add(a, b) { return a + b; }"),
            vec!["(fun add(a b) (return (+ a b)))"]
        );
    }

    #[test]
    fn test_resolvable_nodes_get_distinct_ids() {
        let statements = parse("a; a;").expect("parses");

        let ids: Vec<_> = statements
            .iter()
            .map(|s| match s {
                Stmt::Expression(Expr::Variable { id, .. }) => *id,
                other => panic!("unexpected statement {:?}", other),
            })
            .collect();

        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn test_first_id_offset() {
        let (tokens, _) = scan("x;");
        let mut parser = Parser::new(&tokens).with_first_id(10);
        let statements = parser.parse().expect("parses");

        match &statements[0] {
            Stmt::Expression(Expr::Variable { id, .. }) => assert_eq!(id.0, 10),
            other => panic!("unexpected statement {:?}", other),
        }
        assert_eq!(parser.next_id(), 11);
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert_eq!(
            messages("1 + 2 = 3;"),
            vec!["[line 1] Error at '=': Invalid assignment target."]
        );
    }

    #[test]
    fn test_break_outside_loop() {
        assert_eq!(
            messages("break;"),
            vec!["[line 1] Error at 'break': Must be inside a loop to use 'break'."]
        );
    }

    #[test]
    fn test_break_inside_function_inside_loop_is_rejected() {
        assert_eq!(
            messages("while (true) { fun f() { break; } }"),
            vec!["[line 1] Error at 'break': Must be inside a loop to use 'break'."]
        );
    }

    #[test]
    fn test_break_in_nested_loops_is_accepted() {
        assert!(parse("while (true) { for (;;) { break; } break; }").is_ok());
    }

    #[test]
    fn test_error_recovery_reports_every_bad_statement() {
        let errors = messages("var = 1;\nprint 2;\nvar x = ;\nprint x;");

        assert_eq!(
            errors,
            vec![
                "[line 1] Error at '=': Expect variable name.",
                "[line 3] Error at ';': Expect expression.",
            ]
        );
    }

    #[test]
    fn test_missing_semicolon_at_end() {
        assert_eq!(
            messages("print 1"),
            vec!["[line 1] Error at end: Expect ';' after value."]
        );
    }

    #[test]
    fn test_too_many_arguments() {
        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));

        assert_eq!(
            messages(&source),
            vec!["[line 1] Error at '255': Can't have more than 255 arguments."]
        );
    }

    #[test]
    fn test_too_many_parameters() {
        let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
        let source = format!("fun f({}) {{}}", params.join(", "));

        assert_eq!(
            messages(&source),
            vec!["[line 1] Error at 'p255': Can't have more than 255 parameters."]
        );
    }

    #[test]
    fn test_valid_program_has_no_errors() {
        let source = r#"
            var a = 1;
            { var b = a; print b; }
            if (a > 0) print "pos"; else print "neg";
            while (a < 10) a = a + 1;
            fun f(x) { return x; }
            class C { m() { return this; } }
            print f(C().m());
        "#;

        let statements = parse(source).expect("parses cleanly");
        assert_eq!(statements.len(), 7);
    }

    #[test]
    fn test_single_expression() {
        let (tokens, _) = scan("-(1 + x) * 2");
        let expr = Parser::new(&tokens).parse_expression().expect("parses");

        assert_eq!(AstPrinter::print(&expr), "(* (- (group (+ 1.0 x))) 2.0)");
    }

    #[test]
    fn test_empty_program() {
        assert!(parse("").expect("parses").is_empty());
        assert!(parse("// only a comment").expect("parses").is_empty());
    }
}
