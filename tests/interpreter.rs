#[cfg(test)]
mod interpreter_tests {
    use rox::{ExecMode, Lox, RunResult};

    /// Run `source` as a script, returning what it printed and the result.
    fn run(source: &str) -> (String, RunResult) {
        let mut lox = Lox::new(Vec::new(), ExecMode::Script);
        let result = lox.run(source);
        let output = String::from_utf8(lox.into_output()).expect("output is UTF-8");
        (output, result)
    }

    fn output_of(source: &str) -> String {
        let (output, result) = run(source);
        assert!(
            result.errors().next().is_none(),
            "unexpected errors: {:?}",
            result
        );
        output
    }

    fn runtime_error_of(source: &str) -> String {
        let (_, result) = run(source);
        assert!(!result.had_static_error(), "static errors: {:?}", result);
        result
            .runtime_error
            .expect("program should fault at runtime")
            .to_string()
    }

    #[test]
    fn test_arithmetic_and_concatenation() {
        assert_eq!(output_of("print 1 + 2;"), "3\n");
        assert_eq!(output_of("print (1 + 2) * 3 - 4 / 8;"), "8.5\n");
        assert_eq!(output_of("print \"a\" + \"b\";"), "ab\n");
        assert_eq!(output_of("print \"n=\" + 4;"), "n=4\n");
        assert_eq!(output_of("print \"x\" + 1.5;"), "x1.5\n");
    }

    #[test]
    fn test_division_by_zero_is_not_a_fault() {
        assert_eq!(output_of("print 1 / 0 > 1000;"), "true\n");
    }

    #[test]
    fn test_truthiness_and_logic_return_operands() {
        assert_eq!(
            output_of("print nil or \"x\"; print 0 and 1; print !\"\"; print false or nil;"),
            "x\n1\nfalse\nnil\n"
        );
    }

    #[test]
    fn test_equality_never_faults() {
        assert_eq!(
            output_of("print nil == false; print \"a\" == \"a\"; print 1 == 1; print 1 == \"1\";"),
            "false\ntrue\ntrue\nfalse\n"
        );
    }

    #[test]
    fn test_nan_equals_itself() {
        assert_eq!(
            output_of("var n = 0 / 0; print n == n; print n != n; print n == 1;"),
            "true\nfalse\nfalse\n"
        );
    }

    #[test]
    fn test_negative_zero_keeps_sign() {
        assert_eq!(
            output_of("print -0; print 0; print \"z=\" + -0; print -0 == 0;"),
            "-0\n0\nz=-0\ntrue\n"
        );
    }

    #[test]
    fn test_closures_capture_by_reference() {
        let source = r#"
            fun makeCounter() {
                var i = 0;
                fun count() { i = i + 1; return i; }
                return count;
            }
            var c = makeCounter();
            print c();
            print c();
        "#;

        assert_eq!(output_of(source), "1\n2\n");
    }

    #[test]
    fn test_closure_sees_later_assignment() {
        assert_eq!(
            output_of("var a = 1; fun show() { print a; } a = 2; show();"),
            "2\n"
        );
        assert_eq!(
            output_of("{ var a = 1; fun f() { return a; } a = 2; print f(); }"),
            "2\n"
        );
    }

    #[test]
    fn test_bindings_are_static() {
        let source = r#"
            var a = "global";
            {
                fun showA() { print a; }
                showA();
                var a = "block";
                showA();
            }
        "#;

        assert_eq!(output_of(source), "global\nglobal\n");
    }

    #[test]
    fn test_shadowing() {
        assert_eq!(
            output_of("var a = 1; { var a = 2; print a; } print a;"),
            "2\n1\n"
        );
    }

    #[test]
    fn test_block_locals_end_with_the_block() {
        let (output, result) = run("{ var x = 1; print x; } print x;");

        assert_eq!(output, "1\n");
        assert_eq!(
            result.runtime_error.map(|e| e.to_string()).as_deref(),
            Some("Undefined variable 'x'.\n[line 1]")
        );
    }

    #[test]
    fn test_recursion() {
        let source = r#"
            fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }
            print fib(15);
        "#;

        assert_eq!(output_of(source), "610\n");
    }

    #[test]
    fn test_super_dispatch() {
        let source = r#"
            class A { method() { return "A"; } }
            class B < A { method() { return super.method() + "B"; } }
            class C < B {}
            print C().method();
        "#;

        assert_eq!(output_of(source), "AB\n");
    }

    #[test]
    fn test_initializer_always_returns_instance() {
        let source = r#"
            class P { init(x) { this.x = x; return; } }
            var p = P(3);
            print p.x;
            print p.init(5) == p;
            print p.x;
        "#;

        assert_eq!(output_of(source), "3\ntrue\n5\n");
    }

    #[test]
    fn test_fields_shadow_methods() {
        let source = r#"
            class C { m() { return "method"; } }
            var c = C();
            print c.m();
            c.m = "field";
            print c.m;
        "#;

        assert_eq!(output_of(source), "method\nfield\n");
    }

    #[test]
    fn test_bound_methods_keep_their_receiver() {
        let source = r#"
            class Box { init(v) { this.v = v; } get() { return this.v; } }
            var g = Box("kept").get;
            print g();
        "#;

        assert_eq!(output_of(source), "kept\n");
    }

    #[test]
    fn test_display_forms() {
        let source = r#"
            fun f() {}
            class K {}
            print clock;
            print f;
            print K;
            print K();
            print nil;
            print 2.50;
        "#;

        assert_eq!(
            output_of(source),
            "<native fn>\n<fn f>\nK\nK instance\nnil\n2.5\n"
        );
    }

    #[test]
    fn test_break_exits_innermost_loop() {
        let source = r#"
            for (var i = 0; i < 3; i = i + 1) {
                for (var j = 0; j < 3; j = j + 1) {
                    if (j == 1) break;
                    print i * 10 + j;
                }
            }
            var n = 0;
            while (true) { n = n + 1; if (n == 4) break; }
            print n;
        "#;

        assert_eq!(output_of(source), "0\n10\n20\n4\n");
    }

    #[test]
    fn test_return_exits_loop_inside_function() {
        let source = r#"
            fun first() { for (var i = 5; ; i = i + 1) { if (i > 6) return i; } }
            print first();
        "#;

        assert_eq!(output_of(source), "7\n");
    }

    #[test]
    fn test_arrays() {
        let source = r#"
            var a = Array(3);
            a.set(0, "x");
            print a.get(0);
            print a.length;
            print a.get(1);
            print a;
        "#;

        assert_eq!(output_of(source), "x\n3\nnil\n[x, nil, nil]\n");
    }

    #[test]
    fn test_array_faults() {
        assert_eq!(
            runtime_error_of("var a = Array(3); a.get(3);"),
            "Array index 3 out of bounds for length 3.\n[line 1]"
        );
        assert_eq!(
            runtime_error_of("var a = Array(1); a.get(\"0\");"),
            "Array index must be a number.\n[line 1]"
        );
        assert_eq!(
            runtime_error_of("Array(-1);"),
            "Array size must be a non-negative integer.\n[line 1]"
        );
        assert_eq!(
            runtime_error_of("var a = Array(100000000000000000000); print a.length;"),
            "Array size must not exceed 16777216.\n[line 1]"
        );
        assert_eq!(
            runtime_error_of("var a = Array(1); a.x = 1;"),
            "Can't add properties to arrays.\n[line 1]"
        );
    }

    #[test]
    fn test_operand_faults() {
        assert_eq!(
            runtime_error_of("print 1 + \"a\";"),
            "Operands must be two numbers, two strings, or a string and a number.\n[line 1]"
        );
        assert_eq!(
            runtime_error_of("print 1 < \"a\";"),
            "Operands must be numbers.\n[line 1]"
        );
        assert_eq!(
            runtime_error_of("\n\nprint -nil;"),
            "Operand must be a number.\n[line 3]"
        );
    }

    #[test]
    fn test_variable_faults() {
        assert_eq!(
            runtime_error_of("print x;"),
            "Undefined variable 'x'.\n[line 1]"
        );
        assert_eq!(
            runtime_error_of("x = 1;"),
            "Undefined variable 'x'.\n[line 1]"
        );
    }

    #[test]
    fn test_call_faults() {
        assert_eq!(
            runtime_error_of("\"str\"();"),
            "Can only call functions and classes.\n[line 1]"
        );
        assert_eq!(
            runtime_error_of("clock(1);"),
            "Expected 0 arguments but got 1.\n[line 1]"
        );
        assert_eq!(
            runtime_error_of("class P { init(a, b) {} } P(1);"),
            "Expected 2 arguments but got 1.\n[line 1]"
        );
    }

    #[test]
    fn test_property_faults() {
        assert_eq!(
            runtime_error_of("var n = 4; print n.x;"),
            "Only instances have properties.\n[line 1]"
        );
        assert_eq!(
            runtime_error_of("var n = 4; n.x = 1;"),
            "Only instances have fields.\n[line 1]"
        );
        assert_eq!(
            runtime_error_of("class C {} print C().nope;"),
            "Undefined property 'nope'.\n[line 1]"
        );
        assert_eq!(
            runtime_error_of("var A = 1; class B < A {}"),
            "Superclass must be a class.\n[line 1]"
        );
    }

    #[test]
    fn test_runtime_fault_aborts_remaining_statements() {
        let (output, result) = run("print 1; print -\"a\"; print 2;");

        assert_eq!(output, "1\n");
        assert!(result.had_runtime_error());
        assert!(!result.had_static_error());
    }

    #[test]
    fn test_static_error_prevents_execution() {
        let (output, result) = run("print 1; print ;");
        assert_eq!(output, "");
        assert!(result.had_static_error());
        assert!(!result.had_runtime_error());

        let (output, result) = run("print 1; { var a = 1; var a = 2; }");
        assert_eq!(output, "");
        assert!(result.had_static_error());

        let (output, result) = run("print 1; @");
        assert_eq!(output, "");
        assert_eq!(result.static_errors.len(), 1);
    }

    #[test]
    fn test_error_kinds() {
        let (_, result) = run("print ;");
        assert!(result.static_errors.iter().all(|e| e.is_static()));

        let (_, result) = run("print -nil;");
        let fault = result.runtime_error.expect("faults");
        assert!(!fault.is_static());
        assert_eq!(fault.line(), Some(1));
        assert_eq!(fault.message(), "Operand must be a number.");
    }

    #[test]
    fn test_session_accessors() {
        let mut lox = Lox::new(Vec::new(), ExecMode::Repl);
        assert_eq!(lox.interpreter().mode(), ExecMode::Repl);
        assert!(lox.interpreter().output().is_empty());

        lox.run("print 1;");
        assert_eq!(lox.interpreter().output().as_slice(), b"1\n");
    }

    #[test]
    fn test_script_mode_does_not_echo() {
        let (output, result) = run("1 + 2;");

        assert_eq!(output, "");
        assert!(result.values.is_empty());
    }

    #[test]
    fn test_repl_session_keeps_state_and_echoes() {
        let mut lox = Lox::new(Vec::new(), ExecMode::Repl);

        assert!(lox.run("var x = 2;").values.is_empty());
        assert_eq!(lox.run("x * 3;").values, vec!["6"]);
        assert!(lox.run("fun twice(n) { return n * x; }").values.is_empty());
        assert_eq!(lox.run("twice(5);").values, vec!["10"]);
        assert!(lox.run("print x;").values.is_empty());

        let output = String::from_utf8(lox.into_output()).expect("output is UTF-8");
        assert_eq!(output, "2\n");
    }

    #[test]
    fn test_repl_recovers_scope_after_fault() {
        let mut lox = Lox::new(Vec::new(), ExecMode::Repl);

        let faulted = lox.run("var a = 1; { var b = 2; print -nil; }");
        assert!(faulted.had_runtime_error());

        // The block's scope must not leak into the next line.
        let result = lox.run("print b;");
        assert_eq!(
            result.runtime_error.map(|e| e.to_string()).as_deref(),
            Some("Undefined variable 'b'.\n[line 1]")
        );

        assert_eq!(lox.run("a;").values, vec!["1"]);
    }

    #[test]
    fn test_repl_echoes_every_expression_statement() {
        let mut lox = Lox::new(Vec::new(), ExecMode::Repl);

        assert_eq!(lox.run("1; \"two\"; nil;").values, vec!["1", "two", "nil"]);

        // Values computed before a fault are still reported.
        let result = lox.run("3; -nil; 4;");
        assert_eq!(result.values, vec!["3"]);
        assert!(result.had_runtime_error());
    }
}
