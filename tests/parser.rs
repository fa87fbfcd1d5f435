mod common;

use pretty_assertions::assert_eq;

use common::{parse_errors, parse_to_strings};
use rox::ast::{Expr, Stmt};
use rox::ast_printer::AstPrinter;
use rox::parser::Parser;
use rox::scanner::scan_tokens;

#[test]
fn precedence_binds_factor_tighter_than_term() {
    assert_eq!(
        parse_to_strings("1 + 2 * 3;"),
        vec!["(; (+ 1.0 (* 2.0 3.0)))"]
    );
}

#[test]
fn binary_operators_are_left_associative() {
    assert_eq!(parse_to_strings("1 - 2 - 3;"), vec!["(; (- (- 1.0 2.0) 3.0))"]);
}

#[test]
fn assignment_is_right_associative() {
    assert_eq!(parse_to_strings("a = b = 1;"), vec!["(; (= a (= b 1.0)))"]);
}

#[test]
fn grouping_and_unary() {
    assert_eq!(
        parse_to_strings("print -(1 + 2) == !true;"),
        vec!["(print (== (- (group (+ 1.0 2.0))) (! true)))"]
    );
}

#[test]
fn logical_operators_nest_or_above_and() {
    assert_eq!(
        parse_to_strings("a or b and c;"),
        vec!["(; (or a (and b c)))"]
    );
}

#[test]
fn calls_and_property_access_chain() {
    assert_eq!(
        parse_to_strings("a.b(1, 2).c = 3;"),
        vec!["(; (= (. (call (. a b) 1.0 2.0) c) 3.0))"]
    );
}

#[test]
fn for_loop_desugars_into_block_and_while() {
    assert_eq!(
        parse_to_strings("for (var i = 0; i < 3; i = i + 1) print i;"),
        vec!["(block (var i 0.0) (while (< i 3.0) (block (print i) (; (= i (+ i 1.0))))))"]
    );
}

#[test]
fn for_loop_without_clauses_loops_on_true() {
    assert_eq!(
        parse_to_strings("for (;;) print 1;"),
        vec!["(while true (print 1.0))"]
    );
}

#[test]
fn declarations() {
    assert_eq!(
        parse_to_strings(
            "var x; fun add(a, b) { return a + b; } class B < A { init(n) { this.n = n; } m() { return super.m(); } }"
        ),
        vec![
            "(var x)",
            "(fun add (a b) (return (+ a b)))",
            "(class B < A (method init (n) (; (= (. this n) n))) (method m () (return (call (super m)))))",
        ]
    );
}

#[test]
fn if_else_binds_to_nearest_if() {
    assert_eq!(
        parse_to_strings("if (a) if (b) print 1; else print 2;"),
        vec!["(if a (if b (print 1.0) (print 2.0)))"]
    );
}

#[test]
fn missing_semicolon_reports_at_offending_token() {
    assert_eq!(
        parse_errors("print 1"),
        vec!["[line 1] Error at end: Expect ';' after value."]
    );
}

#[test]
fn parser_recovers_and_reports_every_statement_error() {
    assert_eq!(
        parse_errors("var = 1;\nprint 2;\nprint (3;\n"),
        vec![
            "[line 1] Error at '=': Expect variable name.",
            "[line 3] Error at ';': Expect ')' after expression.",
        ]
    );
}

#[test]
fn invalid_assignment_target_is_reported_without_stopping() {
    assert_eq!(
        parse_errors("1 + 2 = 3;\nvar = ;"),
        vec![
            "[line 1] Error at '=': Invalid assignment target.",
            "[line 2] Error at '=': Expect variable name.",
        ]
    );
}

#[test]
fn too_many_arguments_is_reported() {
    let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
    let source: String = format!("f({});", args.join(", "));

    assert_eq!(
        parse_errors(&source),
        vec!["[line 1] Error at '255': Can't have more than 255 arguments."]
    );
}

#[test]
fn expression_without_operand_reports_expect_expression() {
    assert_eq!(
        parse_errors("print ;"),
        vec!["[line 1] Error at ';': Expect expression."]
    );
}

#[test]
fn every_variable_reference_gets_a_distinct_id() {
    let (tokens, _) = scan_tokens("a; a; a = 1;");
    let statements: Vec<Stmt<'_>> = Parser::new(tokens).parse().unwrap();

    let ids: Vec<_> = statements
        .iter()
        .map(|stmt| match stmt {
            Stmt::Expression(Expr::Variable { id, .. }) => *id,
            Stmt::Expression(Expr::Assign { id, .. }) => *id,
            other => panic!("unexpected statement {:?}", other),
        })
        .collect();

    assert_eq!(ids.len(), 3);
    assert!(ids[0] != ids[1] && ids[1] != ids[2] && ids[0] != ids[2]);
}

#[test]
fn parse_expression_reads_a_single_expression() {
    let (tokens, _) = scan_tokens("(1 + 2) * -3");
    let expr: Expr<'_> = Parser::new(tokens).parse_expression().unwrap();

    assert_eq!(AstPrinter.print(&expr), "(* (group (+ 1.0 2.0)) (- 3.0))");
}

#[test]
fn parse_expression_rejects_trailing_tokens() {
    let (tokens, _) = scan_tokens("1 + 2 garbage )");
    let errors: Vec<String> = Parser::new(tokens)
        .parse_expression()
        .unwrap_err()
        .iter()
        .map(|e| e.to_string())
        .collect();

    assert_eq!(errors, vec!["[line 1] Error at 'garbage': Expect end of expression."]);
}

#[test]
fn parser_accepts_tokens_without_eof() {
    let (mut tokens, _) = scan_tokens("print 1;");
    tokens.pop();

    let statements: Vec<Stmt<'_>> = Parser::new(tokens).parse().unwrap();
    assert_eq!(statements.len(), 1);
}
