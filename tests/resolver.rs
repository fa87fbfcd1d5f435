mod common;

use pretty_assertions::assert_eq;

use common::run;
use rox::ast::Stmt;
use rox::parser::Parser;
use rox::resolver::{Locals, Resolver};
use rox::scanner::scan_tokens;

fn resolve(source: &str) -> Result<Locals, Vec<String>> {
    let (tokens, lex_errors) = scan_tokens(source);
    assert!(lex_errors.is_empty());

    let statements: Vec<Stmt<'_>> = Parser::new(tokens).parse().unwrap();

    Resolver::new()
        .resolve(&statements)
        .map_err(|errors| errors.iter().map(|e| e.to_string()).collect())
}

fn resolve_errors(source: &str) -> Vec<String> {
    match resolve(source) {
        Ok(locals) => panic!("expected resolution errors, got {:?}", locals),
        Err(errors) => errors,
    }
}

#[test]
fn globals_are_not_recorded() {
    let locals: Locals = resolve("var a = 1; print a; a = 2;").unwrap();
    assert!(locals.is_empty());
}

#[test]
fn locals_record_their_scope_distance() {
    let locals: Locals = resolve("{ var a = 1; { { print a; } } }").unwrap();

    let distances: Vec<usize> = locals.values().copied().collect();
    assert_eq!(distances, vec![2]);
}

#[test]
fn resolution_is_deterministic() {
    let source: &str = "fun outer() { var x = 1; fun inner() { return x; } return inner; }";

    let (tokens, _) = scan_tokens(source);
    let statements: Vec<Stmt<'_>> = Parser::new(tokens).parse().unwrap();

    let first: Locals = Resolver::new().resolve(&statements).unwrap();
    let second: Locals = Resolver::new().resolve(&statements).unwrap();

    assert_eq!(first, second);
}

#[test]
fn reading_local_in_its_own_initializer() {
    assert_eq!(
        resolve_errors("{ var a = 1; { var a = a; } }"),
        vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
    );
}

#[test]
fn global_self_reference_in_initializer_is_allowed() {
    assert!(resolve("var a = 1; var a = a;").is_ok());
}

#[test]
fn duplicate_local_declaration() {
    assert_eq!(
        resolve_errors("fun f() { var a; var a; }"),
        vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
    );
}

#[test]
fn duplicate_parameter_name() {
    assert_eq!(
        resolve_errors("fun f(a, a) {}"),
        vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
    );
}

#[test]
fn return_at_top_level() {
    assert_eq!(
        resolve_errors("return 1;"),
        vec!["[line 1] Error at 'return': Can't return from top-level code."]
    );
}

#[test]
fn returning_a_value_from_an_initializer() {
    assert_eq!(
        resolve_errors("class A { init() { return 1; } }"),
        vec!["[line 1] Error at 'return': Can't return a value from an initializer."]
    );
}

#[test]
fn bare_return_in_initializer_is_allowed() {
    assert!(resolve("class A { init() { return; } }").is_ok());
}

#[test]
fn this_outside_of_class() {
    assert_eq!(
        resolve_errors("print this;\nfun f() { return this; }"),
        vec![
            "[line 1] Error at 'this': Can't use 'this' outside of a class.",
            "[line 2] Error at 'this': Can't use 'this' outside of a class.",
        ]
    );
}

#[test]
fn super_outside_of_class() {
    assert_eq!(
        resolve_errors("super.m();"),
        vec!["[line 1] Error at 'super': Can't use 'super' outside of a class."]
    );
}

#[test]
fn super_without_superclass() {
    assert_eq!(
        resolve_errors("class A { m() { super.m(); } }"),
        vec!["[line 1] Error at 'super': Can't use 'super' in a class with no superclass."]
    );
}

#[test]
fn class_inheriting_from_itself() {
    assert_eq!(
        resolve_errors("class A < A {}"),
        vec!["[line 1] Error at 'A': A class can't inherit from itself."]
    );
}

#[test]
fn resolver_errors_prevent_execution() {
    let outcome = run("print \"before\";\nreturn;");

    assert_eq!(outcome.output, "");
    assert_eq!(
        outcome.static_errors,
        vec!["[line 2] Error at 'return': Can't return from top-level code."]
    );
    assert_eq!(outcome.runtime_error, None);
}
