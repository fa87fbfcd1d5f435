#![allow(dead_code)]

use rox::ast::Stmt;
use rox::ast_printer::AstPrinter;
use rox::interpreter::{Interpreter, DEFAULT_MAX_CALL_DEPTH};
use rox::parser::Parser;
use rox::resolver::Resolver;
use rox::scanner::scan_tokens;

/// Everything a program run produced: `print` output, static diagnostics
/// (which prevent execution) and at most one runtime diagnostic.
#[derive(Debug, Default)]
pub struct Outcome {
    pub output: String,
    pub static_errors: Vec<String>,
    pub runtime_error: Option<String>,
}

impl Outcome {
    pub fn lines(&self) -> Vec<&str> {
        self.output.lines().collect()
    }
}

pub fn run(source: &str) -> Outcome {
    run_with_depth(source, DEFAULT_MAX_CALL_DEPTH)
}

/// Scan, parse, resolve and interpret `source`, capturing output in memory.
pub fn run_with_depth(source: &str, max_call_depth: usize) -> Outcome {
    let mut outcome: Outcome = Outcome::default();

    let (tokens, lex_errors) = scan_tokens(source);
    outcome
        .static_errors
        .extend(lex_errors.iter().map(|e| e.to_string()));

    let statements: Vec<Stmt<'_>> = match Parser::new(tokens).parse() {
        Ok(statements) => statements,
        Err(errors) => {
            outcome
                .static_errors
                .extend(errors.iter().map(|e| e.to_string()));
            return outcome;
        }
    };

    if !outcome.static_errors.is_empty() {
        return outcome;
    }

    let locals = match Resolver::new().resolve(&statements) {
        Ok(locals) => locals,
        Err(errors) => {
            outcome.static_errors = errors.iter().map(|e| e.to_string()).collect();
            return outcome;
        }
    };

    let mut buf: Vec<u8> = Vec::new();
    {
        let mut interpreter: Interpreter<'_> =
            Interpreter::with_output(Box::new(&mut buf)).with_max_call_depth(max_call_depth);

        if let Err(e) = interpreter.interpret(&statements, locals) {
            outcome.runtime_error = Some(e.to_string());
        }
    }

    outcome.output = String::from_utf8(buf).expect("interpreter output is UTF-8");
    outcome
}

/// Parse `source` and render every statement with [`AstPrinter`].
pub fn parse_to_strings(source: &str) -> Vec<String> {
    let (tokens, lex_errors) = scan_tokens(source);
    assert!(lex_errors.is_empty(), "unexpected lex errors: {:?}", lex_errors);

    let statements: Vec<Stmt<'_>> = Parser::new(tokens)
        .parse()
        .unwrap_or_else(|errors| panic!("unexpected parse errors: {:?}", errors));

    let printer: AstPrinter = AstPrinter;
    statements.iter().map(|s| printer.print_stmt(s)).collect()
}

/// Parse `source`, expecting failure, and return the rendered diagnostics.
pub fn parse_errors(source: &str) -> Vec<String> {
    let (tokens, _) = scan_tokens(source);

    match Parser::new(tokens).parse() {
        Ok(statements) => panic!("expected parse errors, got {:?}", statements),
        Err(errors) => errors.iter().map(|e| e.to_string()).collect(),
    }
}
