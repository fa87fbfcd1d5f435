use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::{Builder, Env};
use log::{debug, info};
use memmap2::Mmap;

use rox::ast_printer::AstPrinter;
use rox::error::LoxError;
use rox::interpreter::{Interpreter, DEFAULT_MAX_CALL_DEPTH};
use rox::parser::Parser;
use rox::resolver::Resolver;
use rox::scanner::scan_tokens;

/// Exit status for lexical, syntax and resolution errors.
const EXIT_STATIC_ERROR: u8 = 65;

/// Exit status for runtime errors.
const EXIT_RUNTIME_ERROR: u8 = 70;

const LOG_FILE: &str = "rox.log";

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to rox.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print one JSON object per token instead of `TYPE lexeme literal`
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file and prints the AST of each statement
    Parse { filename: PathBuf },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs input from a file as a Lox program
    Run {
        filename: PathBuf,

        /// Maximum nesting of function calls before "Stack overflow."
        #[arg(long, default_value_t = DEFAULT_MAX_CALL_DEPTH)]
        max_call_depth: usize,
    },
}

/// Source text of a file.  Non-empty files are memory mapped; empty files
/// cannot be, so they short-circuit to an empty string.
enum Source {
    Mapped(Mmap),
    Empty,
}

impl Source {
    fn open(path: &Path) -> Result<Self> {
        info!("Reading file: {:?}", path);

        let file: File = File::open(path).with_context(|| format!("Failed to open file {:?}", path))?;
        let len: u64 = file
            .metadata()
            .with_context(|| format!("Failed to stat file {:?}", path))?
            .len();

        if len == 0 {
            return Ok(Source::Empty);
        }

        // SAFETY: the mapping is read-only and lives only as long as this
        // process reads it; concurrent truncation by another process is not
        // supported.
        let map: Mmap = unsafe { Mmap::map(&file) }.with_context(|| format!("Failed to map file {:?}", path))?;

        info!("Mapped {} bytes from {:?}", map.len(), path);

        Ok(Source::Mapped(map))
    }

    fn as_str(&self) -> Result<&str> {
        match self {
            Source::Mapped(map) => std::str::from_utf8(map)
                .map_err(LoxError::from)
                .context("Source file is not valid UTF-8"),
            Source::Empty => Ok(""),
        }
    }
}

fn init_logger() -> Result<()> {
    let log_file: File = File::create(LOG_FILE).with_context(|| format!("Failed to create {}", LOG_FILE))?;

    Builder::from_env(Env::default().default_filter_or("debug"))
        .format(|buf, record| {
            let module: &str = record.module_path().unwrap_or("<unnamed>");
            let module: &str = module.strip_prefix("rox::").unwrap_or(module);

            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    info!("Logger initialized, writing to {}", LOG_FILE);
    Ok(())
}

fn report(errors: &[LoxError]) {
    for e in errors {
        debug!("Static error: {:?}", e);
        eprintln!("{}", e);
    }
}

fn tokenize(src: &str, json: bool) -> Result<ExitCode> {
    let (tokens, errors) = scan_tokens(src);

    // Diagnostics go to stderr while tokens stream to stdout.
    report(&errors);

    for token in &tokens {
        if json {
            println!("{}", serde_json::to_string(token).context("Failed to serialize token")?);
        } else {
            println!("{}", token);
        }
    }

    if errors.is_empty() {
        info!("Tokenization completed successfully");
        Ok(ExitCode::SUCCESS)
    } else {
        debug!("Tokenization failed, exiting with code {}", EXIT_STATIC_ERROR);
        Ok(ExitCode::from(EXIT_STATIC_ERROR))
    }
}

fn parse(src: &str) -> ExitCode {
    let (tokens, lex_errors) = scan_tokens(src);
    report(&lex_errors);

    match Parser::new(tokens).parse() {
        Ok(statements) if lex_errors.is_empty() => {
            let printer: AstPrinter = AstPrinter;

            for stmt in &statements {
                println!("{}", printer.print_stmt(stmt));
            }

            info!("Parse subcommand completed");
            ExitCode::SUCCESS
        }

        Ok(_) => ExitCode::from(EXIT_STATIC_ERROR),

        Err(errors) => {
            report(&errors);
            ExitCode::from(EXIT_STATIC_ERROR)
        }
    }
}

fn evaluate(src: &str) -> ExitCode {
    let (tokens, lex_errors) = scan_tokens(src);
    report(&lex_errors);

    let expr = match Parser::new(tokens).parse_expression() {
        Ok(expr) if lex_errors.is_empty() => expr,

        Ok(_) => return ExitCode::from(EXIT_STATIC_ERROR),

        Err(errors) => {
            report(&errors);
            return ExitCode::from(EXIT_STATIC_ERROR);
        }
    };

    let mut interpreter: Interpreter<'_> = Interpreter::new();

    match interpreter.evaluate(&expr) {
        Ok(value) => {
            debug!("Evaluated to: {}", value);
            println!("{}", value);
            ExitCode::SUCCESS
        }

        Err(e) => {
            debug!("Evaluation debug: {:?}", e);
            eprintln!("{}", e);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}

fn run(src: &str, max_call_depth: usize) -> ExitCode {
    let (tokens, lex_errors) = scan_tokens(src);
    report(&lex_errors);

    // Parse even after lexical errors so every static diagnostic is shown.
    let statements = match Parser::new(tokens).parse() {
        Ok(statements) => statements,

        Err(errors) => {
            report(&errors);
            return ExitCode::from(EXIT_STATIC_ERROR);
        }
    };

    if !lex_errors.is_empty() {
        return ExitCode::from(EXIT_STATIC_ERROR);
    }

    info!("Parsed {} statements", statements.len());

    let locals = match Resolver::new().resolve(&statements) {
        Ok(locals) => locals,

        Err(errors) => {
            report(&errors);
            return ExitCode::from(EXIT_STATIC_ERROR);
        }
    };

    let mut interpreter: Interpreter<'_> = Interpreter::new().with_max_call_depth(max_call_depth);

    match interpreter.interpret(&statements, locals) {
        Ok(()) => {
            info!("Program executed successfully");
            ExitCode::SUCCESS
        }

        Err(e) => {
            debug!("Runtime debug: {:?}", e);
            eprintln!("{}", e);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}

fn main() -> Result<ExitCode> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    }

    info!("CLI arguments: {:?}", args);

    let code: ExitCode = match args.commands {
        Commands::Tokenize { filename, json } => {
            info!("Running Tokenize subcommand");
            let source: Source = Source::open(&filename)?;
            tokenize(source.as_str()?, json)?
        }

        Commands::Parse { filename } => {
            info!("Running Parse subcommand");
            let source: Source = Source::open(&filename)?;
            parse(source.as_str()?)
        }

        Commands::Evaluate { filename } => {
            info!("Running Evaluate subcommand");
            let source: Source = Source::open(&filename)?;
            evaluate(source.as_str()?)
        }

        Commands::Run {
            filename,
            max_call_depth,
        } => {
            info!("Running Run subcommand");
            let source: Source = Source::open(&filename)?;
            run(source.as_str()?, max_call_depth)
        }
    };

    Ok(code)
}
