//! Diagnostics raised by every stage of the pipeline.
//!
//! Scanner, parser and resolver failures are *static*: they are collected in
//! bulk and stop a program before it runs.  They render as
//! `[line N] Error<location>: message`.  A runtime failure aborts execution
//! and renders as `message\n[line N]`.  I/O and UTF-8 failures pass through
//! untouched so the CLI can attach `anyhow` context to them.
//!
//! Nothing here prints; callers decide where diagnostics go.

use std::io;
use thiserror::Error;

use log::info;

use crate::token::{Token, TokenType};

/// Every failure the interpreter can report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Bad character or unterminated string.
    #[error("[line {line}] Error: {message}")]
    Lex {
        message: String,

        /// 1‑based.
        line: usize,
    },

    /// Syntactic (parser) error.  `location` is either ` at 'lexeme'` or
    /// ` at end`.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        location: String,
        line: usize,
    },

    /// Static‑analysis failure reported by the resolver.
    #[error("[line {line}] Error{location}: {message}")]
    Resolve {
        message: String,
        location: String,
        line: usize,
    },

    /// Runtime evaluation error.  Aborts the rest of the program.
    #[error("{message}\n[line {line}]")]
    Runtime {
        message: String,

        /// Lexeme of the token the error is reported at, e.g. the operator
        /// whose operands had the wrong type.
        lexeme: String,
        line: usize,
    },

    /// Reading a source file or writing program output failed.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// A source file is not valid UTF‑8.
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),
}

/// Render the ` at '…'` / ` at end` suffix for a diagnostic anchored on `token`.
fn location_of(token: &Token<'_>) -> String {
    if token.token_type == TokenType::EOF {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

impl LoxError {
    /// Scanner diagnostic; carries no token, only a line.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Syntax error anchored on `token`.
    pub fn parse<S: Into<String>>(token: &Token<'_>, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        LoxError::Parse {
            message,
            location: location_of(token),
            line: token.line,
        }
    }

    /// Scope or context error anchored on `token`.
    pub fn resolve<S: Into<String>>(token: &Token<'_>, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", token.line, message);

        LoxError::Resolve {
            message,
            location: location_of(token),
            line: token.line,
        }
    }

    /// Runtime failure reported at `token`'s line.
    pub fn runtime<S: Into<String>>(token: &Token<'_>, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", token.line, message);

        LoxError::Runtime {
            message,
            lexeme: token.lexeme.to_string(),
            line: token.line,
        }
    }

    /// `true` for errors that must stop a program before it starts running.
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            LoxError::Lex { .. } | LoxError::Parse { .. } | LoxError::Resolve { .. }
        )
    }

    /// Lexeme a runtime error was reported at.
    pub fn lexeme(&self) -> Option<&str> {
        match self {
            LoxError::Runtime { lexeme, .. } => Some(lexeme),
            _ => None,
        }
    }

    /// Source line the diagnostic points at, if it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            LoxError::Lex { line, .. }
            | LoxError::Parse { line, .. }
            | LoxError::Resolve { line, .. }
            | LoxError::Runtime { line, .. } => Some(*line),
            LoxError::Io(_) | LoxError::Utf8(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LoxError>;
