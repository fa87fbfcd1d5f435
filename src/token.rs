use std::fmt;
use std::mem;

use log::debug;
use serde::Serialize;

/// Declares [`TokenType`] with one unit variant per listed name plus the two
/// literal-carrying variants, and derives [`TokenType::name`] from the same
/// list so the printed names can never drift from the variants.
macro_rules! token_types {
    ($($(#[$doc:meta])* $name:ident,)*) => {
        /// The kinds of tokens the scanner produces.
        ///
        /// `STRING` and `NUMBER` carry their literal values; equality ignores
        /// that payload and compares only the kind.
        #[allow(non_camel_case_types)]
        #[derive(Debug, Clone, Serialize)]
        pub enum TokenType {
            $($(#[$doc])* $name,)*

            /// String literal contents, without quotes.
            STRING(String),

            /// Numeric literal value.
            NUMBER(f64),
        }

        impl TokenType {
            /// Name of the kind without its payload, as printed by `tokenize`.
            pub fn name(&self) -> &'static str {
                match self {
                    $(TokenType::$name => stringify!($name),)*
                    TokenType::STRING(_) => "STRING",
                    TokenType::NUMBER(_) => "NUMBER",
                }
            }
        }
    };
}

token_types! {
    // Single-character punctuation.
    LEFT_PAREN,
    RIGHT_PAREN,
    LEFT_BRACE,
    RIGHT_BRACE,
    COMMA,
    DOT,
    MINUS,
    PLUS,
    SEMICOLON,
    SLASH,
    STAR,

    // One- or two-character operators.
    BANG,
    BANG_EQUAL,
    EQUAL,
    EQUAL_EQUAL,
    GREATER,
    GREATER_EQUAL,
    LESS,
    LESS_EQUAL,

    /// A user-defined name.
    IDENTIFIER,

    // Reserved words.
    AND,
    CLASS,
    ELSE,
    FALSE,
    FUN,
    FOR,
    IF,
    NIL,
    OR,
    PRINT,
    RETURN,
    SUPER,
    THIS,
    TRUE,
    VAR,
    WHILE,

    /// End of input; always the last token.
    EOF,
}

impl PartialEq for TokenType {
    fn eq(&self, other: &Self) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

/// One lexeme of the source.  `lexeme` borrows the source text, so tokens
/// (and the AST built from them) cannot outlive it.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Token<'a> {
    pub token_type: TokenType,
    pub lexeme: &'a str,

    /// 1‑based.
    pub line: usize,
}

impl<'a> Token<'a> {
    pub fn new(token_type: TokenType, lexeme: &'a str, line: usize) -> Self {
        debug!("Token {} '{}' on line {}", token_type.name(), lexeme, line);

        Self {
            token_type,
            lexeme,
            line,
        }
    }

    /// A token that does not come from the source text, e.g. an `EOF`
    /// appended by the parser.
    pub fn synthetic(token_type: TokenType, lexeme: &'static str, line: usize) -> Self {
        Self {
            token_type,
            lexeme,
            line,
        }
    }
}

/// `TYPE lexeme literal`, with `null` for tokens that carry no literal and
/// integral numbers shown with one decimal place (`3` → `3.0`).
impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ", self.token_type.name(), self.lexeme)?;

        match &self.token_type {
            TokenType::STRING(s) => f.write_str(s),
            TokenType::NUMBER(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                let mut buf: itoa::Buffer = itoa::Buffer::new();
                write!(f, "{}.0", buf.format(*n as i64))
            }
            TokenType::NUMBER(n) if n.fract() == 0.0 => write!(f, "{:.1}", n),
            TokenType::NUMBER(n) => write!(f, "{}", n),
            _ => f.write_str("null"),
        }
    }
}
