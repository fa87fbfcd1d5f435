//! Streaming lexer.
//!
//! [`Scanner`] walks the source bytes once and yields `Result<Token<'a>>`
//! items: a bad character produces one `Err` and scanning resumes right after
//! it.  Exactly one `EOF` token ends the stream, after which the iterator is
//! fused.  Lexemes are slices of the source, so tokens borrow it for `'a`.
//!
//! ```rust
//! use rox::scanner::Scanner;
//!
//! for result in Scanner::new("print 123; // example") {
//!     match result {
//!         Ok(token) => println!("{}", token),
//!         Err(err) => eprintln!("{}", err),
//!     }
//! }
//! ```

use std::iter::FusedIterator;

use log::{debug, info};
use memchr::memchr;
use phf::phf_map;

use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};

static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "and"    => TokenType::AND,
    "class"  => TokenType::CLASS,
    "else"   => TokenType::ELSE,
    "false"  => TokenType::FALSE,
    "fun"    => TokenType::FUN,
    "for"    => TokenType::FOR,
    "if"     => TokenType::IF,
    "nil"    => TokenType::NIL,
    "or"     => TokenType::OR,
    "print"  => TokenType::PRINT,
    "return" => TokenType::RETURN,
    "super"  => TokenType::SUPER,
    "this"   => TokenType::THIS,
    "true"   => TokenType::TRUE,
    "var"    => TokenType::VAR,
    "while"  => TokenType::WHILE,
};

pub struct Scanner<'a> {
    src: &'a str,

    /// Byte offset where the lexeme being scanned begins.
    start: usize,

    /// Byte offset of the next unread byte.
    current: usize,

    /// 1‑based line of `current`.
    line: usize,

    /// Set once `EOF` has been yielded.
    done: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            start: 0,
            current: 0,
            line: 1,
            done: false,
        }
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.current >= self.src.len()
    }

    /// The byte at `current + offset`, or `0` past the end.
    #[inline]
    fn byte_at(&self, offset: usize) -> u8 {
        self.src
            .as_bytes()
            .get(self.current + offset)
            .copied()
            .unwrap_or(0)
    }

    #[inline]
    fn bump(&mut self) -> u8 {
        let b: u8 = self.byte_at(0);
        self.current += 1;
        b
    }

    #[inline]
    fn eat(&mut self, expected: u8) -> bool {
        let hit: bool = !self.is_at_end() && self.byte_at(0) == expected;
        if hit {
            self.current += 1;
        }
        hit
    }

    /// `matched` if the next byte is `=`, else `single`.
    fn with_equals(&mut self, matched: TokenType, single: TokenType) -> TokenType {
        if self.eat(b'=') {
            matched
        } else {
            single
        }
    }

    /// Scan from `start`.  `Ok(None)` means whitespace or a comment was
    /// skipped and there is nothing to emit yet.
    fn lex(&mut self) -> Result<Option<TokenType>> {
        let token_type: TokenType = match self.bump() {
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,

            b'!' => self.with_equals(TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.with_equals(TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            b'<' => self.with_equals(TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.with_equals(TokenType::GREATER_EQUAL, TokenType::GREATER),

            b'/' if self.eat(b'/') => {
                self.skip_line_comment();
                return Ok(None);
            }
            b'/' => TokenType::SLASH,

            b' ' | b'\r' | b'\t' => return Ok(None),

            b'\n' => {
                self.line += 1;
                return Ok(None);
            }

            b'"' => self.string()?,

            b'0'..=b'9' => self.number(),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),

            other => {
                // Step over the whole code point so the next lexeme starts on
                // a char boundary.
                let ch: char = self.src[self.start..]
                    .chars()
                    .next()
                    .unwrap_or(other as char);
                self.current = self.start + ch.len_utf8();

                return Err(LoxError::lex(self.line, format!("Unexpected character: {}", ch)));
            }
        };

        Ok(Some(token_type))
    }

    /// Leaves `current` on the terminating newline so it is counted.
    fn skip_line_comment(&mut self) {
        let rest: &[u8] = &self.src.as_bytes()[self.current..];

        self.current = match memchr(b'\n', rest) {
            Some(offset) => self.current + offset,
            None => self.src.len(),
        };
    }

    /// A `"…"` literal, possibly spanning lines; the payload excludes quotes.
    fn string(&mut self) -> Result<TokenType> {
        while !self.is_at_end() && self.byte_at(0) != b'"' {
            if self.bump() == b'\n' {
                self.line += 1;
            }
        }

        if self.is_at_end() {
            return Err(LoxError::lex(self.line, "Unterminated string."));
        }

        self.current += 1;

        let contents: &str = &self.src[self.start + 1..self.current - 1];

        Ok(TokenType::STRING(contents.to_owned()))
    }

    /// Digits with an optional `.digits` fraction.  A trailing `.` is left
    /// for the next token.
    fn number(&mut self) -> TokenType {
        self.skip_digits();

        if self.byte_at(0) == b'.' && self.byte_at(1).is_ascii_digit() {
            self.current += 1;
            self.skip_digits();
        }

        let text: &str = &self.src[self.start..self.current];

        // Only ASCII digits and at most one interior dot reach here.
        TokenType::NUMBER(text.parse::<f64>().unwrap_or_default())
    }

    fn skip_digits(&mut self) {
        while self.byte_at(0).is_ascii_digit() {
            self.current += 1;
        }
    }

    fn identifier(&mut self) -> TokenType {
        while matches!(self.byte_at(0), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') {
            self.current += 1;
        }

        let text: &str = &self.src[self.start..self.current];

        KEYWORDS.get(text).cloned().unwrap_or(TokenType::IDENTIFIER)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        while !self.is_at_end() {
            self.start = self.current;

            match self.lex() {
                Ok(Some(token_type)) => {
                    let src: &'a str = self.src;
                    let lexeme: &'a str = &src[self.start..self.current];
                    debug!("Scanned {:?} on line {}", token_type, self.line);

                    return Some(Ok(Token::new(token_type, lexeme, self.line)));
                }
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }

        self.done = true;
        info!("Scanner reached EOF on line {}", self.line);

        Some(Ok(Token::new(TokenType::EOF, "", self.line)))
    }
}

impl<'a> FusedIterator for Scanner<'a> {}

/// Scan the whole of `src`, returning every token (always ending in `EOF`)
/// together with every lexical error encountered along the way.
///
/// Callers must not evaluate a program whose error list is non‑empty.
pub fn scan_tokens(src: &str) -> (Vec<Token<'_>>, Vec<LoxError>) {
    let mut tokens: Vec<Token<'_>> = Vec::new();
    let mut errors: Vec<LoxError> = Vec::new();

    for result in Scanner::new(src) {
        match result {
            Ok(token) => tokens.push(token),
            Err(e) => errors.push(e),
        }
    }

    info!(
        "Scanned {} token(s) with {} error(s)",
        tokens.len(),
        errors.len()
    );

    (tokens, errors)
}
