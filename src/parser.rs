//! Recursive‑descent parser: tokens in, statement list out.
//!
//! Every precedence level of the expression grammar is one method; the four
//! left‑associative binary levels share [`Parser::binary`].  Syntax errors do
//! not stop the parse: the failing declaration is dropped, the parser skips to
//! the next statement boundary and carries on, so a single run reports every
//! independent mistake.
//!
//! ```text
//! program     → declaration* EOF ;
//! declaration → "class" IDENT ( "<" IDENT )? "{" function* "}"
//!             | "fun" function
//!             | "var" IDENT ( "=" expression )? ";"
//!             | statement ;
//! function    → IDENT "(" ( IDENT ( "," IDENT )* )? ")" block ;
//! statement   → "for" "(" ( varDecl | exprStmt | ";" ) expression? ";" expression? ")" statement
//!             | "if" "(" expression ")" statement ( "else" statement )?
//!             | "while" "(" expression ")" statement
//!             | "return" expression? ";"
//!             | "print" expression ";"
//!             | block
//!             | expression ";" ;
//! expression  → ( call "." )? IDENT "=" expression | or ;
//! or          → and ( "or" and )* ;
//! and         → equality ( "and" equality )* ;
//! equality    → comparison ( ( "!=" | "==" ) comparison )* ;
//! comparison  → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
//! term        → factor ( ( "-" | "+" ) factor )* ;
//! factor      → unary ( ( "/" | "*" ) unary )* ;
//! unary       → ( "!" | "-" ) unary | call ;
//! call        → primary ( "(" arguments? ")" | "." IDENT )* ;
//! primary     → NUMBER | STRING | "true" | "false" | "nil" | "this"
//!             | IDENT | "(" expression ")" | "super" "." IDENT ;
//! ```
//!
//! `for` never reaches the AST: it is rewritten into a block holding the
//! initializer and a `while` loop.

use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::error::{LoxError, Result};
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenType};

/// Upper bound on parameters and call arguments.
const MAX_ARGS: usize = 255;

const EQUALITY_OPS: &[TokenType] = &[TokenType::BANG_EQUAL, TokenType::EQUAL_EQUAL];

const COMPARISON_OPS: &[TokenType] = &[
    TokenType::GREATER,
    TokenType::GREATER_EQUAL,
    TokenType::LESS,
    TokenType::LESS_EQUAL,
];

const TERM_OPS: &[TokenType] = &[TokenType::MINUS, TokenType::PLUS];

const FACTOR_OPS: &[TokenType] = &[TokenType::SLASH, TokenType::STAR];

type Production<'a> = fn(&mut Parser<'a>) -> Result<Expr<'a>>;

pub struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    current: usize,

    /// Next [`ExprId`] to hand out.
    next_id: usize,

    /// Diagnostics that did not abort the current declaration.
    errors: Vec<LoxError>,
}

impl<'a> Parser<'a> {
    /// `tokens` normally comes from [`crate::scanner::scan_tokens`]; an `EOF`
    /// sentinel is appended if the caller left it off.
    pub fn new(mut tokens: Vec<Token<'a>>) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        if !matches!(tokens.last(), Some(t) if t.token_type == TokenType::EOF) {
            let line: usize = tokens.last().map_or(1, |t| t.line);
            tokens.push(Token::synthetic(TokenType::EOF, "", line));
        }

        Self {
            tokens,
            current: 0,
            next_id: 0,
            errors: Vec::new(),
        }
    }

    /// Parse a whole program.  Fails with every syntax error found if there
    /// was at least one.
    pub fn parse(mut self) -> std::result::Result<Vec<Stmt<'a>>, Vec<LoxError>> {
        info!("Beginning parse phase");

        let mut statements: Vec<Stmt<'a>> = Vec::new();
        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        if self.errors.is_empty() {
            info!("Parsed {} top-level statement(s)", statements.len());
            Ok(statements)
        } else {
            info!("Parse failed with {} error(s)", self.errors.len());
            Err(self.errors)
        }
    }

    /// Parse a single expression, as the `evaluate` subcommand does.
    pub fn parse_expression(mut self) -> std::result::Result<Expr<'a>, Vec<LoxError>> {
        let result: Result<Expr<'a>> = self.expression().and_then(|expr| {
            if self.is_at_end() {
                Ok(expr)
            } else {
                Err(LoxError::parse(self.peek(), "Expect end of expression."))
            }
        });

        match result {
            Ok(expr) if self.errors.is_empty() => Ok(expr),
            Ok(_) => Err(self.errors),
            Err(e) => {
                self.errors.push(e);
                Err(self.errors)
            }
        }
    }

    // ───────────────────────────── declarations ─────────────────────────────

    /// One declaration, or `None` after recording an error and resynchronising.
    fn declaration(&mut self) -> Option<Stmt<'a>> {
        let keyword: TokenType = self.peek().token_type.clone();

        let result: Result<Stmt<'a>> = match keyword {
            TokenType::CLASS => {
                self.advance();
                self.class_declaration()
            }
            TokenType::FUN => {
                self.advance();
                self.function("function").map(Stmt::Function)
            }
            TokenType::VAR => {
                self.advance();
                self.var_declaration()
            }
            _ => self.statement(),
        };

        result
            .map_err(|e| {
                debug!("Recovering from parse error: {}", e);
                self.errors.push(e);
                self.synchronize();
            })
            .ok()
    }

    fn class_declaration(&mut self) -> Result<Stmt<'a>> {
        let name: Token<'a> = self.consume(TokenType::IDENTIFIER, "Expect class name.")?;

        let superclass: Option<Expr<'a>> = match self.advance_if(TokenType::LESS) {
            Some(_) => {
                let name: Token<'a> = self.consume(TokenType::IDENTIFIER, "Expect superclass name.")?;
                Some(self.variable(name))
            }
            None => None,
        };

        self.consume(TokenType::LEFT_BRACE, "Expect '{' before class body.")?;

        let mut methods: Vec<Rc<FunctionDecl<'a>>> = Vec::new();
        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }

        self.consume(TokenType::RIGHT_BRACE, "Expect '}' after class body.")?;

        debug!("Parsed class '{}' with {} method(s)", name.lexeme, methods.len());

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    /// `kind` is `"function"` or `"method"` and only flavours diagnostics.
    fn function(&mut self, kind: &str) -> Result<Rc<FunctionDecl<'a>>> {
        let name: Token<'a> = self.consume(TokenType::IDENTIFIER, &format!("Expect {} name.", kind))?;
        self.consume(TokenType::LEFT_PAREN, &format!("Expect '(' after {} name.", kind))?;

        let params: Vec<Token<'a>> = self.comma_separated("parameters", |p| {
            p.consume(TokenType::IDENTIFIER, "Expect parameter name.")
        })?;
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after parameters.")?;

        self.consume(TokenType::LEFT_BRACE, &format!("Expect '{{' before {} body.", kind))?;
        let body: Vec<Stmt<'a>> = self.block()?;

        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    fn var_declaration(&mut self) -> Result<Stmt<'a>> {
        let name: Token<'a> = self.consume(TokenType::IDENTIFIER, "Expect variable name.")?;

        let initializer: Option<Expr<'a>> = match self.advance_if(TokenType::EQUAL) {
            Some(_) => Some(self.expression()?),
            None => None,
        };

        self.consume(TokenType::SEMICOLON, "Expect ';' after variable declaration.")?;

        Ok(Stmt::Var { name, initializer })
    }

    // ───────────────────────────── statements ───────────────────────────────

    fn statement(&mut self) -> Result<Stmt<'a>> {
        ensure_sufficient_stack(|| -> Result<Stmt<'a>> {
            let keyword: TokenType = self.peek().token_type.clone();

            match keyword {
                TokenType::FOR => {
                    self.advance();
                    self.for_statement()
                }
                TokenType::IF => {
                    self.advance();
                    self.if_statement()
                }
                TokenType::WHILE => {
                    self.advance();
                    self.while_statement()
                }
                TokenType::RETURN => {
                    self.advance();
                    self.return_statement()
                }
                TokenType::PRINT => {
                    self.advance();
                    let value: Expr<'a> = self.expression()?;
                    self.consume(TokenType::SEMICOLON, "Expect ';' after value.")?;
                    Ok(Stmt::Print(value))
                }
                TokenType::LEFT_BRACE => {
                    self.advance();
                    Ok(Stmt::Block(self.block()?))
                }
                _ => self.expression_statement(),
            }
        })
    }

    /// `for (init; cond; incr) body` becomes
    /// `{ init; while (cond) { body; incr; } }`, with a missing condition
    /// standing in for `true`.
    fn for_statement(&mut self) -> Result<Stmt<'a>> {
        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'for'.")?;

        let first: TokenType = self.peek().token_type.clone();

        let initializer: Option<Stmt<'a>> = match first {
            TokenType::SEMICOLON => {
                self.advance();
                None
            }
            TokenType::VAR => {
                self.advance();
                Some(self.var_declaration()?)
            }
            _ => Some(self.expression_statement()?),
        };

        let condition: Expr<'a> = if self.check(TokenType::SEMICOLON) {
            Expr::Literal(LiteralValue::True)
        } else {
            self.expression()?
        };
        self.consume(TokenType::SEMICOLON, "Expect ';' after loop condition.")?;

        let increment: Option<Expr<'a>> = if self.check(TokenType::RIGHT_PAREN) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after for clauses.")?;

        let body: Stmt<'a> = self.statement()?;

        let body: Stmt<'a> = match increment {
            Some(increment) => Stmt::Block(vec![body, Stmt::Expression(increment)]),
            None => body,
        };

        let looped: Stmt<'a> = Stmt::While {
            condition,
            body: Box::new(body),
        };

        debug!("Desugared for loop into while");

        Ok(match initializer {
            Some(initializer) => Stmt::Block(vec![initializer, looped]),
            None => looped,
        })
    }

    fn if_statement(&mut self) -> Result<Stmt<'a>> {
        let condition: Expr<'a> = self.parenthesized("if", "if condition")?;

        let then_branch: Box<Stmt<'a>> = Box::new(self.statement()?);
        let else_branch: Option<Box<Stmt<'a>>> = match self.advance_if(TokenType::ELSE) {
            Some(_) => Some(Box::new(self.statement()?)),
            None => None,
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt<'a>> {
        let condition: Expr<'a> = self.parenthesized("while", "condition")?;
        let body: Box<Stmt<'a>> = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    fn return_statement(&mut self) -> Result<Stmt<'a>> {
        let keyword: Token<'a> = self.previous();

        let value: Option<Expr<'a>> = if self.check(TokenType::SEMICOLON) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::SEMICOLON, "Expect ';' after return value.")?;

        Ok(Stmt::Return { keyword, value })
    }

    fn expression_statement(&mut self) -> Result<Stmt<'a>> {
        let expr: Expr<'a> = self.expression()?;
        self.consume(TokenType::SEMICOLON, "Expect ';' after expression.")?;

        Ok(Stmt::Expression(expr))
    }

    /// The declarations of a `{ … }` body; the opening brace is already
    /// consumed.
    fn block(&mut self) -> Result<Vec<Stmt<'a>>> {
        let mut statements: Vec<Stmt<'a>> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            statements.extend(self.declaration());
        }

        self.consume(TokenType::RIGHT_BRACE, "Expect '}' after block.")?;

        Ok(statements)
    }

    /// `( expression )` following `keyword`.
    fn parenthesized(&mut self, keyword: &str, what: &str) -> Result<Expr<'a>> {
        self.consume(TokenType::LEFT_PAREN, &format!("Expect '(' after '{}'.", keyword))?;
        let expr: Expr<'a> = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, &format!("Expect ')' after {}.", what))?;

        Ok(expr)
    }

    // ───────────────────────────── expressions ──────────────────────────────

    fn expression(&mut self) -> Result<Expr<'a>> {
        ensure_sufficient_stack(|| self.assignment())
    }

    fn assignment(&mut self) -> Result<Expr<'a>> {
        let target: Expr<'a> = self.or()?;

        let Some(equals) = self.advance_if(TokenType::EQUAL) else {
            return Ok(target);
        };

        // Right‑associative: `a = b = c` assigns `c` to `b` first.
        let value: Box<Expr<'a>> = Box::new(self.assignment()?);

        match target {
            Expr::Variable { name, .. } => Ok(Expr::Assign {
                id: self.fresh_id(),
                name,
                value,
            }),
            Expr::Get { object, name } => Ok(Expr::Set {
                object,
                name,
                value,
            }),
            other => {
                // Not fatal: the parser knows exactly where it is.
                self.errors.push(LoxError::parse(&equals, "Invalid assignment target."));
                Ok(other)
            }
        }
    }

    fn or(&mut self) -> Result<Expr<'a>> {
        self.logical(TokenType::OR, Self::and)
    }

    fn and(&mut self) -> Result<Expr<'a>> {
        self.logical(TokenType::AND, Self::equality)
    }

    fn equality(&mut self) -> Result<Expr<'a>> {
        self.binary(EQUALITY_OPS, Self::comparison)
    }

    fn comparison(&mut self) -> Result<Expr<'a>> {
        self.binary(COMPARISON_OPS, Self::term)
    }

    fn term(&mut self) -> Result<Expr<'a>> {
        self.binary(TERM_OPS, Self::factor)
    }

    fn factor(&mut self) -> Result<Expr<'a>> {
        self.binary(FACTOR_OPS, Self::unary)
    }

    /// A left‑associative chain `operand ( op operand )*` with `op` drawn from
    /// `operators`.
    fn binary(&mut self, operators: &[TokenType], operand: Production<'a>) -> Result<Expr<'a>> {
        let mut expr: Expr<'a> = operand(self)?;

        while let Some(operator) = self.advance_if_any(operators) {
            let right: Expr<'a> = operand(self)?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    /// Like [`Parser::binary`] but builds short‑circuiting `Logical` nodes.
    fn logical(&mut self, operator_type: TokenType, operand: Production<'a>) -> Result<Expr<'a>> {
        let mut expr: Expr<'a> = operand(self)?;

        while let Some(operator) = self.advance_if(operator_type.clone()) {
            let right: Expr<'a> = operand(self)?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr<'a>> {
        match self.advance_if_any(&[TokenType::BANG, TokenType::MINUS]) {
            Some(operator) => {
                let right: Expr<'a> = ensure_sufficient_stack(|| self.unary())?;
                Ok(Expr::Unary {
                    operator,
                    right: Box::new(right),
                })
            }
            None => self.call(),
        }
    }

    fn call(&mut self) -> Result<Expr<'a>> {
        let mut expr: Expr<'a> = self.primary()?;

        loop {
            if self.advance_if(TokenType::LEFT_PAREN).is_some() {
                let arguments: Vec<Expr<'a>> = self.comma_separated("arguments", Self::expression)?;
                let paren: Token<'a> = self.consume(TokenType::RIGHT_PAREN, "Expect ')' after arguments.")?;

                expr = Expr::Call {
                    callee: Box::new(expr),
                    paren,
                    arguments,
                };
            } else if self.advance_if(TokenType::DOT).is_some() {
                let name: Token<'a> = self.consume(TokenType::IDENTIFIER, "Expect property name after '.'.")?;

                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr<'a>> {
        let token: Token<'a> = self.peek().clone();

        let expr: Expr<'a> = match token.token_type {
            TokenType::FALSE => Expr::Literal(LiteralValue::False),
            TokenType::TRUE => Expr::Literal(LiteralValue::True),
            TokenType::NIL => Expr::Literal(LiteralValue::Nil),
            TokenType::NUMBER(n) => Expr::Literal(LiteralValue::Number(n)),
            TokenType::STRING(s) => Expr::Literal(LiteralValue::Str(s)),

            TokenType::THIS => Expr::This {
                id: self.fresh_id(),
                keyword: token,
            },

            TokenType::IDENTIFIER => self.variable(token),

            TokenType::SUPER => {
                self.advance();
                self.consume(TokenType::DOT, "Expect '.' after 'super'.")?;
                let method: Token<'a> = self.consume(TokenType::IDENTIFIER, "Expect superclass method name.")?;

                return Ok(Expr::Super {
                    id: self.fresh_id(),
                    keyword: token,
                    method,
                });
            }

            TokenType::LEFT_PAREN => {
                self.advance();
                let inner: Expr<'a> = self.expression()?;
                self.consume(TokenType::RIGHT_PAREN, "Expect ')' after expression.")?;

                return Ok(Expr::Grouping(Box::new(inner)));
            }

            other => {
                debug!("No expression starts at {:?}", other);
                return Err(LoxError::parse(self.peek(), "Expect expression."));
            }
        };

        self.advance();
        Ok(expr)
    }

    fn variable(&mut self, name: Token<'a>) -> Expr<'a> {
        Expr::Variable {
            id: self.fresh_id(),
            name,
        }
    }

    /// Items separated by commas up to (not including) a closing `)`.  More
    /// than [`MAX_ARGS`] items is reported without aborting the parse.
    fn comma_separated<T>(
        &mut self,
        what: &str,
        mut item: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut items: Vec<T> = Vec::new();

        if self.check(TokenType::RIGHT_PAREN) {
            return Ok(items);
        }

        loop {
            if items.len() >= MAX_ARGS {
                let message: String = format!("Can't have more than {} {}.", MAX_ARGS, what);
                self.errors.push(LoxError::parse(self.peek(), message));
            }

            items.push(item(self)?);

            if self.advance_if(TokenType::COMMA).is_none() {
                return Ok(items);
            }
        }
    }

    // ───────────────────────────── token cursor ─────────────────────────────

    fn fresh_id(&mut self) -> ExprId {
        let id: ExprId = ExprId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Consume the next token if it has type `expected`.
    fn advance_if(&mut self, expected: TokenType) -> Option<Token<'a>> {
        if self.check(expected) {
            self.advance();
            Some(self.previous())
        } else {
            None
        }
    }

    fn advance_if_any(&mut self, expected: &[TokenType]) -> Option<Token<'a>> {
        expected.iter().find_map(|tt| self.advance_if(tt.clone()))
    }

    fn consume(&mut self, expected: TokenType, message: &str) -> Result<Token<'a>> {
        match self.advance_if(expected) {
            Some(token) => Ok(token),
            None => {
                debug!("Expected token missing at line {}: {}", self.peek().line, message);
                Err(LoxError::parse(self.peek(), message))
            }
        }
    }

    #[inline]
    fn check(&self, expected: TokenType) -> bool {
        !self.is_at_end() && self.peek().token_type == expected
    }

    #[inline]
    fn advance(&mut self) {
        if !self.is_at_end() {
            self.current += 1;
        }
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::EOF
    }

    #[inline]
    fn peek(&self) -> &Token<'a> {
        &self.tokens[self.current]
    }

    #[inline]
    fn previous(&self) -> Token<'a> {
        self.tokens[self.current - 1].clone()
    }

    /// Skip to just after a `;` or to the start of the next statement keyword.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.tokens[self.current - 1].token_type == TokenType::SEMICOLON {
                return;
            }

            if matches!(
                self.peek().token_type,
                TokenType::CLASS
                    | TokenType::FUN
                    | TokenType::VAR
                    | TokenType::FOR
                    | TokenType::IF
                    | TokenType::WHILE
                    | TokenType::PRINT
                    | TokenType::RETURN
            ) {
                return;
            }

            self.advance();
        }
    }
}
