//! Abstract syntax tree for Lox programs.
//!
//! Nodes are inert data: every pass (resolver, interpreter, printer) walks
//! them with its own exhaustive `match`.  Expressions that the resolver may
//! bind to a local scope carry an [`ExprId`], assigned by the parser and
//! unique within one parse, which keys the resolver's side‑table.

use std::rc::Rc;

use crate::token::Token;

/// Identity of an expression node that refers to a variable binding
/// (`Variable`, `Assign`, `This`, `Super`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub usize);

/// A **literal constant** that appears directly in the source code.
///
/// These variants are the *terminal leaves* of the expression tree and
/// therefore do **not** retain a reference to the originating [`Token`].
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal ‑ stored as IEEE‑754 `f64`.
    /// Integral lexemes such as `"3"` are still parsed as `3.0`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    /// The boolean constant `true`.
    True,

    /// The boolean constant `false`.
    False,

    /// The `nil` literal (Lox’s `null`).
    Nil,
}

/// **Abstract‑Syntax‑Tree node** representing every kind of *expression*
/// in Lox.  The lifetime `'a` is that of the source text the tokens borrow.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr<'a> {
    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// Prefix unary operator expression
    /// *Example:* `!isReady` or `-42`
    Unary {
        /// The operator token (`!` or `-`).
        operator: Token<'a>,
        /// Operand to which the operator is applied.
        right: Box<Expr<'a>>,
    },

    /// Infix binary operator expression
    /// *Example:* `a + b`, `x <= y`
    Binary {
        left: Box<Expr<'a>>,
        /// Operator token such as `+`, `*`, `==`, …
        operator: Token<'a>,
        right: Box<Expr<'a>>,
    },

    /// Parenthesised sub‑expression: `"(" expression ")"`.
    Grouping(Box<Expr<'a>>),

    /// Variable access ‑ resolves to the identifier’s current value at runtime.
    Variable { id: ExprId, name: Token<'a> },

    /// Assignment expression: `identifier "=" expression`
    Assign {
        id: ExprId,
        name: Token<'a>,
        value: Box<Expr<'a>>,
    },

    /// Short‑circuiting logical operators `and` / `or`.
    Logical {
        left: Box<Expr<'a>>,
        operator: Token<'a>, // `AND` or `OR`
        right: Box<Expr<'a>>,
    },

    /// Function‑ or method‑call expression
    /// *Example:* `clock()` or `add(1, 2)`
    Call {
        /// Expression that evaluates to a callable (variable, property, etc.).
        callee: Box<Expr<'a>>,
        /// The closing `)` token ‑ retained for error reporting.
        paren: Token<'a>,
        /// Argument list (may be empty).
        arguments: Vec<Expr<'a>>,
    },

    /// object.property
    Get {
        object: Box<Expr<'a>>,
        name: Token<'a>,
    },

    /// object.property = value
    Set {
        object: Box<Expr<'a>>,
        name: Token<'a>,
        value: Box<Expr<'a>>,
    },

    /// The 'this' keyword inside a method.
    This { id: ExprId, keyword: Token<'a> },

    /// `super.method` inside a subclass method.
    Super {
        id: ExprId,
        keyword: Token<'a>,
        method: Token<'a>,
    },
}

/// A named function or method: shared between the AST and every closure
/// created from it.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl<'a> {
    pub name: Token<'a>,

    /// Parameter name tokens (arity ≤ 255).
    pub params: Vec<Token<'a>>,

    /// Body executed when the function is called.
    pub body: Vec<Stmt<'a>>,
}

/// **Abstract‑Syntax‑Tree node** for *statements* (complete executable
/// constructs).  A program is a sequence of these nodes returned by
/// [`crate::parser::Parser::parse`].
///
/// There is no `For` variant: `for` loops are desugared into `While`.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt<'a> {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr<'a>),

    /// `print` statement used for output.
    Print(Expr<'a>),

    /// Variable declaration: `"var" IDENT ("=" initializer)? ";"`.
    Var {
        name: Token<'a>,
        initializer: Option<Expr<'a>>,
    },

    /// Braced scope containing zero or more declarations/statements.
    Block(Vec<Stmt<'a>>),

    /// `if` / `else` conditional.
    If {
        condition: Expr<'a>,
        then_branch: Box<Stmt<'a>>,
        else_branch: Option<Box<Stmt<'a>>>,
    },

    /// `while` loop.
    While {
        condition: Expr<'a>,
        body: Box<Stmt<'a>>,
    },

    /// Function declaration ‑ becomes a first‑class callable value.
    Function(Rc<FunctionDecl<'a>>),

    /// `return` statement inside a function body.
    Return {
        /// The `return` keyword token (for error locations).
        keyword: Token<'a>,

        /// Optional expression to return.
        /// Absent ⇒ `nil` is returned.
        value: Option<Expr<'a>>,
    },

    /// Class declaration with an optional superclass (always an
    /// `Expr::Variable`) and its methods.
    Class {
        name: Token<'a>,
        superclass: Option<Expr<'a>>,
        methods: Vec<Rc<FunctionDecl<'a>>>,
    },
}
