//! Static resolution pass.
//!
//! One walk over the AST that mirrors the environments the interpreter will
//! build (one per block, one per call, one holding `this` around every
//! method, one holding `super` around every subclass's methods).  Along the
//! way it records how many scopes separate each local reference from its
//! binding and reports the static errors of the language.  References that
//! end up with no entry are globals.

use std::collections::HashMap;
use std::mem;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::error::LoxError;
use crate::stack::ensure_sufficient_stack;
use crate::token::Token;

/// Side‑table from variable‑referencing expressions to their scope distance.
pub type Locals = HashMap<ExprId, usize>;

/// Name of the method run when a class is called.
pub const INITIALIZER_NAME: &str = "init";

/// Kind of function body being resolved; governs `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

/// Kind of class body being resolved; governs `this` and `super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// One scope: name → whether its initializer has finished.
type Scope<'a> = HashMap<&'a str, bool>;

pub struct Resolver<'a> {
    scopes: Vec<Scope<'a>>,
    locals: Locals,
    function: FunctionType,
    class: ClassType,
    errors: Vec<LoxError>,
}

impl Default for Resolver<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Resolver<'a> {
    pub fn new() -> Self {
        Resolver {
            scopes: Vec::new(),
            locals: HashMap::new(),
            function: FunctionType::None,
            class: ClassType::None,
            errors: Vec::new(),
        }
    }

    /// Resolve a whole program.  Returns the distance table, or every static
    /// error found.  Resolving the same statements twice yields equal tables.
    pub fn resolve(mut self, statements: &[Stmt<'a>]) -> Result<Locals, Vec<LoxError>> {
        info!("Beginning resolve pass over {} statement(s)", statements.len());

        self.statements(statements);

        if self.errors.is_empty() {
            info!("Resolved {} local reference(s)", self.locals.len());
            Ok(self.locals)
        } else {
            info!("Resolve failed with {} error(s)", self.errors.len());
            Err(self.errors)
        }
    }

    fn statements(&mut self, statements: &[Stmt<'a>]) {
        for stmt in statements {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt<'a>) {
        ensure_sufficient_stack(|| match stmt {
            Stmt::Block(statements) => self.scoped(|r| r.statements(statements)),

            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(init) = initializer {
                    self.expr(init);
                }
                self.define(name);
            }

            Stmt::Function(decl) => {
                // Defined before the body so the function can recurse.
                self.declare(&decl.name);
                self.define(&decl.name);
                self.function(decl, FunctionType::Function);
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.class(name, superclass.as_ref(), methods),

            Stmt::Expression(expr) | Stmt::Print(expr) => self.expr(expr),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.expr(condition);
                self.stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.stmt(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                self.expr(condition);
                self.stmt(body);
            }

            Stmt::Return { keyword, value } => {
                if self.function == FunctionType::None {
                    self.error(keyword, "Can't return from top-level code.");
                }

                if let Some(value) = value {
                    if self.function == FunctionType::Initializer {
                        self.error(keyword, "Can't return a value from an initializer.");
                    }
                    self.expr(value);
                }
            }
        })
    }

    fn class(&mut self, name: &Token<'a>, superclass: Option<&Expr<'a>>, methods: &[Rc<FunctionDecl<'a>>]) {
        let enclosing: ClassType = mem::replace(&mut self.class, ClassType::Class);

        self.declare(name);
        self.define(name);

        match superclass {
            Some(superclass) => {
                if let Expr::Variable { name: super_name, .. } = superclass {
                    if super_name.lexeme == name.lexeme {
                        self.error(super_name, "A class can't inherit from itself.");
                    }
                }

                self.class = ClassType::Subclass;
                self.expr(superclass);

                self.scoped(|r| {
                    r.bind_implicit("super");
                    r.methods(methods);
                });
            }
            None => self.methods(methods),
        }

        debug!("Resolved class '{}'", name.lexeme);

        self.class = enclosing;
    }

    /// Methods share one scope binding `this`.
    fn methods(&mut self, methods: &[Rc<FunctionDecl<'a>>]) {
        self.scoped(|r| {
            r.bind_implicit("this");

            for method in methods {
                let kind: FunctionType = if method.name.lexeme == INITIALIZER_NAME {
                    FunctionType::Initializer
                } else {
                    FunctionType::Method
                };

                r.function(method, kind);
            }
        });
    }

    /// Parameters and body share a single scope, as they do at call time.
    fn function(&mut self, decl: &FunctionDecl<'a>, kind: FunctionType) {
        let enclosing: FunctionType = mem::replace(&mut self.function, kind);

        self.scoped(|r| {
            for param in &decl.params {
                r.declare(param);
                r.define(param);
            }
            r.statements(&decl.body);
        });

        self.function = enclosing;
    }

    fn expr(&mut self, expr: &Expr<'a>) {
        ensure_sufficient_stack(|| match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) | Expr::Unary { right: inner, .. } => self.expr(inner),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }

            Expr::Variable { id, name } => {
                let uninitialized: bool = self
                    .scopes
                    .last()
                    .is_some_and(|scope| scope.get(name.lexeme) == Some(&false));

                if uninitialized {
                    self.error(name, "Can't read local variable in its own initializer.");
                }

                self.bind(*id, name);
            }

            Expr::Assign { id, name, value } => {
                self.expr(value);
                self.bind(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.expr(callee);
                for argument in arguments {
                    self.expr(argument);
                }
            }

            Expr::Get { object, .. } => self.expr(object),

            Expr::Set { object, value, .. } => {
                self.expr(value);
                self.expr(object);
            }

            Expr::This { id, keyword } => {
                if self.class == ClassType::None {
                    self.error(keyword, "Can't use 'this' outside of a class.");
                } else {
                    self.bind(*id, keyword);
                }
            }

            Expr::Super { id, keyword, .. } => match self.class {
                ClassType::None => self.error(keyword, "Can't use 'super' outside of a class."),
                ClassType::Class => {
                    self.error(keyword, "Can't use 'super' in a class with no superclass.")
                }
                ClassType::Subclass => self.bind(*id, keyword),
            },
        })
    }

    /// Run `f` inside a fresh innermost scope.
    fn scoped(&mut self, f: impl FnOnce(&mut Self)) {
        self.scopes.push(Scope::new());
        f(self);
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token<'a>) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };

        if scope.contains_key(name.lexeme) {
            self.error(name, "Already a variable with this name in this scope.");
        } else {
            scope.insert(name.lexeme, false);
        }
    }

    fn define(&mut self, name: &Token<'a>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme, true);
        }
    }

    /// Bind `this` or `super` in the innermost scope.
    fn bind_implicit(&mut self, name: &'static str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, true);
        }
    }

    /// Record the distance to the innermost scope declaring `name`; leave
    /// globals unrecorded.
    fn bind(&mut self, id: ExprId, name: &Token<'a>) {
        let depth: Option<usize> = self
            .scopes
            .iter()
            .rev()
            .position(|scope| scope.contains_key(name.lexeme));

        match depth {
            Some(depth) => {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                self.locals.insert(id, depth);
            }
            None => debug!("Resolved '{}' as global", name.lexeme),
        }
    }

    fn error(&mut self, token: &Token<'a>, message: &str) {
        debug!("Resolve error at line {}: {}", token.line, message);
        self.errors.push(LoxError::resolve(token, message));
    }
}
