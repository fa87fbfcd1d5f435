//! Tree‑walking evaluator.
//!
//! Executes a resolved statement list against a chain of environments.  Local
//! variable accesses use the distances recorded by the resolver; everything
//! else goes straight to the globals.  `return` travels back to the call
//! boundary as [`Flow::Return`] rather than as an error.

use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use chrono::Utc;
use log::{debug, info};

use crate::ast::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::class::{LoxClass, LoxInstance};
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::function::{Callable, LoxFunction, NativeFunction};
use crate::resolver::{Locals, INITIALIZER_NAME};
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenType};
use crate::value::{is_equal, is_truthy, Value};

/// Default bound on nested calls before reporting a stack overflow.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

/// How a statement finished.
#[derive(Debug)]
pub enum Flow<'a> {
    /// Fell off the end; keep executing the enclosing statements.
    Normal,

    /// A `return` ran; unwind to the nearest call boundary.
    Return(Value<'a>),
}

pub struct Interpreter<'a> {
    globals: EnvRef<'a>,
    environment: EnvRef<'a>,
    locals: Locals,
    out: Box<dyn Write + 'a>,
    call_depth: usize,
    max_call_depth: usize,
}

impl Default for Interpreter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// `clock()`: seconds since the Unix epoch, with sub‑second precision.
fn clock<'a>(_args: &[Value<'a>]) -> std::result::Result<Value<'a>, String> {
    let micros: i64 = Utc::now().timestamp_micros();
    let seconds: f64 = micros as f64 / 1_000_000.0;

    debug!("Native function 'clock' returned: {}", seconds);

    Ok(Value::Number(seconds))
}

impl<'a> Interpreter<'a> {
    /// Creates an interpreter printing to stdout.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Creates an interpreter whose `print` output goes to `out`, and defines
    /// native functions such as `clock`.
    pub fn with_output(out: Box<dyn Write + 'a>) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef<'a> = Environment::new().into_ref();

        debug!("Defining native function 'clock'");

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction(Rc::new(NativeFunction {
                name: "clock",
                arity: 0,
                func: clock,
            })),
        );

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out,
            call_depth: 0,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    /// Override the nesting limit for function calls.
    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }

    /// Interprets a resolved program.  `locals` must come from resolving
    /// exactly these statements.  Stops at the first runtime error.
    pub fn interpret(&mut self, statements: &[Stmt<'a>], locals: Locals) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        self.locals = locals;

        // Output printed before a runtime error must still reach the sink.
        let result: Result<Flow<'a>> = self.execute_all(statements);
        self.out.flush()?;
        result?;

        info!("Interpretation completed successfully");
        Ok(())
    }

    // ───────────────────────────── statements ─────────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt<'a>) -> Result<Flow<'a>> {
        ensure_sufficient_stack(|| self.execute_inner(stmt))
    }

    fn execute_inner(&mut self, stmt: &Stmt<'a>) -> Result<Flow<'a>> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value: Value<'a> = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)?;
                debug!("Printed value: {}", value);
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value: Value<'a> = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.environment.borrow_mut().define(name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let environment: EnvRef<'a> =
                    Environment::with_enclosing(Rc::clone(&self.environment)).into_ref();
                self.execute_block(statements, environment)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);

                // Capture the current environment as the closure.
                let function: LoxFunction<'a> =
                    LoxFunction::new(Rc::clone(decl), Rc::clone(&self.environment), false);

                self.environment
                    .borrow_mut()
                    .define(decl.name.lexeme, Value::Function(Rc::new(function)));
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value<'a> = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Returning value: {}", value);
                Ok(Flow::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                self.declare_class(name, superclass.as_ref(), methods)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Run `statements` in `environment`, restoring the current environment
    /// afterwards whether they complete, return or fail.
    pub fn execute_block(&mut self, statements: &[Stmt<'a>], environment: EnvRef<'a>) -> Result<Flow<'a>> {
        let previous: EnvRef<'a> = std::mem::replace(&mut self.environment, environment);

        let result: Result<Flow<'a>> = self.execute_all(statements);

        self.environment = previous;

        result
    }

    fn execute_all(&mut self, statements: &[Stmt<'a>]) -> Result<Flow<'a>> {
        for stmt in statements {
            if let Flow::Return(value) = self.execute(stmt)? {
                return Ok(Flow::Return(value));
            }
        }

        Ok(Flow::Normal)
    }

    fn declare_class(
        &mut self,
        name: &Token<'a>,
        superclass: Option<&Expr<'a>>,
        methods: &[Rc<FunctionDecl<'a>>],
    ) -> Result<()> {
        let superclass: Option<Rc<LoxClass<'a>>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let at: &Token<'a> = match expr {
                        Expr::Variable { name, .. } => name,
                        _ => name,
                    };
                    return Err(LoxError::runtime(at, "Superclass must be a class."));
                }
            },
            None => None,
        };

        // Bound first so methods can refer to the class by name.
        self.environment.borrow_mut().define(name.lexeme, Value::Nil);

        let enclosing: Option<EnvRef<'a>> = superclass.as_ref().map(|sc| {
            let mut environment: Environment<'a> =
                Environment::with_enclosing(Rc::clone(&self.environment));
            environment.define("super", Value::Class(Rc::clone(sc)));

            std::mem::replace(&mut self.environment, environment.into_ref())
        });

        let methods: HashMap<&'a str, Rc<LoxFunction<'a>>> = methods
            .iter()
            .map(|decl| {
                let function: LoxFunction<'a> = LoxFunction::new(
                    Rc::clone(decl),
                    Rc::clone(&self.environment),
                    decl.name.lexeme == INITIALIZER_NAME,
                );
                (decl.name.lexeme, Rc::new(function))
            })
            .collect();

        let class: LoxClass<'a> = LoxClass::new(name.lexeme, superclass, methods);

        debug!(
            "Defined class '{}' (superclass: {:?})",
            class.name(),
            class.superclass().map(|sc| sc.name())
        );

        if let Some(previous) = enclosing {
            self.environment = previous;
        }

        self.environment
            .borrow_mut()
            .assign(name, Value::Class(Rc::new(class)))
    }

    // ───────────────────────────── expressions ────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr<'a>) -> Result<Value<'a>> {
        ensure_sufficient_stack(|| self.evaluate_inner(expr))
    }

    fn evaluate_inner(&mut self, expr: &Expr<'a>) -> Result<Value<'a>> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value<'a> = self.evaluate(left)?;

                if operator.token_type == TokenType::OR {
                    if is_truthy(&left) {
                        return Ok(left);
                    }
                } else if !is_truthy(&left) {
                    return Ok(left);
                }

                self.evaluate(right)
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value: Value<'a> = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        if !Environment::assign_at(&self.environment, distance, name.lexeme, value.clone()) {
                            return Err(LoxError::runtime(
                                name,
                                format!("Undefined variable '{}'.", name.lexeme),
                            ));
                        }
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value<'a> = self.evaluate(callee)?;

                let mut values: Vec<Value<'a>> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                self.call_value(&callee, paren, values)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),
                _ => Err(LoxError::runtime(name, "Only instances have properties.")),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(LoxError::runtime(name, "Only instances have fields."));
                };

                let value: Value<'a> = self.evaluate(value)?;
                instance.borrow_mut().set(name, value.clone());

                Ok(value)
            }

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token<'a>, right: &Expr<'a>) -> Result<Value<'a>> {
        let right: Value<'a> = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(LoxError::runtime(operator, "Operand must be a number.")),
            },
            TokenType::BANG => Ok(Value::Bool(!is_truthy(&right))),
            _ => Err(LoxError::runtime(
                operator,
                format!("Invalid unary operator '{}'.", operator.lexeme),
            )),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr<'a>, operator: &Token<'a>, right: &Expr<'a>) -> Result<Value<'a>> {
        let left: Value<'a> = self.evaluate(left)?;
        let right: Value<'a> = self.evaluate(right)?;

        debug!("Binary {} on {} and {}", operator.lexeme, left, right);

        match operator.token_type {
            TokenType::EQUAL_EQUAL => return Ok(Value::Bool(is_equal(&left, &right))),
            TokenType::BANG_EQUAL => return Ok(Value::Bool(!is_equal(&left, &right))),
            TokenType::PLUS => {
                return match (left, right) {
                    (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                    (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                    _ => Err(LoxError::runtime(
                        operator,
                        "Operands must be two numbers or two strings.",
                    )),
                };
            }
            _ => {}
        }

        let (Value::Number(a), Value::Number(b)) = (left, right) else {
            return Err(LoxError::runtime(operator, "Operands must be numbers."));
        };

        match operator.token_type {
            TokenType::MINUS => Ok(Value::Number(a - b)),
            TokenType::STAR => Ok(Value::Number(a * b)),
            TokenType::SLASH => Ok(Value::Number(a / b)),
            TokenType::GREATER => Ok(Value::Bool(a > b)),
            TokenType::GREATER_EQUAL => Ok(Value::Bool(a >= b)),
            TokenType::LESS => Ok(Value::Bool(a < b)),
            TokenType::LESS_EQUAL => Ok(Value::Bool(a <= b)),
            _ => Err(LoxError::runtime(
                operator,
                format!("Invalid binary operator '{}'.", operator.lexeme),
            )),
        }
    }

    fn evaluate_super(&mut self, id: ExprId, keyword: &Token<'a>, method: &Token<'a>) -> Result<Value<'a>> {
        let distance: usize = *self
            .locals
            .get(&id)
            .ok_or_else(|| LoxError::runtime(keyword, "Unresolved 'super'."))?;

        let Some(Value::Class(superclass)) = Environment::get_at(&self.environment, distance, "super")
        else {
            return Err(LoxError::runtime(keyword, "Unresolved 'super'."));
        };

        // `this` always lives one scope inside `super`.
        let Some(Value::Instance(receiver)) =
            distance.checked_sub(1).and_then(|d| Environment::get_at(&self.environment, d, "this"))
        else {
            return Err(LoxError::runtime(keyword, "Unresolved 'this'."));
        };

        match superclass.find_method(method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(receiver)))),
            None => Err(LoxError::runtime(
                method,
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token<'a>) -> Result<Value<'a>> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, name.lexeme)
                .ok_or_else(|| {
                    LoxError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
                }),
            None => self.globals.borrow().get(name),
        }
    }

    // ─────────────────────────────── calls ────────────────────────────────

    /// Invokes a callable (native function, user function or class).
    fn call_value(&mut self, callee: &Value<'a>, paren: &Token<'a>, arguments: Vec<Value<'a>>) -> Result<Value<'a>> {
        let callable: &dyn Callable<'a> = match callee {
            Value::NativeFunction(native) => &**native,
            Value::Function(function) => &**function,
            Value::Class(class) => class,
            other => {
                debug!("Attempted to call a {}", other.type_name());
                return Err(LoxError::runtime(paren, "Can only call functions and classes."));
            }
        };

        if arguments.len() != callable.arity() {
            return Err(LoxError::runtime(
                paren,
                format!(
                    "Expected {} arguments but got {}.",
                    callable.arity(),
                    arguments.len()
                ),
            ));
        }

        if self.call_depth >= self.max_call_depth {
            debug!("Call depth limit {} reached", self.max_call_depth);
            return Err(LoxError::runtime(paren, "Stack overflow."));
        }

        self.call_depth += 1;
        let result: Result<Value<'a>> = ensure_sufficient_stack(|| callable.call(self, paren, arguments));
        self.call_depth -= 1;

        result
    }
}
