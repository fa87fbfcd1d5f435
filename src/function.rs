//! Callable runtime objects: native functions and user‑defined functions
//! (including methods, which are functions bound to an instance).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::class::LoxInstance;
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::interpreter::{Flow, Interpreter};
use crate::token::Token;
use crate::value::Value;

/// Anything that can appear on the left of a call expression.
///
/// The interpreter checks [`Callable::arity`] against the argument count
/// before invoking [`Callable::call`].
pub trait Callable<'a> {
    fn arity(&self) -> usize;

    fn call(
        &self,
        interpreter: &mut Interpreter<'a>,
        paren: &Token<'a>,
        arguments: Vec<Value<'a>>,
    ) -> Result<Value<'a>>;
}

/// Signature of a host function exposed to Lox.
pub type NativeFn<'a> = fn(&[Value<'a>]) -> std::result::Result<Value<'a>, String>;

/// A function implemented in Rust, such as `clock`.
pub struct NativeFunction<'a> {
    pub name: &'static str,
    pub arity: usize,
    pub func: NativeFn<'a>,
}

impl fmt::Debug for NativeFunction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

impl<'a> Callable<'a> for NativeFunction<'a> {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(
        &self,
        _interpreter: &mut Interpreter<'a>,
        paren: &Token<'a>,
        arguments: Vec<Value<'a>>,
    ) -> Result<Value<'a>> {
        debug!("Calling native function '{}'", self.name);

        (self.func)(&arguments).map_err(|message| LoxError::runtime(paren, message))
    }
}

/// A user‑defined function together with the environment it closes over.
pub struct LoxFunction<'a> {
    declaration: Rc<FunctionDecl<'a>>,
    closure: EnvRef<'a>,

    /// `init` methods always evaluate to their receiver.
    is_initializer: bool,
}

impl<'a> LoxFunction<'a> {
    pub fn new(declaration: Rc<FunctionDecl<'a>>, closure: EnvRef<'a>, is_initializer: bool) -> Self {
        LoxFunction {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &'a str {
        self.declaration.name.lexeme
    }

    /// Produce a copy of this method whose closure has `this` bound to
    /// `instance`.  The new scope sits between the method body and the class
    /// scope, matching the resolver's `this` scope.
    pub fn bind(&self, instance: Rc<RefCell<LoxInstance<'a>>>) -> LoxFunction<'a> {
        let mut environment: Environment<'a> = Environment::with_enclosing(Rc::clone(&self.closure));
        environment.define("this", Value::Instance(instance));

        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: environment.into_ref(),
            is_initializer: self.is_initializer,
        }
    }

    /// The receiver of a bound initializer.
    fn bound_this(&self) -> Result<Value<'a>> {
        Environment::get_at(&self.closure, 0, "this").ok_or_else(|| {
            LoxError::runtime(&self.declaration.name, "Initializer is not bound to an instance.")
        })
    }
}

impl fmt::Debug for LoxFunction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxFunction")
            .field("name", &self.name())
            .field("arity", &self.declaration.params.len())
            .field("is_initializer", &self.is_initializer)
            .finish()
    }
}

impl<'a> Callable<'a> for LoxFunction<'a> {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(
        &self,
        interpreter: &mut Interpreter<'a>,
        _paren: &Token<'a>,
        arguments: Vec<Value<'a>>,
    ) -> Result<Value<'a>> {
        debug!("Calling user-defined function '{}'", self.name());

        // A fresh scope chained to the closure, never to the caller.
        let mut environment: Environment<'a> = Environment::with_enclosing(Rc::clone(&self.closure));

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            debug!("Binding parameter '{}' to {}", param.lexeme, argument);
            environment.define(param.lexeme, argument);
        }

        let flow: Flow<'a> = interpreter.execute_block(&self.declaration.body, environment.into_ref())?;

        if self.is_initializer {
            return self.bound_this();
        }

        match flow {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }
}
