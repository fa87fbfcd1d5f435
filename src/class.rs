//! Classes and their instances.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::error::{LoxError, Result};
use crate::function::{Callable, LoxFunction};
use crate::interpreter::Interpreter;
use crate::resolver::INITIALIZER_NAME;
use crate::token::Token;
use crate::value::Value;

/// A class value: its name, optional superclass and method table.
pub struct LoxClass<'a> {
    name: &'a str,
    superclass: Option<Rc<LoxClass<'a>>>,
    methods: HashMap<&'a str, Rc<LoxFunction<'a>>>,
}

impl<'a> LoxClass<'a> {
    pub fn new(
        name: &'a str,
        superclass: Option<Rc<LoxClass<'a>>>,
        methods: HashMap<&'a str, Rc<LoxFunction<'a>>>,
    ) -> Self {
        LoxClass {
            name,
            superclass,
            methods,
        }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn superclass(&self) -> Option<&Rc<LoxClass<'a>>> {
        self.superclass.as_ref()
    }

    /// Look `name` up in this class, then along the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction<'a>>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass.as_ref().and_then(|sc| sc.find_method(name))
    }
}

impl fmt::Debug for LoxClass<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxClass")
            .field("name", &self.name)
            .field("superclass", &self.superclass.as_ref().map(|sc| sc.name))
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Calling a class constructs an instance.  The handle itself is the callable
/// because the new instance must point back at it.
impl<'a> Callable<'a> for Rc<LoxClass<'a>> {
    fn arity(&self) -> usize {
        self.find_method(INITIALIZER_NAME)
            .map(|init| init.arity())
            .unwrap_or(0)
    }

    fn call(
        &self,
        interpreter: &mut Interpreter<'a>,
        paren: &Token<'a>,
        arguments: Vec<Value<'a>>,
    ) -> Result<Value<'a>> {
        debug!("Instantiating class '{}'", self.name);

        let instance: Rc<RefCell<LoxInstance<'a>>> =
            Rc::new(RefCell::new(LoxInstance::new(Rc::clone(self))));

        if let Some(initializer) = self.find_method(INITIALIZER_NAME) {
            // The initializer's own result is discarded: a call to a class
            // always yields the instance.
            initializer
                .bind(Rc::clone(&instance))
                .call(interpreter, paren, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

/// A class instance with its own mutable field map.
pub struct LoxInstance<'a> {
    class: Rc<LoxClass<'a>>,
    fields: HashMap<String, Value<'a>>,
}

impl<'a> LoxInstance<'a> {
    pub fn new(class: Rc<LoxClass<'a>>) -> Self {
        LoxInstance {
            class,
            fields: HashMap::new(),
        }
    }

    pub fn class(&self) -> &Rc<LoxClass<'a>> {
        &self.class
    }

    /// Property read: fields shadow methods; methods come back bound to
    /// `instance`.
    pub fn get(instance: &Rc<RefCell<LoxInstance<'a>>>, name: &Token<'a>) -> Result<Value<'a>> {
        if let Some(value) = instance.borrow().fields.get(name.lexeme) {
            return Ok(value.clone());
        }

        let method: Option<Rc<LoxFunction<'a>>> = instance.borrow().class.find_method(name.lexeme);

        match method {
            Some(method) => Ok(Value::Function(Rc::new(method.bind(Rc::clone(instance))))),
            None => Err(LoxError::runtime(
                name,
                format!("Undefined property '{}'.", name.lexeme),
            )),
        }
    }

    /// Property write: always creates or overwrites a field.
    pub fn set(&mut self, name: &Token<'a>, value: Value<'a>) {
        self.fields.insert(name.lexeme.to_string(), value);
    }
}

impl fmt::Debug for LoxInstance<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxInstance")
            .field("class", &self.class.name)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}
