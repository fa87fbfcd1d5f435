use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a scope.  Closures, nested scopes and in‑flight calls may
/// all hold the same environment; it is never copied.
pub type EnvRef<'a> = Rc<RefCell<Environment<'a>>>;

#[derive(Debug, Default)]
pub struct Environment<'a> {
    values: HashMap<String, Value<'a>>,
    enclosing: Option<EnvRef<'a>>,
}

impl<'a> Environment<'a> {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef<'a>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Wrap `self` in a shareable handle.
    pub fn into_ref(self) -> EnvRef<'a> {
        Rc::new(RefCell::new(self))
    }

    /// Bind `name` in this scope, replacing any previous binding.
    pub fn define(&mut self, name: &str, value: Value<'a>) {
        self.values.insert(name.to_string(), value);
    }

    /// Dynamic lookup along the chain; used for globals.
    pub fn get(&self, name: &Token<'_>) -> Result<Value<'a>> {
        if let Some(value) = self.values.get(name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(LoxError::runtime(
                name,
                format!("Undefined variable '{}'.", name.lexeme),
            ))
        }
    }

    pub fn assign(&mut self, name: &Token<'_>, value: Value<'a>) -> Result<()> {
        if let Some(slot) = self.values.get_mut(name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(LoxError::runtime(
                name,
                format!("Undefined variable '{}'.", name.lexeme),
            ))
        }
    }

    /// Walk exactly `distance` enclosing links from `env`.
    pub fn ancestor(env: &EnvRef<'a>, distance: usize) -> Option<EnvRef<'a>> {
        let mut current: EnvRef<'a> = Rc::clone(env);

        for _ in 0..distance {
            let next: EnvRef<'a> = current.borrow().enclosing.clone()?;
            current = next;
        }

        Some(current)
    }

    /// Read `name` from the scope `distance` hops up, without searching.
    pub fn get_at(env: &EnvRef<'a>, distance: usize, name: &str) -> Option<Value<'a>> {
        let scope: EnvRef<'a> = Self::ancestor(env, distance)?;
        let scope = scope.borrow();

        scope.values.get(name).cloned()
    }

    /// Overwrite `name` in the scope `distance` hops up.  Returns `false`
    /// when that scope has no such binding.
    pub fn assign_at(env: &EnvRef<'a>, distance: usize, name: &str, value: Value<'a>) -> bool {
        let Some(scope) = Self::ancestor(env, distance) else {
            return false;
        };

        let mut scope = scope.borrow_mut();

        match scope.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}
