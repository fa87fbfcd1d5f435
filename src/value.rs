use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::class::{LoxClass, LoxInstance};
use crate::function::{LoxFunction, NativeFunction};

/// A runtime value.  Scalars are held inline; callables and instances are
/// reference‑counted so copies alias the same object.
#[derive(Debug, Clone)]
pub enum Value<'a> {
    NativeFunction(Rc<NativeFunction<'a>>),
    Function(Rc<LoxFunction<'a>>),
    Class(Rc<LoxClass<'a>>),
    Instance(Rc<RefCell<LoxInstance<'a>>>),
    Number(f64),
    String(String),
    Bool(bool),
    Nil,
}

impl<'a> Value<'a> {
    /// Human name of the value's kind, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::NativeFunction(_) | Value::Function(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Nil => "nil",
        }
    }
}

/// `nil` and `false` are falsy; everything else (including `0` and `""`)
/// is truthy.
pub fn is_truthy(value: &Value<'_>) -> bool {
    match value {
        Value::Nil => false,
        Value::Bool(b) => *b,
        _ => true,
    }
}

/// Lox equality: by value for scalars, by identity for heap objects.
pub fn is_equal<'a>(left: &Value<'a>, right: &Value<'a>) -> bool {
    let result: bool = match (left, right) {
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Nil, Value::Nil) => true,
        (Value::NativeFunction(a), Value::NativeFunction(b)) => Rc::ptr_eq(a, b),
        (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
        (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
        (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
        _ => false,
    };

    debug!("Checking equality: {} == {} -> {}", left, right, result);

    result
}

impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        is_equal(self, other)
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::NativeFunction(_) => write!(f, "<native fn>"),

            Value::Function(function) => write!(f, "<fn {}>", function.name()),

            Value::Class(class) => write!(f, "{}", class.name()),

            Value::Instance(instance) => write!(f, "{} instance", instance.borrow().class().name()),

            Value::Number(n) => format_number(f, *n),

            Value::String(s) => write!(f, "{}", s),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Nil => write!(f, "nil"),
        }
    }
}

/// Integral values print without a fractional part (`3`, not `3.0`); other
/// values use the shortest representation that round‑trips.
fn format_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_nan() {
        return write!(f, "NaN");
    }

    if n.is_infinite() {
        return write!(f, "{}Infinity", if n < 0.0 { "-" } else { "" });
    }

    if n.fract() != 0.0 {
        return write!(f, "{}", n);
    }

    if n == 0.0 && n.is_sign_negative() {
        return write!(f, "-0");
    }

    if n.abs() < 1e15 {
        let mut buf: itoa::Buffer = itoa::Buffer::new();
        write!(f, "{}", buf.format(n as i64))
    } else {
        write!(f, "{:.0}", n)
    }
}
