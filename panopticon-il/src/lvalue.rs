use std::fmt;

use crate::{Error, Value};

/// A [`Value`] restricted to the assignable subset: `Undefined`,
/// `Variable` and `Memory`. Constants are rvalues only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Lvalue(Value);

impl Lvalue {
    /// Wraps `value` as an lvalue.
    ///
    /// Fails with [`Error::IllFormedValue`] if `value` is a `Constant`.
    pub fn new(value: Value) -> Result<Self, Error> {
        if matches!(value, Value::Constant(_)) {
            return Err(Error::IllFormedValue("a constant is not a valid lvalue".into()));
        }
        Ok(Self(value))
    }

    /// The always-valid undefined lvalue.
    pub const fn undefined() -> Self {
        Self(Value::Undefined)
    }

    /// Borrows the underlying value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes this lvalue, returning the underlying value.
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Lvalue> for Value {
    fn from(l: Lvalue) -> Self {
        l.0
    }
}

impl fmt::Display for Lvalue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
