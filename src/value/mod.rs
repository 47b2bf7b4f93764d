//! Defines the [`Value`] enum, representing any renderable data.

mod cow;
mod from;
mod ser;

pub use std::collections::BTreeMap as Map;
pub use std::vec::Vec as List;

pub(crate) use crate::value::cow::ValueCow;
pub use crate::value::ser::to_value;

/// Data to be rendered, represented as a recursive enum.
///
/// Scalars are `None`, `Integer`, and `String`; `List` and `Map` carry
/// context structure. A render context is simply a `Value::Map` and nested
/// contexts are nested maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    None,
    Integer(i64),
    String(String),
    List(List<Value>),
    Map(Map<String, Value>),
}

impl Value {
    /// Whether this value is considered true in an `if` condition.
    ///
    /// `None` is false, an integer is true iff positive, and a string is
    /// true iff non-empty and not the literal `"0"`. Lists and maps are
    /// true iff non-empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Integer(n) => *n > 0,
            Value::String(s) => !s.is_empty() && s != "0",
            Value::List(l) => !l.is_empty(),
            Value::Map(m) => !m.is_empty(),
        }
    }

    /// Coerces this value to an integer for arithmetic and comparisons.
    ///
    /// Strings are parsed as decimal and default to 0 when the parse fails,
    /// matching the permissive interpolation semantics. Lists and maps do
    /// not coerce.
    pub(crate) fn as_integer(&self) -> Result<i64, String> {
        match self {
            Value::None => Ok(0),
            Value::Integer(n) => Ok(*n),
            Value::String(s) => Ok(s.trim().parse().unwrap_or(0)),
            value => Err(format!("cannot use {} as a number", value.human())),
        }
    }

    pub(crate) fn human(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Integer(_) => "integer",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::None.is_truthy());
        assert!(!Value::Integer(0).is_truthy());
        assert!(!Value::Integer(-1).is_truthy());
        assert!(Value::Integer(1).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::from("0").is_truthy());
        assert!(Value::from("false").is_truthy());
        assert!(!Value::List(List::new()).is_truthy());
        assert!(Value::from(["x"]).is_truthy());
    }

    #[test]
    fn integer_coercion() {
        assert_eq!(Value::None.as_integer().unwrap(), 0);
        assert_eq!(Value::Integer(29).as_integer().unwrap(), 29);
        assert_eq!(Value::from("29").as_integer().unwrap(), 29);
        assert_eq!(Value::from("nope").as_integer().unwrap(), 0);
        assert!(Value::List(List::new()).as_integer().is_err());
    }
}
