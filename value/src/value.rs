use crate::array::Array;
use crate::dict::Dict;
use crate::r#type::ValType;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A single field value of a query.
///
/// Deserializes from any self-describing format (json, toml), maps keep their
/// order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Array(Array),
    Dict(Dict),
}

impl Value {
    pub fn text(string: &str) -> Value {
        Value::Text(string.to_string())
    }

    pub fn int(int: i64) -> Value {
        Value::Int(int)
    }

    pub fn float(float: f64) -> Value {
        Value::Float(float)
    }

    pub fn bool(bool: bool) -> Value {
        Value::Bool(bool)
    }

    pub fn array(values: Vec<Value>) -> Value {
        Value::Array(Array::new(values))
    }

    pub fn dict(dict: Dict) -> Value {
        Value::Dict(dict)
    }

    pub fn null() -> Value {
        Value::Null
    }

    pub fn type_(&self) -> ValType {
        match self {
            Value::Int(_) => ValType::Integer,
            Value::Float(_) => ValType::Float,
            Value::Bool(_) => ValType::Bool,
            Value::Text(_) => ValType::Text,
            Value::Array(_) => ValType::Array,
            Value::Dict(_) => ValType::Dict,
            Value::Null => ValType::Null,
        }
    }

    /// Null and the empty text count as "not specified".
    pub fn is_unspecified(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(t) => t.is_empty(),
            _ => false,
        }
    }
}

// Canonical text form used on the wire: `10`, `10.5`, `true`.
impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(float) => write!(f, "{float}"),
            Value::Text(t) => f.write_str(t),
            Value::Array(a) => write!(f, "{a}"),
            Value::Dict(d) => write!(f, "{d}"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::text(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Text(value.clone())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::int(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::int(value as i64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::float(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            None => Value::null(),
            Some(v) => v.into(),
        }
    }
}
