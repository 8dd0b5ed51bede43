//! Application values
//!
//! The kind of a value decides how it is encoded.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A value stored in or fetched from the cache
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Byte string, stored as-is
    Str(Vec<u8>),

    /// Integer, stored as decimal text
    Int(i64),

    /// Float, stored as decimal text
    Float(f64),

    /// Boolean, stored as the integer text `1`/`0`; reads back as `Int`
    Bool(bool),

    /// Anything else, stored through the structured codec
    Structured(Structured),
}

/// Composite values that go through the structured codec
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Structured {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
    Text(String),
    List(Vec<Structured>),
    Map(BTreeMap<String, Structured>),
}

impl Value {
    /// Short name of the kind, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "boolean",
            Value::Structured(_) => "structured",
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Str(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// String view when the bytes are valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Booleans come back from the cache as `Int(1)`/`Int(0)`; both forms are accepted
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(0) => Some(false),
            Value::Int(1) => Some(true),
            _ => None,
        }
    }

    pub fn as_structured(&self) -> Option<&Structured> {
        match self {
            Value::Structured(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s.into_bytes())
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Str(b.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Str(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Structured> for Value {
    fn from(s: Structured) -> Self {
        Value::Structured(s)
    }
}
