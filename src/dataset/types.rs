// src/dataset/types.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a column. Loaded columns start out as `Text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Integer,
    Float,
    Text,
}

impl SemanticType {
    pub fn is_numeric(self) -> bool {
        matches!(self, SemanticType::Integer | SemanticType::Float)
    }

    /// Column type used for the persisted table.
    pub fn sql_type(self) -> &'static str {
        match self {
            SemanticType::Integer => "INTEGER",
            SemanticType::Float => "REAL",
            SemanticType::Text => "TEXT",
        }
    }

    /// Map a declared SQLite column type back, following SQLite's affinity rules.
    pub fn from_sql_type(decl: &str) -> SemanticType {
        let upper = decl.to_ascii_uppercase();
        if upper.contains("INT") {
            SemanticType::Integer
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            SemanticType::Float
        } else {
            SemanticType::Text
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SemanticType::Integer => "integer",
            SemanticType::Float => "float",
            SemanticType::Text => "text",
        };
        f.write_str(s)
    }
}

/// A single cell. `Missing` is the missing marker: an empty source cell, a
/// failed coercion, an unmatched outer-join cell or a SQL `NULL`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Numeric view of the value; text is parsed after trimming.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Missing => None,
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Hashable identity used for grouping and join keys. `None` for missing.
    pub fn key(&self) -> Option<KeyPart> {
        match self {
            Value::Missing => None,
            Value::Integer(i) => Some(KeyPart::Integer(*i)),
            // normalise -0.0 so it groups with 0.0
            Value::Float(f) => Some(KeyPart::Float((*f + 0.0).to_bits())),
            Value::Text(s) => Some(KeyPart::Text(s.clone())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Missing)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Integer(i64),
    Float(u64),
    Text(String),
}

/// Identifies a column either by position in the current dataset or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Index(usize),
    Name(String),
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Index(i) => write!(f, "#{}", i),
            ColumnRef::Name(n) => write!(f, "`{}`", n),
        }
    }
}

impl From<usize> for ColumnRef {
    fn from(i: usize) -> Self {
        ColumnRef::Index(i)
    }
}

impl From<&str> for ColumnRef {
    fn from(n: &str) -> Self {
        ColumnRef::Name(n.to_string())
    }
}

/// Declarative rule: source column → target name and (optionally) type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub source: ColumnRef,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub ty: Option<SemanticType>,
}

impl ColumnSpec {
    pub fn new(source: impl Into<ColumnRef>, name: &str, ty: Option<SemanticType>) -> Self {
        Self {
            source: source.into(),
            name: Some(name.to_string()),
            ty,
        }
    }
}
