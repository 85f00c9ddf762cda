//! Core data models used throughout the exporter.
//!
//! Tables are kept generic: a [`Table`] is an ordered list of column names
//! plus rows of dynamically typed [`Value`]s, so whatever columns a browser
//! version ships are carried through untouched.

use std::fmt;

/// A single cell, mirroring SQLite's storage classes.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Interpret the cell as an integer key.
    ///
    /// Reals with no fractional part are accepted; every other value
    /// (including `NULL` and text) has no key.
    pub fn as_key(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Real(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Real(v) => {
                if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
                    write!(f, "{:.1}", v)
                } else {
                    write!(f, "{}", v)
                }
            }
            Value::Text(s) => f.write_str(s),
            Value::Blob(bytes) => f.write_str(&hex::encode(bytes)),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

/// A table loaded from the history database, in native column and row order.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Position of `column` in the table, if present.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Outcome of an export run, reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub visits: usize,
    pub urls: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub destination: std::path::PathBuf,
}
