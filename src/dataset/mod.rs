// src/dataset/mod.rs

mod types;

pub use types::{ColumnRef, ColumnSpec, KeyPart, SemanticType, Value};

use crate::error::EtlError;
use std::collections::HashSet;

/// One named, typed column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub ty: SemanticType,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: SemanticType, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            ty,
            values,
        }
    }

    pub fn integers<I: IntoIterator<Item = i64>>(name: &str, values: I) -> Self {
        Self::new(
            name,
            SemanticType::Integer,
            values.into_iter().map(Value::Integer).collect(),
        )
    }

    pub fn floats<I: IntoIterator<Item = f64>>(name: &str, values: I) -> Self {
        Self::new(
            name,
            SemanticType::Float,
            values.into_iter().map(Value::Float).collect(),
        )
    }

    pub fn texts<'a, I: IntoIterator<Item = &'a str>>(name: &str, values: I) -> Self {
        Self::new(
            name,
            SemanticType::Text,
            values.into_iter().map(Value::from).collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_missing()).count()
    }
}

/// In-memory table: ordered, uniquely named columns of equal length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<Column>,
}

impl Dataset {
    /// Build a dataset, rejecting ragged columns and duplicate names.
    pub fn new(columns: Vec<Column>) -> Result<Self, EtlError> {
        if let Some(first) = columns.first() {
            if let Some(bad) = columns.iter().find(|c| c.len() != first.len()) {
                return Err(EtlError::schema(format!(
                    "column `{}` has {} rows, `{}` has {}",
                    bad.name,
                    bad.len(),
                    first.name,
                    first.len()
                )));
            }
        }
        let mut seen = HashSet::new();
        for c in &columns {
            if !seen.insert(c.name.as_str()) {
                return Err(EtlError::schema(format!("duplicate column `{}`", c.name)));
            }
        }
        Ok(Self { columns })
    }

    /// Row-oriented constructor, mostly for fixtures and store reads.
    pub fn from_rows(
        schema: &[(&str, SemanticType)],
        rows: Vec<Vec<Value>>,
    ) -> Result<Self, EtlError> {
        let mut columns: Vec<Column> = schema
            .iter()
            .map(|(name, ty)| Column::new(*name, *ty, Vec::with_capacity(rows.len())))
            .collect();
        for (idx, row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(EtlError::schema(format!(
                    "row {} has {} values, expected {}",
                    idx,
                    row.len(),
                    columns.len()
                )));
            }
            for (col, v) in columns.iter_mut().zip(row) {
                col.values.push(v);
            }
        }
        Self::new(columns)
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Position of the referenced column, or `SchemaMismatch`.
    pub fn resolve(&self, col: &ColumnRef) -> Result<usize, EtlError> {
        let found = match col {
            ColumnRef::Index(i) if *i < self.columns.len() => Some(*i),
            ColumnRef::Index(_) => None,
            ColumnRef::Name(n) => self.columns.iter().position(|c| &c.name == n),
        };
        found.ok_or_else(|| {
            EtlError::schema(format!(
                "unknown column {} (have: {})",
                col,
                self.column_names().join(", ")
            ))
        })
    }

    /// Values of row `idx`, in column order.
    pub fn row(&self, idx: usize) -> Vec<&Value> {
        self.columns.iter().map(|c| &c.values[idx]).collect()
    }

    /// Keep the rows whose mask entry is `true`.
    pub fn retain_rows(self, mask: &[bool]) -> Self {
        debug_assert_eq!(mask.len(), self.num_rows());
        let columns = self
            .columns
            .into_iter()
            .map(|c| {
                let values = c
                    .values
                    .into_iter()
                    .zip(mask)
                    .filter_map(|(v, keep)| keep.then_some(v))
                    .collect();
                Column { values, ..c }
            })
            .collect();
        Self { columns }
    }

    pub fn has_missing(&self) -> bool {
        self.columns
            .iter()
            .any(|c| c.values.iter().any(Value::is_missing))
    }
}
