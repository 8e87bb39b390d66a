// src/transform/filter.rs

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::dataset::{ColumnRef, Dataset, Value};
use crate::error::EtlError;

/// A literal to compare cells against in an `in` predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Literal {
    fn matches(&self, cell: &Value) -> bool {
        match self {
            Literal::Integer(i) => cell.as_f64() == Some(*i as f64),
            Literal::Float(f) => cell.as_f64() == Some(*f),
            Literal::Text(t) => !cell.is_missing() && cell.to_string() == *t,
        }
    }
}

/// Row filter predicate. A missing cell never satisfies a predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Numeric value within `[min, max]`; an absent bound is open.
    Range {
        column: ColumnRef,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    /// Exact match against one of `values`.
    In {
        column: ColumnRef,
        values: Vec<Literal>,
    },
    /// Unanchored regex search over the text form of the cell.
    Pattern { column: ColumnRef, regex: String },
    /// Text form has exactly `len` characters.
    Length { column: ColumnRef, len: usize },
}

impl Predicate {
    pub fn column(&self) -> &ColumnRef {
        match self {
            Predicate::Range { column, .. }
            | Predicate::In { column, .. }
            | Predicate::Pattern { column, .. }
            | Predicate::Length { column, .. } => column,
        }
    }

    /// Boolean mask over the rows of `ds`.
    pub fn mask(&self, ds: &Dataset) -> Result<Vec<bool>, EtlError> {
        let pos = ds.resolve(self.column())?;
        let values = &ds.columns()[pos].values;

        let mask = match self {
            Predicate::Range { min, max, .. } => values
                .iter()
                .map(|v| match v.as_f64() {
                    Some(x) => min.map_or(true, |m| x >= m) && max.map_or(true, |m| x <= m),
                    None => false,
                })
                .collect(),
            Predicate::In { values: set, .. } => values
                .iter()
                .map(|v| set.iter().any(|lit| lit.matches(v)))
                .collect(),
            Predicate::Pattern { regex, .. } => {
                let re = Regex::new(regex)
                    .map_err(|e| EtlError::schema(format!("invalid pattern `{}`: {}", regex, e)))?;
                values
                    .iter()
                    .map(|v| !v.is_missing() && re.is_match(&v.to_string()))
                    .collect()
            }
            Predicate::Length { len, .. } => values
                .iter()
                .map(|v| !v.is_missing() && v.to_string().chars().count() == *len)
                .collect(),
        };
        Ok(mask)
    }
}

/// Keep the rows satisfying every predicate.
pub fn filter(ds: Dataset, predicates: &[Predicate]) -> Result<Dataset, EtlError> {
    let mut keep = vec![true; ds.num_rows()];
    for p in predicates {
        for (k, m) in keep.iter_mut().zip(p.mask(&ds)?) {
            *k &= m;
        }
    }
    Ok(ds.retain_rows(&keep))
}
