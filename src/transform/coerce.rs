// src/transform/coerce.rs

use tracing::debug;

use crate::dataset::{Column, ColumnRef, Dataset, SemanticType, Value};
use crate::error::EtlError;

/// Coerce the referenced columns to `to`. Cells that do not parse become
/// `Missing`; the column is always converted as a whole.
pub fn coerce(ds: Dataset, refs: &[ColumnRef], to: SemanticType) -> Result<Dataset, EtlError> {
    let positions = refs
        .iter()
        .map(|r| ds.resolve(r))
        .collect::<Result<Vec<_>, _>>()?;

    let mut columns = ds.into_columns();
    for pos in positions {
        let col = std::mem::replace(
            &mut columns[pos],
            Column::new(String::new(), to, Vec::new()),
        );
        columns[pos] = coerce_column(col, to);
    }
    Dataset::new(columns)
}

pub fn coerce_column(col: Column, to: SemanticType) -> Column {
    let before = col.missing_count();
    let values: Vec<Value> = col.values.into_iter().map(|v| coerce_value(v, to)).collect();
    let failed = values.iter().filter(|v| v.is_missing()).count() - before;
    if failed > 0 {
        debug!(column = %col.name, to = %to, failed, "cells failed coercion");
    }
    Column::new(col.name, to, values)
}

pub fn coerce_value(value: Value, to: SemanticType) -> Value {
    match (value, to) {
        (Value::Missing, _) => Value::Missing,

        (Value::Integer(i), SemanticType::Integer) => Value::Integer(i),
        (Value::Float(f), SemanticType::Integer) => integral(f).into(),
        (Value::Text(s), SemanticType::Integer) => parse_integer(&s).into(),

        (Value::Integer(i), SemanticType::Float) => Value::Float(i as f64),
        (Value::Float(f), SemanticType::Float) => finite_or_nan(f).into(),
        (Value::Text(s), SemanticType::Float) => parse_float(&s).into(),

        (Value::Text(s), SemanticType::Text) => Value::Text(s),
        (other, SemanticType::Text) => Value::Text(other.to_string()),
    }
}

/// `"42"`, `" 42 "`, `"+42"` and `"42.0"` all give 42.
fn parse_integer(s: &str) -> Option<i64> {
    let s = s.trim();
    s.parse::<i64>().ok().or_else(|| parse_float(s).and_then(integral))
}

/// NaN counts as missing; infinities are kept.
fn parse_float(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().and_then(finite_or_nan)
}

fn finite_or_nan(f: f64) -> Option<f64> {
    (!f.is_nan()).then_some(f)
}

fn integral(f: f64) -> Option<i64> {
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.is_finite() && f.fract() == 0.0 && in_range).then(|| f as i64)
}
