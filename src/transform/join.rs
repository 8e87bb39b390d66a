// src/transform/join.rs

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::dataset::{Column, ColumnRef, Dataset, KeyPart, Value};
use crate::error::EtlError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
}

/// Join against the auxiliary dataset registered under `with`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Join {
    pub with: String,
    pub on: Vec<String>,
    #[serde(default)]
    pub how: JoinKind,
}

/// Merge `left` and `right` on the shared key columns `on`.
///
/// Output columns: every left column, then the right non-key columns. A left
/// row pairs with each right row of equal key; under `Left`, unmatched left
/// rows get `Missing` on the right-hand side. Missing keys never match.
pub fn join(
    left: &Dataset,
    right: &Dataset,
    on: &[String],
    how: JoinKind,
) -> Result<Dataset, EtlError> {
    if on.is_empty() {
        return Err(EtlError::schema("join needs at least one key column"));
    }
    let lkeys = resolve_all(left, on)?;
    let rkeys = resolve_all(right, on)?;

    // keys of different types never compare equal
    for (&l, &r) in lkeys.iter().zip(&rkeys) {
        let (lc, rc) = (&left.columns()[l], &right.columns()[r]);
        if lc.ty != rc.ty {
            return Err(EtlError::schema(format!(
                "join key `{}` is {} on the left but {} on the right",
                lc.name, lc.ty, rc.ty
            )));
        }
    }

    let rvalues: Vec<usize> = (0..right.num_columns())
        .filter(|p| !rkeys.contains(p))
        .collect();
    let left_names: HashSet<&str> = left.column_names().into_iter().collect();
    if let Some(&clash) = rvalues
        .iter()
        .find(|&&p| left_names.contains(right.columns()[p].name.as_str()))
    {
        return Err(EtlError::schema(format!(
            "join would duplicate column `{}`",
            right.columns()[clash].name
        )));
    }

    // 1) index the right side
    let mut index: HashMap<Vec<KeyPart>, Vec<usize>> = HashMap::new();
    for row in 0..right.num_rows() {
        if let Some(key) = row_key(right, &rkeys, row) {
            index.entry(key).or_default().push(row);
        }
    }

    // 2) pair rows
    let mut pairs: Vec<(usize, Option<usize>)> = Vec::new();
    for row in 0..left.num_rows() {
        let matches = row_key(left, &lkeys, row).and_then(|k| index.get(&k));
        match (matches, how) {
            (Some(rows), _) => pairs.extend(rows.iter().map(|&r| (row, Some(r)))),
            (None, JoinKind::Left) => pairs.push((row, None)),
            (None, JoinKind::Inner) => {}
        }
    }

    // 3) gather
    let mut out: Vec<Column> = left
        .columns()
        .iter()
        .map(|c| {
            let values = pairs.iter().map(|&(l, _)| c.values[l].clone()).collect();
            Column::new(c.name.clone(), c.ty, values)
        })
        .collect();
    for &p in &rvalues {
        let c = &right.columns()[p];
        let values = pairs
            .iter()
            .map(|&(_, r)| r.map_or(Value::Missing, |r| c.values[r].clone()))
            .collect();
        out.push(Column::new(c.name.clone(), c.ty, values));
    }
    Dataset::new(out)
}

fn resolve_all(ds: &Dataset, names: &[String]) -> Result<Vec<usize>, EtlError> {
    names
        .iter()
        .map(|n| ds.resolve(&ColumnRef::Name(n.clone())))
        .collect()
}

fn row_key(ds: &Dataset, keys: &[usize], row: usize) -> Option<Vec<KeyPart>> {
    keys.iter()
        .map(|&k| ds.columns()[k].values[row].key())
        .collect()
}
