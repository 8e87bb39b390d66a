// src/transform/aggregate.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::dataset::{Column, ColumnRef, Dataset, KeyPart, SemanticType, Value};
use crate::error::EtlError;

fn default_count_column() -> String {
    "count".to_string()
}

/// Group-by + mean, with small groups discarded before averaging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Aggregate {
    pub by: Vec<ColumnRef>,
    /// Columns to average; defaults to every numeric non-key column.
    #[serde(default)]
    pub columns: Option<Vec<ColumnRef>>,
    #[serde(default)]
    pub min_count: usize,
    #[serde(default = "default_count_column")]
    pub count_column: String,
}

impl Aggregate {
    pub fn by(keys: &[&str]) -> Self {
        Self {
            by: keys.iter().map(|k| ColumnRef::from(*k)).collect(),
            columns: None,
            min_count: 0,
            count_column: default_count_column(),
        }
    }

    pub fn min_count(mut self, n: usize) -> Self {
        self.min_count = n;
        self
    }
}

struct Group {
    first_row: usize,
    rows: Vec<usize>,
}

pub fn aggregate(ds: &Dataset, spec: &Aggregate) -> Result<Dataset, EtlError> {
    let keys = spec
        .by
        .iter()
        .map(|r| ds.resolve(r))
        .collect::<Result<Vec<_>, _>>()?;

    let value_cols = match &spec.columns {
        Some(refs) => {
            let positions = refs
                .iter()
                .map(|r| ds.resolve(r))
                .collect::<Result<Vec<_>, _>>()?;
            if let Some(&bad) = positions.iter().find(|&&p| !ds.columns()[p].ty.is_numeric()) {
                return Err(EtlError::schema(format!(
                    "cannot average {} column `{}`",
                    ds.columns()[bad].ty,
                    ds.columns()[bad].name
                )));
            }
            positions
        }
        None => (0..ds.num_columns())
            .filter(|p| !keys.contains(p) && ds.columns()[*p].ty.is_numeric())
            .collect(),
    };

    // 1) bucket rows by key, in order of first appearance; missing keys drop out
    let columns = ds.columns();
    let mut index: HashMap<Vec<KeyPart>, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();
    for row in 0..ds.num_rows() {
        let key: Option<Vec<KeyPart>> = keys.iter().map(|&k| columns[k].values[row].key()).collect();
        let Some(key) = key else { continue };
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(Group {
                first_row: row,
                rows: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].rows.push(row);
    }

    // 2) discard small groups before any mean is taken
    let total = groups.len();
    groups.retain(|g| g.rows.len() >= spec.min_count);
    debug!(
        groups = total,
        kept = groups.len(),
        min_count = spec.min_count,
        "grouped"
    );

    // 3) keys, means, counts
    let mut out: Vec<Column> = keys
        .iter()
        .map(|&k| {
            let src = &columns[k];
            let values = groups
                .iter()
                .map(|g| src.values[g.first_row].clone())
                .collect();
            Column::new(src.name.clone(), src.ty, values)
        })
        .collect();

    for &p in &value_cols {
        let src = &columns[p];
        let values = groups
            .iter()
            .map(|g| mean(g.rows.iter().map(|&r| &src.values[r])))
            .collect();
        out.push(Column::new(src.name.clone(), SemanticType::Float, values));
    }

    out.push(Column::new(
        spec.count_column.clone(),
        SemanticType::Integer,
        groups
            .iter()
            .map(|g| Value::Integer(g.rows.len() as i64))
            .collect(),
    ));

    Dataset::new(out)
}

/// Arithmetic mean over the present values; `Missing` when there are none
/// or the mean is not finite.
fn mean<'a>(values: impl Iterator<Item = &'a Value>) -> Value {
    let (sum, n) = values
        .filter_map(Value::as_f64)
        .filter(|x| !x.is_nan())
        .fold((0.0, 0usize), |(s, n), x| (s + x, n + 1));
    let avg = sum / n as f64;
    if n == 0 || !avg.is_finite() {
        Value::Missing
    } else {
        Value::Float(avg)
    }
}
