// src/load/parse.rs

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::dataset::{Column, Dataset, SemanticType, Value};

/// What to do with a record whose field count differs from the header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedRows {
    #[default]
    Skip,
    Fail,
}

pub struct ParseOptions<'a> {
    pub delimiter: u8,
    pub header: bool,
    pub malformed: MalformedRows,
    pub na_values: &'a [String],
}

/// Parse delimited text into an all-text dataset.
///
/// - With `header`, the first record names the columns; otherwise columns are
///   named by position (`"0"`, `"1"`, ...) and the first record is data.
/// - Empty cells (and any of `na_values`) become `Missing`.
pub fn parse_delimited(text: &str, opts: &ParseOptions<'_>) -> Result<Dataset> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // width is checked below, per the malformed-row policy
        .delimiter(opts.delimiter)
        .from_reader(text.as_bytes());

    let mut headers: Option<Vec<String>> = None;
    let mut cells: Vec<Vec<Value>> = Vec::new();
    let mut skipped = 0usize;

    for (idx, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("CSV parse error at record {}", idx))?;

        let width = match &headers {
            Some(h) => h.len(),
            None => {
                let names = if opts.header {
                    header_names(&record)
                } else {
                    (0..record.len()).map(|i| i.to_string()).collect()
                };
                let width = names.len();
                cells = (0..width).map(|_| Vec::new()).collect();
                headers = Some(names);
                if opts.header {
                    continue;
                }
                width
            }
        };

        if record.len() != width {
            match opts.malformed {
                MalformedRows::Skip => {
                    debug!(record = idx, fields = record.len(), expected = width, "skipping malformed row");
                    skipped += 1;
                    continue;
                }
                MalformedRows::Fail => bail!(
                    "record {} has {} fields, expected {}",
                    idx,
                    record.len(),
                    width
                ),
            }
        }

        for (col, field) in cells.iter_mut().zip(record.iter()) {
            col.push(to_value(field, opts.na_values));
        }
    }

    if skipped > 0 {
        warn!(skipped, "dropped malformed rows");
    }

    let columns = headers
        .unwrap_or_default()
        .into_iter()
        .zip(cells)
        .map(|(name, values)| Column::new(name, SemanticType::Text, values))
        .collect();
    Ok(Dataset::new(columns)?)
}

fn to_value(field: &str, na_values: &[String]) -> Value {
    if field.is_empty() || na_values.iter().any(|na| na == field) {
        Value::Missing
    } else {
        Value::Text(field.to_string())
    }
}

/// Header cells as column names: blanks become `Unnamed: <i>`, repeats get
/// a `.1`, `.2`, ... suffix.
fn header_names(record: &StringRecord) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    record
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let base = if raw.trim().is_empty() {
                format!("Unnamed: {}", i)
            } else {
                raw.to_string()
            };
            let mut name = base.clone();
            let mut n = 1;
            while seen.contains(&name) {
                name = format!("{}.{}", base, n);
                n += 1;
            }
            seen.insert(name.clone());
            name
        })
        .collect()
}
