// src/transform/mod.rs
//! Ordered, pure transform steps over a [`Dataset`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::dataset::{ColumnRef, ColumnSpec, Dataset, SemanticType};
use crate::error::EtlError;

pub mod aggregate;
pub mod coerce;
pub mod columns;
pub mod filter;
pub mod join;

pub use aggregate::Aggregate;
pub use filter::{Literal, Predicate};
pub use join::{Join, JoinKind};

/// Columns to convert: the listed ones, or every column but `except`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Coerce {
    #[serde(default)]
    pub columns: Option<Vec<ColumnRef>>,
    #[serde(default)]
    pub except: Vec<ColumnRef>,
    pub to: SemanticType,
}

impl Coerce {
    pub fn new(refs: Vec<ColumnRef>, to: SemanticType) -> Self {
        Self {
            columns: Some(refs),
            except: Vec::new(),
            to,
        }
    }

    fn targets(&self, ds: &Dataset) -> Result<Vec<ColumnRef>, EtlError> {
        if let Some(refs) = &self.columns {
            return Ok(refs.clone());
        }
        let skip = self
            .except
            .iter()
            .map(|r| ds.resolve(r))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((0..ds.num_columns())
            .filter(|p| !skip.contains(p))
            .map(ColumnRef::Index)
            .collect())
    }
}

/// One transform step, as written in the configuration:
///
/// ```yaml
/// - select: [stop_id, stop_name]
/// - coerce: {columns: [stop_id], to: integer}
/// - filter:
///     - range: {column: stop_lat, min: -90, max: 90}
/// - drop_incomplete
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Select(Vec<ColumnRef>),
    Rename(Vec<ColumnSpec>),
    Columns(Vec<ColumnSpec>),
    Coerce(Coerce),
    Filter(Vec<Predicate>),
    DropIncomplete,
    Aggregate(Aggregate),
    Join(Join),
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Select(_) => "select",
            Step::Rename(_) => "rename",
            Step::Columns(_) => "columns",
            Step::Coerce(_) => "coerce",
            Step::Filter(_) => "filter",
            Step::DropIncomplete => "drop_incomplete",
            Step::Aggregate(_) => "aggregate",
            Step::Join(_) => "join",
        }
    }

    /// Apply this step. `partners` holds the datasets a join may refer to.
    pub fn apply(
        &self,
        ds: Dataset,
        partners: &BTreeMap<String, Dataset>,
    ) -> Result<Dataset, EtlError> {
        match self {
            Step::Select(refs) => columns::select(ds, refs),
            Step::Rename(specs) => columns::rename(ds, specs),
            Step::Columns(specs) => columns::apply_specs(ds, specs),
            Step::Coerce(c) => {
                let targets = c.targets(&ds)?;
                coerce::coerce(ds, &targets, c.to)
            }
            Step::Filter(preds) => filter::filter(ds, preds),
            Step::DropIncomplete => Ok(drop_incomplete(ds)),
            Step::Aggregate(spec) => aggregate::aggregate(&ds, spec),
            Step::Join(j) => {
                let right = partners.get(&j.with).ok_or_else(|| {
                    EtlError::schema(format!("no dataset `{}` to join with", j.with))
                })?;
                join::join(&ds, right, &j.on, j.how)
            }
        }
    }
}

/// Remove every row holding a missing value in any column.
pub fn drop_incomplete(ds: Dataset) -> Dataset {
    let mask: Vec<bool> = (0..ds.num_rows())
        .map(|r| ds.columns().iter().all(|c| !c.values[r].is_missing()))
        .collect();
    ds.retain_rows(&mask)
}

/// A left-to-right fold over steps. The first failing step aborts the rest.
#[derive(Debug, Clone, Default)]
pub struct Transformer {
    steps: Vec<Step>,
    partners: BTreeMap<String, Dataset>,
}

impl Transformer {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            partners: BTreeMap::new(),
        }
    }

    /// Register a dataset that `join` steps can refer to by `name`.
    pub fn with_dataset(mut self, name: impl Into<String>, ds: Dataset) -> Self {
        self.partners.insert(name.into(), ds);
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn apply(&self, input: Dataset) -> Result<Dataset, EtlError> {
        let rows_in = input.num_rows();
        let out = self
            .steps
            .iter()
            .enumerate()
            .try_fold(input, |ds, (idx, step)| {
                let before = ds.num_rows();
                let next = step.apply(ds, &self.partners)?;
                debug!(
                    step = idx,
                    kind = step.name(),
                    rows_before = before,
                    rows_after = next.num_rows(),
                    columns = next.num_columns(),
                    "step applied"
                );
                Ok::<_, EtlError>(next)
            })?;
        info!(rows_in, rows_out = out.num_rows(), steps = self.steps.len(), "transformed");
        Ok(out)
    }
}
