// src/pipeline.rs
//! One dataset end to end: lookups → load → transform → persist.

use reqwest::Client;
use std::path::Path;
use tracing::{error, info, warn};

use crate::config::{Config, DatasetConfig};
use crate::error::EtlError;
use crate::load::load;
use crate::transform::Transformer;

/// What a successful run wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub dataset: String,
    pub table: String,
    pub rows: usize,
}

/// Load, transform and persist a single dataset. Nothing is written unless
/// every earlier stage succeeded.
#[tracing::instrument(level = "info", skip_all, fields(dataset = %cfg.name))]
pub async fn run_dataset(
    client: &Client,
    cfg: &DatasetConfig,
    default_db: &Path,
) -> Result<Outcome, EtlError> {
    // 1) lookups first, each through its own steps
    let mut transformer = cfg.transformer();
    for (name, lookup) in &cfg.lookups {
        let raw = load(client, &lookup.source).await?;
        let shaped = Transformer::new(lookup.steps.clone()).apply(raw)?;
        info!(lookup = %name, rows = shaped.num_rows(), "lookup ready");
        transformer = transformer.with_dataset(name.clone(), shaped);
    }

    // 2) main source
    let raw = load(client, &cfg.source).await?;

    // 3) steps
    let ds = transformer.apply(raw)?;

    // 4) replace table
    let table = cfg.table_name();
    let rows = cfg.store(default_db).persist(table, &ds)?;

    Ok(Outcome {
        dataset: cfg.name.clone(),
        table: table.to_string(),
        rows,
    })
}

/// Run the named datasets (all when `only` is empty), one after another.
/// A failure is logged and the next dataset still runs.
pub async fn run_all(
    client: &Client,
    config: &Config,
    only: &[String],
) -> Vec<(String, Result<Outcome, EtlError>)> {
    for name in only {
        if config.dataset(name).is_none() {
            warn!(dataset = %name, "not configured; skipped");
        }
    }

    let mut results = Vec::new();
    for cfg in config
        .datasets
        .iter()
        .filter(|d| only.is_empty() || only.contains(&d.name))
    {
        let res = run_dataset(client, cfg, &config.database).await;
        match &res {
            Ok(o) => info!(dataset = %o.dataset, table = %o.table, rows = o.rows, "done"),
            Err(e) => error!(dataset = %cfg.name, error = %e, "dataset failed"),
        }
        results.push((cfg.name.clone(), res));
    }
    results
}
