// src/config/mod.rs

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::{Path, PathBuf},
};

use crate::error::EtlError;
use crate::load::Source;
use crate::persist::SqliteStore;
use crate::transform::{Step, Transformer};

fn default_database() -> PathBuf {
    PathBuf::from("data/tabload.sqlite")
}

/// All configured datasets plus the default store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_database")]
    pub database: PathBuf,
    pub datasets: Vec<DatasetConfig>,
}

/// How one dataset is loaded, shaped and stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    pub name: String,
    /// Target table; defaults to `name`.
    #[serde(default)]
    pub table: Option<String>,
    /// Store for this dataset; defaults to the top-level `database`.
    #[serde(default)]
    pub database: Option<PathBuf>,
    pub source: Source,
    /// Auxiliary datasets `join` steps can refer to. Loaded, never persisted.
    #[serde(default)]
    pub lookups: BTreeMap<String, Lookup>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Lookup {
    pub source: Source,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl DatasetConfig {
    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.name)
    }

    pub fn store(&self, default_db: &Path) -> SqliteStore {
        SqliteStore::new(self.database.as_deref().unwrap_or(default_db))
    }

    pub fn transformer(&self) -> Transformer {
        Transformer::new(self.steps.clone())
    }
}

impl Config {
    /// Read a `.yaml`/`.yml` or `.json` configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EtlError> {
        let path = path.as_ref();
        Self::read(path).map_err(|e| EtlError::config(path, e))
    }

    fn read(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        let config: Config = match ext.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&text).context("parsing YAML")?,
            "json" => serde_json::from_str(&text).context("parsing JSON")?,
            other => bail!("unsupported config extension: .{other}"),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, EtlError> {
        let parsed: Result<Config> = serde_yaml::from_str::<Config>(text)
            .context("parsing YAML")
            .and_then(|c| c.validate().map(|_| c));
        parsed.map_err(|e| EtlError::config("<inline>", e))
    }

    fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for ds in &self.datasets {
            if !names.insert(ds.name.as_str()) {
                return Err(anyhow!("dataset `{}` is defined twice", ds.name));
            }
            if ds.table_name().trim().is_empty() {
                return Err(anyhow!("dataset `{}` has an empty table name", ds.name));
            }
        }
        Ok(())
    }

    pub fn dataset(&self, name: &str) -> Option<&DatasetConfig> {
        self.datasets.iter().find(|d| d.name == name)
    }
}
