// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure kinds surfaced by the public operations.
///
/// Cell-level coercion failures are not errors: the cell becomes
/// [`crate::Value::Missing`].
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("failed to load {location}: {source}")]
    LoadFailure {
        location: String,
        #[source]
        source: Cause,
    },

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("failed to persist table `{table}`: {source}")]
    PersistFailure {
        table: String,
        #[source]
        source: Cause,
    },

    #[error("invalid configuration {path:?}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: Cause,
    },
}

impl EtlError {
    pub fn load(location: impl Into<String>, cause: impl Into<Cause>) -> Self {
        EtlError::LoadFailure {
            location: location.into(),
            source: cause.into(),
        }
    }

    pub fn persist(table: impl Into<String>, cause: impl Into<Cause>) -> Self {
        EtlError::PersistFailure {
            table: table.into(),
            source: cause.into(),
        }
    }

    pub fn config(path: impl Into<PathBuf>, cause: impl Into<Cause>) -> Self {
        EtlError::Config {
            path: path.into(),
            source: cause.into(),
        }
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        EtlError::SchemaMismatch(msg.into())
    }
}
