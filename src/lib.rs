//! tabload: load delimited text sources (local, remote, zip-wrapped), clean
//! and reshape them through an ordered list of steps, and write each result
//! as a SQLite table.
//!
//! One dataset at a time: `load` → `transform` → `persist`. What runs for
//! which dataset is described in a YAML/JSON configuration (see [`config`]).

pub mod config;
pub mod dataset;
pub mod error;
pub mod fetch;
pub mod load;
pub mod persist;
pub mod pipeline;
pub mod transform;

pub use config::{Config, DatasetConfig};
pub use dataset::{Column, Dataset, SemanticType, Value};
pub use error::EtlError;
pub use load::{load, Source};
pub use persist::SqliteStore;
pub use transform::{Step, Transformer};
