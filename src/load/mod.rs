// src/load/mod.rs

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use crate::dataset::Dataset;
use crate::error::EtlError;
use crate::fetch::{self, zips, Location};

pub mod decode;
pub mod parse;

pub use parse::MalformedRows;

/// Zip wrapping of a source: the archive is retrieved, extracted into
/// `extract_to`, and `member` is parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Archive {
    pub member: String,
    pub extract_to: PathBuf,
    #[serde(default)]
    pub download_to: Option<PathBuf>,
}

/// A delimited text resource and how to read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Source {
    /// URL or local path; for archives, the archive's location.
    pub location: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default = "default_true")]
    pub header: bool,
    #[serde(default)]
    pub skip_rows: usize,
    #[serde(default)]
    pub skip_footer: usize,
    #[serde(default)]
    pub malformed: MalformedRows,
    /// Cell texts read as missing, in addition to the empty cell.
    #[serde(default)]
    pub na_values: Vec<String>,
    #[serde(default)]
    pub archive: Option<Archive>,
}

fn default_delimiter() -> char {
    ','
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_true() -> bool {
    true
}

impl Source {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            delimiter: default_delimiter(),
            encoding: default_encoding(),
            header: true,
            skip_rows: 0,
            skip_footer: 0,
            malformed: MalformedRows::Skip,
            na_values: Vec::new(),
            archive: None,
        }
    }

    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn encoding(mut self, label: &str) -> Self {
        self.encoding = label.to_string();
        self
    }

    pub fn headerless(mut self) -> Self {
        self.header = false;
        self
    }

    pub fn archive(mut self, archive: Archive) -> Self {
        self.archive = Some(archive);
        self
    }

    fn delimiter_byte(&self) -> Result<u8> {
        if !self.delimiter.is_ascii() {
            bail!("delimiter {:?} is not a single-byte character", self.delimiter);
        }
        Ok(self.delimiter as u8)
    }
}

/// Load `source` into a dataset. Every column comes back as text.
///
/// Any I/O, HTTP, archive, decoding or parse problem is a `LoadFailure`; no
/// retry is attempted.
#[tracing::instrument(level = "info", skip_all, fields(location = %source.location))]
pub async fn load(client: &Client, source: &Source) -> Result<Dataset, EtlError> {
    load_inner(client, source)
        .await
        .map_err(|e| EtlError::load(&source.location, e))
}

async fn load_inner(client: &Client, source: &Source) -> Result<Dataset> {
    // 1) validate reader settings before touching the network
    let delimiter = source.delimiter_byte()?;
    let encoding = decode::lookup(&source.encoding)?;
    let location = Location::parse(&source.location);

    // 2) raw bytes, straight or through the archive
    let bytes = match &source.archive {
        Some(archive) => {
            let member = zips::retrieve_member(
                client,
                &location,
                &archive.extract_to,
                archive.download_to.as_deref(),
                &archive.member,
            )
            .await?;
            tokio::fs::read(&member)
                .await
                .with_context(|| format!("reading {}", member.display()))?
        }
        None => fetch::fetch_bytes(client, &location).await?,
    };

    // 3) decode, cut preamble/footer, parse
    let text = decode::decode(&bytes, encoding)?;
    let body = decode::trim_lines(&text, source.skip_rows, source.skip_footer);
    let dataset = parse::parse_delimited(
        body,
        &parse::ParseOptions {
            delimiter,
            header: source.header,
            malformed: source.malformed,
            na_values: &source.na_values,
        },
    )?;

    info!(
        rows = dataset.num_rows(),
        columns = dataset.num_columns(),
        "loaded"
    );
    Ok(dataset)
}
