// src/fetch/mod.rs

use anyhow::{Context, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs;
use url::Url;

pub mod zips;

/// Where a resource lives: a remote HTTP(S) URL or a file on disk.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Remote(Url),
    Local(PathBuf),
}

impl Location {
    /// `http(s)://` → remote, `file://` and anything that does not parse as
    /// a URL (plain paths, Windows drive letters) → local.
    pub fn parse(raw: &str) -> Location {
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Location::Remote(url),
            Ok(url) if url.scheme() == "file" => match url.to_file_path() {
                Ok(p) => Location::Local(p),
                Err(()) => Location::Local(PathBuf::from(url.path())),
            },
            _ => Location::Local(PathBuf::from(raw)),
        }
    }

    /// Last path segment, used to name downloaded archives.
    pub fn file_name(&self) -> Option<String> {
        match self {
            Location::Remote(url) => url
                .path_segments()
                .and_then(|segments| segments.last())
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            Location::Local(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned()),
        }
    }
}

/// Read the whole resource into memory.
pub async fn fetch_bytes(client: &Client, location: &Location) -> Result<Vec<u8>> {
    match location {
        Location::Remote(url) => {
            let resp = client
                .get(url.as_str())
                .send()
                .await
                .with_context(|| format!("GET {}", url))?
                .error_for_status()?;
            let bytes = resp
                .bytes()
                .await
                .with_context(|| format!("reading body from {}", url))?;
            Ok(bytes.to_vec())
        }
        Location::Local(path) => fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display())),
    }
}

/// Fetch the resource and store it at `dest`, creating parent directories.
pub async fn fetch_to_file(client: &Client, location: &Location, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let bytes = fetch_bytes(client, location).await?;
    fs::write(dest, &bytes)
        .await
        .with_context(|| format!("writing {}", dest.display()))?;
    Ok(())
}
