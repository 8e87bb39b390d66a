// src/fetch/zips.rs

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};
use tracing::{debug, info};
use zip::ZipArchive;

use super::{fetch_to_file, Location};

/// Retrieve the archive at `location` into `download_to`, or into
/// `extract_to/<archive file name>` when no download path is given.
/// Returns the path of the saved archive.
pub async fn download_zip(
    client: &Client,
    location: &Location,
    extract_to: &Path,
    download_to: Option<&Path>,
) -> Result<PathBuf> {
    let dest = match download_to {
        Some(p) => p.to_path_buf(),
        None => {
            let name = location
                .file_name()
                .unwrap_or_else(|| "download.zip".to_string());
            extract_to.join(name)
        }
    };
    fetch_to_file(client, location, &dest).await?;
    debug!(path = %dest.display(), "archive saved");
    Ok(dest)
}

/// Extract every entry of `zip_path` under `dest_dir`.
pub fn extract_all(zip_path: &Path, dest_dir: &Path) -> Result<usize> {
    fs::create_dir_all(dest_dir)
        .with_context(|| format!("creating extraction directory {}", dest_dir.display()))?;

    let file = File::open(zip_path)
        .with_context(|| format!("Failed to open ZIP file: {:?}", zip_path))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("Failed to read ZIP archive: {:?}", zip_path))?;
    let entries = archive.len();
    archive
        .extract(dest_dir)
        .with_context(|| format!("extracting {:?} into {:?}", zip_path, dest_dir))?;

    info!(zip = %zip_path.display(), entries, "extracted");
    Ok(entries)
}

/// Fail unless `member` is an entry of the archive at `zip_path`.
pub fn ensure_member(zip_path: &Path, member: &str) -> Result<()> {
    let file = File::open(zip_path)
        .with_context(|| format!("Failed to open ZIP file: {:?}", zip_path))?;
    let archive = ZipArchive::new(file)
        .with_context(|| format!("Failed to read ZIP archive: {:?}", zip_path))?;
    if archive.index_for_name(member).is_none() {
        return Err(anyhow!(
            "archive {:?} has no member `{}`",
            zip_path,
            member
        ));
    }
    Ok(())
}

/// Download, extract, and return the path of `member` inside `extract_to`.
/// The member is looked up in the archive itself, so files left in
/// `extract_to` by an earlier run never stand in for it.
pub async fn retrieve_member(
    client: &Client,
    location: &Location,
    extract_to: &Path,
    download_to: Option<&Path>,
    member: &str,
) -> Result<PathBuf> {
    let zip_path = download_zip(client, location, extract_to, download_to).await?;
    ensure_member(&zip_path, member)?;
    extract_all(&zip_path, extract_to)?;
    Ok(extract_to.join(member))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::tempdir;
    use zip::write::FileOptions;
    use zip::CompressionMethod;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) -> Result<()> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options: FileOptions<'_, ()> =
                FileOptions::default().compression_method(CompressionMethod::Stored);
            for (name, content) in entries {
                zip.start_file(*name, options)?;
                zip.write_all(content.as_bytes())?;
            }
            zip.finish()?;
        }
        fs::write(path, &buf)?;
        Ok(())
    }

    #[tokio::test]
    async fn extracts_requested_member() -> Result<()> {
        let dir = tempdir()?;
        let src = dir.path().join("GTFS.zip");
        write_zip(
            &src,
            &[
                ("stops.txt", "stop_id,stop_name\n1,Fulda\n"),
                ("routes.txt", "route_id\n7\n"),
            ],
        )?;
        let extract_to = dir.path().join("out");

        let member = retrieve_member(
            &Client::new(),
            &Location::Local(src),
            &extract_to,
            None,
            "stops.txt",
        )
        .await?;

        assert_eq!(member, extract_to.join("stops.txt"));
        assert!(extract_to.join("routes.txt").is_file());
        assert!(extract_to.join("GTFS.zip").is_file());
        Ok(())
    }

    #[tokio::test]
    async fn missing_member_fails() -> Result<()> {
        let dir = tempdir()?;
        let src = dir.path().join("GTFS.zip");
        write_zip(&src, &[("routes.txt", "route_id\n7\n")])?;

        let res = retrieve_member(
            &Client::new(),
            &Location::Local(src),
            &dir.path().join("out"),
            None,
            "stops.txt",
        )
        .await;
        assert!(res.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn stale_member_from_earlier_run_is_not_used() -> Result<()> {
        let dir = tempdir()?;
        let src = dir.path().join("GTFS.zip");
        let extract_to = dir.path().join("out");

        write_zip(&src, &[("stops.txt", "stop_id\n1\n")])?;
        retrieve_member(
            &Client::new(),
            &Location::Local(src.clone()),
            &extract_to,
            None,
            "stops.txt",
        )
        .await?;
        assert!(extract_to.join("stops.txt").is_file());

        // next feed no longer carries stops.txt
        write_zip(&src, &[("routes.txt", "route_id\n7\n")])?;
        let res = retrieve_member(
            &Client::new(),
            &Location::Local(src),
            &extract_to,
            None,
            "stops.txt",
        )
        .await;
        assert!(res.is_err());
        Ok(())
    }

    #[test]
    fn corrupt_archive_fails() -> Result<()> {
        let dir = tempdir()?;
        let src = dir.path().join("broken.zip");
        fs::write(&src, b"not a zip")?;
        assert!(extract_all(&src, &dir.path().join("out")).is_err());
        Ok(())
    }
}
