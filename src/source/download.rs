//! Archive download.
//!
//! The archive filename doubles as the "already downloaded" check: an
//! existing file is never re-fetched or verified. Bodies are written to a
//! `.part` file first and renamed into place once complete, so an interrupted
//! transfer never leaves something that looks like a finished download.

use anyhow::{bail, Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fetches the body of a URL.
pub trait Downloader {
    /// Stream the body of `url` into `sink`, returning the number of bytes.
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64>;
}

/// Blocking HTTP(S) downloader.
pub struct HttpDownloader {
    client: reqwest::blocking::Client,
}

impl HttpDownloader {
    /// Create a downloader whose whole-transfer timeout is `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("native-deps/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

impl Downloader for HttpDownloader {
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64> {
        let mut response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Failed to send request to {}", url))?;

        if !response.status().is_success() {
            bail!("HTTP error {}: failed to download {}", response.status(), url);
        }

        response
            .copy_to(sink)
            .with_context(|| format!("Failed to read response body from {}", url))
    }
}

/// Whether [`download_if_missing`] touched the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    AlreadyPresent,
    Downloaded { bytes: u64 },
}

/// Download `url` to `dest` unless `dest` already exists.
pub fn download_if_missing(
    downloader: &dyn Downloader,
    url: &str,
    dest: &Path,
) -> Result<FetchOutcome> {
    if dest.is_file() {
        return Ok(FetchOutcome::AlreadyPresent);
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating download directory '{}'", parent.display()))?;
    }

    let part = part_path(dest);
    let result = fetch_to(downloader, url, &part);
    let bytes = match result {
        Ok(bytes) => bytes,
        Err(e) => {
            let _ = fs::remove_file(&part);
            return Err(e);
        }
    };

    fs::rename(&part, dest).with_context(|| {
        format!(
            "moving finished download '{}' to '{}'",
            part.display(),
            dest.display()
        )
    })?;

    Ok(FetchOutcome::Downloaded { bytes })
}

fn fetch_to(downloader: &dyn Downloader, url: &str, path: &Path) -> Result<u64> {
    let file =
        File::create(path).with_context(|| format!("creating '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);
    let bytes = downloader.fetch(url, &mut writer)?;
    writer
        .flush()
        .with_context(|| format!("writing '{}'", path.display()))?;
    Ok(bytes)
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}
