//! Idempotency gate for prepared dependency trees.
//!
//! A dependency counts as prepared as soon as its tree directory exists. A
//! small JSON marker is written into the tree only after every step of its
//! preparation succeeded, which lets a re-run tell a finished tree from one
//! left behind by an interrupted or failed run. Either way the tree is not
//! touched again; a broken tree has to be removed by hand.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const MARKER_FILENAME: &str = ".prepare-complete.json";

/// Contents of the completion marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionMarker {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_sha256: Option<String>,
    pub finished_at_utc: String,
}

impl CompletionMarker {
    /// Marker stamped with the current UTC time.
    pub fn now(name: &str, version: &str, archive_sha256: Option<String>) -> Self {
        let finished_at_utc = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());
        Self {
            name: name.to_string(),
            version: version.to_string(),
            archive_sha256,
            finished_at_utc,
        }
    }
}

/// State of a dependency tree before a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    /// No tree; the dependency must be prepared.
    Absent,
    /// Tree present with a readable completion marker.
    Complete(CompletionMarker),
    /// Tree present without a (readable) marker.
    Unverified,
}

impl GateState {
    pub fn should_skip(&self) -> bool {
        !matches!(self, GateState::Absent)
    }
}

pub fn marker_path(tree: &Path) -> PathBuf {
    tree.join(MARKER_FILENAME)
}

/// Inspect `tree` without modifying anything.
pub fn gate(tree: &Path) -> GateState {
    if !tree.is_dir() {
        return GateState::Absent;
    }

    let path = marker_path(tree);
    let Ok(bytes) = fs::read(&path) else {
        return GateState::Unverified;
    };
    match serde_json::from_slice(&bytes) {
        Ok(marker) => GateState::Complete(marker),
        Err(_) => GateState::Unverified,
    }
}

/// Write the completion marker into `tree`.
pub fn write_marker(tree: &Path, marker: &CompletionMarker) -> Result<()> {
    let path = marker_path(tree);
    let json = serde_json::to_vec_pretty(marker).context("serializing completion marker")?;
    fs::write(&path, json)
        .with_context(|| format!("writing completion marker '{}'", path.display()))
}

/// Hex sha256 of a file.
pub fn sha256_file(path: &Path) -> Result<String> {
    let f = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut r = BufReader::new(f);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = r
            .read(&mut buf)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
