//! Getting dependency sources onto disk.
//!
//! - [`download`] - fetch an archive over HTTP(S) unless it is already present
//! - [`extract`] - unpack tar archives (plain, gzip, bzip2, zstd)
//! - [`marker`] - idempotency gate and completion marker for prepared trees

pub mod download;
pub mod extract;
pub mod marker;

/// A versioned source archive published at a fixed URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSource {
    /// Download URL.
    pub url: &'static str,
    /// Local filename the archive is saved under.
    pub filename: &'static str,
}
