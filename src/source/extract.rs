//! Tar archive extraction.
//!
//! The compression layer is picked from the archive filename. Extraction
//! unpacks the whole archive into the destination; there is no recovery from a
//! partially unpacked tree.

use anyhow::{bail, Context, Result};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;

/// Compression wrapped around the tar stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Zstd,
}

impl Compression {
    /// Detect compression from the archive filename.
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(Self::Gzip)
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
            Ok(Self::Bzip2)
        } else if name.ends_with(".tar.zst") || name.ends_with(".tzst") {
            Ok(Self::Zstd)
        } else if name.ends_with(".tar") {
            Ok(Self::None)
        } else {
            bail!(
                "unsupported archive format '{}' (expected .tar, .tar.gz, .tar.bz2 or .tar.zst)",
                path.display()
            )
        }
    }
}

/// Unpack `archive` into the directory `into`.
pub fn extract_archive(archive: &Path, into: &Path) -> Result<()> {
    let compression = Compression::from_path(archive)?;

    fs::create_dir_all(into)
        .with_context(|| format!("creating extraction directory '{}'", into.display()))?;

    let file = File::open(archive)
        .with_context(|| format!("opening archive '{}'", archive.display()))?;
    let reader = BufReader::new(file);

    let stream: Box<dyn Read> = match compression {
        Compression::None => Box::new(reader),
        Compression::Gzip => Box::new(flate2::read::GzDecoder::new(reader)),
        Compression::Bzip2 => Box::new(bzip2::read::BzDecoder::new(reader)),
        Compression::Zstd => Box::new(
            zstd::stream::Decoder::new(reader)
                .with_context(|| format!("initialising zstd for '{}'", archive.display()))?,
        ),
    };

    let mut tar = tar::Archive::new(stream);
    tar.set_preserve_permissions(true);
    tar.unpack(into).with_context(|| {
        format!(
            "Failed to unpack '{}' into '{}'",
            archive.display(),
            into.display()
        )
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn tar_bytes(top: &str) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        let body = b"cmake_minimum_required(VERSION 3.10)\n";
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("{top}/CMakeLists.txt"), &body[..])
            .unwrap();
        builder.into_inner().unwrap()
    }

    #[test]
    fn test_compression_from_path() {
        let cases = [
            ("PhysX-5.4.1.tar.gz", Compression::Gzip),
            ("openal-soft-1.23.1.tar.bz2", Compression::Bzip2),
            ("thing.TAR.ZST", Compression::Zstd),
            ("plain.tar", Compression::None),
        ];
        for (name, expected) in cases {
            assert_eq!(Compression::from_path(Path::new(name)).unwrap(), expected);
        }
        assert!(Compression::from_path(Path::new("openvr.zip")).is_err());
    }

    #[test]
    fn test_extract_gzip() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("openvr-2.5.1.tar.gz");
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&tar_bytes("openvr-2.5.1")).unwrap();
        fs::write(&archive, encoder.finish().unwrap()).unwrap();

        extract_archive(&archive, temp.path()).unwrap();

        assert!(temp.path().join("openvr-2.5.1/CMakeLists.txt").is_file());
    }

    #[test]
    fn test_extract_bzip2() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("openal-soft-1.23.1.tar.bz2");
        let mut encoder =
            bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        encoder.write_all(&tar_bytes("openal-soft-1.23.1")).unwrap();
        fs::write(&archive, encoder.finish().unwrap()).unwrap();

        extract_archive(&archive, temp.path()).unwrap();

        assert!(temp.path().join("openal-soft-1.23.1/CMakeLists.txt").is_file());
    }

    #[test]
    fn test_extract_zstd() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("src.tar.zst");
        let compressed = zstd::stream::encode_all(&tar_bytes("src")[..], 3).unwrap();
        fs::write(&archive, compressed).unwrap();

        extract_archive(&archive, temp.path()).unwrap();

        assert!(temp.path().join("src/CMakeLists.txt").is_file());
    }

    #[test]
    fn test_corrupt_archive_is_error() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("broken.tar.gz");
        fs::write(&archive, b"not gzip at all").unwrap();

        assert!(extract_archive(&archive, temp.path()).is_err());
    }
}
