//! Build utilities shared by the dependency recipes.
//!
//! This module provides:
//! - [`context`] - the explicit working context threaded through every step
//! - [`cmake`] - the configure/build/install driver for CMake projects
//!
//! plus the small vocabulary types both use: build variants, host platform and
//! per-variant install prefixes.

pub mod cmake;
pub mod context;

use std::fmt;
use std::path::{Path, PathBuf};

/// One of the two build configurations every dependency is built in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Debug,
    Release,
}

impl Variant {
    /// Build order.
    pub const ALL: [Variant; 2] = [Variant::Debug, Variant::Release];

    /// Name understood by CMake and MSBuild (`Debug`, `Release`).
    pub fn config_name(self) -> &'static str {
        match self {
            Variant::Debug => "Debug",
            Variant::Release => "Release",
        }
    }

    /// Directory name for build trees and install roots.
    pub fn dir_name(self) -> &'static str {
        match self {
            Variant::Debug => "debug",
            Variant::Release => "release",
        }
    }

    pub fn is_debug(self) -> bool {
        self == Variant::Debug
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_name())
    }
}

/// Host flavour, which decides the native build tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// `make` and shell scripts.
    Posix,
    /// `msbuild` and batch files.
    Windows,
}

impl Platform {
    pub fn host() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }
}

/// Install root for each variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPrefixes {
    pub debug: PathBuf,
    pub release: PathBuf,
}

impl InstallPrefixes {
    /// `<root>/build/debug` and `<root>/build/release`.
    pub fn under(root: &Path) -> Self {
        let build = root.join("build");
        Self {
            debug: build.join(Variant::Debug.dir_name()),
            release: build.join(Variant::Release.dir_name()),
        }
    }

    pub fn for_variant(&self, variant: Variant) -> &Path {
        match variant {
            Variant::Debug => &self.debug,
            Variant::Release => &self.release,
        }
    }
}

/// Parallel job count for `make`.
pub fn default_jobs() -> usize {
    match std::thread::available_parallelism() {
        Ok(n) => n.get(),
        Err(e) => {
            eprintln!("  [WARN] Could not detect CPU count ({}), using 4 jobs", e);
            4
        }
    }
}
