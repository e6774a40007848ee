//! OpenAL Soft 1.23.1.
//!
//! The release archive already contains an empty `build/` directory; the
//! per-variant build trees go inside it.

use anyhow::Result;
use std::path::Path;

use super::{Dependency, DependencyId};
use crate::build::cmake::CmakeBuild;
use crate::build::context::PrepareContext;
use crate::source::ArchiveSource;

pub const OPENAL_ARCHIVE: ArchiveSource = ArchiveSource {
    url: "https://github.com/kcat/openal-soft/releases/download/1.23.1/openal-soft-1.23.1.tar.bz2",
    filename: "openal-soft-1.23.1.tar.bz2",
};

/// Shared library only; no utilities, examples or tests.
pub const OPENAL_OPTIONS: &[&str] = &[
    "-DBUILD_SHARED_LIBS=ON",
    "-DALSOFT_UTILS=OFF",
    "-DALSOFT_NO_CONFIG_UTIL=ON",
    "-DALSOFT_EXAMPLES=OFF",
    "-DALSOFT_TESTS=OFF",
    "-DALSOFT_INSTALL_EXAMPLES=OFF",
    "-DALSOFT_INSTALL_UTILS=OFF",
];

pub struct OpenAl;

impl Dependency for OpenAl {
    fn id(&self) -> DependencyId {
        DependencyId::Openal
    }

    fn name(&self) -> &str {
        "OpenAL"
    }

    fn version(&self) -> &str {
        "1.23.1"
    }

    fn tree_dir(&self) -> &str {
        "openal-soft-1.23.1"
    }

    fn archive(&self) -> Option<ArchiveSource> {
        Some(OPENAL_ARCHIVE)
    }

    fn prepare(&self, ctx: &mut PrepareContext<'_>, tree: &Path) -> Result<()> {
        CmakeBuild {
            label: "OpenAL",
            build_root: tree.join("build"),
            source_rel: "../../",
            options: OPENAL_OPTIONS,
            solution: "OpenAL.sln",
        }
        .run(ctx)
    }
}
