//! OpenVR 2.5.1, built as a static library.

use anyhow::Result;
use std::path::Path;

use super::{Dependency, DependencyId};
use crate::build::cmake::CmakeBuild;
use crate::build::context::PrepareContext;
use crate::source::ArchiveSource;

pub const OPENVR_ARCHIVE: ArchiveSource = ArchiveSource {
    url: "https://github.com/ValveSoftware/openvr/archive/refs/tags/v2.5.1.tar.gz",
    filename: "openvr-2.5.1.tar.gz",
};

pub const OPENVR_OPTIONS: &[&str] = &["-DBUILD_SHARED=OFF"];

pub struct OpenVr;

impl Dependency for OpenVr {
    fn id(&self) -> DependencyId {
        DependencyId::Openvr
    }

    fn name(&self) -> &str {
        "OpenVR"
    }

    fn version(&self) -> &str {
        "2.5.1"
    }

    fn tree_dir(&self) -> &str {
        "openvr-2.5.1"
    }

    fn archive(&self) -> Option<ArchiveSource> {
        Some(OPENVR_ARCHIVE)
    }

    fn prepare(&self, ctx: &mut PrepareContext<'_>, tree: &Path) -> Result<()> {
        CmakeBuild {
            label: "OpenVR",
            build_root: tree.join("build"),
            source_rel: "../../",
            options: OPENVR_OPTIONS,
            solution: "OpenVRSDK.sln",
        }
        .run(ctx)
    }
}
