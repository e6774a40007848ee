//! Dependency recipes.
//!
//! Each third-party dependency implements [`Dependency`]: where its source
//! comes from, which directory it occupies under the external directory, and
//! how to build it once the source is in place. The orchestrator owns the
//! shared flow (gate, fetch, extract, marker); a recipe only describes what
//! is specific to it.

pub mod openal;
pub mod openvr;
pub mod physx;
pub mod vcpkg;

use anyhow::{bail, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::build::context::PrepareContext;
use crate::source::ArchiveSource;

pub use openal::OpenAl;
pub use openvr::OpenVr;
pub use physx::{Physx, PhysxPreset};
pub use vcpkg::{Vcpkg, VcpkgFlavour};

/// Selector used by `--only` and the `[run] only` config key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum DependencyId {
    Physx,
    Openal,
    Openvr,
    Vcpkg,
}

impl DependencyId {
    /// Preparation order.
    pub const ALL: [DependencyId; 4] = [
        DependencyId::Physx,
        DependencyId::Openal,
        DependencyId::Openvr,
        DependencyId::Vcpkg,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DependencyId::Physx => "physx",
            DependencyId::Openal => "openal",
            DependencyId::Openvr => "openvr",
            DependencyId::Vcpkg => "vcpkg",
        }
    }
}

impl fmt::Display for DependencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DependencyId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        match Self::ALL.into_iter().find(|id| id.as_str() == wanted) {
            Some(id) => Ok(id),
            None => bail!(
                "unknown dependency '{}'; expected one of: physx, openal, openvr, vcpkg",
                s
            ),
        }
    }
}

/// A native dependency that can be prepared under the external directory.
pub trait Dependency {
    fn id(&self) -> DependencyId;

    /// Display name for progress output.
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Directory under the external directory that holds this dependency's
    /// source. Its existence means the dependency is already prepared.
    fn tree_dir(&self) -> &str;

    /// Archive to download and extract before [`Dependency::prepare`] runs.
    /// `None` when the recipe obtains its source itself.
    fn archive(&self) -> Option<ArchiveSource> {
        None
    }

    /// Build and install from `tree`.
    ///
    /// For archive-based recipes `tree` already holds the extracted source.
    /// Otherwise the recipe is responsible for creating it.
    fn prepare(&self, ctx: &mut PrepareContext<'_>, tree: &Path) -> Result<()>;
}

/// Recipe selection derived from the resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub physx_preset: Option<PhysxPreset>,
    pub local_vcpkg: bool,
    /// Empty means every dependency.
    pub only: Vec<DependencyId>,
}

impl Selection {
    pub fn includes(&self, id: DependencyId) -> bool {
        let selected = self.only.is_empty() || self.only.contains(&id);
        match id {
            DependencyId::Vcpkg => selected && self.local_vcpkg,
            _ => selected,
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            physx_preset: None,
            local_vcpkg: true,
            only: Vec::new(),
        }
    }
}

/// The selected recipes, in preparation order.
pub fn registry(selection: &Selection) -> Vec<Box<dyn Dependency>> {
    let mut deps: Vec<Box<dyn Dependency>> = Vec::new();
    if selection.includes(DependencyId::Physx) {
        deps.push(Box::new(Physx::new(selection.physx_preset)));
    }
    if selection.includes(DependencyId::Openal) {
        deps.push(Box::new(OpenAl));
    }
    if selection.includes(DependencyId::Openvr) {
        deps.push(Box::new(OpenVr));
    }
    if selection.includes(DependencyId::Vcpkg) {
        deps.push(Box::new(Vcpkg::new(VcpkgFlavour::Manifest)));
        deps.push(Box::new(Vcpkg::new(VcpkgFlavour::Manual)));
    }
    deps
}
