//! Local vcpkg checkouts.
//!
//! Two checkouts are prepared side by side: `vcpkg_manifest`, which the host
//! project drives through its own manifest, and `vcpkg_manual`, into which
//! the audio/video packages are installed explicitly.
//!
//! Both are cloned into a staging `vcpkg` directory and then renamed, so a
//! target directory only appears once the clone itself succeeded.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::{Dependency, DependencyId};
use crate::build::context::PrepareContext;
use crate::build::Platform;
use crate::process::Cmd;
use crate::report;

pub const VCPKG_REPO: &str = "https://github.com/microsoft/vcpkg.git";
const STAGING_DIR: &str = "vcpkg";

/// Packages installed into the manual checkout.
pub const MANUAL_PACKAGES: &[&str] = &[
    "openal-soft",
    "ffmpeg[core,avcodec,avdevice,avformat,avfilter,ass,swresample,swscale,nvcodec]",
];

const LINUX_DYNAMIC_TRIPLET: &str = "x64-linux-dynamic";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcpkgFlavour {
    Manifest,
    Manual,
}

impl VcpkgFlavour {
    pub fn target_dir(self) -> &'static str {
        match self {
            VcpkgFlavour::Manifest => "vcpkg_manifest",
            VcpkgFlavour::Manual => "vcpkg_manual",
        }
    }
}

/// Package spec for `vcpkg install`; non-Windows hosts get the dynamic triplet.
pub fn package_spec(package: &str, platform: Platform) -> String {
    match platform {
        Platform::Posix => format!("{}:{}", package, LINUX_DYNAMIC_TRIPLET),
        Platform::Windows => package.to_string(),
    }
}

/// The POSIX bootstrap script is executed by path so its shebang applies.
fn bootstrap_cmd(platform: Platform, tree: &Path) -> Cmd {
    let cmd = match platform {
        Platform::Posix => Cmd::new(tree.join("bootstrap-vcpkg.sh").display().to_string())
            .arg("--disableMetrics"),
        Platform::Windows => {
            Cmd::new("cmd").args(["/C", "bootstrap-vcpkg.bat", "-disableMetrics"])
        }
    };
    cmd.current_dir(tree).error_msg("vcpkg bootstrap failed")
}

/// The tool binary produced by bootstrapping.
fn vcpkg_binary(platform: Platform, tree: &Path) -> PathBuf {
    match platform {
        Platform::Posix => tree.join("vcpkg"),
        Platform::Windows => tree.join("vcpkg.exe"),
    }
}

pub struct Vcpkg {
    flavour: VcpkgFlavour,
}

impl Vcpkg {
    pub fn new(flavour: VcpkgFlavour) -> Self {
        Self { flavour }
    }

    fn install_packages(&self, ctx: &mut PrepareContext<'_>, tree: &Path) -> Result<()> {
        let binary = vcpkg_binary(ctx.platform, tree);
        for package in MANUAL_PACKAGES {
            let spec = package_spec(package, ctx.platform);
            report::step(&format!("Installing {}", spec));
            let cmd = Cmd::new(binary.display().to_string())
                .arg("install")
                .arg(spec.as_str())
                .current_dir(tree)
                .error_msg(format!("vcpkg install {} failed", spec));
            ctx.run(cmd)?;
        }
        Ok(())
    }
}

impl Dependency for Vcpkg {
    fn id(&self) -> DependencyId {
        DependencyId::Vcpkg
    }

    fn name(&self) -> &str {
        match self.flavour {
            VcpkgFlavour::Manifest => "vcpkg (manifest)",
            VcpkgFlavour::Manual => "vcpkg (manual)",
        }
    }

    fn version(&self) -> &str {
        "git"
    }

    fn tree_dir(&self) -> &str {
        self.flavour.target_dir()
    }

    fn prepare(&self, ctx: &mut PrepareContext<'_>, tree: &Path) -> Result<()> {
        let staging = ctx.root.join(STAGING_DIR);
        if staging.exists() {
            bail!(
                "staging directory '{}' already exists; remove it and re-run",
                staging.display()
            );
        }

        report::step("Cloning vcpkg");
        let clone = Cmd::new("git")
            .args(["clone", VCPKG_REPO, STAGING_DIR])
            .current_dir(&ctx.root)
            .error_msg("git clone of vcpkg failed");
        if ctx.run(clone)?.failed() {
            return Ok(());
        }

        fs::rename(&staging, tree).with_context(|| {
            format!(
                "renaming '{}' to '{}'",
                staging.display(),
                tree.display()
            )
        })?;

        report::step("Bootstrapping vcpkg");
        if ctx.run(bootstrap_cmd(ctx.platform, tree))?.failed() {
            return Ok(());
        }

        if self.flavour == VcpkgFlavour::Manual {
            self.install_packages(ctx, tree)?;
        }
        Ok(())
    }
}
