//! CMake configure / build / install driver.
//!
//! For each [`Variant`] a separate build directory is configured with the
//! variant's install prefix, then compiled and installed with the host's
//! native tool: `make` on POSIX, `msbuild` on Windows.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::context::PrepareContext;
use super::{Platform, Variant};
use crate::process::Cmd;
use crate::report;

/// A CMake project built once per variant.
#[derive(Debug, Clone)]
pub struct CmakeBuild<'a> {
    /// Name used in progress output.
    pub label: &'a str,
    /// Directory that receives one subdirectory per variant.
    pub build_root: PathBuf,
    /// Source directory relative to each variant build directory.
    pub source_rel: &'a str,
    /// Fixed options passed to every configure run.
    pub options: &'a [&'a str],
    /// Solution file CMake generates on Windows.
    pub solution: &'a str,
}

impl CmakeBuild<'_> {
    /// Configure, build and install every variant.
    ///
    /// A variant whose configure step failed (under the `Continue` policy) is
    /// not built; the other variant still is.
    pub fn run(&self, ctx: &mut PrepareContext<'_>) -> Result<()> {
        for variant in Variant::ALL {
            let dir = self.build_root.join(variant.dir_name());
            fs::create_dir_all(&dir)
                .with_context(|| format!("creating build directory '{}'", dir.display()))?;

            report::step(&format!("Building {} ({})", self.label, variant));
            let prefix = ctx.prefixes.for_variant(variant).to_path_buf();
            let configure = configure_cmd(&dir, variant, self.options, &prefix, self.source_rel);
            if ctx.run(configure)?.failed() {
                continue;
            }

            for cmd in native_build_cmds(ctx.platform, &dir, self.solution, variant, ctx.jobs) {
                if ctx.run(cmd)?.failed() {
                    break;
                }
            }
        }
        Ok(())
    }
}

/// `cmake -DCMAKE_BUILD_TYPE=<V> <options> -DCMAKE_INSTALL_PREFIX=<prefix> <source>`
pub fn configure_cmd(
    dir: &Path,
    variant: Variant,
    options: &[&str],
    prefix: &Path,
    source_rel: &str,
) -> Cmd {
    Cmd::new("cmake")
        .arg(format!("-DCMAKE_BUILD_TYPE={}", variant.config_name()))
        .args(options.iter().copied())
        .arg(format!("-DCMAKE_INSTALL_PREFIX={}", prefix.display()))
        .arg(source_rel)
        .current_dir(dir)
        .error_msg(format!("cmake configure failed for {} build", variant))
}

/// Build then install, run inside an already-configured build directory.
pub fn native_build_cmds(
    platform: Platform,
    dir: &Path,
    solution: &str,
    variant: Variant,
    jobs: usize,
) -> [Cmd; 2] {
    match platform {
        Platform::Posix => make_cmds(dir, jobs, &format!("{} build", variant)),
        Platform::Windows => msbuild_cmds(dir, solution, variant),
    }
}

/// `make -j<jobs>` followed by `make install`.
pub fn make_cmds(dir: &Path, jobs: usize, what: &str) -> [Cmd; 2] {
    [
        Cmd::new("make")
            .arg(format!("-j{}", jobs))
            .current_dir(dir)
            .error_msg(format!("make failed for {}", what)),
        Cmd::new("make")
            .arg("install")
            .current_dir(dir)
            .error_msg(format!("make install failed for {}", what)),
    ]
}

/// Build `solution`, then its `INSTALL` project, in the given configuration.
pub fn msbuild_cmds(dir: &Path, solution: &str, variant: Variant) -> [Cmd; 2] {
    let config = format!("/p:Configuration={}", variant.config_name());
    [
        Cmd::new("msbuild")
            .arg(solution)
            .arg(config.clone())
            .current_dir(dir)
            .error_msg(format!("msbuild {} failed for {} build", solution, variant)),
        Cmd::new("msbuild")
            .arg("INSTALL.vcxproj")
            .arg(config)
            .current_dir(dir)
            .error_msg(format!("msbuild INSTALL failed for {} build", variant)),
    ]
}
