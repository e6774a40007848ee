//! prepare-deps - fetch, build and install native engine dependencies
//!
//! Usage: prepare-deps [--physx-preset linux] [--external-dir external]
//!
//! Prepares, in order:
//! 1. PhysX (patched presets, generated projects, every compiler directory)
//! 2. OpenAL Soft (CMake, debug + release)
//! 3. OpenVR (CMake, debug + release)
//! 4. Local vcpkg checkouts (manifest and manual)
//!
//! Anything whose directory already exists is skipped.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;

use native_deps::build::context::FailurePolicy;
use native_deps::config::{resolve_config_path, CliOverrides, Settings};
use native_deps::deps::{registry, DependencyId, PhysxPreset};
use native_deps::orchestrator::{self, RunOptions};
use native_deps::preflight;
use native_deps::process::SystemExecutor;
use native_deps::source::download::HttpDownloader;

#[derive(Parser)]
#[command(name = "prepare-deps")]
#[command(about = "Fetch, build and install third-party native dependencies")]
struct Args {
    /// Preset passed to the PhysX project generator
    #[arg(long, value_enum)]
    physx_preset: Option<PhysxPreset>,

    /// Skip the local vcpkg checkouts
    #[arg(long)]
    no_local_vcpkg: bool,

    /// Directory that receives archives, sources and install roots (default: current directory)
    #[arg(long)]
    external_dir: Option<PathBuf>,

    /// Config file (default: <external-dir>/prepare-deps.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep going after a failed build step; affected dependencies are left incomplete
    #[arg(long)]
    keep_going: bool,

    /// Only prepare the given dependencies (repeatable)
    #[arg(long, value_enum)]
    only: Vec<DependencyId>,

    /// Do not check for required host tools before starting
    #[arg(long)]
    skip_preflight: bool,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            physx_preset: self.physx_preset,
            no_local_vcpkg: self.no_local_vcpkg,
            keep_going: self.keep_going,
            only: self.only.clone(),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Commands run in nested build directories, so every path handed to
    // them has to be absolute.
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let external_dir = match args.external_dir.clone() {
        Some(dir) if dir.is_absolute() => dir,
        Some(dir) => cwd.join(dir),
        None => cwd,
    };
    let config = args
        .config
        .as_deref()
        .map(|path| resolve_config_path(&external_dir, path));

    let mut settings = Settings::load(&external_dir, config.as_deref())?;
    settings.apply_cli(&args.overrides());

    let selection = settings.selection();
    let deps = registry(&selection);
    if deps.is_empty() {
        println!("Nothing selected to prepare.");
        return Ok(());
    }

    if !args.skip_preflight {
        let ids: Vec<DependencyId> = deps.iter().map(|d| d.id()).collect();
        preflight::check_host_tools(&ids)?;
    }

    let mut options = RunOptions::new(external_dir);
    if settings.keep_going {
        options.policy = FailurePolicy::Continue;
    }

    println!("External directory: {}", options.root.display());
    println!();

    let downloader = HttpDownloader::new(settings.download_timeout())?;
    let mut executor = SystemExecutor;
    let summary = orchestrator::run(&options, &deps, &mut executor, &downloader)?;
    summary.print();

    if !summary.is_success() {
        bail!("some dependencies are incomplete; see the warnings above");
    }
    Ok(())
}
