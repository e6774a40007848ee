//! Run settings.
//!
//! Settings are layered: built-in defaults, then an optional
//! `prepare-deps.toml`, then `PREPARE_DEPS_*` environment variables, then
//! command-line flags (applied by the binary). Each later layer only
//! overrides the values it actually sets.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::deps::{DependencyId, PhysxPreset, Selection};

/// Config file looked up in the external directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILENAME: &str = "prepare-deps.toml";

pub const ENV_PHYSX_PRESET: &str = "PREPARE_DEPS_PHYSX_PRESET";
pub const ENV_NO_LOCAL_VCPKG: &str = "PREPARE_DEPS_NO_LOCAL_VCPKG";

const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub physx_preset: Option<PhysxPreset>,
    pub local_vcpkg: bool,
    pub keep_going: bool,
    /// Empty means every dependency.
    pub only: Vec<DependencyId>,
    pub download_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            physx_preset: None,
            local_vcpkg: true,
            keep_going: false,
            only: Vec::new(),
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
        }
    }
}

/// Values given on the command line. Unset flags leave earlier layers alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub physx_preset: Option<PhysxPreset>,
    pub no_local_vcpkg: bool,
    pub keep_going: bool,
    pub only: Vec<DependencyId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    physx: Option<PhysxToml>,
    vcpkg: Option<VcpkgToml>,
    run: Option<RunToml>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PhysxToml {
    preset: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct VcpkgToml {
    local: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RunToml {
    keep_going: Option<bool>,
    only: Option<Vec<String>>,
    download_timeout_secs: Option<u64>,
}

impl Settings {
    /// Defaults overlaid with the config file (if any) and the process
    /// environment.
    ///
    /// An explicit `config` path must exist. Without one,
    /// `<external_dir>/prepare-deps.toml` is used when present.
    pub fn load(external_dir: &Path, config: Option<&Path>) -> Result<Self> {
        let mut settings = Settings::default();

        let path = match config {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let candidate = external_dir.join(DEFAULT_CONFIG_FILENAME);
                candidate.is_file().then_some(candidate)
            }
        };
        if let Some(path) = path {
            settings.apply_file(&path)?;
        }

        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn apply_file(&mut self, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config '{}'", path.display()))?;
        self.apply_toml(&text)
            .with_context(|| format!("parsing config '{}'", path.display()))
    }

    fn apply_toml(&mut self, text: &str) -> Result<()> {
        let parsed: ConfigToml = toml::from_str(text)?;

        if let Some(preset) = parsed.physx.and_then(|p| p.preset) {
            self.physx_preset = Some(preset.parse()?);
        }
        if let Some(local) = parsed.vcpkg.and_then(|v| v.local) {
            self.local_vcpkg = local;
        }
        if let Some(run) = parsed.run {
            if let Some(keep_going) = run.keep_going {
                self.keep_going = keep_going;
            }
            if let Some(only) = run.only {
                self.only = only
                    .iter()
                    .map(|name| name.parse())
                    .collect::<Result<Vec<DependencyId>>>()?;
            }
            if let Some(secs) = run.download_timeout_secs {
                self.download_timeout_secs = secs;
            }
        }
        Ok(())
    }

    /// Apply environment overrides. `lookup` is `std::env::var` outside tests.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(preset) = lookup(ENV_PHYSX_PRESET).filter(|v| !v.trim().is_empty()) {
            self.physx_preset = Some(
                preset
                    .parse()
                    .with_context(|| format!("invalid {}", ENV_PHYSX_PRESET))?,
            );
        }
        if let Some(value) = lookup(ENV_NO_LOCAL_VCPKG) {
            if is_truthy(&value) {
                self.local_vcpkg = false;
            }
        }
        Ok(())
    }

    /// Apply command-line flags, the last and strongest layer.
    pub fn apply_cli(&mut self, cli: &CliOverrides) {
        if let Some(preset) = cli.physx_preset {
            self.physx_preset = Some(preset);
        }
        if cli.no_local_vcpkg {
            self.local_vcpkg = false;
        }
        if cli.keep_going {
            self.keep_going = true;
        }
        if !cli.only.is_empty() {
            self.only = cli.only.clone();
        }
    }

    pub fn selection(&self) -> Selection {
        Selection {
            physx_preset: self.physx_preset,
            local_vcpkg: self.local_vcpkg,
            only: self.only.clone(),
        }
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// `--config` resolved against the external directory when relative.
pub fn resolve_config_path(external_dir: &Path, config: &Path) -> PathBuf {
    if config.is_absolute() {
        config.to_path_buf()
    } else {
        external_dir.join(config)
    }
}
