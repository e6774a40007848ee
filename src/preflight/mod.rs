//! Preflight checks.
//!
//! Validates that the host has the tools the selected dependencies need
//! before anything is downloaded, so a missing `cmake` is reported up front
//! rather than after a multi-minute fetch.
//!
//! # Example
//!
//! ```rust
//! use native_deps::preflight::{check_required_tools, command_exists};
//!
//! if !command_exists("cmake") {
//!     println!("cmake not installed");
//! }
//!
//! let tools = &[("cmake", "cmake"), ("git", "git")];
//! if let Err(e) = check_required_tools(tools) {
//!     eprintln!("{}", e);
//! }
//! ```

use anyhow::{bail, Result};

use crate::build::Platform;
use crate::deps::DependencyId;

/// Check if a command exists on the host system (searched in PATH).
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Host tools needed to prepare `deps` on `platform`.
///
/// Each tuple is (command_name, install hint). Duplicates are removed, first
/// occurrence wins.
pub fn required_tools(platform: Platform, deps: &[DependencyId]) -> Vec<(&'static str, &'static str)> {
    let mut tools: Vec<(&'static str, &'static str)> = Vec::new();
    let mut add = |tool: (&'static str, &'static str)| {
        if !tools.iter().any(|(name, _)| *name == tool.0) {
            tools.push(tool);
        }
    };

    let (build_tool, shell) = match platform {
        Platform::Posix => (("make", "make"), ("sh", "a POSIX shell")),
        Platform::Windows => (("msbuild", "Visual Studio Build Tools"), ("cmd", "cmd.exe")),
    };

    for dep in deps {
        match dep {
            DependencyId::Physx => {
                // generate_projects.sh is a bash script that hands off to
                // packman's Python scripts.
                if platform == Platform::Posix {
                    add(("bash", "bash"));
                    add(("python3", "python3 (used by the PhysX project generator)"));
                } else {
                    add(shell);
                }
                add(("cmake", "cmake"));
                add(build_tool);
            }
            DependencyId::Openal | DependencyId::Openvr => {
                add(("cmake", "cmake"));
                add(build_tool);
            }
            DependencyId::Vcpkg => {
                add(("git", "git"));
                add(shell);
            }
        }
    }
    tools
}

/// Check that specific tools are available.
///
/// # Arguments
///
/// * `tools` - Slice of (command, install hint) tuples
///
/// # Returns
///
/// * `Ok(())` if all tools are found
/// * `Err` with list of missing tools and their hints
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let missing: Vec<_> = tools
        .iter()
        .filter(|(tool, _)| !command_exists(tool))
        .collect();

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|(t, p)| format!("  {} (install: {})", t, p))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Missing required host tools:\n{}", msg);
    }

    Ok(())
}

/// Check the tools needed for `deps` on the current host.
pub fn check_host_tools(deps: &[DependencyId]) -> Result<()> {
    check_required_tools(&required_tools(Platform::host(), deps))
}
