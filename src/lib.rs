//! Preparation of the third-party native libraries an engine build links
//! against.
//!
//! The crate fetches source archives, unpacks them, patches what needs
//! patching, and drives each project's own build system to install debug and
//! release builds under one external directory:
//!
//! - **Sources** - download-if-missing, tar extraction, completion markers
//! - **Preset patching** - boolean toggles in PhysX generator presets
//! - **Build driver** - CMake configure/build/install per variant
//! - **Recipes** - PhysX, OpenAL Soft, OpenVR and local vcpkg checkouts
//! - **Orchestrator** - sequencing, idempotency and failure policy
//!
//! # Architecture
//!
//! ```text
//! prepare-deps (bin)
//!     │
//!     ├── config ──────── defaults < prepare-deps.toml < env < CLI
//!     ├── preflight ───── host tool check
//!     └── orchestrator
//!             │
//!             ├── source::{download, extract, marker}
//!             └── deps::{physx, openal, openvr, vcpkg}
//!                     │
//!                     ├── preset
//!                     └── build::{context, cmake} ── process::Executor
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use native_deps::deps::{registry, Selection};
//! use native_deps::orchestrator::{run, RunOptions};
//! use native_deps::process::SystemExecutor;
//! use native_deps::source::download::HttpDownloader;
//! use std::time::Duration;
//!
//! let options = RunOptions::new("/work/engine/external".into());
//! let deps = registry(&Selection::default());
//! let downloader = HttpDownloader::new(Duration::from_secs(600))?;
//! let summary = run(&options, &deps, &mut SystemExecutor, &downloader)?;
//! summary.print();
//! ```

pub mod build;
pub mod config;
pub mod deps;
pub mod orchestrator;
pub mod preflight;
pub mod preset;
pub mod process;
pub mod report;
pub mod source;

#[cfg(test)]
mod test_support;

pub use build::context::{FailurePolicy, PrepareContext};
pub use build::{Platform, Variant};
pub use deps::{Dependency, DependencyId};
pub use orchestrator::{DependencyOutcome, RunOptions, RunSummary};
pub use process::{Cmd, CmdResult, Executor};
