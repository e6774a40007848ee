//! Dependency orchestration.
//!
//! Runs the selected recipes strictly in order. Per dependency:
//!
//! ```text
//! gate ──(tree exists)──────────────────────────────> Skipped
//!   │
//!   └─(absent)─> fetch -> extract -> prepare ──(all steps ok)──> marker -> Prepared
//!                                          └─(failures under Continue)─> Incomplete
//! ```
//!
//! Fetch and extract errors always abort the run. Build tool failures follow
//! the [`FailurePolicy`] carried by the context.

use anyhow::{bail, Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::build::context::{FailurePolicy, PrepareContext, StepFailure};
use crate::build::{default_jobs, Platform};
use crate::deps::Dependency;
use crate::process::Executor;
use crate::report;
use crate::source::download::{download_if_missing, Downloader, FetchOutcome};
use crate::source::extract::extract_archive;
use crate::source::marker::{gate, sha256_file, write_marker, CompletionMarker, GateState};

pub const LOCK_FILENAME: &str = ".prepare-deps.lock";

/// Everything a run needs besides the recipes and the I/O seams.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// External directory. Created if missing.
    pub root: PathBuf,
    pub platform: Platform,
    pub policy: FailurePolicy,
    pub jobs: usize,
}

impl RunOptions {
    /// Options for the host platform with the default job count.
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            platform: Platform::host(),
            policy: FailurePolicy::default(),
            jobs: default_jobs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyOutcome {
    /// Tree already present; nothing was done.
    Skipped(GateState),
    /// Every step succeeded and the completion marker was written.
    Prepared,
    /// Some steps failed under [`FailurePolicy::Continue`].
    Incomplete { failures: Vec<StepFailure> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyReport {
    pub name: String,
    pub outcome: DependencyOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub reports: Vec<DependencyReport>,
}

impl RunSummary {
    /// True when no dependency ended up incomplete.
    pub fn is_success(&self) -> bool {
        !self
            .reports
            .iter()
            .any(|r| matches!(r.outcome, DependencyOutcome::Incomplete { .. }))
    }

    pub fn outcome_of(&self, name: &str) -> Option<&DependencyOutcome> {
        self.reports
            .iter()
            .find(|r| r.name == name)
            .map(|r| &r.outcome)
    }

    pub fn print(&self) {
        println!();
        println!("Summary:");
        for report in &self.reports {
            let status = match &report.outcome {
                DependencyOutcome::Skipped(GateState::Unverified) => {
                    "skipped (unverified)".to_string()
                }
                DependencyOutcome::Skipped(_) => "skipped".to_string(),
                DependencyOutcome::Prepared => "prepared".to_string(),
                DependencyOutcome::Incomplete { failures } => {
                    format!("INCOMPLETE ({} failed step(s))", failures.len())
                }
            };
            println!("  {:<20} {}", report.name, status);
        }
    }
}

/// Prepare `deps` in order under `options.root`.
///
/// Holds an exclusive lock on the external directory for the whole run.
pub fn run(
    options: &RunOptions,
    deps: &[Box<dyn Dependency>],
    executor: &mut dyn Executor,
    downloader: &dyn Downloader,
) -> Result<RunSummary> {
    fs::create_dir_all(&options.root).with_context(|| {
        format!(
            "creating external directory '{}'",
            options.root.display()
        )
    })?;
    let _lock = RunLock::acquire(&options.root)?;

    let mut ctx = PrepareContext::new(options.root.clone(), executor)
        .with_platform(options.platform)
        .with_policy(options.policy)
        .with_jobs(options.jobs);

    let mut summary = RunSummary::default();
    for dep in deps {
        let outcome = prepare_dependency(&mut ctx, downloader, dep.as_ref())
            .with_context(|| format!("preparing {}", dep.name()))?;
        summary.reports.push(DependencyReport {
            name: dep.name().to_string(),
            outcome,
        });
    }
    Ok(summary)
}

/// Gate, fetch, extract and prepare a single dependency.
pub fn prepare_dependency(
    ctx: &mut PrepareContext<'_>,
    downloader: &dyn Downloader,
    dep: &dyn Dependency,
) -> Result<DependencyOutcome> {
    let tree = ctx.root.join(dep.tree_dir());

    let state = gate(&tree);
    if state.should_skip() {
        report::skip(dep.name());
        if state == GateState::Unverified {
            report::warn(&format!(
                "'{}' has no completion marker; it may be a partial extraction or build. \
                 Remove it by hand to rebuild {}.",
                tree.display(),
                dep.name()
            ));
        }
        return Ok(DependencyOutcome::Skipped(state));
    }

    report::section(&format!("Preparing {}", dep.name()));

    let archive_sha256 = match dep.archive() {
        Some(archive) => {
            let dest = ctx.root.join(archive.filename);

            report::step(&format!("Downloading {}", archive.filename));
            match download_if_missing(downloader, archive.url, &dest)? {
                FetchOutcome::AlreadyPresent => report::detail("archive already present"),
                FetchOutcome::Downloaded { bytes } => {
                    report::detail(&format!("downloaded {} bytes", bytes))
                }
            }

            report::step(&format!("Extracting {}", archive.filename));
            extract_archive(&dest, &ctx.root)?;
            if !tree.is_dir() {
                bail!(
                    "extracting '{}' did not produce '{}'",
                    dest.display(),
                    tree.display()
                );
            }

            Some(sha256_file(&dest)?)
        }
        None => None,
    };

    let failures_before = ctx.failure_count();
    dep.prepare(ctx, &tree)?;
    let failures = ctx.failures()[failures_before..].to_vec();

    if !failures.is_empty() {
        report::warn(&format!(
            "{} is incomplete: {} step(s) failed, no completion marker written",
            dep.name(),
            failures.len()
        ));
        return Ok(DependencyOutcome::Incomplete { failures });
    }

    write_marker(
        &tree,
        &CompletionMarker::now(dep.name(), dep.version(), archive_sha256),
    )?;
    report::section(&format!("Prepared {}", dep.name()));
    Ok(DependencyOutcome::Prepared)
}

/// RAII guard: the advisory lock is released when the file closes.
///
/// The lock file itself stays in place. Unlinking it while locked would let
/// a run that opened the old inode and a run that creates a fresh file both
/// acquire "the" lock.
#[derive(Debug)]
struct RunLock {
    _file: File,
}

impl RunLock {
    fn acquire(root: &Path) -> Result<Self> {
        let path = root.join(LOCK_FILENAME);

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to create lock file: {}", path.display()))?;

        if file.try_lock_exclusive().is_err() {
            bail!(
                "External directory is locked by another prepare-deps run: {}",
                path.display()
            );
        }

        Ok(Self { _file: file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{Cmd, CmdResult};
    use crate::source::ArchiveSource;
    use crate::test_support::RecordingExecutor;
    use std::cell::Cell;
    use std::io::Write;
    use tempfile::TempDir;

    struct NoNetwork;

    impl Downloader for NoNetwork {
        fn fetch(&self, url: &str, _sink: &mut dyn Write) -> Result<u64> {
            bail!("unexpected download of {}", url)
        }
    }

    /// Recipe without an archive that creates its tree and runs one command.
    struct Scripted {
        calls: Cell<usize>,
    }

    impl Dependency for Scripted {
        fn id(&self) -> crate::deps::DependencyId {
            crate::deps::DependencyId::Vcpkg
        }
        fn name(&self) -> &str {
            "Scripted"
        }
        fn version(&self) -> &str {
            "1"
        }
        fn tree_dir(&self) -> &str {
            "scripted"
        }
        fn prepare(&self, ctx: &mut PrepareContext<'_>, tree: &Path) -> Result<()> {
            self.calls.set(self.calls.get() + 1);
            fs::create_dir_all(tree)?;
            ctx.run(Cmd::new("tool").current_dir(tree))?;
            Ok(())
        }
    }

    fn scripted() -> Box<dyn Dependency> {
        Box::new(Scripted {
            calls: Cell::new(0),
        })
    }

    fn options(root: &Path) -> RunOptions {
        RunOptions {
            root: root.to_path_buf(),
            platform: Platform::Posix,
            policy: FailurePolicy::Halt,
            jobs: 2,
        }
    }

    #[test]
    fn test_success_writes_marker_and_releases_lock() {
        let temp = TempDir::new().unwrap();
        let mut exec = RecordingExecutor::new();

        let summary = run(&options(temp.path()), &[scripted()], &mut exec, &NoNetwork).unwrap();

        assert!(summary.is_success());
        assert_eq!(summary.outcome_of("Scripted"), Some(&DependencyOutcome::Prepared));
        match gate(&temp.path().join("scripted")) {
            GateState::Complete(marker) => {
                assert_eq!(marker.name, "Scripted");
                assert_eq!(marker.archive_sha256, None);
            }
            other => panic!("expected complete marker, got {:?}", other),
        }
        assert!(temp.path().join(LOCK_FILENAME).is_file());
        RunLock::acquire(temp.path()).unwrap();
    }

    #[test]
    fn test_existing_tree_is_skipped_without_side_effects() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("scripted")).unwrap();
        let mut exec = RecordingExecutor::new();

        let summary = run(&options(temp.path()), &[scripted()], &mut exec, &NoNetwork).unwrap();

        assert_eq!(
            summary.outcome_of("Scripted"),
            Some(&DependencyOutcome::Skipped(GateState::Unverified))
        );
        assert!(summary.is_success());
        assert!(exec.commands().is_empty());
    }

    #[test]
    fn test_continue_policy_reports_incomplete() {
        let temp = TempDir::new().unwrap();
        let mut exec = RecordingExecutor::with_hook(|_| CmdResult::failed(3));
        let opts = RunOptions {
            policy: FailurePolicy::Continue,
            ..options(temp.path())
        };

        let summary = run(&opts, &[scripted()], &mut exec, &NoNetwork).unwrap();

        assert!(!summary.is_success());
        match summary.outcome_of("Scripted") {
            Some(DependencyOutcome::Incomplete { failures }) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].code, Some(3));
            }
            other => panic!("expected incomplete, got {:?}", other),
        }
        assert_eq!(gate(&temp.path().join("scripted")), GateState::Unverified);
    }

    #[test]
    fn test_halt_policy_aborts_run() {
        let temp = TempDir::new().unwrap();
        let mut exec = RecordingExecutor::with_hook(|_| CmdResult::failed(1));

        let err = run(&options(temp.path()), &[scripted()], &mut exec, &NoNetwork).unwrap_err();
        assert!(format!("{:#}", err).contains("preparing Scripted"));
        RunLock::acquire(temp.path()).unwrap();
    }

    #[test]
    fn test_lock_file_survives_release() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(LOCK_FILENAME);

        let first = RunLock::acquire(temp.path()).unwrap();
        assert!(RunLock::acquire(temp.path()).is_err());
        drop(first);

        // Same path, same file: a waiter that opened it earlier still
        // contends with anyone who opens it now.
        assert!(path.is_file());
        let second = RunLock::acquire(temp.path()).unwrap();
        let opened_before = OpenOptions::new().write(true).open(&path).unwrap();
        assert!(opened_before.try_lock_exclusive().is_err());
        drop(second);
        opened_before.try_lock_exclusive().unwrap();
        assert!(RunLock::acquire(temp.path()).is_err());
    }

    #[test]
    fn test_locked_root_fails_fast() {
        let temp = TempDir::new().unwrap();
        let _held = RunLock::acquire(temp.path()).unwrap();
        let mut exec = RecordingExecutor::new();

        let err = run(&options(temp.path()), &[scripted()], &mut exec, &NoNetwork).unwrap_err();
        assert!(err.to_string().contains("locked"), "{err}");
        assert!(exec.commands().is_empty());
    }

    struct EmptyArchive;

    impl Dependency for EmptyArchive {
        fn id(&self) -> crate::deps::DependencyId {
            crate::deps::DependencyId::Openvr
        }
        fn name(&self) -> &str {
            "Empty"
        }
        fn version(&self) -> &str {
            "0"
        }
        fn tree_dir(&self) -> &str {
            "empty-1.0"
        }
        fn archive(&self) -> Option<ArchiveSource> {
            Some(ArchiveSource {
                url: "https://example.invalid/empty.tar",
                filename: "empty.tar",
            })
        }
        fn prepare(&self, _ctx: &mut PrepareContext<'_>, _tree: &Path) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_archive_without_expected_dir_is_error() {
        let temp = TempDir::new().unwrap();
        // An empty tar is two zeroed 512-byte blocks.
        fs::write(temp.path().join("empty.tar"), vec![0u8; 1024]).unwrap();
        let mut exec = RecordingExecutor::new();
        let deps: Vec<Box<dyn Dependency>> = vec![Box::new(EmptyArchive)];

        let err = run(&options(temp.path()), &deps, &mut exec, &NoNetwork).unwrap_err();
        assert!(format!("{:#}", err).contains("did not produce"), "{err:#}");
    }
}
