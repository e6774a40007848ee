//! PhysX 5.4.1.
//!
//! PhysX ships its own project generator driven by XML presets. The presets
//! are patched to produce static libraries without snippets, then the
//! generator runs and every generated compiler directory is built and
//! installed.
//!
//! On POSIX a single generation yields one compiler directory per build
//! configuration. On Windows the generator produces one solution for all
//! configurations, but the CRT flavour is fixed at generation time, so the
//! presets are re-patched and the projects regenerated once per variant.

use anyhow::{bail, Context, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::{Dependency, DependencyId};
use crate::build::cmake::{make_cmds, msbuild_cmds};
use crate::build::context::PrepareContext;
use crate::build::{Platform, Variant};
use crate::preset::{patch_preset_dir, strip_token_occurrences, Toggle};
use crate::process::{ensure_exists, Cmd};
use crate::report;
use crate::source::ArchiveSource;

pub const PHYSX_ARCHIVE: ArchiveSource = ArchiveSource {
    url: "https://github.com/NVIDIA-Omniverse/PhysX/archive/refs/tags/106.0-physx-5.4.1.tar.gz",
    filename: "PhysX-5.4.1.tar.gz",
};

const EXTRACT_DIR: &str = "PhysX-106.0-physx-5.4.1";
const PRESETS_REL: &str = "buildtools/presets/public";
const LINUX_CMAKELISTS_REL: &str = "source/compiler/cmake/linux/CMakeLists.txt";
const SOLUTION: &str = "PhysXSDK.sln";
const GENERATOR_SCRIPT: &str = "generate_projects.sh";

/// Toggles applied on every platform.
pub const BASE_TOGGLES: [Toggle; 2] = [
    ("PX_GENERATE_STATIC_LIBRARIES", true),
    ("PX_BUILDSNIPPETS", false),
];

/// Toggles for one Windows variant: dynamic CRT, debug CRT for debug builds.
pub fn windows_toggles(variant: Variant) -> [Toggle; 4] {
    [
        BASE_TOGGLES[0],
        BASE_TOGGLES[1],
        ("NV_USE_STATIC_WINCRT", false),
        ("NV_USE_DEBUG_WINCRT", variant.is_debug()),
    ]
}

/// Preset name passed to the PhysX project generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PhysxPreset {
    #[value(name = "linux")]
    Linux,
    #[value(name = "linux-aarch64")]
    LinuxAarch64,
    #[value(name = "vc16win64")]
    Vc16win64,
    #[value(name = "vc17win64")]
    Vc17win64,
}

impl PhysxPreset {
    pub const ALL: [PhysxPreset; 4] = [
        PhysxPreset::Linux,
        PhysxPreset::LinuxAarch64,
        PhysxPreset::Vc16win64,
        PhysxPreset::Vc17win64,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PhysxPreset::Linux => "linux",
            PhysxPreset::LinuxAarch64 => "linux-aarch64",
            PhysxPreset::Vc16win64 => "vc16win64",
            PhysxPreset::Vc17win64 => "vc17win64",
        }
    }
}

impl fmt::Display for PhysxPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhysxPreset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        if let Some(preset) = Self::ALL.into_iter().find(|p| p.as_str() == wanted) {
            return Ok(preset);
        }

        let accepted = Self::ALL.map(PhysxPreset::as_str).join(", ");
        bail!("unsupported PhysX preset '{}'; expected one of: {}", s, accepted)
    }
}

pub struct Physx {
    preset: Option<PhysxPreset>,
}

impl Physx {
    pub fn new(preset: Option<PhysxPreset>) -> Self {
        Self { preset }
    }

    /// The generator is a bash script; it is executed by path so its own
    /// shebang picks the interpreter.
    fn generate_cmd(&self, platform: Platform, physx_dir: &Path) -> Cmd {
        let cmd = match platform {
            Platform::Posix => {
                Cmd::new(physx_dir.join(GENERATOR_SCRIPT).display().to_string())
            }
            Platform::Windows => Cmd::new("cmd").args(["/C", "generate_projects.bat"]),
        };
        let cmd = match self.preset {
            Some(preset) => cmd.arg(preset.as_str()),
            None => cmd,
        };
        cmd.current_dir(physx_dir)
            .error_msg("PhysX project generation failed")
    }

    fn build_posix(&self, ctx: &mut PrepareContext<'_>, physx_dir: &Path) -> Result<()> {
        // Recent compilers warn on the 5.4.1 sources; keep warnings non-fatal.
        report::step("Disabling errors on warnings");
        let cmakelists = physx_dir.join(LINUX_CMAKELISTS_REL);
        if cmakelists.is_file() {
            let changed = strip_token_occurrences(&cmakelists, "-Werror")?;
            report::detail(&format!("removed -Werror from {} line(s)", changed));
        } else {
            report::warn(&format!(
                "{} not found; warnings stay fatal",
                cmakelists.display()
            ));
        }

        report::step("Configuring project presets");
        configure_presets(physx_dir, &BASE_TOGGLES)?;

        report::step("Generating projects");
        if ctx.run(self.generate_cmd(ctx.platform, physx_dir))?.failed() {
            return Ok(());
        }

        report::step("Building PhysX");
        for dir in compiler_dirs(physx_dir)? {
            let name = dir_label(&dir);
            report::step(&format!("Building PhysX: {}", name));
            for cmd in make_cmds(&dir, ctx.jobs, &format!("PhysX {}", name)) {
                if ctx.run(cmd)?.failed() {
                    break;
                }
            }
        }
        Ok(())
    }

    fn build_windows(&self, ctx: &mut PrepareContext<'_>, physx_dir: &Path) -> Result<()> {
        for variant in Variant::ALL {
            report::step(&format!("Configuring project presets for {}", variant));
            configure_presets(physx_dir, &windows_toggles(variant))?;

            report::step("Generating projects");
            if ctx.run(self.generate_cmd(ctx.platform, physx_dir))?.failed() {
                continue;
            }

            report::step("Building PhysX");
            for dir in compiler_dirs(physx_dir)? {
                for cmd in msbuild_cmds(&dir, SOLUTION, variant) {
                    if ctx.run(cmd)?.failed() {
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

impl Dependency for Physx {
    fn id(&self) -> DependencyId {
        DependencyId::Physx
    }

    fn name(&self) -> &str {
        "PhysX"
    }

    fn version(&self) -> &str {
        "5.4.1"
    }

    fn tree_dir(&self) -> &str {
        EXTRACT_DIR
    }

    fn archive(&self) -> Option<ArchiveSource> {
        Some(PHYSX_ARCHIVE)
    }

    fn prepare(&self, ctx: &mut PrepareContext<'_>, tree: &Path) -> Result<()> {
        let physx_dir = tree.join("physx");
        ensure_exists(&physx_dir, "PhysX source directory")?;

        match ctx.platform {
            Platform::Posix => self.build_posix(ctx, &physx_dir),
            Platform::Windows => self.build_windows(ctx, &physx_dir),
        }
    }
}

fn configure_presets(physx_dir: &Path, toggles: &[Toggle]) -> Result<()> {
    let presets = physx_dir.join(PRESETS_REL);
    ensure_exists(&presets, "PhysX preset directory")?;

    for (path, patch) in patch_preset_dir(&presets, toggles)? {
        report::detail(&format!("Configuring preset: {}", dir_label(&path)));
        if patch.untouched() > 0 {
            report::detail(&format!(
                "{} targeted line(s) already had the wanted value or an unexpected format",
                patch.untouched()
            ));
        }
    }
    Ok(())
}

/// Generated compiler project directories, excluding the shared `public` one.
pub fn compiler_dirs(physx_dir: &Path) -> Result<Vec<PathBuf>> {
    let compiler = physx_dir.join("compiler");
    if !compiler.is_dir() {
        bail!(
            "PhysX project generation did not produce '{}'",
            compiler.display()
        );
    }

    let mut dirs = Vec::new();
    for entry in fs::read_dir(&compiler)
        .with_context(|| format!("reading '{}'", compiler.display()))?
    {
        let entry = entry.with_context(|| format!("reading entry in '{}'", compiler.display()))?;
        let path = entry.path();
        if !path.is_dir() || entry.file_name() == "public" {
            continue;
        }
        dirs.push(path);
    }
    dirs.sort();
    Ok(dirs)
}

fn dir_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::CmdResult;
    use crate::test_support::RecordingExecutor;
    use tempfile::TempDir;

    const PRESET_XML: &str = r#"<preset name="vc17win64">
  <CMakeSwitches>
    <cmakeSwitch name="PX_BUILDSNIPPETS" value="True" comment="Generate the snippets" />
    <cmakeSwitch name="PX_GENERATE_STATIC_LIBRARIES" value="False" comment="Generate static libs" />
    <cmakeSwitch name="NV_USE_STATIC_WINCRT" value="True" comment="Use the statically linked windows CRT" />
    <cmakeSwitch name="NV_USE_DEBUG_WINCRT" value="False" comment="Use the debug version of the CRT" />
  </CMakeSwitches>
</preset>
"#;

    fn physx_tree(root: &Path) -> PathBuf {
        let tree = root.join(EXTRACT_DIR);
        let physx = tree.join("physx");
        fs::create_dir_all(physx.join(PRESETS_REL)).unwrap();
        fs::write(physx.join(PRESETS_REL).join("preset.xml"), PRESET_XML).unwrap();
        let cmakelists = physx.join(LINUX_CMAKELISTS_REL);
        fs::create_dir_all(cmakelists.parent().unwrap()).unwrap();
        fs::write(&cmakelists, "SET(PHYSX_CXX_FLAGS \"-Wall -Werror\")\n").unwrap();
        tree
    }

    /// Executor that creates the given compiler dirs when the generator runs.
    fn generator_executor(physx: PathBuf, dirs: &'static [&'static str]) -> RecordingExecutor {
        RecordingExecutor::with_hook(move |cmd| {
            let generator = cmd.program().ends_with(GENERATOR_SCRIPT)
                || cmd.get_args().iter().any(|a| a.starts_with("generate_projects"));
            if generator {
                for dir in dirs {
                    fs::create_dir_all(physx.join("compiler").join(dir)).unwrap();
                }
            }
            CmdResult::ok()
        })
    }

    #[test]
    fn test_preset_parsing() {
        assert_eq!("linux-aarch64".parse::<PhysxPreset>().unwrap(), PhysxPreset::LinuxAarch64);
        assert_eq!(" VC17WIN64 ".parse::<PhysxPreset>().unwrap(), PhysxPreset::Vc17win64);
        let err = "mac64".parse::<PhysxPreset>().unwrap_err().to_string();
        assert!(err.contains("linux, linux-aarch64, vc16win64, vc17win64"), "{err}");
    }

    #[test]
    fn test_windows_toggles_follow_variant() {
        assert!(windows_toggles(Variant::Debug).contains(&("NV_USE_DEBUG_WINCRT", true)));
        assert!(windows_toggles(Variant::Release).contains(&("NV_USE_DEBUG_WINCRT", false)));
        assert!(windows_toggles(Variant::Release).contains(&("NV_USE_STATIC_WINCRT", false)));
    }

    #[test]
    fn test_posix_build_flow() {
        let temp = TempDir::new().unwrap();
        let tree = physx_tree(temp.path());
        let physx = tree.join("physx");
        let mut exec =
            generator_executor(physx.clone(), &["linux-release", "public", "linux-debug"]);
        let mut ctx = PrepareContext::new(temp.path().to_path_buf(), &mut exec)
            .with_platform(Platform::Posix)
            .with_jobs(4);

        Physx::new(Some(PhysxPreset::Linux))
            .prepare(&mut ctx, &tree)
            .unwrap();
        drop(ctx);

        let generator = physx.join(GENERATOR_SCRIPT).display().to_string();
        assert_eq!(
            exec.lines(),
            [
                format!("{} linux", generator).as_str(),
                "make -j4",
                "make install",
                "make -j4",
                "make install",
            ]
        );
        let cwds: Vec<_> = exec.commands()[1..]
            .iter()
            .map(|c| c.cwd().unwrap().file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(cwds, ["linux-debug", "linux-debug", "linux-release", "linux-release"]);
        assert_eq!(exec.commands()[0].cwd(), Some(physx.as_path()));

        let preset = fs::read_to_string(physx.join(PRESETS_REL).join("preset.xml")).unwrap();
        assert!(preset.contains(r#"name="PX_BUILDSNIPPETS" value="False""#));
        assert!(preset.contains(r#"name="PX_GENERATE_STATIC_LIBRARIES" value="True""#));
        // Windows-only switches are not touched on POSIX.
        assert!(preset.contains(r#"name="NV_USE_STATIC_WINCRT" value="True""#));

        let cmakelists = fs::read_to_string(physx.join(LINUX_CMAKELISTS_REL)).unwrap();
        assert!(!cmakelists.contains("-Werror"));
    }

    #[test]
    fn test_windows_regenerates_per_variant() {
        let temp = TempDir::new().unwrap();
        let tree = physx_tree(temp.path());
        let physx = tree.join("physx");
        let mut exec = generator_executor(physx.clone(), &["vc17win64"]);
        let mut ctx = PrepareContext::new(temp.path().to_path_buf(), &mut exec)
            .with_platform(Platform::Windows);

        Physx::new(Some(PhysxPreset::Vc17win64))
            .prepare(&mut ctx, &tree)
            .unwrap();
        drop(ctx);

        assert_eq!(
            exec.lines(),
            [
                "cmd /C generate_projects.bat vc17win64",
                "msbuild PhysXSDK.sln /p:Configuration=Debug",
                "msbuild INSTALL.vcxproj /p:Configuration=Debug",
                "cmd /C generate_projects.bat vc17win64",
                "msbuild PhysXSDK.sln /p:Configuration=Release",
                "msbuild INSTALL.vcxproj /p:Configuration=Release",
            ]
        );

        // Last pass was the release configuration.
        let preset = fs::read_to_string(physx.join(PRESETS_REL).join("preset.xml")).unwrap();
        assert!(preset.contains(r#"name="NV_USE_STATIC_WINCRT" value="False""#));
        assert!(preset.contains(r#"name="NV_USE_DEBUG_WINCRT" value="False""#));
    }

    #[test]
    fn test_no_preset_means_no_generator_argument() {
        let temp = TempDir::new().unwrap();
        let tree = physx_tree(temp.path());
        let physx = tree.join("physx");
        let mut exec = generator_executor(physx.clone(), &["linux-release"]);
        let mut ctx = PrepareContext::new(temp.path().to_path_buf(), &mut exec)
            .with_platform(Platform::Posix);

        Physx::new(None).prepare(&mut ctx, &tree).unwrap();
        drop(ctx);

        let first = &exec.commands()[0];
        assert_eq!(first.program(), physx.join(GENERATOR_SCRIPT).display().to_string());
        assert!(first.get_args().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_generator_runs_under_its_own_shebang() {
        use crate::process::{Executor, SystemExecutor};
        use std::os::unix::fs::PermissionsExt;

        // Mirrors the shipped generator: bash-only syntax plus a helper
        // sourced relative to the script's own location.
        let temp = TempDir::new().unwrap();
        let physx = temp.path().join("physx");
        fs::create_dir_all(&physx).unwrap();
        fs::write(physx.join("helper.sh"), "PRESET_PREFIX=generated\n").unwrap();
        let script = physx.join(GENERATOR_SCRIPT);
        fs::write(
            &script,
            concat!(
                "#!/usr/bin/env bash\n",
                "SCRIPT_DIR=\"$(cd \"$(dirname \"${BASH_SOURCE[0]}\")\" && pwd)\"\n",
                "source \"$SCRIPT_DIR/helper.sh\" || exit 1\n",
                "if [[ -z \"$1\" ]]; then exit 2; fi\n",
                "echo \"$PRESET_PREFIX-$1\" > \"$SCRIPT_DIR/generated.txt\"\n",
            ),
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let cmd = Physx::new(Some(PhysxPreset::Linux)).generate_cmd(Platform::Posix, &physx);
        let result = SystemExecutor.execute(&cmd).unwrap();

        assert!(result.success(), "{:?}", result);
        assert_eq!(
            fs::read_to_string(physx.join("generated.txt")).unwrap(),
            "generated-linux\n"
        );
    }

    #[test]
    fn test_missing_compiler_dir_is_error() {
        let temp = TempDir::new().unwrap();
        let tree = physx_tree(temp.path());
        let mut exec = RecordingExecutor::new();
        let mut ctx = PrepareContext::new(temp.path().to_path_buf(), &mut exec)
            .with_platform(Platform::Posix);

        let err = Physx::new(None).prepare(&mut ctx, &tree).unwrap_err();
        assert!(err.to_string().contains("did not produce"), "{err}");
    }
}
