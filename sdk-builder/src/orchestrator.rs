//! Per-platform configure + build of one package
//!
//! Platforms are processed strictly in registry order, one toolchain process
//! at a time. A failing configure or build step only ends that platform; the
//! remaining platforms are still attempted and the failure is returned as a
//! [`BuildOutcome`].

use crate::package::ArtifactInstaller;
use crate::platform::{Platform, PlatformRegistry, PlatformSetting};
use crate::toolchain::{CommandRunner, Invocation, RunStatus, Step};
use crate::{BuildError, Result};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Release configuration name passed to CMake
const BUILD_TYPE: &str = "Release";

/// Where processing of one platform stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildStage {
    /// Build directory already existed; nothing was run
    UpToDate,
    /// Configure step exited non-zero
    Configure,
    /// Build step exited non-zero
    Build,
    /// Configured, built and installed
    Success,
}

/// Result of processing one platform for one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildOutcome {
    /// Platform this outcome is for
    pub platform: Platform,
    /// Package name
    pub package: String,
    /// Where processing stopped
    pub stage: BuildStage,
    /// Whether the platform ended up built (or already was)
    pub succeeded: bool,
}

impl BuildOutcome {
    fn new(platform: Platform, package: &str, stage: BuildStage, succeeded: bool) -> Self {
        Self {
            platform,
            package: package.to_string(),
            stage,
            succeeded,
        }
    }
}

/// Resumability contract for a package root
///
/// A platform counts as built once `<package_root>/build-<platform>` exists.
/// The marker is not versioned and never re-verified; it is created before
/// the configure step, so a failed attempt also counts as complete until the
/// directory is removed.
#[derive(Debug, Clone, Copy)]
pub struct BuildCheckpoint<'a> {
    package_root: &'a Path,
}

impl<'a> BuildCheckpoint<'a> {
    /// Checkpoint for the package unpacked at `package_root`
    #[must_use]
    pub fn new(package_root: &'a Path) -> Self {
        Self { package_root }
    }

    /// Build directory for `platform`
    #[must_use]
    pub fn build_dir(&self, platform: Platform) -> PathBuf {
        self.package_root.join(format!("build-{platform}"))
    }

    /// Whether `platform` has already been processed
    #[must_use]
    pub fn is_complete(&self, platform: Platform) -> bool {
        self.build_dir(platform).exists()
    }

    /// Claim `platform` by creating its build directory
    fn mark(&self, platform: Platform) -> Result<PathBuf> {
        let build_dir = self.build_dir(platform);
        fs::create_dir_all(&build_dir)?;
        Ok(build_dir)
    }
}

/// Drives configure + build + install across every registered platform
#[derive(Debug)]
pub struct BuildOrchestrator<'a, R> {
    platforms: &'a PlatformRegistry,
    sdk_dir: PathBuf,
    jobs: usize,
    runner: R,
}

impl<'a, R: CommandRunner> BuildOrchestrator<'a, R> {
    /// Create an orchestrator installing into `sdk_dir/<platform>/lib`
    ///
    /// The build step parallelism defaults to the logical core count.
    pub fn new(platforms: &'a PlatformRegistry, sdk_dir: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            platforms,
            sdk_dir: sdk_dir.into(),
            jobs: num_cpus::get(),
            runner,
        }
    }

    /// Override the build step parallelism hint
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Runner used for toolchain invocations
    #[must_use]
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// SDK library directory for `platform`
    #[must_use]
    pub fn lib_dir(&self, platform: Platform) -> PathBuf {
        self.sdk_dir.join(platform.as_str()).join("lib")
    }

    /// Configure, build and install one package for every platform
    ///
    /// Returns one outcome per registered platform, in registry order.
    ///
    /// # Errors
    ///
    /// Only fatal conditions are errors: a toolchain that cannot be started,
    /// a build directory that cannot be created, or a failed install.
    /// Non-zero configure/build exits are reported as failed outcomes.
    pub fn build_all(
        &mut self,
        package_root: &Path,
        package_src: &Path,
        installer: &dyn ArtifactInstaller,
        extra_configure_args: &[String],
    ) -> Result<Vec<BuildOutcome>> {
        let package = installer.package();
        let checkpoint = BuildCheckpoint::new(package_root);
        let platforms = self.platforms;
        let mut outcomes = Vec::with_capacity(platforms.len());

        for setting in platforms.iter() {
            let platform = setting.platform;

            if checkpoint.is_complete(platform) {
                info!("{} for {} already built, skipping", package, platform);
                outcomes.push(BuildOutcome::new(platform, package, BuildStage::UpToDate, true));
                continue;
            }

            info!("Building {} for {}", package, platform);
            let build_dir = checkpoint.mark(platform)?;

            let configure = configure_invocation(
                setting,
                package_src,
                &build_dir,
                extra_configure_args,
                installer.configure_args(platform),
            );
            let status = self.run_step(&configure)?;
            if !status.success() {
                error!(
                    platform = %platform,
                    package,
                    code = ?status.code(),
                    "Configure failed for {} in {}",
                    platform,
                    package_src.display()
                );
                outcomes.push(BuildOutcome::new(platform, package, BuildStage::Configure, false));
                continue;
            }

            let build = build_invocation(setting, &build_dir, self.jobs);
            let status = self.run_step(&build)?;
            if !status.success() {
                error!(
                    platform = %platform,
                    package,
                    code = ?status.code(),
                    "Build failed for {} in {}",
                    platform,
                    package_src.display()
                );
                outcomes.push(BuildOutcome::new(platform, package, BuildStage::Build, false));
                continue;
            }

            installer.install(&self.lib_dir(platform), &setting.output_dir(&build_dir), platform)?;
            info!("✓ {} built for {}", package, platform);
            outcomes.push(BuildOutcome::new(platform, package, BuildStage::Success, true));
        }

        Ok(outcomes)
    }

    fn run_step(&mut self, invocation: &Invocation) -> Result<RunStatus> {
        debug!("Running: {}", invocation);
        self.runner
            .run(invocation)
            .map_err(|source| BuildError::Spawn {
                program: invocation.program.display().to_string(),
                source,
            })
    }
}

/// `cmake -S <src> -B <build> -DCMAKE_BUILD_TYPE=Release <platform args> <package args> <installer args>`
fn configure_invocation(
    setting: &PlatformSetting,
    package_src: &Path,
    build_dir: &Path,
    extra_configure_args: &[String],
    installer_args: &[&str],
) -> Invocation {
    let mut args: Vec<OsString> = vec![
        "-S".into(),
        package_src.into(),
        "-B".into(),
        build_dir.into(),
        format!("-DCMAKE_BUILD_TYPE={BUILD_TYPE}").into(),
    ];
    args.extend(setting.extra_args.iter().map(OsString::from));
    args.extend(extra_configure_args.iter().map(OsString::from));
    args.extend(installer_args.iter().map(OsString::from));

    Invocation {
        step: Step::Configure,
        program: setting.toolchain.clone(),
        args,
    }
}

/// `cmake --build <build> --config Release <platform args> --parallel <jobs>`
fn build_invocation(setting: &PlatformSetting, build_dir: &Path, jobs: usize) -> Invocation {
    let mut args: Vec<OsString> = vec![
        "--build".into(),
        build_dir.into(),
        "--config".into(),
        BUILD_TYPE.into(),
    ];
    args.extend(setting.extra_args.iter().map(OsString::from));
    args.push("--parallel".into());
    args.push(jobs.to_string().into());

    Invocation {
        step: Step::Build,
        program: setting.toolchain.clone(),
        args,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn android_setting() -> PlatformSetting {
        let mut env = HashMap::new();
        let _ = env.insert("ANDROID_NDK".to_string(), "/ndk".to_string());
        let _ = env.insert("ANDROID_SDK".to_string(), "/sdk".to_string());
        PlatformRegistry::detect("", &env)
            .get(Platform::Android)
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_configure_invocation_argument_order() {
        let invocation = configure_invocation(
            &android_setting(),
            Path::new("src"),
            Path::new("build-android"),
            &["-DALSOFT_UTILS=OFF".to_string()],
            &["-DLIBTYPE=STATIC"],
        );

        assert_eq!(invocation.step, Step::Configure);
        assert_eq!(
            invocation.args,
            vec![
                OsString::from("-S"),
                "src".into(),
                "-B".into(),
                "build-android".into(),
                "-DCMAKE_BUILD_TYPE=Release".into(),
                "-DCMAKE_TOOLCHAIN_FILE=/ndk/build/cmake/android.toolchain.cmake".into(),
                "-DANDROID_STL=c++_shared".into(),
                "-DALSOFT_UTILS=OFF".into(),
                "-DLIBTYPE=STATIC".into(),
            ]
        );
    }

    #[test]
    fn test_build_invocation_has_parallelism_hint() {
        let invocation = build_invocation(&android_setting(), Path::new("build-android"), 12);

        assert_eq!(invocation.step, Step::Build);
        assert_eq!(
            invocation.args[..4],
            [
                OsString::from("--build"),
                "build-android".into(),
                "--config".into(),
                "Release".into(),
            ]
        );
        assert_eq!(
            invocation.args[invocation.args.len() - 2..],
            [OsString::from("--parallel"), "12".into()]
        );
        assert!(invocation.args.contains(&OsString::from("-DANDROID_STL=c++_shared")));
    }

    #[test]
    fn test_checkpoint_paths() {
        let checkpoint = BuildCheckpoint::new(Path::new("tmp/sdl2"));
        assert_eq!(
            checkpoint.build_dir(Platform::Windows),
            Path::new("tmp/sdl2").join("build-windows")
        );
    }
}
