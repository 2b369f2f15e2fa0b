//! End-to-end SDK build: fetch, unpack and build every package, then pack
//!
//! 1. Download each package archive into `tmp/` (cached)
//! 2. Extract it next to the archive (cached)
//! 3. Configure + build + install for every registered platform
//! 4. Zip `sdk/` into `sdk.zip`, whatever the individual outcomes were
//!
//! Fatal errors (transport, archive, missing toolchain, install) abort the
//! run before packaging.

use crate::config::BuildConfig;
use crate::orchestrator::{BuildOrchestrator, BuildOutcome};
use crate::package::PackageSpec;
use crate::packager::SdkPackager;
use crate::platform::PlatformRegistry;
use crate::toolchain::CommandRunner;
use crate::Result;
use convenient_cache::{ArtifactCache, Transport};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Machine-readable run summary written under `tmp/`
pub const REPORT_FILE: &str = "build-report.json";

/// Outcomes for one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageReport {
    /// Package name
    pub package: String,
    /// Upstream version that was built
    pub version: String,
    /// One outcome per registered platform, in registry order
    pub outcomes: Vec<BuildOutcome>,
}

/// Everything a finished run produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Per-package outcomes, in build order
    pub reports: Vec<PackageReport>,
    /// Packed SDK archive
    pub archive: PathBuf,
}

impl RunSummary {
    /// Outcomes that did not succeed, across all packages
    pub fn failures(&self) -> impl Iterator<Item = &BuildOutcome> {
        self.reports
            .iter()
            .flat_map(|r| r.outcomes.iter())
            .filter(|o| !o.succeeded)
    }

    /// Whether any platform build failed
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    /// Serialize the summary as pretty JSON to `path`
    ///
    /// # Errors
    ///
    /// Returns `BuildError::Report` if serialization fails and
    /// `BuildError::Io` if the file cannot be written.
    pub fn write_report(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    fn log(&self) {
        info!("Build summary:");
        for report in &self.reports {
            for outcome in &report.outcomes {
                let mark = if outcome.succeeded { "✓" } else { "✗" };
                info!(
                    "  {} {:8} {:8} {:?}",
                    mark, report.package, outcome.platform, outcome.stage
                );
            }
        }

        let failed = self.failures().count();
        if failed > 0 {
            warn!("{} platform build(s) failed; see errors above", failed);
        }
    }
}

/// Runs the whole SDK build for one working root
#[derive(Debug)]
pub struct SdkBuilder<T, R> {
    config: BuildConfig,
    platforms: PlatformRegistry,
    transport: T,
    runner: R,
}

impl<T: Transport, R: CommandRunner> SdkBuilder<T, R> {
    /// Builder for `platforms`, fetching with `transport` and running the
    /// toolchain through `runner`
    pub fn new(config: BuildConfig, platforms: PlatformRegistry, transport: T, runner: R) -> Self {
        Self {
            config,
            platforms,
            transport,
            runner,
        }
    }

    /// Run configuration
    #[must_use]
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Toolchain runner
    #[must_use]
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Download transport
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Build every package for every platform and pack the SDK
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; per-platform build failures are part
    /// of the returned summary instead.
    pub fn run(&mut self, packages: &[PackageSpec]) -> Result<RunSummary> {
        let tmp_dir = self.config.tmp_dir();
        let sdk_dir = self.config.sdk_dir();
        fs::create_dir_all(&tmp_dir)?;
        fs::create_dir_all(&sdk_dir)?;

        info!(
            "Building {} package(s) for {:?}",
            packages.len(),
            self.platforms.platforms()
        );

        let cache = ArtifactCache::new(&tmp_dir, &self.transport);
        let mut orchestrator = BuildOrchestrator::new(&self.platforms, &sdk_dir, &mut self.runner)
            .with_jobs(self.config.jobs);
        let mut reports = Vec::with_capacity(packages.len());

        for package in packages {
            info!("=== {} {} ===", package.name, package.version);

            let _ = cache.download(&package.url(), &package.archive_file_name)?;
            let package_root = cache.extract(&package.archive_file_name, &package.extracted_dir_name)?;
            let package_src = package_root.join(package.source_dir_name());

            let outcomes = orchestrator.build_all(
                &package_root,
                &package_src,
                package.installer(),
                &package.extra_configure_args,
            )?;

            reports.push(PackageReport {
                package: package.name.clone(),
                version: package.version.clone(),
                outcomes,
            });
        }

        let archive = SdkPackager::new(&sdk_dir).pack()?;
        let summary = RunSummary { reports, archive };
        summary.write_report(&tmp_dir.join(REPORT_FILE))?;
        summary.log();

        Ok(summary)
    }
}
