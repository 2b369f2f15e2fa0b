//! Upstream dependencies and their artifact installers
//!
//! The package set is fixed: SDL2 and OpenAL Soft. Each package knows where
//! its sources live and which built files belong in `sdk/<platform>/lib`.

use crate::platform::Platform;
use crate::{BuildError, Result};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::info;

/// Placeholder substituted with the package version in templates
const VERSION_PLACEHOLDER: &str = "{version}";

/// Copies a package's built binaries into the SDK tree
pub trait ArtifactInstaller: fmt::Debug {
    /// Package this installer belongs to
    fn package(&self) -> &str;

    /// Files to copy for `platform`; empty when the platform needs no
    /// prebuilt binaries
    fn artifacts(&self, platform: Platform) -> &'static [&'static str];

    /// Configure arguments needed so the build for `platform` produces
    /// [`artifacts`](Self::artifacts)
    fn configure_args(&self, _platform: Platform) -> &'static [&'static str] {
        &[]
    }

    /// Copy the artifacts for `platform` from `output_dir` into `lib_dir`
    ///
    /// # Errors
    ///
    /// Returns `BuildError::Install` if an expected artifact cannot be copied.
    fn install(&self, lib_dir: &Path, output_dir: &Path, platform: Platform) -> Result<()> {
        let artifacts = self.artifacts(platform);
        if artifacts.is_empty() {
            info!(
                "{} on {}: no prebuilt libraries needed, nothing to install",
                self.package(),
                platform
            );
            return Ok(());
        }

        fs::create_dir_all(lib_dir)?;
        for artifact in artifacts {
            let _ = fs::copy(output_dir.join(artifact), lib_dir.join(artifact)).map_err(
                |source| BuildError::Install {
                    package: self.package().to_string(),
                    platform,
                    artifact: (*artifact).to_string(),
                    source,
                },
            )?;
            info!("  Installed {} → {}", artifact, lib_dir.display());
        }

        Ok(())
    }
}

/// SDL2 libraries
#[derive(Debug, Clone, Copy, Default)]
pub struct Sdl2Installer;

impl ArtifactInstaller for Sdl2Installer {
    fn package(&self) -> &str {
        "sdl2"
    }

    fn artifacts(&self, platform: Platform) -> &'static [&'static str] {
        match platform {
            Platform::Windows => &["SDL2.lib", "SDL2main.lib"],
            Platform::Android => &["libSDL2.so", "libSDL2main.a"],
            Platform::Macos => &["libSDL2-2.0.dylib", "libSDL2main.a"],
            Platform::Ios => &["libSDL2.a", "libSDL2main.a"],
            // System SDL2 from the distribution is used
            Platform::Linux => &[],
        }
    }
}

/// OpenAL Soft library
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAlInstaller;

impl ArtifactInstaller for OpenAlInstaller {
    fn package(&self) -> &str {
        "openal"
    }

    fn artifacts(&self, platform: Platform) -> &'static [&'static str] {
        match platform {
            Platform::Windows => &["OpenAL32.lib"],
            Platform::Android => &["libopenal.so"],
            Platform::Macos => &["libopenal.dylib"],
            Platform::Ios => &["libopenal.a"],
            Platform::Linux => &[],
        }
    }

    fn configure_args(&self, platform: Platform) -> &'static [&'static str] {
        // Shared is the upstream default
        match platform {
            Platform::Ios => &["-DLIBTYPE=STATIC"],
            _ => &[],
        }
    }
}

/// Static description of one upstream dependency
#[derive(Debug)]
pub struct PackageSpec {
    /// Short name, also used for the archive and extraction directory
    pub name: String,

    /// Upstream release version
    pub version: String,

    /// Download URL with a `{version}` placeholder
    pub url_template: String,

    /// Archive file name inside the scratch directory
    pub archive_file_name: String,

    /// Directory the archive is extracted into (the package root)
    pub extracted_dir_name: String,

    /// Top-level source directory inside the archive, with a `{version}`
    /// placeholder
    pub source_dir_template: String,

    /// Arguments appended to the configure step on every platform
    pub extra_configure_args: Vec<String>,

    installer: Box<dyn ArtifactInstaller>,
}

impl PackageSpec {
    /// Describe a package distributed as a zip archive
    ///
    /// The archive is stored as `<name>.zip` and extracted into `<name>`.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        url_template: impl Into<String>,
        source_dir_template: impl Into<String>,
        installer: Box<dyn ArtifactInstaller>,
    ) -> Self {
        let name = name.into();
        Self {
            archive_file_name: format!("{name}.zip"),
            extracted_dir_name: name.clone(),
            name,
            version: version.into(),
            url_template: url_template.into(),
            source_dir_template: source_dir_template.into(),
            extra_configure_args: Vec::new(),
            installer,
        }
    }

    /// Append configure arguments
    #[must_use]
    pub fn with_configure_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_configure_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// SDL2 2.0.22
    #[must_use]
    pub fn sdl2() -> Self {
        Self::new(
            "sdl2",
            "2.0.22",
            "https://www.libsdl.org/release/SDL2-{version}.zip",
            "SDL2-{version}",
            Box::new(Sdl2Installer),
        )
    }

    /// OpenAL Soft 1.22.2
    #[must_use]
    pub fn openal() -> Self {
        Self::new(
            "openal",
            "1.22.2",
            "https://github.com/kcat/openal-soft/archive/refs/tags/{version}.zip",
            "openal-soft-{version}",
            Box::new(OpenAlInstaller),
        )
        .with_configure_args(["-DALSOFT_EXAMPLES=OFF", "-DALSOFT_UTILS=OFF"])
    }

    /// Versioned download URL
    #[must_use]
    pub fn url(&self) -> String {
        self.url_template.replace(VERSION_PLACEHOLDER, &self.version)
    }

    /// Versioned source directory name inside the package root
    #[must_use]
    pub fn source_dir_name(&self) -> String {
        self.source_dir_template.replace(VERSION_PLACEHOLDER, &self.version)
    }

    /// Installer for this package's artifacts
    #[must_use]
    pub fn installer(&self) -> &dyn ArtifactInstaller {
        self.installer.as_ref()
    }
}

/// The fixed package set, in build order
#[must_use]
pub fn default_packages() -> Vec<PackageSpec> {
    vec![PackageSpec::sdl2(), PackageSpec::openal()]
}
