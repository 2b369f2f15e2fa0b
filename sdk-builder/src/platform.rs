//! Target platform detection
//!
//! The registry is derived once from the host descriptor and the Android
//! environment variables, then shared read-only for the whole run.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Toolchain used when a platform needs nothing special
pub const DEFAULT_TOOLCHAIN: &str = "cmake";

/// CMake version bundled with the Android SDK
pub const ANDROID_CMAKE_VERSION: &str = "3.22.1";

/// Path to the Android NDK
pub const ANDROID_NDK_ENV: &str = "ANDROID_NDK";

/// Path to the Android SDK
pub const ANDROID_SDK_ENV: &str = "ANDROID_SDK";

/// Target platform an SDK can be built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Windows desktop (MSVC, multi-config generator)
    Windows,
    /// Linux desktop; libraries come from the distribution
    Linux,
    /// Android via the NDK toolchain file
    Android,
    /// macOS desktop
    Macos,
    /// iOS, built from a macOS host
    Ios,
}

impl Platform {
    /// Stable id used for directory names (`build-<id>`, `sdk/<id>`)
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::Android => "android",
            Self::Macos => "macos",
            Self::Ios => "ios",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// How to configure and build for one platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformSetting {
    /// Platform these settings apply to
    pub platform: Platform,

    /// CMake executable
    pub toolchain: PathBuf,

    /// Extra arguments passed to both configure and build steps
    pub extra_args: Vec<String>,

    /// Where the build step leaves artifacts, relative to the build directory
    /// (empty means the build directory itself)
    pub output_subpath: PathBuf,
}

impl PlatformSetting {
    fn with_default_toolchain(platform: Platform, output_subpath: &str) -> Self {
        Self {
            platform,
            toolchain: PathBuf::from(DEFAULT_TOOLCHAIN),
            extra_args: Vec::new(),
            output_subpath: PathBuf::from(output_subpath),
        }
    }

    fn android(ndk: &str, sdk: &str) -> Self {
        Self {
            platform: Platform::Android,
            toolchain: Path::new(sdk)
                .join("cmake")
                .join(ANDROID_CMAKE_VERSION)
                .join("bin")
                .join("cmake"),
            extra_args: vec![
                format!("-DCMAKE_TOOLCHAIN_FILE={ndk}/build/cmake/android.toolchain.cmake"),
                "-DANDROID_STL=c++_shared".to_string(),
            ],
            output_subpath: PathBuf::new(),
        }
    }

    /// Directory holding the built artifacts for `build_dir`
    #[must_use]
    pub fn output_dir(&self, build_dir: &Path) -> PathBuf {
        if self.output_subpath.as_os_str().is_empty() {
            build_dir.to_path_buf()
        } else {
            build_dir.join(&self.output_subpath)
        }
    }
}

/// Buildable platforms for this run, in registration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformRegistry {
    settings: Vec<PlatformSetting>,
}

impl PlatformRegistry {
    /// Derive the buildable platforms from the host descriptor and environment
    ///
    /// Matching is plain case-insensitive substring membership. Android needs
    /// both `ANDROID_NDK` and `ANDROID_SDK`; either alone is ignored. An
    /// unrecognised host yields an empty registry, which is not an error.
    #[must_use]
    pub fn detect(host: &str, env: &HashMap<String, String>) -> Self {
        let host = host.to_lowercase();
        let mut settings = Vec::new();

        if host.contains("windows") {
            info!("Windows platform added.");
            settings.push(PlatformSetting::with_default_toolchain(Platform::Windows, "Release"));
        }

        if host.contains("linux") {
            info!("Linux platform added.");
            settings.push(PlatformSetting::with_default_toolchain(Platform::Linux, ""));
        }

        if let (Some(ndk), Some(sdk)) = (env.get(ANDROID_NDK_ENV), env.get(ANDROID_SDK_ENV)) {
            info!("Android platform added.");
            settings.push(PlatformSetting::android(ndk, sdk));
        }

        if host.contains("macos") {
            info!("MacOS & iOS platforms added.");
            settings.push(PlatformSetting::with_default_toolchain(Platform::Macos, ""));
            settings.push(PlatformSetting::with_default_toolchain(Platform::Ios, ""));
        }

        if settings.is_empty() {
            warn!("No buildable platforms for host '{}'; nothing will be built", host);
        }

        Self { settings }
    }

    /// Settings in registration order
    pub fn iter(&self) -> impl Iterator<Item = &PlatformSetting> {
        self.settings.iter()
    }

    /// Settings for `platform`, if registered
    #[must_use]
    pub fn get(&self, platform: Platform) -> Option<&PlatformSetting> {
        self.settings.iter().find(|s| s.platform == platform)
    }

    /// Whether `platform` is registered
    #[must_use]
    pub fn contains(&self, platform: Platform) -> bool {
        self.get(platform).is_some()
    }

    /// Registered platform ids, in order
    #[must_use]
    pub fn platforms(&self) -> Vec<Platform> {
        self.settings.iter().map(|s| s.platform).collect()
    }

    /// Number of registered platforms
    #[must_use]
    pub fn len(&self) -> usize {
        self.settings.len()
    }

    /// Whether no platform can be built on this host
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }
}

/// Host descriptor derived from the compiled-for OS and architecture,
/// e.g. `linux-x86_64` or `macos-aarch64`
#[must_use]
pub fn host_descriptor() -> String {
    format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}
