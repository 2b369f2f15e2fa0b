//! sdk-builder - precompiled native dependency SDKs for every reachable platform
//!
//! sdk-builder is a thin orchestration layer over CMake:
//! - **platform**: which targets this host (plus `ANDROID_NDK`/`ANDROID_SDK`) can build
//! - **convenient-cache**: idempotent download and unpack of upstream sources
//! - **orchestrator**: configure + build per platform, failures isolated per platform
//! - **package**: the fixed upstream dependencies and their artifact installers
//! - **packager**: zips the assembled `sdk/` tree
//!
//! ## Architecture
//!
//! ```text
//! PlatformRegistry::detect ─┐
//!                           ▼
//! for each PackageSpec: download → extract → BuildOrchestrator::build_all
//!                           ▼
//!                   SdkPackager::pack → sdk.zip
//! ```
//!
//! The platform registry is computed once and passed down explicitly. A
//! platform whose build directory already exists is treated as built; see
//! [`BuildCheckpoint`].
//!
//! ## Usage
//!
//! ```no_run
//! use sdk_builder::*;
//! use std::collections::HashMap;
//!
//! # fn example() -> Result<()> {
//! let config = BuildConfig::new(".");
//! let env: HashMap<String, String> = std::env::vars().collect();
//! let platforms = PlatformRegistry::detect(&config.host, &env);
//!
//! let summary = SdkBuilder::new(config, platforms, HttpTransport::new(), SystemRunner)
//!     .run(&default_packages())?;
//! println!("{} failed builds", summary.failures().count());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(unused_results)]

pub mod config;
pub mod orchestrator;
pub mod package;
pub mod packager;
pub mod pipeline;
pub mod platform;
pub mod toolchain;

pub use config::{BuildConfig, Cli, ExitPolicy};
pub use orchestrator::{BuildCheckpoint, BuildOrchestrator, BuildOutcome, BuildStage};
pub use package::{ArtifactInstaller, OpenAlInstaller, PackageSpec, Sdl2Installer, default_packages};
pub use packager::SdkPackager;
pub use pipeline::{PackageReport, RunSummary, SdkBuilder};
pub use platform::{Platform, PlatformRegistry, PlatformSetting, host_descriptor};
pub use toolchain::{CommandRunner, Invocation, RunStatus, Step, SystemRunner};

// Re-export the transport seam so callers need only this crate
pub use convenient_cache::{CacheError, HttpTransport, Transport};

use std::io;
use thiserror::Error;

/// Fatal errors that abort a run
///
/// Per-platform configure/build failures are not errors; they are reported
/// as [`BuildOutcome`]s.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Download or extraction failed
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Filesystem error outside the cache
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Toolchain process could not be started
    #[error("Failed to run {program}: {source}")]
    Spawn {
        /// Executable that failed to start
        program: String,
        /// Underlying spawn error
        #[source]
        source: io::Error,
    },

    /// Built artifact could not be copied into the SDK tree
    #[error("Failed to install {artifact} for {package} on {platform}: {source}")]
    Install {
        /// Package being installed
        package: String,
        /// Platform being installed
        platform: Platform,
        /// Artifact file name that could not be copied
        artifact: String,
        /// Underlying copy error
        #[source]
        source: io::Error,
    },

    /// Build report could not be serialized
    #[error("Failed to write build report: {0}")]
    Report(#[from] serde_json::Error),
}

/// Result type for sdk-builder operations
pub type Result<T> = std::result::Result<T, BuildError>;
