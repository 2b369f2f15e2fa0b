//! Run configuration and command-line interface
//!
//! Every flag has a default, so a bare `sdk-builder` invocation builds from
//! the current directory for whatever the host supports and always exits
//! successfully once the archive is written.

use crate::pipeline::RunSummary;
use crate::platform::host_descriptor;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

/// Scratch directory for downloads, extraction and build directories
pub const TMP_DIR: &str = "tmp";

/// Assembled SDK tree
pub const SDK_DIR: &str = "sdk";

/// What the process exit status reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ExitPolicy {
    /// Exit successfully even when some platform failed to build
    #[default]
    AlwaysSucceed,
    /// Exit with a failure status when any platform failed to build
    FailOnBuildError,
}

impl ExitPolicy {
    /// Whether a finished run should exit with a failure status
    #[must_use]
    pub fn fails(self, summary: &RunSummary) -> bool {
        match self {
            Self::AlwaysSucceed => false,
            Self::FailOnBuildError => summary.has_failures(),
        }
    }

    /// Exit code for a finished run
    #[must_use]
    pub fn exit_code(self, summary: &RunSummary) -> ExitCode {
        if self.fails(summary) {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }
}

/// sdk-builder - precompiled native dependency SDKs
#[derive(Debug, Parser)]
#[command(name = "sdk-builder")]
#[command(about = "Builds SDL2 and OpenAL Soft for every platform this host can target and packs them into sdk.zip")]
#[command(version)]
pub struct Cli {
    /// Working root holding tmp/, sdk/ and sdk.zip
    #[arg(long, env = "SDK_BUILDER_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Host descriptor override (defaults to <os>-<arch>)
    #[arg(long, env = "SDK_BUILDER_HOST")]
    pub host: Option<String>,

    /// Parallelism hint for the build step (defaults to logical cores)
    #[arg(long, env = "SDK_BUILDER_JOBS")]
    pub jobs: Option<usize>,

    /// Exit status policy when a platform fails to build
    #[arg(long, value_enum, env = "SDK_BUILDER_EXIT_POLICY", default_value_t = ExitPolicy::AlwaysSucceed)]
    pub exit_policy: ExitPolicy,
}

/// Immutable settings for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Working root holding `tmp/`, `sdk/` and `sdk.zip`
    pub root: PathBuf,
    /// Host descriptor used for platform detection
    pub host: String,
    /// Parallelism hint for the build step
    pub jobs: usize,
    /// Exit status policy
    pub exit_policy: ExitPolicy,
}

impl BuildConfig {
    /// Defaults for a run rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            host: host_descriptor(),
            jobs: num_cpus::get(),
            exit_policy: ExitPolicy::default(),
        }
    }

    /// Override the host descriptor
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Scratch directory, `<root>/tmp`
    #[must_use]
    pub fn tmp_dir(&self) -> PathBuf {
        self.root.join(TMP_DIR)
    }

    /// SDK tree, `<root>/sdk`
    #[must_use]
    pub fn sdk_dir(&self) -> PathBuf {
        self.root.join(SDK_DIR)
    }
}

impl From<Cli> for BuildConfig {
    fn from(cli: Cli) -> Self {
        let mut config = Self::new(cli.root);
        if let Some(host) = cli.host {
            config.host = host;
        }
        if let Some(jobs) = cli.jobs {
            config.jobs = jobs.max(1);
        }
        config.exit_policy = cli.exit_policy;
        config
    }
}
