//! sdk-builder - precompiled native dependency SDKs
//!
//! Orchestrates:
//! 1. Platform detection (host + ANDROID_NDK/ANDROID_SDK)
//! 2. Source download and extraction (cached under tmp/)
//! 3. CMake configure + build per platform
//! 4. Artifact collection into sdk/<platform>/lib
//! 5. Packing sdk/ into sdk.zip

use clap::Parser;
use sdk_builder::{
    BuildConfig, Cli, HttpTransport, PlatformRegistry, SdkBuilder, SystemRunner, default_packages,
};
use std::collections::HashMap;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sdk_builder=info,convenient_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = BuildConfig::from(Cli::parse());
    tracing::info!("Building SDKs in {}", config.root.display());

    let env: HashMap<String, String> = std::env::vars_os()
        .map(|(k, v)| (k.to_string_lossy().into_owned(), v.to_string_lossy().into_owned()))
        .collect();
    let platforms = PlatformRegistry::detect(&config.host, &env);

    let exit_policy = config.exit_policy;
    let summary = SdkBuilder::new(config, platforms, HttpTransport::new(), SystemRunner)
        .run(&default_packages())?;

    Ok(exit_policy.exit_code(&summary))
}
