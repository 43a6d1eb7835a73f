//! Shared plumbing for the `qos-manager` and `qos-mkdir` binaries.

use std::path::{Path, PathBuf};

use anyhow::Context;

use qos_core::EngineConfig;

/// Install the tracing subscriber, filtered by `RUST_LOG` with an
/// info-level default for the qos crates.
pub fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("qos=info".parse()?),
        )
        .init();
    Ok(())
}

/// Resolve the engine configuration: config file if given, defaults
/// otherwise, with the catalog path flag winning over both.
pub fn load_config(
    config_file: Option<&Path>,
    catalog_override: Option<&Path>,
) -> anyhow::Result<EngineConfig> {
    let mut config = match config_file {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(path) = catalog_override {
        config.catalog_path = PathBuf::from(path);
    }
    Ok(config)
}
