pub mod config;
pub mod riders;
pub mod serve;

use anyhow::Context;
use courier_core::config::Config;
use std::path::Path;

/// The config file with environment overrides applied.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let mut config = Config::load(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    config.apply_env().context("invalid environment override")?;
    Ok(config)
}
