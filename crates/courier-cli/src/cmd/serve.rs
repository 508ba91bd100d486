use anyhow::Context;
use courier_core::config::Config;
use std::path::Path;

use super::load_config;

pub fn run(
    config_path: &Path,
    port: Option<u16>,
    host: Option<String>,
    open: bool,
) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(host) = host {
        config.server.host = host;
    }
    refuse_config_errors(&config)?;

    let rt = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    rt.block_on(async move {
        let addr = format!("{}:{}", config.server.host, config.server.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        courier_server::serve_on(config, listener, open).await
    })
}

fn refuse_config_errors(config: &Config) -> anyhow::Result<()> {
    let warnings = config.validate();
    for w in &warnings {
        tracing::warn!(level = ?w.level, "{}", w.message);
    }
    if Config::has_errors(&warnings) {
        anyhow::bail!("config has errors; run `courier config validate` for details");
    }
    Ok(())
}
