use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use tracing::info;
use visa_log_server::{config, init_tracing, server};

/// Execute the start command
///
/// Loads configuration, applies the port override, initializes tracing
/// from the configured level and format, then serves until shutdown.
pub async fn execute(config_path: &Path, port: Option<u16>) -> Result<()> {
    let mut cfg = config::load_config(config_path)?;
    if let Some(port) = port {
        cfg.server.port = port;
        config::validate_config(&cfg)?;
    }

    init_tracing(&cfg.server.log_level, &cfg.server.log_format);

    println!("{}", "Starting visa log server...".green());
    info!(
        config = %config_path.display(),
        port = cfg.server.port,
        "Configuration loaded"
    );

    server::start_server(cfg).await
}
