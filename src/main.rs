use anyhow::Result;
use fal_gateway::{
    config::{self, Credential},
    server,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Accepts a bare level or a full filter directive such as `fal_gateway=debug,tower_http=info`.
fn parse_log_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level).map_err(|_| {
        anyhow::anyhow!(
            "Invalid log level: '{}'. Valid levels: error, warn, info, debug, trace",
            level
        )
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Configuration comes first so the log level can be read from it
    let config = match config::load().await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // RUST_LOG overrides the configured level
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| config.server.logs.level.clone());

    let filter = match parse_log_filter(&log_level) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .init();

    info!("Starting fal gateway with log level: {}", log_level);
    info!("Configuration loaded successfully");

    let credential = Credential::from_env(&config.upstream.api_key_env);
    server::run(config, credential).await?;

    Ok(())
}
