mod bridge;
mod config;
mod payload;
mod platform;
mod routing;
mod webhook;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bridge::Bridge;
use crate::config::Config;
use crate::webhook::WebhookClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,brainbridge=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Input webhook: {}", config.webhooks.input_url);
    info!("  Query webhook: {}", config.webhooks.query_url);
    info!("  Timeout: {}s", config.webhooks.timeout_secs);

    let delivery = WebhookClient::new(config.webhooks.clone())?;
    let bridge = Arc::new(Bridge::new(Box::new(delivery)));

    info!("Bot is starting...");
    platform::discord::run(config, bridge).await?;

    Ok(())
}
