mod bot;
mod config;
mod handlers;
mod platform;
mod startup;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::startup::Mode;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before logging so RUST_LOG can live there too
    let dotenv = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,greeterbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match dotenv {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Failed to read .env file: {}", e),
    }

    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Configuration loaded successfully");
    let mode = Mode::select(&config)?;
    match &mode {
        Mode::Polling => info!("  Mode: polling"),
        Mode::Webhook { url, port } => {
            info!("  Mode: webhook");
            info!("  Webhook URL: {}", url);
            info!("  Port: {}", port);
        }
    }

    info!("Bot is starting...");
    startup::run(&config, mode).await
}
