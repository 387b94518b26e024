mod bot;
mod config;
mod emoji;
mod logging;
mod platform;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::bot::ReactBot;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Flushed on drop, however the client loop ends
    let _log_guard = logging::init()?;

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Name: {}", config.name);
    info!("  Channel: {}", config.channel_id);
    info!("  Emoji: {}", config.emoji);

    let token = config.token.clone();
    let bot = ReactBot::new(config);

    info!("Bot is starting...");
    platform::discord::run(&token, bot).await?;

    Ok(())
}
