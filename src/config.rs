use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Display label used in log lines.
    pub name: String,
    /// Snowflake of the single monitored channel.
    pub channel_id: String,
    /// Shortcode or custom emoji name to react with. Case sensitive, no colons.
    pub emoji: String,
    pub token: String,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            bail!("`token` must not be empty");
        }
        if self.emoji.is_empty() {
            bail!("`emoji` must not be empty");
        }
        match self.channel_id.parse::<u64>() {
            Ok(id) if id != 0 => Ok(()),
            _ => bail!(
                "`channel_id` must be a non-zero Discord snowflake, got {:?}",
                self.channel_id
            ),
        }
    }
}
