use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::routing::Destination;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub webhooks: WebhookConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DiscordConfig {
    #[serde(default)]
    pub bot_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookConfig {
    /// Receives content-saving commands (INPUT)
    #[serde(default = "default_input_url")]
    pub input_url: String,
    /// Receives information-retrieval commands (QUERY)
    #[serde(default = "default_query_url")]
    pub query_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            input_url: default_input_url(),
            query_url: default_query_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl WebhookConfig {
    pub fn url_for(&self, destination: Destination) -> &str {
        match destination {
            Destination::Input => &self.input_url,
            Destination::Query => &self.query_url,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_input_url() -> String {
    "http://localhost:5678/webhook/discord-brain-input".to_string()
}

fn default_query_url() -> String {
    "http://localhost:5678/webhook/discord-brain".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    "SecondBrain-Discord-Bot/1.0".to_string()
}

pub const TOKEN_VAR: &str = "DISCORD_TOKEN";
pub const INPUT_WEBHOOK_VAR: &str = "SAVE_WEBHOOK";
pub const QUERY_WEBHOOK_VAR: &str = "QUERY_WEBHOOK";

impl Config {
    /// Load from an optional TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Load from an optional TOML file, overriding from `lookup`.
    pub fn load_with<F>(path: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&content)?
        } else {
            Config::default()
        };

        config.apply_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Override settings from `lookup` (normally the process environment).
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get(TOKEN_VAR) {
            self.discord.bot_token = token;
        }
        if let Some(url) = get(INPUT_WEBHOOK_VAR) {
            self.webhooks.input_url = url;
        }
        if let Some(url) = get(QUERY_WEBHOOK_VAR) {
            self.webhooks.query_url = url;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.discord.bot_token.trim().is_empty() {
            anyhow::bail!(
                "Discord bot token is missing: set {} or [discord] bot_token",
                TOKEN_VAR
            );
        }

        for (name, url) in [
            ("input_url", &self.webhooks.input_url),
            ("query_url", &self.webhooks.query_url),
        ] {
            let parsed = reqwest::Url::parse(url)
                .with_context(|| format!("Invalid webhook {}: {}", name, url))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("Webhook {} must use http or https: {}", name, url);
            }
        }

        if self.webhooks.timeout_secs == 0 {
            anyhow::bail!("Webhook timeout_secs must be greater than zero");
        }

        Ok(())
    }
}
