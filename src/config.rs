//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API keys, tokens) are referenced by env-var name in the
//! config and resolved at runtime via `std::env::var`, so a missing
//! credential only fails the operation that needs it.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub llm: LlmConfig,
    pub alerts: AlertsConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    pub name: String,
    pub scan_interval_minutes: u64,
    /// Number of markets fetched per scan, ordered by volume descending.
    pub market_limit: usize,
    /// Minimum confidence score (1-10) for a market to be admitted.
    pub min_confidence: u8,
    /// Peer agent name for best-effort DM notifications.
    #[serde(default)]
    pub peer_reviewer: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub api_key_env: String,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlertsConfig {
    pub telegram: TelegramConfig,
    pub moltbook: MoltbookConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token_env: String,
    pub channel_id_env: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MoltbookConfig {
    pub enabled: bool,
    pub api_key_env: String,
    pub submolt: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub portfolio_path: String,
    pub heartbeat_path: String,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
