//! Client configuration
//!
//! Built programmatically or loaded from environment variables.

use chat_core::{Intents, UpdatePresence};
use std::env;

/// Default REST base URL
pub const DEFAULT_API_URL: &str = "https://discord.com/api/v10";

/// Default gateway URL, used until READY supplies a resume URL
pub const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg";

/// Bounds for the large_threshold identify field
pub const LARGE_THRESHOLD_MIN: u8 = 50;
pub const LARGE_THRESHOLD_MAX: u8 = 250;

/// Main client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bot authentication token
    pub token: String,
    /// Gateway intents sent with Identify
    pub intents: Intents,
    /// Shard ids this process runs; None = all of `[0, shard_count)`
    pub shard_ids: Option<Vec<u32>>,
    /// Total shard count; None = ask the server via /gateway/bot
    pub shard_count: Option<u32>,
    /// Member cutoff for initial guild payloads, clamped to 50..=250
    pub large_threshold: u8,
    /// Enable transport-level compression on the gateway
    pub compress: bool,
    /// Presence sent with Identify
    pub presence: Option<UpdatePresence>,
    /// REST base URL
    pub api_url: String,
    /// Gateway URL override
    pub gateway_url: String,
    /// Inbound interaction webhook, disabled when None
    pub webhook: Option<WebhookConfig>,
}

/// Interaction webhook server configuration
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Hex-encoded Ed25519 public key of the application
    pub public_key: String,
    /// Listen address, e.g. "0.0.0.0:8443"
    pub address: String,
    /// Endpoint path, e.g. "/interactions"
    pub path: String,
}

impl ClientConfig {
    /// Create a configuration with defaults for everything but the token
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            intents: Intents::default(),
            shard_ids: None,
            shard_count: None,
            large_threshold: LARGE_THRESHOLD_MIN,
            compress: false,
            presence: None,
            api_url: DEFAULT_API_URL.to_string(),
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            webhook: None,
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `CHAT_TOKEN` is missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let mut config = Self::new(
            env::var("CHAT_TOKEN").map_err(|_| ConfigError::MissingVar("CHAT_TOKEN"))?,
        );

        if let Some(bits) = env::var("CHAT_INTENTS").ok().and_then(|s| s.parse().ok()) {
            config.intents = Intents::from_bits_truncate(bits);
        }
        if let Some(count) = env::var("CHAT_SHARD_COUNT").ok().and_then(|s| s.parse().ok()) {
            config.shard_count = Some(count);
        }
        if let Some(threshold) = env::var("CHAT_LARGE_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.large_threshold = clamp_large_threshold(threshold);
        }
        if let Ok(compress) = env::var("CHAT_COMPRESS") {
            config.compress = compress == "1" || compress.eq_ignore_ascii_case("true");
        }
        if let Ok(url) = env::var("CHAT_API_URL") {
            config.api_url = url;
        }
        if let Ok(url) = env::var("CHAT_GATEWAY_URL") {
            config.gateway_url = url;
        }
        if let Ok(public_key) = env::var("CHAT_WEBHOOK_PUBLIC_KEY") {
            config.webhook = Some(WebhookConfig {
                public_key,
                address: env::var("CHAT_WEBHOOK_ADDRESS")
                    .unwrap_or_else(|_| "0.0.0.0:8443".to_string()),
                path: env::var("CHAT_WEBHOOK_PATH").unwrap_or_else(|_| "/interactions".to_string()),
            });
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns an error when the token is empty or the shard subset is
    /// inconsistent with the shard count.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.trim().is_empty() {
            return Err(ConfigError::MissingVar("CHAT_TOKEN"));
        }

        if let (Some(ids), Some(count)) = (&self.shard_ids, self.shard_count) {
            if let Some(&bad) = ids.iter().find(|&&id| id >= count) {
                return Err(ConfigError::InvalidValue(
                    "shard_ids",
                    format!("shard id {bad} out of range for shard count {count}"),
                ));
            }
        }

        Ok(())
    }
}

/// Clamp a large_threshold value into the server-accepted range
#[must_use]
pub fn clamp_large_threshold(value: u8) -> u8 {
    value.clamp(LARGE_THRESHOLD_MIN, LARGE_THRESHOLD_MAX)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("token123");
        assert_eq!(config.token, "token123");
        assert_eq!(config.large_threshold, LARGE_THRESHOLD_MIN);
        assert!(!config.compress);
        assert!(config.shard_count.is_none());
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_clamp_large_threshold() {
        assert_eq!(clamp_large_threshold(10), 50);
        assert_eq!(clamp_large_threshold(125), 125);
        assert_eq!(clamp_large_threshold(255), 250);
    }

    #[test]
    fn test_validate_empty_token() {
        let config = ClientConfig::new("  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_shard_subset() {
        let mut config = ClientConfig::new("token");
        config.shard_ids = Some(vec![0, 3]);
        config.shard_count = Some(4);
        assert!(config.validate().is_ok());

        config.shard_ids = Some(vec![4]);
        assert!(config.validate().is_err());
    }
}
