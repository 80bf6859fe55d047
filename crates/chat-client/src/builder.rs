//! Client builder
//!
//! Covers the whole configuration surface: token, intents, sharding, cache
//! flags and policies, identify presence, compression, and the optional
//! interaction webhook.

use std::sync::Arc;
use std::time::Duration;

use chat_cache::{CacheConfig, CacheFlags, CachePolicy, Caches};
use chat_common::config::clamp_large_threshold;
use chat_common::{ClientConfig, ClientError, ClientResult, WebhookConfig};
use chat_core::{Intents, Member, Message, UpdatePresence};
use chat_gateway::chunking::MemberChunkCoordinator;
use chat_gateway::DEFAULT_CHUNK_TIMEOUT;

use crate::client::Client;
use crate::events::EventListener;

/// Builder for [`Client`]
pub struct ClientBuilder {
    config: ClientConfig,
    cache_config: CacheConfig,
    chunk_timeout: Duration,
    listeners: Vec<Arc<dyn EventListener>>,
    http_client: Option<chat_rest::HttpClient>,
}

impl ClientBuilder {
    /// Start a builder with a bot token and defaults for everything else
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self::from_config(ClientConfig::new(token))
    }

    /// Start from an existing configuration (e.g. [`ClientConfig::from_env`])
    #[must_use]
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            cache_config: CacheConfig::default(),
            chunk_timeout: DEFAULT_CHUNK_TIMEOUT,
            listeners: Vec::new(),
            http_client: None,
        }
    }

    /// Gateway intents sent with Identify
    #[must_use]
    pub fn intents(mut self, intents: Intents) -> Self {
        self.config.intents = intents;
        self
    }

    /// Fix the shard topology instead of asking /gateway/bot
    #[must_use]
    pub fn shard_count(mut self, count: u32) -> Self {
        self.config.shard_count = Some(count);
        self
    }

    /// Run only a subset of shards (multi-process sharding)
    #[must_use]
    pub fn shard_ids(mut self, ids: Vec<u32>) -> Self {
        self.config.shard_ids = Some(ids);
        self
    }

    /// Member cutoff for initial guild payloads, clamped to 50..=250
    #[must_use]
    pub fn large_threshold(mut self, threshold: u8) -> Self {
        self.config.large_threshold = clamp_large_threshold(threshold);
        self
    }

    /// Enable transport-level compression on the gateway
    #[must_use]
    pub fn compress(mut self, compress: bool) -> Self {
        self.config.compress = compress;
        self
    }

    /// Presence sent with Identify
    #[must_use]
    pub fn presence(mut self, presence: UpdatePresence) -> Self {
        self.config.presence = Some(presence);
        self
    }

    /// Override the REST base URL
    #[must_use]
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    /// Override the gateway URL
    #[must_use]
    pub fn gateway_url(mut self, url: impl Into<String>) -> Self {
        self.config.gateway_url = url.into();
        self
    }

    /// Receive interactions over a signed HTTP webhook
    #[must_use]
    pub fn webhook(mut self, webhook: WebhookConfig) -> Self {
        self.config.webhook = Some(webhook);
        self
    }

    /// Select which caches are kept
    #[must_use]
    pub fn cache_flags(mut self, flags: CacheFlags) -> Self {
        self.cache_config.flags = flags;
        self
    }

    /// Retention policy for the member cache
    #[must_use]
    pub fn member_cache_policy(mut self, policy: CachePolicy<Member>) -> Self {
        self.cache_config.member_policy = policy;
        self
    }

    /// Retention policy for the message cache
    #[must_use]
    pub fn message_cache_policy(mut self, policy: CachePolicy<Message>) -> Self {
        self.cache_config.message_policy = policy;
        self
    }

    /// How long to wait for all chunks of one member request
    #[must_use]
    pub fn chunk_timeout(mut self, timeout: Duration) -> Self {
        self.chunk_timeout = timeout;
        self
    }

    /// Use a preconfigured HTTP client for REST calls
    #[must_use]
    pub fn http_client(mut self, http: chat_rest::HttpClient) -> Self {
        self.http_client = Some(http);
        self
    }

    /// Register an event listener up front
    #[must_use]
    pub fn add_listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Validate the configuration and assemble the client
    ///
    /// No network traffic happens here; call [`Client::connect`] to go live.
    pub fn build(self) -> ClientResult<Arc<Client>> {
        self.config
            .validate()
            .map_err(|err| ClientError::config(err))?;

        let caches = Arc::new(Caches::new(self.cache_config));
        let chunking = Arc::new(MemberChunkCoordinator::new(self.chunk_timeout));
        let client = Client::assemble(self.config, caches, chunking, self.http_client)?;

        for listener in self.listeners {
            client.add_listener(listener);
        }
        Ok(client)
    }
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("intents", &self.config.intents)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
