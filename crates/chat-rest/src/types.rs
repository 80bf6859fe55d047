//! REST request/response bodies

use serde::{Deserialize, Serialize};

/// GET /gateway response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayInfo {
    pub url: String,
}

/// Identify budget attached to GET /gateway/bot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStartLimit {
    pub total: u32,
    pub remaining: u32,
    /// Milliseconds until the identify budget refills
    pub reset_after: u64,
    /// How many identify buckets may run in parallel
    pub max_concurrency: u32,
}

/// GET /gateway/bot response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayBotInfo {
    pub url: String,
    /// Server-recommended shard count
    pub shards: u32,
    pub session_start_limit: SessionStartLimit,
}

/// POST /channels/{id}/messages body
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CreateMessage {
    pub content: String,
}

impl CreateMessage {
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// PATCH /channels/{id}/messages/{id} body
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EditMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Error body the server attaches to 4xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}
