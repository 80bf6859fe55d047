//! Client error types
//!
//! Unified error handling for the entire client.

use std::fmt;

/// Client-wide error type
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No gateway is configured")]
    NoGateway,

    #[error("Shard {0} not found")]
    ShardNotFound(u32),

    // Transport errors (gateway)
    #[error("Gateway transport error: {0}")]
    Gateway(String),

    /// Fatal close code from the gateway; the session will not reconnect
    #[error("Gateway closed with fatal code {code}: {reason}")]
    FatalClose { code: u16, reason: String },

    // REST errors
    #[error("API error {status} (code {code}): {message}")]
    Api {
        status: u16,
        code: i64,
        message: String,
    },

    /// 5xx from the server; safe for the caller to retry
    #[error("Server error {0}; request may be retried")]
    ServerError(u16),

    #[error("HTTP transport error: {0}")]
    Http(String),

    // Webhook errors
    #[error("Interaction signature verification failed")]
    SignatureInvalid,

    // Lifecycle errors
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Client is closed")]
    Closed,

    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    // Internal errors
    #[error("Internal client error")]
    Internal(#[source] anyhow::Error),
}

impl ClientError {
    /// Check whether retrying the failed operation can succeed
    ///
    /// Only server-side 5xx responses are marked retryable; the client never
    /// retries them itself.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ServerError(_))
    }

    /// Check whether the error ends the session or client for good
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::FatalClose { .. } | Self::Closed
        )
    }

    /// Check whether the error came from cancellation or shutdown
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Closed)
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(msg: impl fmt::Display) -> Self {
        Self::Config(msg.to_string())
    }

    /// Create a gateway transport error
    #[must_use]
    pub fn gateway(msg: impl fmt::Display) -> Self {
        Self::Gateway(msg.to_string())
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
