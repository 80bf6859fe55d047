//! Client configuration

mod client_config;

pub use client_config::{
    clamp_large_threshold, ClientConfig, ConfigError, WebhookConfig, DEFAULT_API_URL,
    DEFAULT_GATEWAY_URL, LARGE_THRESHOLD_MAX, LARGE_THRESHOLD_MIN,
};
