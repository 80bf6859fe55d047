//! # chat-common
//!
//! Shared client infrastructure: configuration, the unified error type, and
//! telemetry setup.

pub mod config;
pub mod error;
pub mod telemetry;

pub use config::{ClientConfig, ConfigError, WebhookConfig};
pub use error::{ClientError, ClientResult};
