//! # chat-client
//!
//! High-level client for the chat platform: sharded gateway sessions, an
//! event pipeline that keeps the in-memory cache coherent before handlers
//! run, a rate-limited REST client, and an optional signed interaction
//! webhook, assembled behind one facade.
//!
//! ```no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use chat_client::{Client, ClientBuilder, Event, EventListener, GatewayEvent};
//! use chat_core::Intents;
//!
//! struct Logger;
//!
//! #[async_trait]
//! impl EventListener for Logger {
//!     async fn on_event(&self, _client: Arc<Client>, event: GatewayEvent) {
//!         if let Event::MessageCreate { message } = &event.event {
//!             println!("{}: {}", message.author.username, message.content);
//!         }
//!     }
//! }
//!
//! # async fn run() -> chat_common::ClientResult<()> {
//! let client = ClientBuilder::new(std::env::var("CHAT_TOKEN").unwrap())
//!     .intents(Intents::GUILDS | Intents::GUILD_MESSAGES)
//!     .add_listener(Arc::new(Logger))
//!     .build()?;
//! client.connect().await?;
//! # Ok(())
//! # }
//! ```

mod builder;
mod client;
mod events;
mod webhook;

pub use builder::ClientBuilder;
pub use client::Client;
pub use events::{
    Event, EventListener, EventManager, EventProcessor, GatewayEvent, InteractionResponder,
};

// The pieces callers typically need alongside the facade.
pub use chat_cache::{CacheFlags, CachePolicy, Caches};
pub use chat_common::{ClientConfig, ClientError, ClientResult, WebhookConfig};
pub use chat_gateway::{SessionStatus, ShardManager, ShardSession};
pub use chat_rest::{CreateMessage, EditMessage, RestClient};
