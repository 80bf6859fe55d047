//! # chat-core
//!
//! Domain layer for the chat client: value objects and the wire entities
//! shared by the gateway, cache, and REST crates. This crate has zero
//! dependencies on infrastructure (sockets, HTTP, caches).

pub mod entities;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    Activity, Channel, ChannelType, Emoji, Guild, Interaction, InteractionType, Member, Message,
    OnlineStatus, OverwriteType, PermissionOverwrite, Presence, PresenceUser, Role, Sticker,
    ThreadMember, ThreadMetadata, UnavailableGuild, UpdatePresence, User, VoiceState,
};
pub use value_objects::{Intents, Permissions, Snowflake, SnowflakeParseError};
