//! Voice state entity
//!
//! The client only tracks voice state; it does not carry media. Joining or
//! leaving a voice channel is expressed by sending a VoiceStateUpdate over
//! the owning shard.

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// A user's voice connection state within a guild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    /// None when the user disconnected from voice
    #[serde(default)]
    pub channel_id: Option<Snowflake>,
    pub user_id: Snowflake,
    pub session_id: String,
    #[serde(default)]
    pub self_mute: bool,
    #[serde(default)]
    pub self_deaf: bool,
}

impl VoiceState {
    /// Check if the user is connected to a voice channel
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.channel_id.is_some()
    }
}
