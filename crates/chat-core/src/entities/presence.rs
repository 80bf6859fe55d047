//! Presence entity - a user's online status and activities in a guild

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Online status values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OnlineStatus {
    Online,
    Idle,
    Dnd,
    #[default]
    Offline,
    /// Only ever sent by the client, never received
    Invisible,
}

/// An activity shown under a user's name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    /// Raw activity type (0 = playing, 1 = streaming, ...)
    #[serde(rename = "type", default)]
    pub kind: u8,
}

/// Partial user reference carried inside presence payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUser {
    pub id: Snowflake,
}

/// Outbound presence, sent with Identify or as a PresenceUpdate command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UpdatePresence {
    /// Unix millis since the client went idle
    #[serde(default)]
    pub since: Option<u64>,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub status: OnlineStatus,
    #[serde(default)]
    pub afk: bool,
}

/// Presence entity, keyed by (guild, user)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    pub user: PresenceUser,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub status: OnlineStatus,
    #[serde(default)]
    pub activities: Vec<Activity>,
}
