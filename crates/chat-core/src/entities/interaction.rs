//! Interaction entity - a user-initiated RPC
//!
//! Interactions arrive either as gateway INTERACTION_CREATE dispatches or as
//! signed webhook deliveries. The command/component payload under `data` is
//! schema-rich and application-specific, so it stays an opaque JSON value.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::entities::{Member, User};
use crate::value_objects::Snowflake;

/// Interaction type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InteractionType {
    /// Webhook liveness check; answered synchronously with Pong
    Ping = 1,
    /// Slash command invocation
    ApplicationCommand = 2,
    /// Button press or select menu choice
    MessageComponent = 3,
    /// Autocomplete query while typing a command
    Autocomplete = 4,
    /// Modal form submission
    ModalSubmit = 5,
}

impl InteractionType {
    /// Create an `InteractionType` from a raw integer value
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Ping),
            2 => Some(Self::ApplicationCommand),
            3 => Some(Self::MessageComponent),
            4 => Some(Self::Autocomplete),
            5 => Some(Self::ModalSubmit),
            _ => None,
        }
    }

    /// Get the raw integer value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl Serialize for InteractionType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for InteractionType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Self::from_u8(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid interaction type: {value}")))
    }
}

/// Interaction entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Snowflake,
    pub application_id: Snowflake,
    #[serde(rename = "type")]
    pub kind: InteractionType,
    /// Single-use token for responding to this interaction
    #[serde(default)]
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<Snowflake>,
    /// Present for guild interactions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<Member>,
    /// Present for DM interactions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// Command/component payload, application-specific
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Interaction {
    /// The invoking user, wherever the interaction came from
    #[must_use]
    pub fn author(&self) -> Option<&User> {
        self.user.as_ref().or_else(|| self.member.as_ref().map(|m| &m.user))
    }
}
