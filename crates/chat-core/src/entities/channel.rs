//! Channel entity - text, voice, DM, category, announcement, or thread
//!
//! Channels are a tagged union on the wire: the numeric `type` field decides
//! which optional fields are meaningful. A DM channel always carries
//! `ChannelType::Dm`; threads carry one of the three thread tags plus
//! [`ThreadMetadata`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::value_objects::{Permissions, Snowflake};

/// Channel type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ChannelType {
    /// Guild text channel
    #[default]
    GuildText = 0,
    /// Direct message between users
    Dm = 1,
    /// Guild voice channel
    GuildVoice = 2,
    /// Group direct message
    GroupDm = 3,
    /// Guild category for organizing channels
    GuildCategory = 4,
    /// Guild announcement channel
    GuildNews = 5,
    /// Thread under an announcement channel
    GuildNewsThread = 10,
    /// Public thread under a text channel
    GuildPublicThread = 11,
    /// Private thread under a text channel
    GuildPrivateThread = 12,
}

impl ChannelType {
    /// Create a `ChannelType` from a raw integer value
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::GuildText),
            1 => Some(Self::Dm),
            2 => Some(Self::GuildVoice),
            3 => Some(Self::GroupDm),
            4 => Some(Self::GuildCategory),
            5 => Some(Self::GuildNews),
            10 => Some(Self::GuildNewsThread),
            11 => Some(Self::GuildPublicThread),
            12 => Some(Self::GuildPrivateThread),
            _ => None,
        }
    }

    /// Get the raw integer value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if this channel type is a thread
    #[must_use]
    pub const fn is_thread(self) -> bool {
        matches!(
            self,
            Self::GuildNewsThread | Self::GuildPublicThread | Self::GuildPrivateThread
        )
    }

    /// Check if this channel type lives inside a guild
    #[must_use]
    pub const fn is_guild(self) -> bool {
        matches!(
            self,
            Self::GuildText | Self::GuildVoice | Self::GuildCategory | Self::GuildNews
        ) || self.is_thread()
    }

    /// Check if messages can be sent to this channel type
    #[must_use]
    pub const fn is_messageable(self) -> bool {
        matches!(self, Self::GuildText | Self::Dm | Self::GroupDm | Self::GuildNews)
            || self.is_thread()
    }
}

impl Serialize for ChannelType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for ChannelType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Self::from_u8(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid channel type: {value}")))
    }
}

/// Target of a permission overwrite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OverwriteType {
    Role = 0,
    Member = 1,
}

impl Serialize for OverwriteType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for OverwriteType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match u8::deserialize(deserializer)? {
            0 => Ok(Self::Role),
            1 => Ok(Self::Member),
            other => Err(serde::de::Error::custom(format!(
                "invalid overwrite type: {other}"
            ))),
        }
    }
}

/// Per-role or per-member permission overwrite on a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOverwrite {
    pub id: Snowflake,
    #[serde(rename = "type")]
    pub kind: OverwriteType,
    pub allow: Permissions,
    pub deny: Permissions,
}

/// Thread lifecycle state, present only on thread channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMetadata {
    #[serde(default)]
    pub archived: bool,
    /// Minutes of inactivity before auto-archival (60, 1440, 4320, 10080)
    #[serde(default)]
    pub auto_archive_duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub invitable: bool,
}

/// A user's membership in a thread, keyed by (thread, user)
///
/// The wire omits `id`/`user_id` in some contexts (e.g. the current user's
/// entry inside THREAD_CREATE); the client fills them from the surrounding
/// event before caching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMember {
    /// Thread id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Snowflake>,
    pub join_timestamp: DateTime<Utc>,
}

/// Channel entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Snowflake,
    #[serde(rename = "type")]
    pub kind: ChannelType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permission_overwrites: Vec<PermissionOverwrite>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_id: Option<Snowflake>,
    /// Thread creator, present on thread channels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Snowflake>,
    /// Present exactly when `kind.is_thread()`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_metadata: Option<ThreadMetadata>,
}

impl Channel {
    /// Find the overwrite targeting a specific role
    #[must_use]
    pub fn role_overwrite(&self, role_id: Snowflake) -> Option<&PermissionOverwrite> {
        self.permission_overwrites
            .iter()
            .find(|o| o.kind == OverwriteType::Role && o.id == role_id)
    }

    /// Find the overwrite targeting a specific member
    #[must_use]
    pub fn member_overwrite(&self, user_id: Snowflake) -> Option<&PermissionOverwrite> {
        self.permission_overwrites
            .iter()
            .find(|o| o.kind == OverwriteType::Member && o.id == user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_type_from_u8() {
        assert_eq!(ChannelType::from_u8(0), Some(ChannelType::GuildText));
        assert_eq!(ChannelType::from_u8(1), Some(ChannelType::Dm));
        assert_eq!(ChannelType::from_u8(2), Some(ChannelType::GuildVoice));
        assert_eq!(ChannelType::from_u8(5), Some(ChannelType::GuildNews));
        assert_eq!(ChannelType::from_u8(11), Some(ChannelType::GuildPublicThread));
        assert_eq!(ChannelType::from_u8(6), None);
        assert_eq!(ChannelType::from_u8(99), None);
    }

    #[test]
    fn test_thread_types() {
        for kind in [
            ChannelType::GuildNewsThread,
            ChannelType::GuildPublicThread,
            ChannelType::GuildPrivateThread,
        ] {
            assert!(kind.is_thread());
            assert!(kind.is_guild());
            assert!(kind.is_messageable());
        }
        assert!(!ChannelType::GuildText.is_thread());
        assert!(!ChannelType::Dm.is_thread());
    }

    #[test]
    fn test_thread_channel_deserialize() {
        let json = r#"{
            "id": "500",
            "type": 11,
            "guild_id": "100",
            "parent_id": "200",
            "name": "help-me",
            "owner_id": "9",
            "thread_metadata": {
                "archived": false,
                "auto_archive_duration": 1440,
                "locked": false,
                "invitable": true
            }
        }"#;
        let thread: Channel = serde_json::from_str(json).unwrap();
        assert_eq!(thread.kind, ChannelType::GuildPublicThread);
        assert_eq!(thread.parent_id, Some(Snowflake::new(200)));
        assert_eq!(thread.owner_id, Some(Snowflake::new(9)));

        let metadata = thread.thread_metadata.unwrap();
        assert!(!metadata.archived);
        assert_eq!(metadata.auto_archive_duration, 1440);
        assert!(metadata.invitable);
    }

    #[test]
    fn test_dm_channel_carries_dm_tag() {
        let channel: Channel = serde_json::from_str(r#"{"id":"7","type":1}"#).unwrap();
        assert_eq!(channel.kind, ChannelType::Dm);
        assert!(!channel.kind.is_guild());
        assert!(channel.kind.is_messageable());
    }

    #[test]
    fn test_channel_type_serializes_as_number() {
        let json = serde_json::to_string(&ChannelType::GuildVoice).unwrap();
        assert_eq!(json, "2");
    }

    #[test]
    fn test_overwrite_lookup() {
        let channel = Channel {
            id: Snowflake::new(1),
            kind: ChannelType::GuildText,
            guild_id: Some(Snowflake::new(10)),
            name: Some("general".to_string()),
            topic: None,
            position: Some(0),
            parent_id: None,
            permission_overwrites: vec![
                PermissionOverwrite {
                    id: Snowflake::new(10),
                    kind: OverwriteType::Role,
                    allow: Permissions::VIEW_CHANNEL,
                    deny: Permissions::empty(),
                },
                PermissionOverwrite {
                    id: Snowflake::new(99),
                    kind: OverwriteType::Member,
                    allow: Permissions::empty(),
                    deny: Permissions::SEND_MESSAGES,
                },
            ],
            last_message_id: None,
            owner_id: None,
            thread_metadata: None,
        };

        assert!(channel.role_overwrite(Snowflake::new(10)).is_some());
        assert!(channel.role_overwrite(Snowflake::new(99)).is_none());
        assert!(channel.member_overwrite(Snowflake::new(99)).is_some());
    }

    #[test]
    fn test_overwrite_roundtrip() {
        let overwrite = PermissionOverwrite {
            id: Snowflake::new(5),
            kind: OverwriteType::Member,
            allow: Permissions::SEND_MESSAGES,
            deny: Permissions::VIEW_CHANNEL,
        };
        let json = serde_json::to_string(&overwrite).unwrap();
        assert!(json.contains("\"type\":1"));

        let parsed: PermissionOverwrite = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, overwrite);
    }
}
