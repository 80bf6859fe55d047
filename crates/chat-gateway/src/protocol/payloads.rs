//! Gateway payload definitions
//!
//! Structures carried in the `d` field of gateway messages the client sends,
//! plus the Hello payload it receives first on every connection.

use chat_core::{Intents, Snowflake, UpdatePresence};
use serde::{Deserialize, Serialize};

/// Payload for op 10 (Hello)
///
/// First frame after the socket opens; carries the heartbeat cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

/// Client connection properties sent with Identify
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

impl IdentifyProperties {
    /// Library name reported to the server
    pub const LIBRARY: &'static str = "chat-client";

    /// Properties for the current process
    #[must_use]
    pub fn current() -> Self {
        Self {
            os: current_os().to_string(),
            browser: Self::LIBRARY.to_string(),
            device: Self::LIBRARY.to_string(),
        }
    }
}

impl Default for IdentifyProperties {
    fn default() -> Self {
        Self::current()
    }
}

/// Simplified operating system name for identify properties
#[must_use]
pub fn current_os() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "darwin"
    } else {
        "linux"
    }
}

/// Payload for op 2 (Identify)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyPayload {
    /// Authentication token
    pub token: String,
    pub properties: IdentifyProperties,
    pub intents: Intents,
    /// `[shard_id, shard_count]`
    pub shard: [u32; 2],
    pub large_threshold: u8,
    #[serde(default)]
    pub compress: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<UpdatePresence>,
}

/// Payload for op 6 (Resume)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumePayload {
    /// Authentication token
    pub token: String,

    /// Session ID to resume
    pub session_id: String,

    /// Last received sequence number
    pub seq: u64,
}

/// Payload for op 8 (Request Guild Members)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestGuildMembersPayload {
    pub guild_id: Snowflake,
    /// Username prefix filter; empty string matches everyone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Maximum members to return for a query request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Specific members to fetch; mutually exclusive with `query`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<Snowflake>>,
    #[serde(default)]
    pub presences: bool,
    /// Correlates GUILD_MEMBERS_CHUNK responses with this request
    pub nonce: String,
}

/// Payload for op 4 (Voice State Update)
///
/// `channel_id: None` disconnects from voice in the guild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceStateUpdatePayload {
    pub guild_id: Snowflake,
    pub channel_id: Option<Snowflake>,
    #[serde(default)]
    pub self_mute: bool,
    #[serde(default)]
    pub self_deaf: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hello_payload() {
        let hello: HelloPayload =
            serde_json::from_str(r#"{"heartbeat_interval":41250}"#).unwrap();
        assert_eq!(hello.heartbeat_interval, 41250);
    }

    #[test]
    fn test_identify_properties_current() {
        let props = IdentifyProperties::current();
        assert!(["windows", "darwin", "linux"].contains(&props.os.as_str()));
        assert_eq!(props.browser, "chat-client");
    }

    #[test]
    fn test_identify_payload_serialization() {
        let payload = IdentifyPayload {
            token: "token123".to_string(),
            properties: IdentifyProperties::current(),
            intents: Intents::GUILDS,
            shard: [0, 1],
            large_threshold: 50,
            compress: false,
            presence: None,
        };

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("token123"));
        assert!(json.contains("\"shard\":[0,1]"));
        assert!(json.contains("\"intents\":1"));
        assert!(!json.contains("presence"));
    }

    #[test]
    fn test_resume_payload_serialization() {
        let payload = ResumePayload {
            token: "token123".to_string(),
            session_id: "session456".to_string(),
            seq: 42,
        };

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("session456"));
        assert!(json.contains("42"));
    }

    #[test]
    fn test_request_members_by_ids() {
        let payload = RequestGuildMembersPayload {
            guild_id: Snowflake::new(1),
            query: None,
            limit: None,
            user_ids: Some(vec![Snowflake::new(2)]),
            presences: false,
            nonce: "abc".to_string(),
        };

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("user_ids"));
        assert!(!json.contains("query"));
    }

    #[test]
    fn test_voice_disconnect_serializes_null_channel() {
        let payload = VoiceStateUpdatePayload {
            guild_id: Snowflake::new(1),
            channel_id: None,
            self_mute: false,
            self_deaf: false,
        };

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"channel_id\":null"));
    }
}
