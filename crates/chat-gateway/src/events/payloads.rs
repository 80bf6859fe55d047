//! Dispatch payload shapes
//!
//! Wire structures for the `d` field of dispatch events whose shape differs
//! from a bare entity.

use chat_core::{
    Channel, ChannelType, Emoji, Guild, Member, Presence, Role, Snowflake, Sticker, ThreadMember,
    UnavailableGuild, User, VoiceState,
};
use serde::{Deserialize, Serialize};

/// READY payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyData {
    /// Gateway protocol version
    pub v: u8,
    /// The authenticated user
    pub user: User,
    /// Server-issued session id, required for Resume
    pub session_id: String,
    /// Preferred URL for resuming this session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_gateway_url: Option<String>,
    /// Guilds the session will receive GUILD_CREATE for
    #[serde(default)]
    pub guilds: Vec<UnavailableGuild>,
    /// `[shard_id, shard_count]` echoed back
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard: Option<[u32; 2]>,
}

/// GUILD_CREATE payload: the guild plus its initial entity snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildCreateData {
    #[serde(flatten)]
    pub guild: Guild,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub presences: Vec<Presence>,
    #[serde(default)]
    pub voice_states: Vec<VoiceState>,
    #[serde(default)]
    pub emojis: Vec<Emoji>,
    #[serde(default)]
    pub stickers: Vec<Sticker>,
    /// Active threads the session can see
    #[serde(default)]
    pub threads: Vec<Channel>,
}

/// GUILD_DELETE payload
///
/// `unavailable == true` means an outage, not removal; only a false flag
/// triggers cache eviction.
pub type GuildDeleteData = UnavailableGuild;

/// MESSAGE_DELETE payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDeleteData {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
}

/// GUILD_MEMBER_REMOVE payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildMemberRemoveData {
    pub guild_id: Snowflake,
    pub user: User,
}

/// GUILD_MEMBERS_CHUNK payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildMembersChunkData {
    pub guild_id: Snowflake,
    #[serde(default)]
    pub members: Vec<Member>,
    pub chunk_index: u32,
    pub chunk_count: u32,
    #[serde(default)]
    pub not_found: Vec<Snowflake>,
    #[serde(default)]
    pub presences: Vec<Presence>,
    /// Echo of the requesting nonce
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl GuildMembersChunkData {
    /// Check if this is the final chunk of its request
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.chunk_index + 1 >= self.chunk_count
    }
}

/// GUILD_ROLE_CREATE / GUILD_ROLE_UPDATE payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildRoleData {
    pub guild_id: Snowflake,
    pub role: Role,
}

/// GUILD_ROLE_DELETE payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildRoleDeleteData {
    pub guild_id: Snowflake,
    pub role_id: Snowflake,
}

/// THREAD_DELETE payload
///
/// Only the ids survive; the full channel is gone server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadDeleteData {
    pub id: Snowflake,
    pub guild_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Snowflake>,
    #[serde(rename = "type")]
    pub kind: ChannelType,
}

/// THREAD_MEMBERS_UPDATE payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMembersUpdateData {
    /// Thread id
    pub id: Snowflake,
    pub guild_id: Snowflake,
    /// Approximate member count, capped by the server
    #[serde(default)]
    pub member_count: u32,
    #[serde(default)]
    pub added_members: Vec<ThreadMember>,
    #[serde(default)]
    pub removed_member_ids: Vec<Snowflake>,
}

/// MESSAGE_REACTION_ADD / MESSAGE_REACTION_REMOVE payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReactionData {
    pub user_id: Snowflake,
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub emoji: Emoji,
}

/// TYPING_START payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingStartData {
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub user_id: Snowflake,
    /// Unix seconds
    pub timestamp: u64,
}

/// VOICE_SERVER_UPDATE payload
///
/// Forwarded verbatim; the client does not open media connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceServerUpdateData {
    pub token: String,
    pub guild_id: Snowflake,
    #[serde(default)]
    pub endpoint: Option<String>,
}
