//! Typed event union
//!
//! Every gateway dispatch decodes into one of these variants after the cache
//! has been mutated. `*_UPDATE` variants carry the pre-mutation value so
//! handlers can diff without racing the cache.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::oneshot;

use chat_core::{
    Channel, Guild, Interaction, Member, Message, Presence, Role, Snowflake, UnavailableGuild,
    User, VoiceState,
};
use chat_gateway::events::{
    GuildMembersChunkData, MessageReactionData, ThreadMembersUpdateData, TypingStartData,
    VoiceServerUpdateData,
};

/// An event plus its delivery context
#[derive(Debug, Clone)]
pub struct GatewayEvent {
    /// Shard that received the event; None for webhook deliveries
    pub shard_id: Option<u32>,
    /// Dispatch sequence; None for client-synthesized lifecycle events
    pub sequence: Option<u64>,
    pub event: Event,
}

/// Typed gateway events
#[derive(Debug, Clone)]
pub enum Event {
    /// Session identified; the cache now holds the self user
    Ready {
        user: User,
        /// Guilds that will arrive as GUILD_CREATE
        guilds: Vec<UnavailableGuild>,
    },
    /// Session resumed with no state loss
    Resumed,
    /// A shard lost its connection
    Disconnected {
        close_code: Option<u16>,
        reconnecting: bool,
    },

    GuildCreate {
        guild: Guild,
    },
    GuildUpdate {
        guild: Guild,
        old: Option<Guild>,
    },
    GuildDelete {
        id: Snowflake,
        /// True for an outage; false means the client actually left
        unavailable: bool,
        guild: Option<Guild>,
    },

    ChannelCreate {
        channel: Channel,
    },
    ChannelUpdate {
        channel: Channel,
        old: Option<Channel>,
    },
    ChannelDelete {
        channel: Channel,
    },

    ThreadCreate {
        channel: Channel,
    },
    ThreadUpdate {
        channel: Channel,
        old: Option<Channel>,
    },
    ThreadDelete {
        id: Snowflake,
        guild_id: Snowflake,
        parent_id: Option<Snowflake>,
        thread: Option<Channel>,
    },
    ThreadMembersUpdate(ThreadMembersUpdateData),

    MessageCreate {
        message: Message,
    },
    MessageUpdate {
        message: Message,
        old: Option<Message>,
    },
    MessageDelete {
        id: Snowflake,
        channel_id: Snowflake,
        guild_id: Option<Snowflake>,
        message: Option<Message>,
    },

    MessageReactionAdd(MessageReactionData),
    MessageReactionRemove(MessageReactionData),

    GuildMemberAdd {
        member: Member,
    },
    GuildMemberUpdate {
        member: Member,
        old: Option<Member>,
    },
    GuildMemberRemove {
        guild_id: Snowflake,
        user: User,
        member: Option<Member>,
    },
    GuildMembersChunk(GuildMembersChunkData),

    GuildRoleCreate {
        guild_id: Snowflake,
        role: Role,
    },
    GuildRoleUpdate {
        guild_id: Snowflake,
        role: Role,
        old: Option<Role>,
    },
    GuildRoleDelete {
        guild_id: Snowflake,
        role_id: Snowflake,
        role: Option<Role>,
    },

    PresenceUpdate {
        presence: Presence,
        old: Option<Presence>,
    },
    TypingStart(TypingStartData),

    UserUpdate {
        user: User,
        old: Option<User>,
    },

    VoiceStateUpdate {
        state: VoiceState,
        old: Option<VoiceState>,
    },
    VoiceServerUpdate(VoiceServerUpdateData),

    InteractionCreate {
        interaction: Interaction,
        /// Present for webhook deliveries; gateway interactions respond
        /// through the REST interaction-callback endpoint instead
        responder: Option<Arc<InteractionResponder>>,
    },
}

impl Event {
    /// Short name for logging
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "Ready",
            Self::Resumed => "Resumed",
            Self::Disconnected { .. } => "Disconnected",
            Self::GuildCreate { .. } => "GuildCreate",
            Self::GuildUpdate { .. } => "GuildUpdate",
            Self::GuildDelete { .. } => "GuildDelete",
            Self::ChannelCreate { .. } => "ChannelCreate",
            Self::ChannelUpdate { .. } => "ChannelUpdate",
            Self::ChannelDelete { .. } => "ChannelDelete",
            Self::ThreadCreate { .. } => "ThreadCreate",
            Self::ThreadUpdate { .. } => "ThreadUpdate",
            Self::ThreadDelete { .. } => "ThreadDelete",
            Self::ThreadMembersUpdate(_) => "ThreadMembersUpdate",
            Self::MessageCreate { .. } => "MessageCreate",
            Self::MessageUpdate { .. } => "MessageUpdate",
            Self::MessageDelete { .. } => "MessageDelete",
            Self::MessageReactionAdd(_) => "MessageReactionAdd",
            Self::MessageReactionRemove(_) => "MessageReactionRemove",
            Self::GuildMemberAdd { .. } => "GuildMemberAdd",
            Self::GuildMemberUpdate { .. } => "GuildMemberUpdate",
            Self::GuildMemberRemove { .. } => "GuildMemberRemove",
            Self::GuildMembersChunk(_) => "GuildMembersChunk",
            Self::GuildRoleCreate { .. } => "GuildRoleCreate",
            Self::GuildRoleUpdate { .. } => "GuildRoleUpdate",
            Self::GuildRoleDelete { .. } => "GuildRoleDelete",
            Self::PresenceUpdate { .. } => "PresenceUpdate",
            Self::TypingStart(_) => "TypingStart",
            Self::UserUpdate { .. } => "UserUpdate",
            Self::VoiceStateUpdate { .. } => "VoiceStateUpdate",
            Self::VoiceServerUpdate(_) => "VoiceServerUpdate",
            Self::InteractionCreate { .. } => "InteractionCreate",
        }
    }
}

/// One-shot reply channel for a webhook interaction
///
/// The first `respond` wins; the HTTP handler sends the value as the
/// response body. Cloneable via Arc so every listener sees the same slot.
#[derive(Debug)]
pub struct InteractionResponder {
    tx: Mutex<Option<oneshot::Sender<Value>>>,
}

impl InteractionResponder {
    #[must_use]
    pub fn new(tx: oneshot::Sender<Value>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
        }
    }

    /// Send the interaction response; returns false if already responded
    /// or the HTTP request timed out
    pub fn respond(&self, response: Value) -> bool {
        let Some(tx) = self.tx.lock().expect("responder lock poisoned").take() else {
            return false;
        };
        tx.send(response).is_ok()
    }
}
