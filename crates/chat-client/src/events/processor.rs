//! Event processor
//!
//! Turns raw dispatch frames into typed events. For each frame, in order:
//! decode, apply the cache mutation, snapshot the pre-mutation value for
//! `*_UPDATE` events, tap the chunk coordinator, and hand the typed event
//! back for listener fan-out. Runs strictly in receive order per shard.

use std::sync::Arc;

use serde_json::Value;

use chat_cache::Caches;
use chat_core::{Channel, Guild, Interaction, Member, Message, Presence, Role, User, VoiceState};
use chat_gateway::chunking::MemberChunkCoordinator;
use chat_gateway::events::{
    GuildCreateData, GuildDeleteData, GuildMemberRemoveData, GuildMembersChunkData, GuildRoleData,
    GuildRoleDeleteData, MessageDeleteData, MessageReactionData, ReadyData, ThreadDeleteData,
    ThreadMembersUpdateData, TypingStartData, VoiceServerUpdateData,
};
use chat_gateway::EventType;

use crate::events::{Event, GatewayEvent};

/// Decodes dispatches and drives cache mutations before listeners run
#[derive(Debug)]
pub struct EventProcessor {
    caches: Arc<Caches>,
    chunking: Arc<MemberChunkCoordinator>,
}

impl EventProcessor {
    #[must_use]
    pub fn new(caches: Arc<Caches>, chunking: Arc<MemberChunkCoordinator>) -> Self {
        Self { caches, chunking }
    }

    /// Process one dispatch frame; None for unknown or undecodable events
    pub fn process(
        &self,
        shard_id: u32,
        name: &str,
        sequence: u64,
        data: Value,
    ) -> Option<GatewayEvent> {
        let Some(event_type) = EventType::parse(name) else {
            tracing::debug!(event = name, "Skipping unknown dispatch event");
            return None;
        };

        let event = match self.apply(event_type, data) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(
                    event = name,
                    error = %err,
                    "Failed to decode dispatch payload"
                );
                return None;
            }
        };

        Some(GatewayEvent {
            shard_id: Some(shard_id),
            sequence: Some(sequence),
            event,
        })
    }

    /// Decode the payload and apply its cache mutation
    fn apply(&self, event_type: EventType, data: Value) -> Result<Event, serde_json::Error> {
        let caches = &self.caches;

        let event = match event_type {
            EventType::Ready => {
                let ready: ReadyData = serde_json::from_value(data)?;
                caches.set_self_user(ready.user.clone());
                caches.users().insert(ready.user.id, ready.user.clone());
                Event::Ready {
                    user: ready.user,
                    guilds: ready.guilds,
                }
            }
            EventType::Resumed => Event::Resumed,

            EventType::GuildCreate => {
                let create: GuildCreateData = serde_json::from_value(data)?;
                let guild_id = create.guild.id;
                caches.guilds().insert(guild_id, create.guild.clone());

                for mut channel in create.channels {
                    channel.guild_id.get_or_insert(guild_id);
                    caches.channels().insert(channel.id, channel);
                }
                for mut role in create.roles {
                    role.guild_id.get_or_insert(guild_id);
                    caches.roles().insert(guild_id, role.id, role);
                }
                for mut member in create.members {
                    member.guild_id.get_or_insert(guild_id);
                    caches.users().insert(member.user.id, member.user.clone());
                    caches.members().insert(guild_id, member.user.id, member);
                }
                for presence in create.presences {
                    caches.presences().insert(guild_id, presence.user.id, presence);
                }
                for voice_state in create.voice_states {
                    caches
                        .voice_states()
                        .insert(guild_id, voice_state.user_id, voice_state);
                }
                for emoji in create.emojis {
                    if let Some(id) = emoji.id {
                        caches.emojis().insert(guild_id, id, emoji);
                    }
                }
                for sticker in create.stickers {
                    caches.stickers().insert(guild_id, sticker.id, sticker);
                }
                for mut thread in create.threads {
                    thread.guild_id.get_or_insert(guild_id);
                    caches.channels().insert(thread.id, thread);
                }

                Event::GuildCreate {
                    guild: create.guild,
                }
            }
            EventType::GuildUpdate => {
                let guild: Guild = serde_json::from_value(data)?;
                let old = caches.guilds().insert(guild.id, guild.clone());
                Event::GuildUpdate { guild, old }
            }
            EventType::GuildDelete => {
                let delete: GuildDeleteData = serde_json::from_value(data)?;
                let guild = caches.guilds().get(delete.id);
                if !delete.unavailable {
                    caches.evict_guild(delete.id);
                }
                Event::GuildDelete {
                    id: delete.id,
                    unavailable: delete.unavailable,
                    guild,
                }
            }

            EventType::ChannelCreate => {
                let channel: Channel = serde_json::from_value(data)?;
                caches.channels().insert(channel.id, channel.clone());
                Event::ChannelCreate { channel }
            }
            EventType::ChannelUpdate => {
                let channel: Channel = serde_json::from_value(data)?;
                let old = caches.channels().insert(channel.id, channel.clone());
                Event::ChannelUpdate { channel, old }
            }
            EventType::ChannelDelete => {
                let channel: Channel = serde_json::from_value(data)?;
                caches.channels().remove(channel.id);
                caches.messages().remove_group(channel.id);
                Event::ChannelDelete { channel }
            }

            EventType::ThreadCreate => {
                let channel: Channel = serde_json::from_value(data)?;
                caches.channels().insert(channel.id, channel.clone());
                Event::ThreadCreate { channel }
            }
            EventType::ThreadUpdate => {
                let channel: Channel = serde_json::from_value(data)?;
                let old = caches.channels().insert(channel.id, channel.clone());
                Event::ThreadUpdate { channel, old }
            }
            EventType::ThreadDelete => {
                let delete: ThreadDeleteData = serde_json::from_value(data)?;
                let thread = caches.channels().remove(delete.id);
                caches.messages().remove_group(delete.id);
                caches.thread_members().remove_group(delete.id);
                Event::ThreadDelete {
                    id: delete.id,
                    guild_id: delete.guild_id,
                    parent_id: delete.parent_id,
                    thread,
                }
            }
            EventType::ThreadMembersUpdate => {
                let update: ThreadMembersUpdateData = serde_json::from_value(data)?;
                for member in &update.added_members {
                    let mut member = member.clone();
                    member.id.get_or_insert(update.id);
                    let Some(user_id) = member.user_id else {
                        continue;
                    };
                    caches.thread_members().insert(update.id, user_id, member);
                }
                for &user_id in &update.removed_member_ids {
                    caches.thread_members().remove(update.id, user_id);
                }
                Event::ThreadMembersUpdate(update)
            }

            EventType::MessageCreate => {
                let message: Message = serde_json::from_value(data)?;
                caches.users().insert(message.author.id, message.author.clone());
                caches
                    .messages()
                    .insert(message.channel_id, message.id, message.clone());
                Event::MessageCreate { message }
            }
            EventType::MessageUpdate => {
                let message: Message = serde_json::from_value(data)?;
                let old = caches
                    .messages()
                    .insert(message.channel_id, message.id, message.clone());
                Event::MessageUpdate { message, old }
            }
            EventType::MessageDelete => {
                let delete: MessageDeleteData = serde_json::from_value(data)?;
                let message = caches.messages().remove(delete.channel_id, delete.id);
                Event::MessageDelete {
                    id: delete.id,
                    channel_id: delete.channel_id,
                    guild_id: delete.guild_id,
                    message,
                }
            }

            EventType::MessageReactionAdd => {
                let reaction: MessageReactionData = serde_json::from_value(data)?;
                Event::MessageReactionAdd(reaction)
            }
            EventType::MessageReactionRemove => {
                let reaction: MessageReactionData = serde_json::from_value(data)?;
                Event::MessageReactionRemove(reaction)
            }

            EventType::GuildMemberAdd => {
                let member: Member = serde_json::from_value(data)?;
                self.cache_member(&member);
                Event::GuildMemberAdd { member }
            }
            EventType::GuildMemberUpdate => {
                let member: Member = serde_json::from_value(data)?;
                let old = self.cache_member(&member);
                Event::GuildMemberUpdate { member, old }
            }
            EventType::GuildMemberRemove => {
                let remove: GuildMemberRemoveData = serde_json::from_value(data)?;
                let member = caches.members().remove(remove.guild_id, remove.user.id);
                Event::GuildMemberRemove {
                    guild_id: remove.guild_id,
                    user: remove.user,
                    member,
                }
            }
            EventType::GuildMembersChunk => {
                let chunk: GuildMembersChunkData = serde_json::from_value(data)?;
                for member in &chunk.members {
                    let mut member = member.clone();
                    member.guild_id.get_or_insert(chunk.guild_id);
                    caches.users().insert(member.user.id, member.user.clone());
                    caches.members().insert(chunk.guild_id, member.user.id, member);
                }
                for presence in &chunk.presences {
                    caches
                        .presences()
                        .insert(chunk.guild_id, presence.user.id, presence.clone());
                }
                self.chunking.handle_chunk(&chunk);
                Event::GuildMembersChunk(chunk)
            }

            EventType::GuildRoleCreate => {
                let data: GuildRoleData = serde_json::from_value(data)?;
                let mut role = data.role;
                role.guild_id.get_or_insert(data.guild_id);
                caches.roles().insert(data.guild_id, role.id, role.clone());
                Event::GuildRoleCreate {
                    guild_id: data.guild_id,
                    role,
                }
            }
            EventType::GuildRoleUpdate => {
                let data: GuildRoleData = serde_json::from_value(data)?;
                let mut role = data.role;
                role.guild_id.get_or_insert(data.guild_id);
                let old = caches.roles().insert(data.guild_id, role.id, role.clone());
                Event::GuildRoleUpdate {
                    guild_id: data.guild_id,
                    role,
                    old,
                }
            }
            EventType::GuildRoleDelete => {
                let data: GuildRoleDeleteData = serde_json::from_value(data)?;
                let role = caches.roles().remove(data.guild_id, data.role_id);
                Event::GuildRoleDelete {
                    guild_id: data.guild_id,
                    role_id: data.role_id,
                    role,
                }
            }

            EventType::PresenceUpdate => {
                let presence: Presence = serde_json::from_value(data)?;
                let old = presence.guild_id.and_then(|guild_id| {
                    caches
                        .presences()
                        .insert(guild_id, presence.user.id, presence.clone())
                });
                Event::PresenceUpdate { presence, old }
            }
            EventType::TypingStart => {
                let typing: TypingStartData = serde_json::from_value(data)?;
                Event::TypingStart(typing)
            }

            EventType::UserUpdate => {
                let user: User = serde_json::from_value(data)?;
                let old = caches.users().insert(user.id, user.clone());
                caches.set_self_user(user.clone());
                Event::UserUpdate { user, old }
            }

            EventType::VoiceStateUpdate => {
                let state: VoiceState = serde_json::from_value(data)?;
                let old = match (state.guild_id, state.channel_id) {
                    (Some(guild_id), Some(_)) => caches
                        .voice_states()
                        .insert(guild_id, state.user_id, state.clone()),
                    (Some(guild_id), None) => {
                        // Disconnected from voice: drop the cached state.
                        caches.voice_states().remove(guild_id, state.user_id)
                    }
                    (None, _) => None,
                };
                Event::VoiceStateUpdate { state, old }
            }
            EventType::VoiceServerUpdate => {
                let update: VoiceServerUpdateData = serde_json::from_value(data)?;
                Event::VoiceServerUpdate(update)
            }

            EventType::InteractionCreate => {
                let interaction: Interaction = serde_json::from_value(data)?;
                Event::InteractionCreate {
                    interaction,
                    responder: None,
                }
            }
        };

        Ok(event)
    }

    /// Insert a member (and its user) keyed by the member's own guild id
    fn cache_member(&self, member: &Member) -> Option<Member> {
        let guild_id = member.guild_id?;
        self.caches
            .users()
            .insert(member.user.id, member.user.clone());
        self.caches
            .members()
            .insert(guild_id, member.user.id, member.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_cache::CacheConfig;
    use chat_core::Snowflake;
    use serde_json::json;

    fn processor() -> EventProcessor {
        EventProcessor::new(
            Arc::new(Caches::new(CacheConfig::default())),
            Arc::new(MemberChunkCoordinator::default()),
        )
    }

    fn guild_create(guild_id: u64) -> Value {
        json!({
            "id": guild_id.to_string(),
            "name": "lounge",
            "owner_id": "7",
            "large": false,
            "channels": [{"id": "200", "type": 0}],
            "roles": [{"id": guild_id.to_string(), "name": "@everyone", "permissions": "7"}],
            "members": [{
                "user": {"id": "9", "username": "quokka"},
                "joined_at": "2024-01-01T00:00:00Z"
            }]
        })
    }

    #[test]
    fn test_ready_populates_self_user() {
        let processor = processor();
        let event = processor
            .process(
                0,
                "READY",
                1,
                json!({
                    "v": 10,
                    "user": {"id": "1", "username": "bot", "bot": true},
                    "session_id": "abc",
                    "guilds": [{"id": "100", "unavailable": true}]
                }),
            )
            .unwrap();

        assert_eq!(event.sequence, Some(1));
        assert!(matches!(event.event, Event::Ready { .. }));
        assert_eq!(
            processor.caches.self_user().unwrap().id,
            Snowflake::new(1)
        );
    }

    #[test]
    fn test_guild_create_populates_entity_caches() {
        let processor = processor();
        processor.process(0, "GUILD_CREATE", 2, guild_create(100)).unwrap();

        let caches = &processor.caches;
        assert!(caches.guilds().get(Snowflake::new(100)).is_some());

        // Nested entities get the surrounding guild id filled in.
        let channel = caches.channels().get(Snowflake::new(200)).unwrap();
        assert_eq!(channel.guild_id, Some(Snowflake::new(100)));
        let member = caches
            .members()
            .get(Snowflake::new(100), Snowflake::new(9))
            .unwrap();
        assert_eq!(member.guild_id, Some(Snowflake::new(100)));
        assert!(caches.users().get(Snowflake::new(9)).is_some());
    }

    #[test]
    fn test_message_update_snapshots_old_value() {
        let processor = processor();
        let original = json!({
            "id": "33",
            "channel_id": "200",
            "author": {"id": "9", "username": "quokka"},
            "content": "first",
            "timestamp": "2024-06-01T12:00:00Z"
        });
        processor.process(0, "MESSAGE_CREATE", 3, original).unwrap();

        let edited = json!({
            "id": "33",
            "channel_id": "200",
            "author": {"id": "9", "username": "quokka"},
            "content": "second",
            "timestamp": "2024-06-01T12:00:00Z",
            "edited_timestamp": "2024-06-01T12:05:00Z"
        });
        let event = processor.process(0, "MESSAGE_UPDATE", 4, edited).unwrap();

        match event.event {
            Event::MessageUpdate { message, old } => {
                assert_eq!(message.content, "second");
                // Old is the value exactly as cached before this event.
                assert_eq!(old.unwrap().content, "first");
            }
            other => panic!("expected MessageUpdate, got {}", other.name()),
        }

        // The cache already reflects the new value when handlers run.
        let cached = processor
            .caches
            .messages()
            .get(Snowflake::new(200), Snowflake::new(33))
            .unwrap();
        assert_eq!(cached.content, "second");
    }

    #[test]
    fn test_guild_delete_eviction_vs_outage() {
        let processor = processor();
        processor.process(0, "GUILD_CREATE", 1, guild_create(100)).unwrap();

        // Outage: caches stay.
        processor
            .process(0, "GUILD_DELETE", 2, json!({"id": "100", "unavailable": true}))
            .unwrap();
        assert!(processor.caches.guilds().get(Snowflake::new(100)).is_some());

        // Actual removal: cascade eviction.
        processor
            .process(0, "GUILD_DELETE", 3, json!({"id": "100", "unavailable": false}))
            .unwrap();
        assert!(processor.caches.guilds().get(Snowflake::new(100)).is_none());
        assert!(processor.caches.channels().get(Snowflake::new(200)).is_none());
        assert!(processor
            .caches
            .members()
            .get(Snowflake::new(100), Snowflake::new(9))
            .is_none());
    }

    #[test]
    fn test_thread_lifecycle() {
        let processor = processor();

        let event = processor
            .process(
                0,
                "THREAD_CREATE",
                1,
                json!({
                    "id": "500",
                    "type": 11,
                    "guild_id": "100",
                    "parent_id": "200",
                    "name": "help-me",
                    "thread_metadata": {"archived": false, "auto_archive_duration": 1440}
                }),
            )
            .unwrap();
        assert!(matches!(event.event, Event::ThreadCreate { .. }));
        assert!(processor.caches.channels().get(Snowflake::new(500)).is_some());

        processor
            .process(
                0,
                "THREAD_MEMBERS_UPDATE",
                2,
                json!({
                    "id": "500",
                    "guild_id": "100",
                    "member_count": 1,
                    "added_members": [
                        {"user_id": "9", "join_timestamp": "2024-06-01T12:00:00Z"}
                    ]
                }),
            )
            .unwrap();
        let cached = processor
            .caches
            .thread_members()
            .get(Snowflake::new(500), Snowflake::new(9))
            .unwrap();
        // The thread id gets filled in from the surrounding event.
        assert_eq!(cached.id, Some(Snowflake::new(500)));

        let event = processor
            .process(
                0,
                "THREAD_DELETE",
                3,
                json!({"id": "500", "guild_id": "100", "parent_id": "200", "type": 11}),
            )
            .unwrap();
        match event.event {
            Event::ThreadDelete { thread, .. } => {
                assert_eq!(thread.unwrap().name.as_deref(), Some("help-me"));
            }
            other => panic!("expected ThreadDelete, got {}", other.name()),
        }
        assert!(processor.caches.channels().get(Snowflake::new(500)).is_none());
        assert!(processor
            .caches
            .thread_members()
            .get(Snowflake::new(500), Snowflake::new(9))
            .is_none());
    }

    #[test]
    fn test_thread_members_update_removals() {
        let processor = processor();
        processor
            .process(
                0,
                "THREAD_MEMBERS_UPDATE",
                1,
                json!({
                    "id": "500",
                    "guild_id": "100",
                    "member_count": 1,
                    "added_members": [
                        {"user_id": "9", "join_timestamp": "2024-06-01T12:00:00Z"}
                    ]
                }),
            )
            .unwrap();

        processor
            .process(
                0,
                "THREAD_MEMBERS_UPDATE",
                2,
                json!({
                    "id": "500",
                    "guild_id": "100",
                    "member_count": 0,
                    "removed_member_ids": ["9"]
                }),
            )
            .unwrap();
        assert!(processor
            .caches
            .thread_members()
            .get(Snowflake::new(500), Snowflake::new(9))
            .is_none());
    }

    #[test]
    fn test_voice_disconnect_removes_state() {
        let processor = processor();
        processor
            .process(
                0,
                "VOICE_STATE_UPDATE",
                1,
                json!({"guild_id": "1", "channel_id": "2", "user_id": "9", "session_id": "s"}),
            )
            .unwrap();
        assert!(processor
            .caches
            .voice_states()
            .get(Snowflake::new(1), Snowflake::new(9))
            .is_some());

        let event = processor
            .process(
                0,
                "VOICE_STATE_UPDATE",
                2,
                json!({"guild_id": "1", "channel_id": null, "user_id": "9", "session_id": "s"}),
            )
            .unwrap();

        assert!(processor
            .caches
            .voice_states()
            .get(Snowflake::new(1), Snowflake::new(9))
            .is_none());
        match event.event {
            Event::VoiceStateUpdate { old, .. } => {
                assert_eq!(old.unwrap().channel_id, Some(Snowflake::new(2)));
            }
            other => panic!("expected VoiceStateUpdate, got {}", other.name()),
        }
    }

    #[test]
    fn test_unknown_event_skipped() {
        let processor = processor();
        assert!(processor.process(0, "NOT_AN_EVENT", 1, json!({})).is_none());
    }

    #[test]
    fn test_undecodable_payload_skipped() {
        let processor = processor();
        assert!(processor
            .process(0, "MESSAGE_CREATE", 1, json!({"id": "missing fields"}))
            .is_none());
    }
}
