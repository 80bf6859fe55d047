//! Gateway dispatch events
//!
//! Event names and the payload shapes that differ from bare entities.

mod event_types;
mod payloads;

pub use event_types::EventType;
pub use payloads::{
    GuildCreateData, GuildDeleteData, GuildMemberRemoveData, GuildMembersChunkData, GuildRoleData,
    GuildRoleDeleteData, MessageDeleteData, MessageReactionData, ReadyData, ThreadDeleteData,
    ThreadMembersUpdateData, TypingStartData, VoiceServerUpdateData,
};
