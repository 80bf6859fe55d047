//! Gateway stream replay tests
//!
//! Replays captured session streams through the event pipeline and checks
//! the terminal cache state, sequence bookkeeping, and derived old-value
//! snapshots.

use chat_core::{Permissions, Snowflake};
use integration::fixtures;
use integration::helpers::Pipeline;

use chat_client::Event;

#[tokio::test]
async fn test_fresh_session_terminal_cache_state() {
    let pipeline = Pipeline::new();
    pipeline.replay(&fixtures::fresh_session()).await;

    let caches = &pipeline.caches;

    // Self user from READY.
    assert_eq!(caches.self_user().unwrap().id, Snowflake::new(1));

    // Guild snapshot from GUILD_CREATE.
    let guild = caches.guilds().get(Snowflake::new(100)).unwrap();
    assert_eq!(guild.name, "lounge");
    assert!(caches.channels().get(Snowflake::new(200)).is_some());
    assert!(caches.channels().get(Snowflake::new(201)).is_some());
    assert_eq!(caches.roles().group_values(Snowflake::new(100)).len(), 2);

    // The active thread arrived with GUILD_CREATE, its member separately.
    let thread = caches.channels().get(Snowflake::new(500)).unwrap();
    assert!(thread.kind.is_thread());
    assert_eq!(thread.guild_id, Some(Snowflake::new(100)));
    assert!(caches
        .thread_members()
        .get(Snowflake::new(500), Snowflake::new(9))
        .is_some());

    // GUILD_MEMBER_ADD added a third member.
    assert_eq!(caches.members().group_values(Snowflake::new(100)).len(), 3);

    // Message 400 was deleted, 401 survives with its created content.
    assert!(caches
        .messages()
        .get(Snowflake::new(200), Snowflake::new(400))
        .is_none());
    let survivor = caches
        .messages()
        .get(Snowflake::new(200), Snowflake::new(401))
        .unwrap();
    assert_eq!(survivor.content, "second");

    // The role update replaced the cached role.
    let role = caches
        .roles()
        .get(Snowflake::new(100), Snowflake::new(110))
        .unwrap();
    assert_eq!(role.name, "moderators");

    // The voice disconnect removed the cached state.
    assert!(caches
        .voice_states()
        .get(Snowflake::new(100), Snowflake::new(9))
        .is_none());
}

#[tokio::test]
async fn test_replay_is_deterministic() {
    // The same stream replayed into two fresh pipelines lands on identical
    // terminal state, independent of any handler scheduling.
    let first = Pipeline::new();
    let second = Pipeline::new();
    first.replay(&fixtures::fresh_session()).await;
    second.replay(&fixtures::fresh_session()).await;

    for caches in [&first.caches, &second.caches] {
        assert_eq!(caches.guilds().len(), 1);
        assert_eq!(caches.channels().len(), 3);
        assert_eq!(caches.messages().len(), 1);
        assert_eq!(caches.members().group_values(Snowflake::new(100)).len(), 3);
        assert_eq!(caches.thread_members().len(), 1);
    }

    assert_eq!(
        first
            .caches
            .messages()
            .get(Snowflake::new(200), Snowflake::new(401)),
        second
            .caches
            .messages()
            .get(Snowflake::new(200), Snowflake::new(401)),
    );
}

#[tokio::test]
async fn test_sequence_advances_monotonically_across_resume() {
    let pipeline = Pipeline::new();

    pipeline.replay(&fixtures::fresh_session()).await;
    assert_eq!(pipeline.session.last_sequence().await, Some(10));

    // Replayed frames after a resume continue the same counter.
    pipeline.replay(&fixtures::resumed_tail()).await;
    assert_eq!(pipeline.session.last_sequence().await, Some(11));

    let replayed = pipeline
        .caches
        .messages()
        .get(Snowflake::new(200), Snowflake::new(402))
        .unwrap();
    assert_eq!(replayed.content, "after resume");
}

#[tokio::test]
async fn test_update_events_snapshot_pre_mutation_value() {
    let pipeline = Pipeline::new();
    let events = pipeline.replay(&fixtures::fresh_session()).await;

    let mut saw_message_update = false;
    let mut saw_role_update = false;

    for event in &events {
        match &event.event {
            Event::MessageUpdate { message, old } => {
                saw_message_update = true;
                assert_eq!(message.content, "edited");
                assert_eq!(old.as_ref().unwrap().content, "first");
            }
            Event::GuildRoleUpdate { role, old, .. } => {
                saw_role_update = true;
                assert_eq!(role.name, "moderators");
                assert_eq!(old.as_ref().unwrap().name, "mods");
            }
            _ => {}
        }
    }

    assert!(saw_message_update);
    assert!(saw_role_update);
}

#[tokio::test]
async fn test_guild_delete_cascades_through_all_caches() {
    let pipeline = Pipeline::new();
    pipeline.replay(&fixtures::fresh_session()).await;
    pipeline.replay(&fixtures::guild_removal()).await;

    let caches = &pipeline.caches;
    assert!(caches.guilds().get(Snowflake::new(100)).is_none());
    assert!(caches.channels().get(Snowflake::new(200)).is_none());
    assert!(caches.channels().get(Snowflake::new(201)).is_none());
    assert!(caches.channels().get(Snowflake::new(500)).is_none());
    assert!(caches.thread_members().is_empty());
    assert!(caches.roles().group_values(Snowflake::new(100)).is_empty());
    assert!(caches.members().group_values(Snowflake::new(100)).is_empty());
    assert!(caches.emojis().group_values(Snowflake::new(100)).is_empty());
    assert!(caches.messages().is_empty());
}

#[tokio::test]
async fn test_timed_out_member_loses_send_in_channel() {
    let pipeline = Pipeline::new();
    pipeline.replay(&fixtures::fresh_session()).await;

    // The moderators role grants SEND_MESSAGES via the updated permissions.
    let mut member = pipeline
        .caches
        .members()
        .get(Snowflake::new(100), Snowflake::new(9))
        .unwrap();
    let before = pipeline
        .caches
        .member_permissions_in(Snowflake::new(200), &member);
    assert!(before.contains(Permissions::SEND_MESSAGES));

    // One hour of timeout masks everything but viewing and history.
    member.communication_disabled_until = Some(chrono::Utc::now() + chrono::Duration::hours(1));
    let during = pipeline
        .caches
        .member_permissions_in(Snowflake::new(200), &member);
    assert_eq!(
        during,
        during & (Permissions::VIEW_CHANNEL | Permissions::READ_MESSAGE_HISTORY)
    );
    assert!(!during.contains(Permissions::SEND_MESSAGES));
    assert!(during.contains(Permissions::VIEW_CHANNEL));
}

#[tokio::test]
async fn test_shard_routing_constant_per_guild() {
    // (guild >> 22) % 4 for the documented example id.
    let guild = Snowflake::new(613425648685547541);
    let expected = ((613425648685547541u64 >> 22) % 4) as u32;
    assert_eq!(guild.shard_index(4), expected);

    // Stable across repeated computation and unaffected by low bits.
    for low in 0..32u64 {
        let sibling = Snowflake::new((613425648685547541 & !0x3F_FFFF) | low);
        assert_eq!(sibling.shard_index(4), expected);
    }
}
