//! Cache aggregate
//!
//! Owns every per-type cache, applies the guild eviction cascade, and
//! computes effective permissions from the cached guild state.

use chat_core::{
    Channel, Emoji, Guild, Member, Message, Permissions, Presence, Role, Snowflake, Sticker,
    ThreadMember, User, VoiceState,
};
use std::sync::RwLock;

use crate::flags::CacheFlags;
use crate::policy::CachePolicy;
use crate::store::{Cache, GroupedCache};

/// Cache configuration
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    pub flags: CacheFlags,
    pub member_policy: CachePolicy<Member>,
    pub message_policy: CachePolicy<Message>,
}

/// All client caches
#[derive(Debug)]
pub struct Caches {
    flags: CacheFlags,

    self_user: RwLock<Option<User>>,

    users: Cache<User>,
    guilds: Cache<Guild>,
    channels: Cache<Channel>,
    roles: GroupedCache<Role>,
    members: GroupedCache<Member>,
    presences: GroupedCache<Presence>,
    voice_states: GroupedCache<VoiceState>,
    /// Keyed by (channel, message)
    messages: GroupedCache<Message>,
    emojis: GroupedCache<Emoji>,
    stickers: GroupedCache<Sticker>,
    /// Keyed by (thread, user)
    thread_members: GroupedCache<ThreadMember>,
}

impl Caches {
    /// Create the cache aggregate from a configuration
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        let flags = config.flags;
        Self {
            flags,
            self_user: RwLock::new(None),
            users: Cache::new(flags.contains(CacheFlags::USERS)),
            guilds: Cache::new(flags.contains(CacheFlags::GUILDS)),
            channels: Cache::new(flags.contains(CacheFlags::CHANNELS)),
            roles: GroupedCache::new(flags.contains(CacheFlags::ROLES), CachePolicy::all()),
            members: GroupedCache::new(
                flags.contains(CacheFlags::MEMBERS),
                config.member_policy,
            ),
            presences: GroupedCache::new(flags.contains(CacheFlags::PRESENCES), CachePolicy::all()),
            voice_states: GroupedCache::new(
                flags.contains(CacheFlags::VOICE_STATES),
                CachePolicy::all(),
            ),
            messages: GroupedCache::new(
                flags.contains(CacheFlags::MESSAGES),
                config.message_policy,
            ),
            emojis: GroupedCache::new(flags.contains(CacheFlags::EMOJIS), CachePolicy::all()),
            stickers: GroupedCache::new(flags.contains(CacheFlags::STICKERS), CachePolicy::all()),
            thread_members: GroupedCache::new(
                flags.contains(CacheFlags::THREAD_MEMBERS),
                CachePolicy::all(),
            ),
        }
    }

    /// The configured cache flags
    #[must_use]
    pub fn flags(&self) -> CacheFlags {
        self.flags
    }

    /// The authenticated user, populated on READY
    pub fn self_user(&self) -> Option<User> {
        self.self_user.read().expect("self_user lock poisoned").clone()
    }

    /// Replace the authenticated user
    pub fn set_self_user(&self, user: User) {
        *self.self_user.write().expect("self_user lock poisoned") = Some(user);
    }

    pub fn users(&self) -> &Cache<User> {
        &self.users
    }

    pub fn guilds(&self) -> &Cache<Guild> {
        &self.guilds
    }

    pub fn channels(&self) -> &Cache<Channel> {
        &self.channels
    }

    pub fn roles(&self) -> &GroupedCache<Role> {
        &self.roles
    }

    pub fn members(&self) -> &GroupedCache<Member> {
        &self.members
    }

    pub fn presences(&self) -> &GroupedCache<Presence> {
        &self.presences
    }

    pub fn voice_states(&self) -> &GroupedCache<VoiceState> {
        &self.voice_states
    }

    pub fn messages(&self) -> &GroupedCache<Message> {
        &self.messages
    }

    pub fn emojis(&self) -> &GroupedCache<Emoji> {
        &self.emojis
    }

    pub fn stickers(&self) -> &GroupedCache<Sticker> {
        &self.stickers
    }

    pub fn thread_members(&self) -> &GroupedCache<ThreadMember> {
        &self.thread_members
    }

    /// Evict a guild and everything scoped to it
    ///
    /// Applied on GUILD_DELETE with `unavailable == false`: channels and
    /// threads, roles, members, presences, voice states, emojis, stickers,
    /// plus the messages and thread members of every evicted channel.
    pub fn evict_guild(&self, guild_id: Snowflake) {
        self.guilds.remove(guild_id);

        // Threads carry the guild id too, so one sweep catches both.
        let channels = self
            .channels
            .find_all(|channel| channel.guild_id == Some(guild_id));
        for channel in &channels {
            self.channels.remove(channel.id);
            self.messages.remove_group(channel.id);
            self.thread_members.remove_group(channel.id);
        }

        let roles = self.roles.remove_group(guild_id);
        let members = self.members.remove_group(guild_id);
        self.presences.remove_group(guild_id);
        self.voice_states.remove_group(guild_id);
        self.emojis.remove_group(guild_id);
        self.stickers.remove_group(guild_id);

        tracing::debug!(
            guild_id = %guild_id,
            channels = channels.len(),
            roles = roles,
            members = members,
            "Guild evicted from cache"
        );
    }

    /// Copy out the cached roles a member holds
    pub fn member_roles(&self, member: &Member) -> Vec<Role> {
        let Some(guild_id) = member.guild_id else {
            return Vec::new();
        };
        member
            .roles
            .iter()
            .filter_map(|&role_id| self.roles.get(guild_id, role_id))
            .collect()
    }

    /// Compute a member's guild-level effective permissions
    ///
    /// Owners get everything. Otherwise: @everyone role permissions, OR-ed
    /// with each held role, short-circuiting on ADMINISTRATOR. A timed-out
    /// member is masked down to viewing and reading history.
    pub fn member_permissions(&self, member: &Member) -> Permissions {
        let Some(guild_id) = member.guild_id else {
            return Permissions::empty();
        };

        if let Some(guild) = self.guilds.get(guild_id) {
            if guild.owner_id == member.user.id {
                return Permissions::ALL;
            }
        }

        // The @everyone role shares its id with the guild.
        let mut permissions = self
            .roles
            .get(guild_id, guild_id)
            .map(|role| role.permissions)
            .unwrap_or_default();

        for role in self.member_roles(member) {
            permissions |= role.permissions;
            if permissions.contains(Permissions::ADMINISTRATOR) {
                return Permissions::ALL;
            }
        }

        if member.is_timed_out() {
            permissions &= Permissions::TIMED_OUT;
        }
        permissions
    }

    /// Compute a member's effective permissions in a channel
    ///
    /// Overwrites apply on top of the guild-level set in fixed order:
    /// @everyone overwrite, then the union of role overwrites (deny before
    /// allow), then the member-specific overwrite. Each layer is the plain
    /// `(base & !deny) | allow`.
    pub fn member_permissions_in(&self, channel_id: Snowflake, member: &Member) -> Permissions {
        let Some(channel) = self.channels.get(channel_id) else {
            return Permissions::empty();
        };
        let Some(guild_id) = channel.guild_id else {
            return Permissions::empty();
        };

        if let Some(guild) = self.guilds.get(guild_id) {
            if guild.owner_id == member.user.id {
                return Permissions::ALL;
            }
        }

        let base = self.member_permissions(member);
        if base.contains(Permissions::ADMINISTRATOR) {
            return Permissions::ALL;
        }

        let mut permissions = base;

        if let Some(overwrite) = channel.role_overwrite(guild_id) {
            permissions = permissions.apply_overwrite(overwrite.allow, overwrite.deny);
        }

        let mut role_allow = Permissions::empty();
        let mut role_deny = Permissions::empty();
        for &role_id in &member.roles {
            if role_id == guild_id {
                continue;
            }
            if let Some(overwrite) = channel.role_overwrite(role_id) {
                role_allow |= overwrite.allow;
                role_deny |= overwrite.deny;
            }
        }
        permissions = permissions.apply_overwrite(role_allow, role_deny);

        if let Some(overwrite) = channel.member_overwrite(member.user.id) {
            permissions = permissions.apply_overwrite(overwrite.allow, overwrite.deny);
        }

        if member.is_timed_out() {
            permissions &= Permissions::TIMED_OUT;
        }
        permissions
    }
}

impl Default for Caches {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::{ChannelType, OverwriteType, PermissionOverwrite, ThreadMetadata};
    use chrono::{Duration, Utc};

    fn guild(id: u64, owner: u64) -> Guild {
        Guild {
            id: Snowflake::new(id),
            name: "test".to_string(),
            icon: None,
            owner_id: Snowflake::new(owner),
            member_count: None,
            large: false,
        }
    }

    fn role(guild_id: u64, id: u64, permissions: Permissions) -> Role {
        Role {
            id: Snowflake::new(id),
            guild_id: Some(Snowflake::new(guild_id)),
            name: "role".to_string(),
            permissions,
            position: 0,
        }
    }

    fn member(guild_id: u64, user_id: u64, roles: Vec<u64>) -> Member {
        Member {
            guild_id: Some(Snowflake::new(guild_id)),
            user: User {
                id: Snowflake::new(user_id),
                username: "user".to_string(),
                discriminator: None,
                avatar: None,
                bot: false,
            },
            nick: None,
            roles: roles.into_iter().map(Snowflake::new).collect(),
            joined_at: Utc::now(),
            communication_disabled_until: None,
        }
    }

    fn channel(guild_id: u64, id: u64, overwrites: Vec<PermissionOverwrite>) -> Channel {
        Channel {
            id: Snowflake::new(id),
            kind: ChannelType::GuildText,
            guild_id: Some(Snowflake::new(guild_id)),
            name: Some("general".to_string()),
            topic: None,
            position: Some(0),
            parent_id: None,
            permission_overwrites: overwrites,
            last_message_id: None,
            owner_id: None,
            thread_metadata: None,
        }
    }

    fn thread(guild_id: u64, id: u64, parent_id: u64) -> Channel {
        Channel {
            id: Snowflake::new(id),
            kind: ChannelType::GuildPublicThread,
            guild_id: Some(Snowflake::new(guild_id)),
            name: Some("thread".to_string()),
            topic: None,
            position: None,
            parent_id: Some(Snowflake::new(parent_id)),
            permission_overwrites: vec![],
            last_message_id: None,
            owner_id: Some(Snowflake::new(9)),
            thread_metadata: Some(ThreadMetadata {
                archived: false,
                auto_archive_duration: 1440,
                archive_timestamp: None,
                locked: false,
                invitable: false,
            }),
        }
    }

    fn populated_caches() -> Caches {
        let caches = Caches::default();
        caches.guilds().insert(Snowflake::new(1), guild(1, 999));
        // @everyone role
        caches
            .roles()
            .insert(Snowflake::new(1), Snowflake::new(1), role(1, 1, Permissions::DEFAULT));
        caches
    }

    #[test]
    fn test_owner_gets_all_permissions() {
        let caches = populated_caches();
        let owner = member(1, 999, vec![]);
        assert_eq!(caches.member_permissions(&owner), Permissions::ALL);
    }

    #[test]
    fn test_everyone_role_is_base() {
        let caches = populated_caches();
        let m = member(1, 5, vec![]);
        assert_eq!(caches.member_permissions(&m), Permissions::DEFAULT);
    }

    #[test]
    fn test_roles_are_unioned_and_admin_short_circuits() {
        let caches = populated_caches();
        caches
            .roles()
            .insert(Snowflake::new(1), Snowflake::new(10), role(1, 10, Permissions::MANAGE_GUILD));
        caches
            .roles()
            .insert(Snowflake::new(1), Snowflake::new(11), role(1, 11, Permissions::ADMINISTRATOR));

        let mod_member = member(1, 5, vec![10]);
        let perms = caches.member_permissions(&mod_member);
        assert!(perms.contains(Permissions::MANAGE_GUILD));
        assert!(perms.contains(Permissions::VIEW_CHANNEL));
        assert_ne!(perms, Permissions::ALL);

        let admin_member = member(1, 6, vec![11]);
        assert_eq!(caches.member_permissions(&admin_member), Permissions::ALL);
    }

    #[test]
    fn test_channel_overwrites_apply_in_order() {
        let caches = populated_caches();
        caches.roles().insert(
            Snowflake::new(1),
            Snowflake::new(10),
            role(1, 10, Permissions::empty()),
        );

        // @everyone overwrite denies sending; the member's role re-allows it;
        // the member overwrite denies reactions.
        caches.channels().insert(
            Snowflake::new(2),
            channel(
                1,
                2,
                vec![
                    PermissionOverwrite {
                        id: Snowflake::new(1),
                        kind: OverwriteType::Role,
                        allow: Permissions::empty(),
                        deny: Permissions::SEND_MESSAGES,
                    },
                    PermissionOverwrite {
                        id: Snowflake::new(10),
                        kind: OverwriteType::Role,
                        allow: Permissions::SEND_MESSAGES,
                        deny: Permissions::empty(),
                    },
                    PermissionOverwrite {
                        id: Snowflake::new(5),
                        kind: OverwriteType::Member,
                        allow: Permissions::empty(),
                        deny: Permissions::ADD_REACTIONS,
                    },
                ],
            ),
        );

        let m = member(1, 5, vec![10]);
        let perms = caches.member_permissions_in(Snowflake::new(2), &m);
        assert!(perms.contains(Permissions::SEND_MESSAGES));
        assert!(perms.contains(Permissions::VIEW_CHANNEL));
        assert!(!perms.contains(Permissions::ADD_REACTIONS));
    }

    #[test]
    fn test_timed_out_member_masked() {
        let caches = populated_caches();
        caches.roles().insert(
            Snowflake::new(1),
            Snowflake::new(10),
            role(1, 10, Permissions::SEND_MESSAGES | Permissions::READ_MESSAGE_HISTORY),
        );
        caches.channels().insert(Snowflake::new(2), channel(1, 2, vec![]));

        let mut m = member(1, 5, vec![10]);
        m.communication_disabled_until = Some(Utc::now() + Duration::hours(1));

        let perms = caches.member_permissions_in(Snowflake::new(2), &m);
        assert_eq!(perms, Permissions::TIMED_OUT & perms);
        assert!(perms.contains(Permissions::VIEW_CHANNEL));
        assert!(perms.contains(Permissions::READ_MESSAGE_HISTORY));
        assert!(!perms.contains(Permissions::SEND_MESSAGES));
    }

    #[test]
    fn test_guild_eviction_cascades() {
        let caches = populated_caches();
        caches.channels().insert(Snowflake::new(2), channel(1, 2, vec![]));
        caches.channels().insert(Snowflake::new(3), thread(1, 3, 2));
        caches.thread_members().insert(
            Snowflake::new(3),
            Snowflake::new(5),
            ThreadMember {
                id: Some(Snowflake::new(3)),
                user_id: Some(Snowflake::new(5)),
                join_timestamp: Utc::now(),
            },
        );
        caches.members().insert(Snowflake::new(1), Snowflake::new(5), member(1, 5, vec![]));
        caches.messages().insert(
            Snowflake::new(2),
            Snowflake::new(33),
            Message {
                id: Snowflake::new(33),
                channel_id: Snowflake::new(2),
                guild_id: Some(Snowflake::new(1)),
                author: User {
                    id: Snowflake::new(5),
                    username: "user".to_string(),
                    discriminator: None,
                    avatar: None,
                    bot: false,
                },
                content: "hi".to_string(),
                timestamp: Utc::now(),
                edited_timestamp: None,
            },
        );

        caches.evict_guild(Snowflake::new(1));

        assert!(caches.guilds().get(Snowflake::new(1)).is_none());
        assert!(caches.channels().get(Snowflake::new(2)).is_none());
        assert!(caches.channels().get(Snowflake::new(3)).is_none());
        assert!(caches
            .thread_members()
            .get(Snowflake::new(3), Snowflake::new(5))
            .is_none());
        assert!(caches.members().get(Snowflake::new(1), Snowflake::new(5)).is_none());
        assert!(caches.messages().get(Snowflake::new(2), Snowflake::new(33)).is_none());
        assert!(caches.roles().group_values(Snowflake::new(1)).is_empty());
    }
}
