//! REST routes
//!
//! A route is a method plus a concrete path plus its rate-limit identity:
//! the path template (with non-major parameters blanked) and the values of
//! the major parameters. Two calls share a bucket queue exactly when both
//! identities match.

use chat_core::Snowflake;
use reqwest::Method;
use std::fmt;

/// Major rate-limit parameter of a route
///
/// Buckets with the same server hash but different major values are
/// independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MajorParams {
    #[default]
    None,
    Channel(Snowflake),
    Guild(Snowflake),
    Webhook(Snowflake),
}

impl fmt::Display for MajorParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("-"),
            Self::Channel(id) => write!(f, "c{id}"),
            Self::Guild(id) => write!(f, "g{id}"),
            Self::Webhook(id) => write!(f, "w{id}"),
        }
    }
}

/// One REST call target
#[derive(Debug, Clone)]
pub struct Route {
    pub method: Method,
    /// Concrete request path, all parameters substituted
    pub path: String,
    /// Path template identifying the rate-limit route
    pub template: &'static str,
    /// Major parameter partitioning the bucket
    pub major: MajorParams,
}

impl Route {
    /// Key mapping this route to its server-assigned bucket hash
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}:{}:{}", self.method, self.template, self.major)
    }

    // === Gateway metadata ===

    #[must_use]
    pub fn get_gateway() -> Self {
        Self {
            method: Method::GET,
            path: "/gateway".to_string(),
            template: "/gateway",
            major: MajorParams::None,
        }
    }

    #[must_use]
    pub fn get_gateway_bot() -> Self {
        Self {
            method: Method::GET,
            path: "/gateway/bot".to_string(),
            template: "/gateway/bot",
            major: MajorParams::None,
        }
    }

    // === Channels and messages ===

    #[must_use]
    pub fn get_channel(channel_id: Snowflake) -> Self {
        Self {
            method: Method::GET,
            path: format!("/channels/{channel_id}"),
            template: "/channels/{channel.id}",
            major: MajorParams::Channel(channel_id),
        }
    }

    #[must_use]
    pub fn create_message(channel_id: Snowflake) -> Self {
        Self {
            method: Method::POST,
            path: format!("/channels/{channel_id}/messages"),
            template: "/channels/{channel.id}/messages",
            major: MajorParams::Channel(channel_id),
        }
    }

    #[must_use]
    pub fn edit_message(channel_id: Snowflake, message_id: Snowflake) -> Self {
        Self {
            method: Method::PATCH,
            path: format!("/channels/{channel_id}/messages/{message_id}"),
            template: "/channels/{channel.id}/messages/{message.id}",
            major: MajorParams::Channel(channel_id),
        }
    }

    #[must_use]
    pub fn delete_message(channel_id: Snowflake, message_id: Snowflake) -> Self {
        Self {
            method: Method::DELETE,
            path: format!("/channels/{channel_id}/messages/{message_id}"),
            template: "/channels/{channel.id}/messages/{message.id}",
            major: MajorParams::Channel(channel_id),
        }
    }

    /// `emoji` must already be URL-encoded (`name:id` for custom emoji)
    #[must_use]
    pub fn create_reaction(channel_id: Snowflake, message_id: Snowflake, emoji: &str) -> Self {
        Self {
            method: Method::PUT,
            path: format!("/channels/{channel_id}/messages/{message_id}/reactions/{emoji}/@me"),
            template: "/channels/{channel.id}/messages/{message.id}/reactions/{emoji}/@me",
            major: MajorParams::Channel(channel_id),
        }
    }

    /// `emoji` must already be URL-encoded (`name:id` for custom emoji)
    #[must_use]
    pub fn delete_own_reaction(channel_id: Snowflake, message_id: Snowflake, emoji: &str) -> Self {
        Self {
            method: Method::DELETE,
            path: format!("/channels/{channel_id}/messages/{message_id}/reactions/{emoji}/@me"),
            template: "/channels/{channel.id}/messages/{message.id}/reactions/{emoji}/@me",
            major: MajorParams::Channel(channel_id),
        }
    }

    // === Guilds ===

    #[must_use]
    pub fn get_guild(guild_id: Snowflake) -> Self {
        Self {
            method: Method::GET,
            path: format!("/guilds/{guild_id}"),
            template: "/guilds/{guild.id}",
            major: MajorParams::Guild(guild_id),
        }
    }

    #[must_use]
    pub fn get_member(guild_id: Snowflake, user_id: Snowflake) -> Self {
        Self {
            method: Method::GET,
            path: format!("/guilds/{guild_id}/members/{user_id}"),
            template: "/guilds/{guild.id}/members/{user.id}",
            major: MajorParams::Guild(guild_id),
        }
    }

    // === Users ===

    #[must_use]
    pub fn get_current_user() -> Self {
        Self {
            method: Method::GET,
            path: "/users/@me".to_string(),
            template: "/users/@me",
            major: MajorParams::None,
        }
    }

    // === Interactions and webhooks ===

    #[must_use]
    pub fn create_interaction_response(interaction_id: Snowflake, token: &str) -> Self {
        Self {
            method: Method::POST,
            path: format!("/interactions/{interaction_id}/{token}/callback"),
            template: "/interactions/{interaction.id}/{interaction.token}/callback",
            major: MajorParams::None,
        }
    }

    #[must_use]
    pub fn execute_webhook(webhook_id: Snowflake, token: &str) -> Self {
        Self {
            method: Method::POST,
            path: format!("/webhooks/{webhook_id}/{token}"),
            template: "/webhooks/{webhook.id}/{webhook.token}",
            major: MajorParams::Webhook(webhook_id),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}
