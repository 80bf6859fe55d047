//! Member entity - represents a user's membership in a guild

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::User;
use crate::value_objects::Snowflake;

/// Guild member entity (junction between User and Guild)
///
/// Member objects nested in guild payloads omit `guild_id`; the client fills
/// it in from the surrounding event before caching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub user: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    pub joined_at: DateTime<Utc>,
    /// Until this instant the member is timed out and restricted to
    /// viewing channels and reading history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communication_disabled_until: Option<DateTime<Utc>>,
}

impl Member {
    /// Get display name (nickname if set, otherwise username)
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.nick.as_deref().unwrap_or(&self.user.username)
    }

    /// Check if member has a specific role
    #[inline]
    #[must_use]
    pub fn has_role(&self, role_id: Snowflake) -> bool {
        self.roles.contains(&role_id)
    }

    /// Check if the member is currently timed out
    #[must_use]
    pub fn is_timed_out(&self) -> bool {
        self.communication_disabled_until
            .is_some_and(|until| until > Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn member() -> Member {
        Member {
            guild_id: Some(Snowflake::new(1)),
            user: User {
                id: Snowflake::new(2),
                username: "quokka".to_string(),
                discriminator: None,
                avatar: None,
                bot: false,
            },
            nick: None,
            roles: vec![Snowflake::new(100)],
            joined_at: Utc::now(),
            communication_disabled_until: None,
        }
    }

    #[test]
    fn test_display_name() {
        let mut m = member();
        assert_eq!(m.display_name(), "quokka");

        m.nick = Some("Nickname".to_string());
        assert_eq!(m.display_name(), "Nickname");
    }

    #[test]
    fn test_has_role() {
        let m = member();
        assert!(m.has_role(Snowflake::new(100)));
        assert!(!m.has_role(Snowflake::new(101)));
    }

    #[test]
    fn test_timeout_in_future_counts() {
        let mut m = member();
        assert!(!m.is_timed_out());

        m.communication_disabled_until = Some(Utc::now() + Duration::hours(1));
        assert!(m.is_timed_out());
    }

    #[test]
    fn test_expired_timeout_ignored() {
        let mut m = member();
        m.communication_disabled_until = Some(Utc::now() - Duration::minutes(5));
        assert!(!m.is_timed_out());
    }
}
