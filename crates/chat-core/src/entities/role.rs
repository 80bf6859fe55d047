//! Role entity

use serde::{Deserialize, Serialize};

use crate::value_objects::{Permissions, Snowflake};

/// Guild role entity
///
/// The @everyone role shares its id with the guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub name: String,
    pub permissions: Permissions,
    #[serde(default)]
    pub position: i32,
}

impl Role {
    /// Check if this is a guild's @everyone role
    #[inline]
    #[must_use]
    pub fn is_everyone(&self, guild_id: Snowflake) -> bool {
        self.id == guild_id
    }
}
