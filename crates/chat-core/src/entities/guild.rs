//! Guild entity

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Guild entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    pub id: Snowflake,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub owner_id: Snowflake,
    /// Total member count, present on GUILD_CREATE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_count: Option<u32>,
    /// Whether the guild crossed the large_threshold member cutoff
    #[serde(default)]
    pub large: bool,
}

/// A guild the client knows about but has no data for
///
/// Sent in READY, and in GUILD_DELETE when the guild went unavailable due to
/// an outage rather than the client leaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableGuild {
    pub id: Snowflake,
    #[serde(default)]
    pub unavailable: bool,
}
