//! Emoji and sticker entities

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Custom or unicode emoji
///
/// Unicode emoji carry no id; only custom guild emoji are cacheable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emoji {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub animated: bool,
}

impl Emoji {
    /// Check if this is a custom guild emoji (has an id)
    #[inline]
    #[must_use]
    pub fn is_custom(&self) -> bool {
        self.id.is_some()
    }
}

/// Guild sticker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sticker {
    pub id: Snowflake,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
}
