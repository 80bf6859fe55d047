//! User entity

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// A platform user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Snowflake,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Whether this account belongs to an application
    #[serde(default)]
    pub bot: bool,
}

impl User {
    /// Display tag: `username#discriminator` when a discriminator is set
    #[must_use]
    pub fn tag(&self) -> String {
        match &self.discriminator {
            Some(d) => format!("{}#{}", self.username, d),
            None => self.username.clone(),
        }
    }
}
