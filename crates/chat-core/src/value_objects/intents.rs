//! Gateway intents bitmask
//!
//! Intents select which categories of events the server will push over a
//! gateway session. They are sent with Identify and cannot change without a
//! re-identify.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

bitflags! {
    /// Gateway intent flags
    ///
    /// Serialized as a plain integer in the Identify payload.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Intents: u64 {
        /// Guild create/update/delete, roles, channels
        const GUILDS                    = 1 << 0;
        /// Member add/update/remove (privileged)
        const GUILD_MEMBERS             = 1 << 1;
        /// Bans and moderation events
        const GUILD_MODERATION          = 1 << 2;
        /// Emoji and sticker updates
        const GUILD_EMOJIS_AND_STICKERS = 1 << 3;
        /// Integration updates
        const GUILD_INTEGRATIONS        = 1 << 4;
        /// Webhook updates
        const GUILD_WEBHOOKS            = 1 << 5;
        /// Invite create/delete
        const GUILD_INVITES             = 1 << 6;
        /// Voice state updates
        const GUILD_VOICE_STATES        = 1 << 7;
        /// Presence updates (privileged)
        const GUILD_PRESENCES           = 1 << 8;
        /// Guild message create/update/delete
        const GUILD_MESSAGES            = 1 << 9;
        /// Guild message reactions
        const GUILD_MESSAGE_REACTIONS   = 1 << 10;
        /// Guild typing indicators
        const GUILD_MESSAGE_TYPING      = 1 << 11;
        /// Direct message create/update/delete
        const DIRECT_MESSAGES           = 1 << 12;
        /// Direct message reactions
        const DIRECT_MESSAGE_REACTIONS  = 1 << 13;
        /// Direct message typing indicators
        const DIRECT_MESSAGE_TYPING     = 1 << 14;
        /// Message content payloads (privileged)
        const MESSAGE_CONTENT           = 1 << 15;

        /// Intents that require explicit enablement on the application
        const PRIVILEGED = Self::GUILD_MEMBERS.bits()
            | Self::GUILD_PRESENCES.bits()
            | Self::MESSAGE_CONTENT.bits();
    }
}

impl Intents {
    /// All non-privileged intents
    #[must_use]
    pub fn non_privileged() -> Self {
        Self::all() & !Self::PRIVILEGED
    }

    /// Check whether any privileged intent is requested
    #[must_use]
    pub fn has_privileged(&self) -> bool {
        self.intersects(Self::PRIVILEGED)
    }
}

impl Default for Intents {
    fn default() -> Self {
        Self::non_privileged()
    }
}

impl fmt::Display for Intents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

// Identify carries intents as a plain JSON number.
impl Serialize for Intents {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.bits())
    }
}

impl<'de> Deserialize<'de> for Intents {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = u64::deserialize(deserializer)?;
        Ok(Intents::from_bits_truncate(bits))
    }
}
