//! Permissions bitflags for guild access control
//!
//! Stored as a 64-bit integer bitfield, serialized as a string in JSON.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

bitflags! {
    /// Permission flags
    ///
    /// Serialized as a decimal string in JSON for JavaScript safety.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u64 {
        /// View channel and read messages
        const VIEW_CHANNEL          = 1 << 0;
        /// Send messages in text channels
        const SEND_MESSAGES         = 1 << 1;
        /// Read message history of a channel
        const READ_MESSAGE_HISTORY  = 1 << 2;
        /// Delete other users' messages
        const MANAGE_MESSAGES       = 1 << 3;
        /// Create, edit, delete channels
        const MANAGE_CHANNELS       = 1 << 4;
        /// Create, edit, delete, assign roles
        const MANAGE_ROLES          = 1 << 5;
        /// Edit guild settings
        const MANAGE_GUILD          = 1 << 6;
        /// Kick members from guild
        const KICK_MEMBERS          = 1 << 7;
        /// Ban members from guild
        const BAN_MEMBERS           = 1 << 8;
        /// Bypass all permission checks
        const ADMINISTRATOR         = 1 << 9;
        /// Upload files and images
        const ATTACH_FILES          = 1 << 10;
        /// Add emoji reactions
        const ADD_REACTIONS         = 1 << 11;
        /// Mention @everyone and all roles
        const MENTION_EVERYONE      = 1 << 12;
        /// Join voice channels
        const CONNECT               = 1 << 13;
        /// Speak in voice channels
        const SPEAK                 = 1 << 14;
        /// Mute members in voice channels
        const MUTE_MEMBERS          = 1 << 15;

        /// Default permissions for the @everyone role
        const DEFAULT = Self::VIEW_CHANNEL.bits()
            | Self::SEND_MESSAGES.bits()
            | Self::READ_MESSAGE_HISTORY.bits()
            | Self::ADD_REACTIONS.bits()
            | Self::ATTACH_FILES.bits()
            | Self::CONNECT.bits()
            | Self::SPEAK.bits();

        /// Permissions retained while a member is timed out
        const TIMED_OUT = Self::VIEW_CHANNEL.bits() | Self::READ_MESSAGE_HISTORY.bits();

        /// All permissions (guild owners and administrators)
        const ALL = u64::MAX;
    }
}

impl Permissions {
    /// Check if the permission set contains a required permission
    ///
    /// Administrators bypass all permission checks.
    #[inline]
    pub fn has(&self, permission: Permissions) -> bool {
        if self.contains(Permissions::ADMINISTRATOR) {
            return true;
        }
        self.contains(permission)
    }

    /// Check if the permission set has any of the given permissions
    #[inline]
    pub fn has_any(&self, permissions: Permissions) -> bool {
        if self.contains(Permissions::ADMINISTRATOR) {
            return true;
        }
        self.intersects(permissions)
    }

    /// Combine permissions from multiple roles
    pub fn combine<I>(roles: I) -> Self
    where
        I: IntoIterator<Item = Permissions>,
    {
        roles.into_iter().fold(Permissions::empty(), |acc, p| acc | p)
    }

    /// Apply a permission overwrite: clear denied bits, then set allowed bits
    #[inline]
    #[must_use]
    pub fn apply_overwrite(self, allow: Permissions, deny: Permissions) -> Self {
        (self & !deny) | allow
    }

    /// Parse from string representation (decimal number)
    pub fn parse(s: &str) -> Result<Self, std::num::ParseIntError> {
        s.parse::<u64>().map(Permissions::from_bits_truncate)
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Permissions::empty()
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

// Serialize as string for JSON (JavaScript BigInt safety)
impl Serialize for Permissions {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.bits().to_string())
    }
}

// Deserialize from string or number
impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct PermissionsVisitor;

        impl Visitor<'_> for PermissionsVisitor {
            type Value = Permissions;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or integer representing permission bits")
            }

            fn visit_i64<E>(self, value: i64) -> Result<Permissions, E>
            where
                E: de::Error,
            {
                Ok(Permissions::from_bits_truncate(value as u64))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Permissions, E>
            where
                E: de::Error,
            {
                Ok(Permissions::from_bits_truncate(value))
            }

            fn visit_str<E>(self, value: &str) -> Result<Permissions, E>
            where
                E: de::Error,
            {
                value
                    .parse::<u64>()
                    .map(Permissions::from_bits_truncate)
                    .map_err(|_| de::Error::custom("invalid permissions string"))
            }
        }

        deserializer.deserialize_any(PermissionsVisitor)
    }
}

impl From<u64> for Permissions {
    fn from(bits: u64) -> Self {
        Permissions::from_bits_truncate(bits)
    }
}

impl From<Permissions> for u64 {
    fn from(perms: Permissions) -> Self {
        perms.bits()
    }
}
