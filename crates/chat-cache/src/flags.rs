//! Cache flags
//!
//! Selects which caches the client keeps. Writes to a disabled cache are
//! dropped and reads return misses.

use bitflags::bitflags;

bitflags! {
    /// Flags enabling individual caches
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CacheFlags: u32 {
        const GUILDS       = 1 << 0;
        const CHANNELS     = 1 << 1;
        const USERS        = 1 << 2;
        const ROLES        = 1 << 3;
        const MEMBERS      = 1 << 4;
        const MESSAGES     = 1 << 5;
        const PRESENCES    = 1 << 6;
        const VOICE_STATES = 1 << 7;
        const EMOJIS         = 1 << 8;
        const STICKERS       = 1 << 9;
        const THREAD_MEMBERS = 1 << 10;

        /// Everything the permission engine needs
        const PERMISSIONS = Self::GUILDS.bits()
            | Self::CHANNELS.bits()
            | Self::ROLES.bits()
            | Self::MEMBERS.bits();
    }
}

impl Default for CacheFlags {
    fn default() -> Self {
        Self::all()
    }
}
