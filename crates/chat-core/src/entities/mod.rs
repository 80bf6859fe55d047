//! Wire entities - the platform objects carried by gateway and REST payloads

mod channel;
mod emoji;
mod guild;
mod interaction;
mod member;
mod message;
mod presence;
mod role;
mod user;
mod voice_state;

pub use channel::{
    Channel, ChannelType, OverwriteType, PermissionOverwrite, ThreadMember, ThreadMetadata,
};
pub use emoji::{Emoji, Sticker};
pub use guild::{Guild, UnavailableGuild};
pub use interaction::{Interaction, InteractionType};
pub use member::Member;
pub use message::Message;
pub use presence::{Activity, OnlineStatus, Presence, PresenceUser, UpdatePresence};
pub use role::Role;
pub use user::User;
pub use voice_state::VoiceState;
