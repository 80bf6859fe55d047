//! # chat-cache
//!
//! In-memory entity caches for the chat client. Caches are selected with
//! [`CacheFlags`], filtered by per-type [`CachePolicy`] predicates, and read
//! by value copy; mutation goes through the insert/remove paths only.

mod caches;
mod flags;
mod policy;
mod store;

pub use caches::{CacheConfig, Caches};
pub use flags::CacheFlags;
pub use policy::CachePolicy;
pub use store::{Cache, GroupedCache};
