//! Gateway session
//!
//! Per-shard connection state machine and its supporting pieces.

mod send_limiter;
mod shard_session;
mod state;

pub use send_limiter::CommandLimiter;
pub use shard_session::{
    ShardEvent, ShardSession, ShardSessionConfig, GATEWAY_VERSION,
};
pub use state::{SessionState, SessionStatus};
