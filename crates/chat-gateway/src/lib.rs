//! # chat-gateway
//!
//! The client side of the gateway: wire protocol, per-shard session state
//! machines with heartbeat/resume handling, the shard manager with bucketed
//! identify sequencing, and the member-chunking coordinator.

pub mod chunking;
pub mod compression;
pub mod events;
pub mod protocol;
pub mod session;
pub mod shard;

pub use chunking::{ChunkRequest, MemberChunkCoordinator, DEFAULT_CHUNK_TIMEOUT};
pub use events::EventType;
pub use protocol::{CloseCode, GatewayMessage, OpCode};
pub use session::{SessionStatus, ShardEvent, ShardSession, ShardSessionConfig};
pub use shard::{ShardManager, ShardManagerConfig};
