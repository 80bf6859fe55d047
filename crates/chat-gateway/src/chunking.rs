//! Member chunking coordinator
//!
//! Large guilds do not ship their full member list in GUILD_CREATE. The
//! client requests members with op 8 and the server answers with a series of
//! GUILD_MEMBERS_CHUNK dispatches correlated by nonce. The coordinator
//! registers a waiter per nonce, accumulates chunks in arrival order, and
//! resolves the waiter on the final chunk.

use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use chat_common::{ClientError, ClientResult};
use chat_core::{Member, Snowflake};

use crate::events::GuildMembersChunkData;
use crate::protocol::{GatewayMessage, RequestGuildMembersPayload};
use crate::session::ShardSession;

/// Default time to wait for all chunks of one request
pub const DEFAULT_CHUNK_TIMEOUT: Duration = Duration::from_secs(30);

/// Member selection for a chunk request
#[derive(Debug, Clone)]
pub enum ChunkRequest {
    /// Fetch specific members by id
    ByIds(Vec<Snowflake>),
    /// Fetch members whose username starts with `query`; empty matches all,
    /// `limit == 0` means no limit (requires the members intent)
    Query { query: String, limit: u32 },
}

struct PendingRequest {
    members: Vec<Member>,
    tx: Option<oneshot::Sender<Vec<Member>>>,
}

/// Correlates RequestGuildMembers commands with their chunked responses
pub struct MemberChunkCoordinator {
    pending: DashMap<String, PendingRequest>,
    timeout: Duration,
}

impl std::fmt::Debug for MemberChunkCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemberChunkCoordinator")
            .field("pending", &self.pending.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl MemberChunkCoordinator {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            timeout,
        }
    }

    /// Request guild members through a shard and wait for the full list
    ///
    /// Suspends until the last chunk arrives, the timeout elapses, or the
    /// token cancels.
    pub async fn request_members(
        &self,
        shard: &ShardSession,
        guild_id: Snowflake,
        request: ChunkRequest,
        presences: bool,
        cancel: &CancellationToken,
    ) -> ClientResult<Vec<Member>> {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.insert(
            nonce.clone(),
            PendingRequest {
                members: Vec::new(),
                tx: Some(tx),
            },
        );

        let (query, limit, user_ids) = match request {
            ChunkRequest::ByIds(ids) => (None, None, Some(ids)),
            ChunkRequest::Query { query, limit } => (Some(query), Some(limit), None),
        };
        let payload = RequestGuildMembersPayload {
            guild_id,
            query,
            limit,
            user_ids,
            presences,
            nonce: nonce.clone(),
        };

        if let Err(err) = shard.send(GatewayMessage::request_guild_members(&payload)).await {
            self.pending.remove(&nonce);
            return Err(err);
        }

        tracing::debug!(
            guild_id = %guild_id,
            nonce = %nonce,
            "Requested guild members"
        );

        tokio::select! {
            result = rx => result.map_err(|_| ClientError::Closed),
            () = tokio::time::sleep(self.timeout) => {
                self.pending.remove(&nonce);
                Err(ClientError::Timeout("guild member chunks"))
            }
            () = cancel.cancelled() => {
                self.pending.remove(&nonce);
                Err(ClientError::Cancelled)
            }
        }
    }

    /// Feed a GUILD_MEMBERS_CHUNK dispatch into the coordinator
    ///
    /// Returns whether the chunk matched a pending request. Chunks are still
    /// dispatched to user handlers either way; this is a tap, not a filter.
    pub fn handle_chunk(&self, chunk: &GuildMembersChunkData) -> bool {
        let Some(nonce) = chunk.nonce.as_deref() else {
            return false;
        };
        let Some(mut pending) = self.pending.get_mut(nonce) else {
            return false;
        };

        pending.members.extend(chunk.members.iter().cloned());

        if chunk.is_last() {
            let members = std::mem::take(&mut pending.members);
            let tx = pending.tx.take();
            drop(pending);
            self.pending.remove(nonce);

            if let Some(tx) = tx {
                let _ = tx.send(members);
            }
        }
        true
    }

    /// Number of requests still waiting for chunks
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Fail every pending waiter with a closed error
    pub fn close(&self) {
        // Dropping the senders wakes the waiters with Closed.
        self.pending.clear();
    }
}

impl Default for MemberChunkCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::User;
    use chrono::Utc;

    fn member(user_id: u64) -> Member {
        Member {
            guild_id: Some(Snowflake::new(1)),
            user: User {
                id: Snowflake::new(user_id),
                username: format!("user{user_id}"),
                discriminator: None,
                avatar: None,
                bot: false,
            },
            nick: None,
            roles: Vec::new(),
            joined_at: Utc::now(),
            communication_disabled_until: None,
        }
    }

    fn chunk(nonce: &str, index: u32, count: u32, user_ids: &[u64]) -> GuildMembersChunkData {
        GuildMembersChunkData {
            guild_id: Snowflake::new(1),
            members: user_ids.iter().map(|&id| member(id)).collect(),
            chunk_index: index,
            chunk_count: count,
            not_found: Vec::new(),
            presences: Vec::new(),
            nonce: Some(nonce.to_string()),
        }
    }

    /// Register a waiter directly, as request_members would
    fn register(
        coordinator: &MemberChunkCoordinator,
        nonce: &str,
    ) -> oneshot::Receiver<Vec<Member>> {
        let (tx, rx) = oneshot::channel();
        coordinator.pending.insert(
            nonce.to_string(),
            PendingRequest {
                members: Vec::new(),
                tx: Some(tx),
            },
        );
        rx
    }

    #[tokio::test]
    async fn test_chunks_accumulate_until_last() {
        let coordinator = MemberChunkCoordinator::default();
        let mut rx = register(&coordinator, "n1");

        assert!(coordinator.handle_chunk(&chunk("n1", 0, 2, &[10, 11])));
        assert!(rx.try_recv().is_err());

        assert!(coordinator.handle_chunk(&chunk("n1", 1, 2, &[12])));
        let members = rx.await.unwrap();
        assert_eq!(members.len(), 3);
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_nonce_ignored() {
        let coordinator = MemberChunkCoordinator::default();
        let _rx = register(&coordinator, "n1");

        assert!(!coordinator.handle_chunk(&chunk("other", 0, 1, &[10])));
        assert!(!coordinator.handle_chunk(&GuildMembersChunkData {
            nonce: None,
            ..chunk("n1", 0, 1, &[10])
        }));
        assert_eq!(coordinator.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_close_fails_waiters() {
        let coordinator = MemberChunkCoordinator::default();
        let rx = register(&coordinator, "n1");

        coordinator.close();
        assert!(rx.await.is_err());
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_single_chunk_resolves_immediately() {
        let coordinator = MemberChunkCoordinator::default();
        let rx = register(&coordinator, "n1");

        coordinator.handle_chunk(&chunk("n1", 0, 1, &[10]));
        assert_eq!(rx.await.unwrap().len(), 1);
    }
}
