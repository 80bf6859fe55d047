//! Shard manager
//!
//! Owns a fixed set of gateway sessions and routes guild traffic to the
//! shard that owns it: `shard_id = (guild_id >> 22) % shard_count`.
//! Identifies are sequenced through rate buckets; closing is concurrent.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use chat_common::{ClientError, ClientResult};
use chat_core::{Intents, Snowflake, UpdatePresence};

use crate::session::{ShardEvent, ShardSession, ShardSessionConfig};
use crate::shard::rate_bucket::{identify_buckets, IDENTIFY_SPACING};

/// Shard manager configuration
#[derive(Debug, Clone)]
pub struct ShardManagerConfig {
    pub token: String,
    pub intents: Intents,
    pub gateway_url: String,
    pub large_threshold: u8,
    pub compress: bool,
    pub presence: Option<UpdatePresence>,
    /// Shard ids this process runs (a subset for multi-process sharding)
    pub shard_ids: Vec<u32>,
    /// Total shard count across all processes
    pub shard_count: u32,
    /// Maximum parallel identifies, from /gateway/bot
    pub max_concurrency: u32,
}

/// Manages all gateway sessions of this process
pub struct ShardManager {
    shards: DashMap<u32, Arc<ShardSession>>,
    shard_count: u32,
    max_concurrency: u32,
    shutdown: CancellationToken,
    driver_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl ShardManager {
    /// Create the manager and its (not yet connected) sessions
    #[must_use]
    pub fn new(
        config: ShardManagerConfig,
        events: mpsc::UnboundedSender<ShardEvent>,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        let shards = DashMap::new();
        for &shard_id in &config.shard_ids {
            let session = ShardSession::new(
                ShardSessionConfig {
                    token: config.token.clone(),
                    intents: config.intents,
                    shard_id,
                    shard_count: config.shard_count,
                    gateway_url: config.gateway_url.clone(),
                    large_threshold: config.large_threshold,
                    compress: config.compress,
                    presence: config.presence.clone(),
                },
                events.clone(),
                shutdown.child_token(),
            );
            shards.insert(shard_id, session);
        }

        Arc::new(Self {
            shards,
            shard_count: config.shard_count,
            max_concurrency: config.max_concurrency.max(1),
            shutdown,
            driver_handles: Mutex::new(Vec::new()),
        })
    }

    /// Total shard count across all processes
    #[must_use]
    pub fn shard_count(&self) -> u32 {
        self.shard_count
    }

    /// Shard ids managed by this process, ascending
    #[must_use]
    pub fn shard_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.shards.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Get a session by shard id
    pub fn shard(&self, shard_id: u32) -> Option<Arc<ShardSession>> {
        self.shards.get(&shard_id).map(|entry| entry.clone())
    }

    /// Get the session owning a guild
    ///
    /// # Errors
    /// Returns [`ClientError::ShardNotFound`] when the guild's shard is not
    /// managed by this process.
    pub fn shard_for_guild(&self, guild_id: Snowflake) -> ClientResult<Arc<ShardSession>> {
        let shard_id = guild_id.shard_index(self.shard_count);
        self.shard(shard_id).ok_or(ClientError::ShardNotFound(shard_id))
    }

    /// Launch every shard, honoring the identify concurrency buckets
    ///
    /// Shards in the same bucket (`shard_id % max_concurrency`) start with
    /// 5 second spacing; buckets launch in parallel.
    pub async fn open(self: &Arc<Self>) {
        let shard_ids = self.shard_ids();
        let buckets = identify_buckets(&shard_ids, self.max_concurrency);

        tracing::info!(
            shards = shard_ids.len(),
            shard_count = self.shard_count,
            buckets = buckets.len(),
            "Opening shards"
        );

        for bucket in buckets {
            let manager = Arc::clone(self);
            tokio::spawn(async move {
                let last = bucket.len().saturating_sub(1);
                for (index, shard_id) in bucket.into_iter().enumerate() {
                    let Some(session) = manager.shard(shard_id) else {
                        continue;
                    };

                    let handle = session.open();
                    manager.driver_handles.lock().await.push(handle);

                    if index < last {
                        tokio::select! {
                            () = manager.shutdown.cancelled() => return,
                            () = tokio::time::sleep(IDENTIFY_SPACING) => {}
                        }
                    }
                }
            });
        }
    }

    /// Close every shard concurrently and wait for the drivers to finish
    pub async fn close(&self) {
        tracing::info!(shards = self.shards.len(), "Closing shards");
        self.shutdown.cancel();

        let sessions: Vec<Arc<ShardSession>> =
            self.shards.iter().map(|entry| entry.clone()).collect();
        futures_util::future::join_all(sessions.iter().map(|session| session.close())).await;

        let handles = std::mem::take(&mut *self.driver_handles.lock().await);
        for handle in handles {
            let _ = handle.await;
        }
    }
}

impl std::fmt::Debug for ShardManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardManager")
            .field("shards", &self.shards.len())
            .field("shard_count", &self.shard_count)
            .field("max_concurrency", &self.max_concurrency)
            .finish()
    }
}
