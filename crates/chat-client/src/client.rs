//! Client facade
//!
//! Owns every subsystem (caches, REST, shards, chunking, event pipeline,
//! webhook) and exposes the public surface. Subsystems reach back only
//! through weak references or channels; the facade is the single owner.

use std::sync::{Arc, Mutex as StdMutex, Weak};
use std::time::Duration;

use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use chat_cache::Caches;
use chat_common::{ClientConfig, ClientError, ClientResult};
use chat_core::{Member, Snowflake, UpdatePresence, User};
use chat_gateway::chunking::{ChunkRequest, MemberChunkCoordinator};
use chat_gateway::protocol::{GatewayMessage, VoiceStateUpdatePayload};
use chat_gateway::session::ShardEvent;
use chat_gateway::{ShardManager, ShardManagerConfig, ShardSession};
use chat_rest::RestClient;

use crate::events::{Event, EventListener, EventManager, EventProcessor, GatewayEvent};
use crate::webhook;

/// High-level client over gateway shards, cache, REST, and webhooks
pub struct Client {
    config: ClientConfig,
    caches: Arc<Caches>,
    rest: Arc<RestClient>,
    chunking: Arc<MemberChunkCoordinator>,
    events: EventManager,
    processor: EventProcessor,

    /// Built on connect, once the shard topology is known
    shards: RwLock<Option<Arc<ShardManager>>>,

    shard_events_tx: StdMutex<Option<mpsc::UnboundedSender<ShardEvent>>>,
    shard_events_rx: StdMutex<Option<mpsc::UnboundedReceiver<ShardEvent>>>,

    shutdown: CancellationToken,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl Client {
    /// Assemble a client; used by [`crate::ClientBuilder`]
    pub(crate) fn assemble(
        config: ClientConfig,
        caches: Arc<Caches>,
        chunking: Arc<MemberChunkCoordinator>,
        http_client: Option<chat_rest::HttpClient>,
    ) -> ClientResult<Arc<Self>> {
        let shutdown = CancellationToken::new();
        let rest = Arc::new(match http_client {
            Some(http) => RestClient::with_http_client(
                http,
                config.token.clone(),
                config.api_url.clone(),
                shutdown.child_token(),
            ),
            None => RestClient::new(
                config.token.clone(),
                config.api_url.clone(),
                shutdown.child_token(),
            )?,
        });
        let (shard_events_tx, shard_events_rx) = mpsc::unbounded_channel();

        Ok(Arc::new(Self {
            processor: EventProcessor::new(Arc::clone(&caches), Arc::clone(&chunking)),
            config,
            caches,
            rest,
            chunking,
            events: EventManager::new(),
            shards: RwLock::new(None),
            shard_events_tx: StdMutex::new(Some(shard_events_tx)),
            shard_events_rx: StdMutex::new(Some(shard_events_rx)),
            shutdown,
            background: Mutex::new(Vec::new()),
        }))
    }

    /// The entity caches
    #[must_use]
    pub fn caches(&self) -> &Arc<Caches> {
        &self.caches
    }

    /// The REST client
    #[must_use]
    pub fn rest(&self) -> &Arc<RestClient> {
        &self.rest
    }

    /// The event manager
    #[must_use]
    pub fn event_manager(&self) -> &EventManager {
        &self.events
    }

    /// The authenticated user, available once any shard saw READY
    #[must_use]
    pub fn self_user(&self) -> Option<User> {
        self.caches.self_user()
    }

    /// Register an event listener
    pub fn add_listener(&self, listener: Arc<dyn EventListener>) {
        self.events.add_listener(listener);
    }

    /// Remove an event listener
    pub fn remove_listener(&self, listener: &Arc<dyn EventListener>) {
        self.events.remove_listener(listener);
    }

    /// The shard manager; errors before [`Client::connect`]
    pub async fn shard_manager(&self) -> ClientResult<Arc<ShardManager>> {
        self.shards
            .read()
            .await
            .clone()
            .ok_or(ClientError::NoGateway)
    }

    /// The gateway session owning a guild
    pub async fn shard(&self, guild_id: Snowflake) -> ClientResult<Arc<ShardSession>> {
        self.shard_manager().await?.shard_for_guild(guild_id)
    }

    /// Connect the gateway: resolve the shard topology, start the event
    /// pipeline and webhook, and launch every shard
    pub async fn connect(self: &Arc<Self>) -> ClientResult<()> {
        {
            let mut shards = self.shards.write().await;
            if shards.is_some() {
                return Ok(());
            }

            let (gateway_url, shard_count, max_concurrency) = match self.config.shard_count {
                Some(count) => (self.config.gateway_url.clone(), count, 1),
                None => {
                    let info = self.rest.get_gateway_bot().await?;
                    tracing::info!(
                        shards = info.shards,
                        max_concurrency = info.session_start_limit.max_concurrency,
                        remaining_identifies = info.session_start_limit.remaining,
                        "Gateway topology resolved"
                    );
                    (info.url, info.shards, info.session_start_limit.max_concurrency)
                }
            };
            if shard_count == 0 {
                return Err(ClientError::config("shard count must be at least 1"));
            }

            let shard_ids = self
                .config
                .shard_ids
                .clone()
                .unwrap_or_else(|| (0..shard_count).collect());
            if let Some(&bad) = shard_ids.iter().find(|&&id| id >= shard_count) {
                return Err(ClientError::config(format!(
                    "shard id {bad} out of range for shard count {shard_count}"
                )));
            }

            let events_tx = self
                .shard_events_tx
                .lock()
                .expect("shard event sender poisoned")
                .clone()
                .ok_or(ClientError::Closed)?;

            let manager = ShardManager::new(
                ShardManagerConfig {
                    token: self.config.token.clone(),
                    intents: self.config.intents,
                    gateway_url,
                    large_threshold: self.config.large_threshold,
                    compress: self.config.compress,
                    presence: self.config.presence.clone(),
                    shard_ids,
                    shard_count,
                    max_concurrency,
                },
                events_tx,
                self.shutdown.child_token(),
            );
            *shards = Some(Arc::clone(&manager));
        }

        // Event pipeline: single consumer keeps per-shard receive order.
        if let Some(rx) = self
            .shard_events_rx
            .lock()
            .expect("shard event receiver poisoned")
            .take()
        {
            let weak = Arc::downgrade(self);
            let handle = tokio::spawn(run_pipeline(weak, rx));
            self.background.lock().await.push(handle);
        }

        if let Some(webhook_config) = &self.config.webhook {
            let handle = webhook::start(
                Arc::downgrade(self),
                webhook_config,
                self.shutdown.child_token(),
            )
            .await?;
            self.background.lock().await.push(handle);
        }

        let manager = self.shard_manager().await?;
        manager.open().await;
        Ok(())
    }

    /// Shut down: drain shards, release pending waiters, stop the servers
    ///
    /// Waits up to `timeout` for in-flight work, then abandons it. The
    /// client must not be used afterwards.
    pub async fn close(&self, timeout: Duration) {
        tracing::info!("Closing client");
        self.shutdown.cancel();
        self.chunking.close();

        // Ends the pipeline once the shard senders are gone too.
        self.shard_events_tx
            .lock()
            .expect("shard event sender poisoned")
            .take();

        let shards = self.shards.read().await.clone();
        if let Some(shards) = shards {
            if tokio::time::timeout(timeout, shards.close()).await.is_err() {
                tracing::warn!("Shards did not drain within the close timeout");
            }
        }

        let handles = std::mem::take(&mut *self.background.lock().await);
        for handle in handles {
            if tokio::time::timeout(timeout, handle).await.is_err() {
                tracing::debug!("Background task abandoned at close");
            }
        }
    }

    // === Gateway commands ===

    /// Update presence on every shard
    pub async fn set_presence(&self, presence: UpdatePresence) -> ClientResult<()> {
        let manager = self.shard_manager().await?;
        for shard_id in manager.shard_ids() {
            if let Some(shard) = manager.shard(shard_id) {
                shard.send(GatewayMessage::presence_update(&presence)).await?;
            }
        }
        Ok(())
    }

    /// Update presence on one shard
    pub async fn set_presence_for_shard(
        &self,
        shard_id: u32,
        presence: UpdatePresence,
    ) -> ClientResult<()> {
        let manager = self.shard_manager().await?;
        let shard = manager
            .shard(shard_id)
            .ok_or(ClientError::ShardNotFound(shard_id))?;
        shard.send(GatewayMessage::presence_update(&presence)).await
    }

    /// Join a voice channel (state only; no media transport)
    pub async fn voice_connect(
        &self,
        guild_id: Snowflake,
        channel_id: Snowflake,
    ) -> ClientResult<()> {
        let shard = self.shard(guild_id).await?;
        shard
            .send(GatewayMessage::voice_state_update(&VoiceStateUpdatePayload {
                guild_id,
                channel_id: Some(channel_id),
                self_mute: false,
                self_deaf: false,
            }))
            .await
    }

    /// Leave voice in a guild
    pub async fn voice_disconnect(&self, guild_id: Snowflake) -> ClientResult<()> {
        let shard = self.shard(guild_id).await?;
        shard
            .send(GatewayMessage::voice_state_update(&VoiceStateUpdatePayload {
                guild_id,
                channel_id: None,
                self_mute: false,
                self_deaf: false,
            }))
            .await
    }

    /// Fetch specific members of a guild over the gateway
    pub async fn request_members(
        &self,
        guild_id: Snowflake,
        user_ids: Vec<Snowflake>,
        presences: bool,
    ) -> ClientResult<Vec<Member>> {
        let shard = self.shard(guild_id).await?;
        self.chunking
            .request_members(
                &shard,
                guild_id,
                ChunkRequest::ByIds(user_ids),
                presences,
                &self.shutdown,
            )
            .await
    }

    /// Fetch members matching a username prefix over the gateway
    ///
    /// An empty query with `limit == 0` requests the whole guild.
    pub async fn request_members_with_query(
        &self,
        guild_id: Snowflake,
        query: impl Into<String>,
        limit: u32,
        presences: bool,
    ) -> ClientResult<Vec<Member>> {
        let shard = self.shard(guild_id).await?;
        self.chunking
            .request_members(
                &shard,
                guild_id,
                ChunkRequest::Query {
                    query: query.into(),
                    limit,
                },
                presences,
                &self.shutdown,
            )
            .await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("intents", &self.config.intents)
            .field("listeners", &self.events.listener_count())
            .finish()
    }
}

/// Pipeline loop: decode, mutate caches, then fan out, in receive order
async fn run_pipeline(client: Weak<Client>, mut rx: mpsc::UnboundedReceiver<ShardEvent>) {
    while let Some(shard_event) = rx.recv().await {
        let Some(client) = client.upgrade() else {
            break;
        };

        match shard_event {
            ShardEvent::Dispatch {
                shard_id,
                event,
                sequence,
                data,
            } => {
                if let Some(event) = client.processor.process(shard_id, &event, sequence, data) {
                    client.events.dispatch(&client, event);
                }
            }
            ShardEvent::Ready {
                shard_id,
                resumed,
            } => {
                tracing::debug!(shard_id, resumed, "Shard session ready");
            }
            ShardEvent::Disconnected {
                shard_id,
                close_code,
                reconnecting,
            } => {
                client.events.dispatch(
                    &client,
                    GatewayEvent {
                        shard_id: Some(shard_id),
                        sequence: None,
                        event: Event::Disconnected {
                            close_code,
                            reconnecting,
                        },
                    },
                );
            }
        }
    }
    tracing::debug!("Event pipeline stopped");
}
