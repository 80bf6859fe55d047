//! Shard session
//!
//! One gateway WebSocket from connect through identify, heartbeat, live
//! dispatch, disconnect, and resume/reidentify. A driver task owns the
//! reconnect loop; each connection splits into a reader (this task) and a
//! single-writer task fed by an mpsc channel.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval_at, Instant};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use chat_common::{ClientError, ClientResult};
use chat_core::{Intents, UpdatePresence};

use crate::compression::Inflater;
use crate::events::{EventType, ReadyData};
use crate::protocol::{
    CloseCode, GatewayMessage, IdentifyPayload, IdentifyProperties, OpCode, ResumePayload,
};
use crate::session::{CommandLimiter, SessionState, SessionStatus};

/// Gateway protocol version spoken by this client
pub const GATEWAY_VERSION: u8 = 10;

/// Channel buffer size for outgoing messages
const MESSAGE_BUFFER_SIZE: usize = 100;

/// Reconnect backoff bounds (full jitter)
const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(60);

/// Configuration for one shard session
#[derive(Debug, Clone)]
pub struct ShardSessionConfig {
    pub token: String,
    pub intents: Intents,
    pub shard_id: u32,
    pub shard_count: u32,
    pub gateway_url: String,
    pub large_threshold: u8,
    pub compress: bool,
    pub presence: Option<UpdatePresence>,
}

/// Events a shard session emits to its owner, in receive order
#[derive(Debug, Clone)]
pub enum ShardEvent {
    /// A dispatched gateway event
    Dispatch {
        shard_id: u32,
        event: String,
        sequence: u64,
        data: Value,
    },
    /// The session reached Ready
    Ready { shard_id: u32, resumed: bool },
    /// The session lost (or gave up) its connection
    Disconnected {
        shard_id: u32,
        close_code: Option<u16>,
        reconnecting: bool,
    },
}

/// What to do after a connection ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseAction {
    /// Shut the session down for good
    Stop,
    /// Reconnect and resume with the known session id
    Resume,
    /// Reconnect and identify from scratch
    Reidentify,
}

/// One gateway session bound to a shard id
pub struct ShardSession {
    config: ShardSessionConfig,
    state: SessionState,
    limiter: CommandLimiter,
    /// Writer channel of the live connection, None while disconnected
    commands: RwLock<Option<mpsc::Sender<Message>>>,
    events: mpsc::UnboundedSender<ShardEvent>,
    shutdown: CancellationToken,
}

impl ShardSession {
    #[must_use]
    pub fn new(
        config: ShardSessionConfig,
        events: mpsc::UnboundedSender<ShardEvent>,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            state: SessionState::new(),
            limiter: CommandLimiter::default(),
            commands: RwLock::new(None),
            events,
            shutdown,
        })
    }

    pub fn shard_id(&self) -> u32 {
        self.config.shard_id
    }

    pub async fn status(&self) -> SessionStatus {
        self.state.status().await
    }

    pub async fn session_id(&self) -> Option<String> {
        self.state.session_id().await
    }

    pub async fn last_sequence(&self) -> Option<u64> {
        self.state.last_sequence().await
    }

    /// Heartbeat round-trip time of the last acknowledged beat
    pub async fn latency(&self) -> Option<Duration> {
        self.state.latency().await
    }

    /// Launch the session driver; it reconnects until shutdown or a fatal close
    pub fn open(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move { session.drive().await })
    }

    /// Send a user command over this session's socket
    ///
    /// Serializes through the single-writer channel, metered at 120 commands
    /// per 60 seconds.
    pub async fn send(&self, message: GatewayMessage) -> ClientResult<()> {
        self.limiter.acquire(&self.shutdown).await?;

        let tx = self
            .commands
            .read()
            .await
            .clone()
            .ok_or_else(|| ClientError::gateway("shard is not connected"))?;

        let json = message.to_json().map_err(ClientError::internal)?;
        tx.send(Message::Text(json))
            .await
            .map_err(|_| ClientError::gateway("shard writer closed"))
    }

    /// Request this session to stop; the driver exits after the socket closes
    pub async fn close(&self) {
        self.state.set_status(SessionStatus::Disconnecting).await;
        self.shutdown.cancel();
    }

    /// Reconnect loop with exponential backoff and full jitter
    async fn drive(self: Arc<Self>) {
        let mut backoff = BACKOFF_BASE;

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let result = self.run_connection().await;
            let reached_ready = self.state.status().await == SessionStatus::Ready;

            *self.commands.write().await = None;
            self.state.reset_heartbeat().await;
            self.state.set_status(SessionStatus::Disconnected).await;

            match result {
                Ok(CloseAction::Stop) => {
                    self.emit_disconnected(None, false);
                    break;
                }
                Ok(CloseAction::Resume) => {
                    self.emit_disconnected(None, true);
                }
                Ok(CloseAction::Reidentify) => {
                    self.state.clear_session().await;
                    self.emit_disconnected(None, true);
                }
                Err(ClientError::FatalClose { code, reason }) => {
                    tracing::error!(
                        shard_id = self.config.shard_id,
                        close_code = code,
                        reason = %reason,
                        "Fatal gateway close; shard will not reconnect"
                    );
                    self.emit_disconnected(Some(code), false);
                    break;
                }
                Err(err) if err.is_cancellation() => {
                    self.emit_disconnected(None, false);
                    break;
                }
                Err(err) => {
                    tracing::warn!(
                        shard_id = self.config.shard_id,
                        error = %err,
                        "Gateway connection error"
                    );
                    self.emit_disconnected(None, true);
                }
            }

            if reached_ready {
                backoff = BACKOFF_BASE;
            }

            let delay = backoff.mul_f64(rand::random::<f64>());
            tracing::debug!(
                shard_id = self.config.shard_id,
                delay_ms = delay.as_millis() as u64,
                "Reconnecting after backoff"
            );
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
            backoff = (backoff * 2).min(BACKOFF_CAP);
        }

        self.state.set_status(SessionStatus::Disconnected).await;
    }

    /// One socket lifetime: connect, Hello, identify/resume, live loop
    async fn run_connection(&self) -> ClientResult<CloseAction> {
        let resume = self.state.resume_info().await;
        let url = self.connect_url().await;

        self.state.set_status(SessionStatus::Connecting).await;
        tracing::debug!(shard_id = self.config.shard_id, url = %url, "Connecting to gateway");

        let (socket, _response) = tokio::select! {
            () = self.shutdown.cancelled() => return Ok(CloseAction::Stop),
            result = connect_async(&url) => result.map_err(|e| ClientError::gateway(e))?,
        };
        let (mut sink, mut stream) = socket.split();
        let mut inflater = self.config.compress.then(Inflater::new);

        // First inbound frame must be Hello.
        let hello = loop {
            let frame = tokio::select! {
                () = self.shutdown.cancelled() => return Ok(CloseAction::Stop),
                frame = stream.next() => frame,
            };
            let Some(frame) = frame else {
                return Err(ClientError::gateway("socket closed before Hello"));
            };
            let frame = frame.map_err(|e| ClientError::gateway(e))?;
            if let Some(text) = decode_frame(frame, &mut inflater)? {
                let message = GatewayMessage::from_json(&text).map_err(ClientError::internal)?;
                match message.as_hello() {
                    Some(hello) => break hello,
                    None => return Err(ClientError::gateway("expected Hello as first frame")),
                }
            }
        };

        // Single-writer task over the sink.
        let (tx, mut rx) = mpsc::channel::<Message>(MESSAGE_BUFFER_SIZE);
        *self.commands.write().await = Some(tx.clone());
        let shard_id = self.config.shard_id;
        let writer = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if sink.send(message).await.is_err() {
                    tracing::debug!(shard_id, "Gateway writer closed");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let action = self
            .session_loop(&tx, &mut stream, &mut inflater, hello.heartbeat_interval, resume)
            .await;

        // Dropping the last sender ends the writer task.
        *self.commands.write().await = None;
        drop(tx);
        let _ = writer.await;

        action
    }

    async fn session_loop<S>(
        &self,
        tx: &mpsc::Sender<Message>,
        stream: &mut S,
        inflater: &mut Option<Inflater>,
        heartbeat_interval_ms: u64,
        resume: Option<(String, u64)>,
    ) -> ClientResult<CloseAction>
    where
        S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
            + Unpin,
    {
        match &resume {
            Some((session_id, seq)) => {
                self.state.set_status(SessionStatus::Resuming).await;
                tracing::info!(
                    shard_id = self.config.shard_id,
                    session_id = %session_id,
                    seq = seq,
                    "Resuming gateway session"
                );
                self.queue(tx, GatewayMessage::resume(&ResumePayload {
                    token: self.config.token.clone(),
                    session_id: session_id.clone(),
                    seq: *seq,
                }))
                .await?;
            }
            None => {
                self.state.set_status(SessionStatus::Identifying).await;
                self.state.clear_session().await;
                tracing::info!(shard_id = self.config.shard_id, "Identifying gateway session");
                self.queue(tx, GatewayMessage::identify(&self.identify_payload())).await?;
            }
        }

        // First heartbeat fires at a random fraction of the interval.
        let interval = Duration::from_millis(heartbeat_interval_ms);
        let jitter = interval.mul_f64(rand::random::<f64>());
        let mut heartbeat = interval_at(Instant::now() + jitter, interval);

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    self.queue(tx, close_frame(WsCloseCode::Normal, "shutting down")).await.ok();
                    return Ok(CloseAction::Stop);
                }

                _ = heartbeat.tick() => {
                    if !self.state.is_heartbeat_acked().await {
                        tracing::warn!(
                            shard_id = self.config.shard_id,
                            "Heartbeat not acknowledged; reconnecting to resume"
                        );
                        self.queue(tx, close_frame(WsCloseCode::Library(4000), "heartbeat ack missed"))
                            .await
                            .ok();
                        return Ok(CloseAction::Resume);
                    }
                    self.send_heartbeat(tx).await?;
                }

                frame = stream.next() => {
                    let Some(frame) = frame else {
                        // Dropped without a close frame; resume if possible.
                        return Ok(CloseAction::Resume);
                    };
                    let frame = frame.map_err(|e| ClientError::gateway(e))?;

                    match frame {
                        Message::Close(close) => return self.classify_close(close).await,
                        Message::Ping(payload) => {
                            self.queue(tx, Message::Pong(payload)).await.ok();
                        }
                        Message::Pong(_) => {}
                        other => {
                            if let Some(text) = decode_frame(other, inflater)? {
                                if let Some(action) = self.handle_text(tx, &text).await? {
                                    return Ok(action);
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    /// Handle one decoded gateway frame; Some(action) ends the connection
    async fn handle_text(
        &self,
        tx: &mpsc::Sender<Message>,
        text: &str,
    ) -> ClientResult<Option<CloseAction>> {
        let message = match GatewayMessage::from_json(text) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(
                    shard_id = self.config.shard_id,
                    error = %err,
                    "Failed to parse gateway frame"
                );
                return Ok(None);
            }
        };

        match message.op {
            OpCode::Dispatch => {
                self.handle_dispatch(&message).await;
                Ok(None)
            }
            OpCode::Heartbeat => {
                // Server asked for an immediate beat.
                self.send_heartbeat(tx).await?;
                Ok(None)
            }
            OpCode::Reconnect => {
                tracing::info!(shard_id = self.config.shard_id, "Server requested reconnect");
                Ok(Some(CloseAction::Resume))
            }
            OpCode::InvalidSession => {
                let resumable = message.as_invalid_session().unwrap_or(false);
                tracing::info!(
                    shard_id = self.config.shard_id,
                    resumable = resumable,
                    "Session invalidated"
                );
                if resumable {
                    return Ok(Some(CloseAction::Resume));
                }
                self.state.clear_session().await;

                // Mandatory 1-5 s pause before the fresh identify.
                let delay = Duration::from_millis(1_000 + (rand::random::<f64>() * 4_000.0) as u64);
                tokio::select! {
                    () = self.shutdown.cancelled() => return Ok(Some(CloseAction::Stop)),
                    () = tokio::time::sleep(delay) => {}
                }
                Ok(Some(CloseAction::Reidentify))
            }
            OpCode::Hello => Ok(None),
            OpCode::HeartbeatAck => {
                self.state.ack_heartbeat().await;
                Ok(None)
            }
            op => {
                tracing::warn!(shard_id = self.config.shard_id, op = %op, "Unexpected client op from server");
                Ok(None)
            }
        }
    }

    async fn handle_dispatch(&self, message: &GatewayMessage) {
        let Some((name, sequence, data)) = message.as_dispatch() else {
            tracing::warn!(shard_id = self.config.shard_id, "Malformed dispatch frame");
            return;
        };

        self.state.advance_sequence(sequence).await;

        match EventType::parse(name) {
            Some(EventType::Ready) => {
                match serde_json::from_value::<ReadyData>(data.clone()) {
                    Ok(ready) => {
                        self.state
                            .set_session(ready.session_id.clone(), ready.resume_gateway_url.clone())
                            .await;
                        self.state.set_status(SessionStatus::Ready).await;
                        tracing::info!(
                            shard_id = self.config.shard_id,
                            session_id = %ready.session_id,
                            guilds = ready.guilds.len(),
                            "Shard ready"
                        );
                        let _ = self.events.send(ShardEvent::Ready {
                            shard_id: self.config.shard_id,
                            resumed: false,
                        });
                    }
                    Err(err) => {
                        tracing::error!(
                            shard_id = self.config.shard_id,
                            error = %err,
                            "Failed to decode READY"
                        );
                    }
                }
            }
            Some(EventType::Resumed) => {
                self.state.set_status(SessionStatus::Ready).await;
                tracing::info!(shard_id = self.config.shard_id, "Shard resumed");
                let _ = self.events.send(ShardEvent::Ready {
                    shard_id: self.config.shard_id,
                    resumed: true,
                });
            }
            Some(_) | None => {}
        }

        let _ = self.events.send(ShardEvent::Dispatch {
            shard_id: self.config.shard_id,
            event: name.to_string(),
            sequence,
            data: data.clone(),
        });
    }

    /// Map a server close frame to the follow-up action
    async fn classify_close(&self, close: Option<CloseFrame<'_>>) -> ClientResult<CloseAction> {
        let raw = close.as_ref().map(|frame| u16::from(frame.code));
        tracing::info!(
            shard_id = self.config.shard_id,
            close_code = raw,
            "Gateway closed the connection"
        );

        let Some(code) = raw.and_then(CloseCode::from_u16) else {
            // Non-protocol close (1000, 1001, ...): reconnect, resuming if known.
            return Ok(if self.state.resume_info().await.is_some() {
                CloseAction::Resume
            } else {
                CloseAction::Reidentify
            });
        };

        if !code.should_reconnect() {
            return Err(ClientError::FatalClose {
                code: code.as_u16(),
                reason: code.description().to_string(),
            });
        }
        if code.can_resume() && self.state.resume_info().await.is_some() {
            Ok(CloseAction::Resume)
        } else {
            Ok(CloseAction::Reidentify)
        }
    }

    async fn send_heartbeat(&self, tx: &mpsc::Sender<Message>) -> ClientResult<()> {
        let seq = self.state.last_sequence().await;
        self.queue(tx, GatewayMessage::heartbeat(seq)).await?;
        self.state.mark_heartbeat_sent().await;
        Ok(())
    }

    /// Queue a frame on the writer without the command limiter
    async fn queue(
        &self,
        tx: &mpsc::Sender<Message>,
        message: impl Into<QueuedFrame>,
    ) -> ClientResult<()> {
        let frame = match message.into() {
            QueuedFrame::Gateway(message) => {
                Message::Text(message.to_json().map_err(ClientError::internal)?)
            }
            QueuedFrame::Raw(frame) => frame,
        };
        tx.send(frame)
            .await
            .map_err(|_| ClientError::gateway("shard writer closed"))
    }

    fn identify_payload(&self) -> IdentifyPayload {
        IdentifyPayload {
            token: self.config.token.clone(),
            properties: IdentifyProperties::current(),
            intents: self.config.intents,
            shard: [self.config.shard_id, self.config.shard_count],
            large_threshold: self.config.large_threshold,
            compress: false,
            presence: self.config.presence.clone(),
        }
    }

    async fn connect_url(&self) -> String {
        let base = self
            .state
            .resume_url()
            .await
            .unwrap_or_else(|| self.config.gateway_url.clone());
        let mut url = format!("{base}?v={GATEWAY_VERSION}&encoding=json");
        if self.config.compress {
            url.push_str("&compress=zlib-stream");
        }
        url
    }

    fn emit_disconnected(&self, close_code: Option<u16>, reconnecting: bool) {
        let _ = self.events.send(ShardEvent::Disconnected {
            shard_id: self.config.shard_id,
            close_code,
            reconnecting,
        });
    }
}

impl std::fmt::Debug for ShardSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardSession")
            .field("shard_id", &self.config.shard_id)
            .field("shard_count", &self.config.shard_count)
            .finish()
    }
}

/// Frame kinds accepted by the writer queue
enum QueuedFrame {
    Gateway(GatewayMessage),
    Raw(Message),
}

impl From<GatewayMessage> for QueuedFrame {
    fn from(message: GatewayMessage) -> Self {
        Self::Gateway(message)
    }
}

impl From<Message> for QueuedFrame {
    fn from(frame: Message) -> Self {
        Self::Raw(frame)
    }
}

fn close_frame(code: WsCloseCode, reason: &'static str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: reason.into(),
    }))
}

/// Decode an inbound frame to JSON text, inflating when compression is on
fn decode_frame(
    frame: Message,
    inflater: &mut Option<Inflater>,
) -> ClientResult<Option<String>> {
    match frame {
        Message::Text(text) => Ok(Some(text)),
        Message::Binary(bytes) => {
            let decoded = match inflater {
                Some(inflater) => match inflater
                    .push(&bytes)
                    .map_err(|e| ClientError::gateway(format!("inflate error: {e}")))?
                {
                    Some(decoded) => decoded,
                    None => return Ok(None),
                },
                None => bytes,
            };
            String::from_utf8(decoded)
                .map(Some)
                .map_err(|_| ClientError::gateway("binary frame was not valid UTF-8"))
        }
        _ => Ok(None),
    }
}
