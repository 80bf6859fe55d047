//! Per-session connection state
//!
//! Tracks the lifecycle status, resume identity, sequence counter, and
//! heartbeat bookkeeping for one gateway session.

use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Gateway session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No connection
    Disconnected,
    /// Socket opening, waiting for Hello
    Connecting,
    /// Identify sent, waiting for Ready
    Identifying,
    /// Resume sent, waiting for replay
    Resuming,
    /// Live and dispatching
    Ready,
    /// Close requested, draining
    Disconnecting,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Identifying => "Identifying",
            Self::Resuming => "Resuming",
            Self::Ready => "Ready",
            Self::Disconnecting => "Disconnecting",
        };
        f.write_str(name)
    }
}

/// Mutable state of one gateway session
#[derive(Debug)]
pub struct SessionState {
    status: RwLock<SessionStatus>,

    /// Server-issued on READY, cleared on unresumable disconnect
    session_id: RwLock<Option<String>>,

    /// Preferred reconnect URL, supplied on READY
    resume_url: RwLock<Option<String>>,

    /// Highest dispatch sequence seen; reset only on fresh identify
    last_sequence: RwLock<Option<u64>>,

    /// When the outstanding heartbeat was sent
    heartbeat_sent: RwLock<Option<Instant>>,

    /// Whether the last heartbeat has been acknowledged
    heartbeat_acked: RwLock<bool>,

    /// Send-to-ack round trip of the last heartbeat
    latency: RwLock<Option<Duration>>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: RwLock::new(SessionStatus::Disconnected),
            session_id: RwLock::new(None),
            resume_url: RwLock::new(None),
            last_sequence: RwLock::new(None),
            heartbeat_sent: RwLock::new(None),
            heartbeat_acked: RwLock::new(true),
            latency: RwLock::new(None),
        }
    }

    pub async fn status(&self) -> SessionStatus {
        *self.status.read().await
    }

    pub async fn set_status(&self, status: SessionStatus) {
        *self.status.write().await = status;
    }

    pub async fn session_id(&self) -> Option<String> {
        self.session_id.read().await.clone()
    }

    pub async fn resume_url(&self) -> Option<String> {
        self.resume_url.read().await.clone()
    }

    /// Record the identity delivered by READY
    pub async fn set_session(&self, session_id: String, resume_url: Option<String>) {
        *self.session_id.write().await = Some(session_id);
        *self.resume_url.write().await = resume_url;
    }

    /// Forget the session identity; the next connection must identify
    pub async fn clear_session(&self) {
        *self.session_id.write().await = None;
        *self.resume_url.write().await = None;
        *self.last_sequence.write().await = None;
    }

    pub async fn last_sequence(&self) -> Option<u64> {
        *self.last_sequence.read().await
    }

    /// Advance the sequence counter; ignores regressions
    ///
    /// Returns whether the counter moved.
    pub async fn advance_sequence(&self, sequence: u64) -> bool {
        let mut guard = self.last_sequence.write().await;
        if guard.map_or(true, |current| sequence > current) {
            *guard = Some(sequence);
            true
        } else {
            false
        }
    }

    /// Resume identity, available only when both id and sequence are known
    pub async fn resume_info(&self) -> Option<(String, u64)> {
        let session_id = self.session_id.read().await.clone()?;
        let sequence = (*self.last_sequence.read().await)?;
        Some((session_id, sequence))
    }

    /// Record an outgoing heartbeat; exactly one may be outstanding
    pub async fn mark_heartbeat_sent(&self) {
        *self.heartbeat_sent.write().await = Some(Instant::now());
        *self.heartbeat_acked.write().await = false;
    }

    /// Record the heartbeat acknowledgement and measure latency
    pub async fn ack_heartbeat(&self) {
        *self.heartbeat_acked.write().await = true;
        if let Some(sent) = *self.heartbeat_sent.read().await {
            *self.latency.write().await = Some(sent.elapsed());
        }
    }

    pub async fn is_heartbeat_acked(&self) -> bool {
        *self.heartbeat_acked.read().await
    }

    /// Reset heartbeat bookkeeping for a fresh connection
    pub async fn reset_heartbeat(&self) {
        *self.heartbeat_sent.write().await = None;
        *self.heartbeat_acked.write().await = true;
    }

    /// Send-to-ack round trip of the most recent heartbeat
    pub async fn latency(&self) -> Option<Duration> {
        *self.latency.read().await
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initial_state() {
        let state = SessionState::new();
        assert_eq!(state.status().await, SessionStatus::Disconnected);
        assert!(state.session_id().await.is_none());
        assert!(state.last_sequence().await.is_none());
        assert!(state.is_heartbeat_acked().await);
        assert!(state.resume_info().await.is_none());
    }

    #[tokio::test]
    async fn test_sequence_only_advances() {
        let state = SessionState::new();

        assert!(state.advance_sequence(5).await);
        assert!(state.advance_sequence(6).await);
        assert!(!state.advance_sequence(6).await);
        assert!(!state.advance_sequence(3).await);
        assert_eq!(state.last_sequence().await, Some(6));
    }

    #[tokio::test]
    async fn test_clear_session_resets_sequence() {
        let state = SessionState::new();
        state.set_session("abc".to_string(), None).await;
        state.advance_sequence(9).await;
        assert_eq!(state.resume_info().await, Some(("abc".to_string(), 9)));

        state.clear_session().await;
        assert!(state.session_id().await.is_none());
        assert!(state.last_sequence().await.is_none());
        assert!(state.resume_info().await.is_none());
    }

    #[tokio::test]
    async fn test_resume_info_needs_sequence() {
        let state = SessionState::new();
        state.set_session("abc".to_string(), Some("wss://resume".to_string())).await;

        // No dispatch seen yet: nothing to resume from.
        assert!(state.resume_info().await.is_none());

        state.advance_sequence(1).await;
        assert_eq!(state.resume_info().await, Some(("abc".to_string(), 1)));
        assert_eq!(state.resume_url().await, Some("wss://resume".to_string()));
    }

    #[tokio::test]
    async fn test_heartbeat_ack_cycle() {
        let state = SessionState::new();
        assert!(state.is_heartbeat_acked().await);

        state.mark_heartbeat_sent().await;
        assert!(!state.is_heartbeat_acked().await);

        state.ack_heartbeat().await;
        assert!(state.is_heartbeat_acked().await);
        assert!(state.latency().await.is_some());
    }
}
