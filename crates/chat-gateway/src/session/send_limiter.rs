//! Outbound command rate limiter
//!
//! The server allows 120 gateway commands per 60 seconds per session.
//! Heartbeats bypass the limiter (they keep the session alive); everything
//! else waits here for a free slot.

use chat_common::{ClientError, ClientResult};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Sliding-window command limiter
#[derive(Debug)]
pub struct CommandLimiter {
    capacity: usize,
    window: Duration,
    stamps: Mutex<VecDeque<Instant>>,
}

impl CommandLimiter {
    /// Commands allowed per window on one session
    pub const DEFAULT_CAPACITY: usize = 120;

    /// Window length
    pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

    #[must_use]
    pub fn new(capacity: usize, window: Duration) -> Self {
        Self {
            capacity,
            window,
            stamps: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Wait for a free command slot
    ///
    /// Returns [`ClientError::Cancelled`] when the token fires first.
    pub async fn acquire(&self, cancel: &CancellationToken) -> ClientResult<()> {
        loop {
            let wait = {
                let mut stamps = self.stamps.lock().await;
                let now = Instant::now();
                while stamps.front().is_some_and(|&front| front + self.window <= now) {
                    stamps.pop_front();
                }

                if stamps.len() < self.capacity {
                    stamps.push_back(now);
                    return Ok(());
                }

                // Full: wait for the oldest stamp to leave the window.
                *stamps.front().expect("non-empty when full") + self.window - now
            };

            tokio::select! {
                () = cancel.cancelled() => return Err(ClientError::Cancelled),
                () = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Slots currently free
    pub async fn available(&self) -> usize {
        let mut stamps = self.stamps.lock().await;
        let now = Instant::now();
        while stamps.front().is_some_and(|&front| front + self.window <= now) {
            stamps.pop_front();
        }
        self.capacity - stamps.len()
    }
}

impl Default for CommandLimiter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY, Self::DEFAULT_WINDOW)
    }
}
