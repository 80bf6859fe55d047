//! Test helpers
//!
//! Builds a standalone event pipeline (caches + processor) and replays
//! serialized gateway frames through it, tracking session state the way a
//! live shard would.

use std::sync::Arc;

use chat_cache::{CacheConfig, Caches};
use chat_client::{EventProcessor, GatewayEvent};
use chat_gateway::chunking::MemberChunkCoordinator;
use chat_gateway::session::SessionState;
use chat_gateway::GatewayMessage;

/// A pipeline under test
pub struct Pipeline {
    pub caches: Arc<Caches>,
    pub chunking: Arc<MemberChunkCoordinator>,
    pub processor: EventProcessor,
    pub session: SessionState,
}

impl Pipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::with_cache_config(CacheConfig::default())
    }

    #[must_use]
    pub fn with_cache_config(config: CacheConfig) -> Self {
        let caches = Arc::new(Caches::new(config));
        let chunking = Arc::new(MemberChunkCoordinator::default());
        let processor = EventProcessor::new(Arc::clone(&caches), Arc::clone(&chunking));
        Self {
            caches,
            chunking,
            processor,
            session: SessionState::new(),
        }
    }

    /// Replay serialized frames in order, returning the typed events
    pub async fn replay(&self, frames: &[&str]) -> Vec<GatewayEvent> {
        let mut events = Vec::new();
        for frame in frames {
            let message = GatewayMessage::from_json(frame).expect("fixture frame parses");
            let (name, sequence, data) = message.as_dispatch().expect("fixture frame is a dispatch");
            self.session.advance_sequence(sequence).await;

            if let Some(event) = self.processor.process(0, name, sequence, data.clone()) {
                events.push(event);
            }
        }
        events
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
