//! Event manager
//!
//! Holds the registered listeners and fans events out to them. Each
//! listener-event pair runs in its own task, so handlers may run
//! concurrently; every handler observes cache state at-or-after the mutation
//! of the event it receives. Handler panics are caught at the dispatch
//! boundary and logged.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use futures_util::FutureExt;

use crate::client::Client;
use crate::events::GatewayEvent;

/// A user-registered event handler
#[async_trait]
pub trait EventListener: Send + Sync {
    async fn on_event(&self, client: Arc<Client>, event: GatewayEvent);
}

/// Registry and fan-out point for event listeners
#[derive(Default)]
pub struct EventManager {
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
}

impl EventManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Register a listener
    pub fn add_listener(&self, listener: Arc<dyn EventListener>) {
        self.listeners
            .write()
            .expect("listener registry poisoned")
            .push(listener);
    }

    /// Remove a previously registered listener (matched by identity)
    pub fn remove_listener(&self, listener: &Arc<dyn EventListener>) {
        self.listeners
            .write()
            .expect("listener registry poisoned")
            .retain(|existing| !Arc::ptr_eq(existing, listener));
    }

    /// Number of registered listeners
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .expect("listener registry poisoned")
            .len()
    }

    /// Fan an event out to every listener, one task per listener
    pub fn dispatch(&self, client: &Arc<Client>, event: GatewayEvent) {
        let listeners: Vec<Arc<dyn EventListener>> = self
            .listeners
            .read()
            .expect("listener registry poisoned")
            .clone();

        tracing::trace!(
            event = event.event.name(),
            listeners = listeners.len(),
            "Dispatching event"
        );

        for listener in listeners {
            let client = Arc::clone(client);
            let event = event.clone();
            tokio::spawn(async move {
                let name = event.event.name();
                let run = std::panic::AssertUnwindSafe(listener.on_event(client, event))
                    .catch_unwind();
                if run.await.is_err() {
                    tracing::error!(event = name, "Event listener panicked");
                }
            });
        }
    }
}

impl std::fmt::Debug for EventManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventManager")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
