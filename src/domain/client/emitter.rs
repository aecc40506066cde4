//! Named event subscriptions with persistent and one-shot listeners

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::BoxFuture;

use super::Client;

/// Listener invoked with the client and the event payload
pub type Listener =
    Arc<dyn Fn(Arc<Client>, Vec<serde_json::Value>) -> BoxFuture<'static, ()> + Send + Sync>;

struct Subscription {
    listener: Listener,
    once: bool,
}

/// Event subscription table
#[derive(Default)]
pub struct EventEmitter {
    listeners: Mutex<HashMap<String, Vec<Subscription>>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe for the lifetime of the process
    pub fn on(&self, event: impl Into<String>, listener: Listener) {
        self.subscribe(event.into(), listener, false);
    }

    /// Subscribe for the next emission only
    pub fn once(&self, event: impl Into<String>, listener: Listener) {
        self.subscribe(event.into(), listener, true);
    }

    fn subscribe(&self, event: String, listener: Listener, once: bool) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event)
            .or_default()
            .push(Subscription { listener, once });
    }

    /// Listeners to run for one emission of `event`, in subscription order.
    ///
    /// One-shot listeners are retired before they run.
    pub fn take(&self, event: &str) -> Vec<Listener> {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(subscriptions) = listeners.get_mut(event) else {
            return Vec::new();
        };

        let fired = subscriptions.iter().map(|s| s.listener.clone()).collect();
        subscriptions.retain(|s| !s.once);
        if subscriptions.is_empty() {
            listeners.remove(event);
        }
        fired
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .map(Vec::len)
            .unwrap_or(0)
    }
}
