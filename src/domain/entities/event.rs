use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};

use super::{ActionResult, PluginSettings, Value};
use crate::domain::client::Client;

/// Event handler function type; the trailing argument carries the event payload
pub type EventAction = Arc<
    dyn Fn(Arc<Client>, PluginSettings, Vec<serde_json::Value>) -> BoxFuture<'static, ActionResult>
        + Send
        + Sync,
>;

/// Wrap an async closure as an [`EventAction`].
pub fn event_action<F, Fut>(handler: F) -> EventAction
where
    F: Fn(Arc<Client>, PluginSettings, Vec<serde_json::Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ActionResult> + Send + 'static,
{
    Arc::new(move |client, settings, args| handler(client, settings, args).boxed())
}

/// A validated subscription to a platform event
#[derive(Clone)]
pub struct Event {
    pub event: String,
    pub once: bool,
    pub action: EventAction,
}

impl Event {
    pub fn new(event: impl Into<String>, action: EventAction) -> Self {
        Self {
            event: event.into(),
            once: false,
            action,
        }
    }

    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    /// Take a module export apart into a typed event.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut fields) = value else {
            return None;
        };
        let Some(Value::String(event)) = fields.remove("event") else {
            return None;
        };
        let once = match fields.remove("once") {
            None => false,
            Some(Value::Bool(once)) => once,
            Some(_) => return None,
        };
        let Some(Value::Function(function)) = fields.remove("action") else {
            return None;
        };
        let action = function.into_event()?;
        Some(Self { event, once, action })
    }

    pub fn into_value(self) -> Value {
        Value::object([
            ("event", Value::String(self.event)),
            ("once", Value::Bool(self.once)),
            ("action", Value::Function(super::Function::Event(self.action))),
        ])
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("event", &self.event)
            .field("once", &self.once)
            .finish_non_exhaustive()
    }
}
