//! Platform client - event subscriptions, interaction routing and the gateway handle

pub mod emitter;

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use futures_util::future::{BoxFuture, FutureExt};
use tokio::task::JoinHandle;

use crate::application::errors::BotError;
use crate::domain::entities::CommandInteraction;
use crate::domain::traits::{ClientUser, CommandScope, Gateway};

pub use emitter::{EventEmitter, Listener};

/// Emitted once the gateway connection is established
pub const READY_EVENT: &str = "ready";

/// Emitted for inbound chat messages that are not commands
pub const MESSAGE_EVENT: &str = "messageCreate";

/// Receives every inbound command invocation
pub type InteractionHandler =
    Arc<dyn Fn(Arc<Client>, Arc<CommandInteraction>) -> BoxFuture<'static, ()> + Send + Sync>;

/// Handle to the chat platform shared with every plugin handler
pub struct Client {
    gateway: Arc<dyn Gateway>,
    intents: Vec<String>,
    emitter: EventEmitter,
    interaction_handler: RwLock<Option<InteractionHandler>>,
    user: RwLock<Option<ClientUser>>,
}

impl Client {
    pub fn new(gateway: Arc<dyn Gateway>, intents: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            gateway,
            intents,
            emitter: EventEmitter::new(),
            interaction_handler: RwLock::new(None),
            user: RwLock::new(None),
        })
    }

    pub fn intents(&self) -> &[String] {
        &self.intents
    }

    /// The bot's own identity, available once logged in
    pub fn user(&self) -> Option<ClientUser> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_ready(&self) -> bool {
        self.user().is_some()
    }

    pub fn on<F, Fut>(&self, event: impl Into<String>, listener: F)
    where
        F: Fn(Arc<Client>, Vec<serde_json::Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.emitter.on(event, Arc::new(move |c, args| listener(c, args).boxed()));
    }

    pub fn once<F, Fut>(&self, event: impl Into<String>, listener: F)
    where
        F: Fn(Arc<Client>, Vec<serde_json::Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.emitter.once(event, Arc::new(move |c, args| listener(c, args).boxed()));
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.emitter.listener_count(event)
    }

    /// Start every listener of `event` on its own task, in subscription order.
    ///
    /// A listener that never completes only stalls itself. The returned
    /// handles may be awaited or dropped; an empty set means nobody was
    /// subscribed.
    pub fn emit(self: &Arc<Self>, event: &str, args: Vec<serde_json::Value>) -> Vec<JoinHandle<()>> {
        self.emitter
            .take(event)
            .into_iter()
            .map(|listener| tokio::spawn(listener(self.clone(), args.clone())))
            .collect()
    }

    /// Install the handler that receives command invocations
    pub fn on_interaction(&self, handler: InteractionHandler) {
        *self
            .interaction_handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    pub async fn dispatch_interaction(self: &Arc<Self>, interaction: CommandInteraction) {
        let handler = self
            .interaction_handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match handler {
            Some(handler) => handler(self.clone(), Arc::new(interaction)).await,
            None => tracing::warn!(
                "No interaction handler installed; dropping /{}",
                interaction.command_name
            ),
        }
    }

    /// Connect to the platform and fire the `ready` event.
    ///
    /// Returns once the `ready` listeners have been started, not when they finish.
    pub async fn login(self: &Arc<Self>, token: &str) -> Result<(), BotError> {
        let user = self.gateway.connect(token, &self.intents).await?;
        tracing::info!("{} is online!", user.username);
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user);

        self.emit(READY_EVENT, Vec::new());
        Ok(())
    }

    /// Drive the gateway until it stops delivering traffic
    pub async fn listen(self: &Arc<Self>) -> Result<(), BotError> {
        self.gateway.listen(self.clone()).await
    }

    pub async fn put_commands(
        &self,
        scope: &CommandScope,
        commands: &[serde_json::Value],
    ) -> Result<(), BotError> {
        self.gateway.put_commands(scope, commands).await
    }
}
