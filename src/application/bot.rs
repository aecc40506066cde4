//! Bot orchestrator - owns the plugin set and wires it to the platform client
//!
//! Lifecycle: `Uninitialized` → plugins loaded (`Loaded`) → connected and
//! commands pushed (`CommandsRegistered`) → listening (`Running`).

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use futures_util::FutureExt;
use tracing::{debug, error, info};

use super::errors::{panic_message, BotError};
use super::registry::CommandRegistry;
use crate::domain::entities::{Event, Plugin, PluginSettings};
use crate::domain::traits::{CommandScope, Gateway};
use crate::domain::client::Client;
use crate::infrastructure::modules::ModuleLoader;
use crate::infrastructure::plugins::PluginLoader;

/// Plugins root used when none is configured, relative to the working directory
pub const DEFAULT_PLUGINS_DIR: &str = "plugins";

/// Startup parameters
#[derive(Debug, Clone, Default)]
pub struct BotOptions {
    pub token: String,
    /// Platform capabilities to request; the gateway's defaults when `None`
    pub intents: Option<Vec<String>>,
    pub plugins_dir: Option<PathBuf>,
    /// Deployment target for command registration; global when `None`
    pub server: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    Uninitialized,
    Loaded,
    CommandsRegistered,
    Running,
}

pub struct Bot {
    client: Arc<Client>,
    token: Option<String>,
    plugins_dir: PathBuf,
    server: Option<String>,
    modules: Arc<dyn ModuleLoader>,
    plugins: Arc<Vec<Plugin>>,
    commands: Arc<CommandRegistry>,
    state: Arc<RwLock<BotState>>,
}

impl Bot {
    pub fn new(options: BotOptions, gateway: Arc<dyn Gateway>, modules: Arc<dyn ModuleLoader>) -> Self {
        let intents = options.intents.unwrap_or_else(|| gateway.default_intents());
        let plugins_dir = options.plugins_dir.unwrap_or_else(default_plugins_dir);

        Self {
            client: Client::new(gateway, intents),
            token: Some(options.token),
            plugins_dir,
            server: options.server.filter(|server| !server.is_empty()),
            modules,
            plugins: Arc::new(Vec::new()),
            commands: Arc::new(CommandRegistry::new()),
            state: Arc::new(RwLock::new(BotState::Uninitialized)),
        }
    }

    pub fn client(&self) -> Arc<Client> {
        self.client.clone()
    }

    pub fn plugins(&self) -> &[Plugin] {
        &self.plugins
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn plugins_dir(&self) -> &std::path::Path {
        &self.plugins_dir
    }

    pub fn state(&self) -> BotState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load plugins, wire handlers, log in and push commands to the platform.
    ///
    /// Plugin `ready` listeners run on their own tasks; command registration
    /// follows login directly and does not wait for them.
    pub async fn start(&mut self) -> Result<(), BotError> {
        let token = self
            .token
            .take()
            .ok_or_else(|| BotError::Auth("Bot has already been started".to_string()))?;

        self.load_plugins().await;
        self.register_event_handlers();

        self.client.login(&token).await?;

        match register_commands(&self.client, &self.plugins, self.server.as_deref()).await {
            Ok(count) => {
                info!("Successfully registered {} application commands", count);
                set_state(&self.state, BotState::CommandsRegistered);
            }
            Err(e) => error!(error = %e, "Failed to register application commands"),
        }
        Ok(())
    }

    /// Start the bot and serve inbound traffic until the gateway stops
    pub async fn run(&mut self) -> Result<(), BotError> {
        self.start().await?;
        set_state(&self.state, BotState::Running);
        self.client.listen().await
    }

    /// Discover plugins and build the command table
    pub async fn load_plugins(&mut self) {
        let loader = PluginLoader::new(&self.plugins_dir, self.modules.clone());
        let plugins = loader.load_plugins().await;

        self.commands = Arc::new(CommandRegistry::from_plugins(&plugins));
        self.plugins = Arc::new(plugins);
        set_state(&self.state, BotState::Loaded);

        info!(
            "Loaded {} plugins with {} commands",
            self.plugins.len(),
            self.commands.len()
        );
    }

    fn register_event_handlers(&self) {
        let commands = self.commands.clone();
        self.client.on_interaction(Arc::new(move |client, interaction| {
            let commands = commands.clone();
            async move {
                commands.dispatch(client, interaction).await;
            }
            .boxed()
        }));

        for plugin in self.plugins.iter() {
            for event in &plugin.events {
                subscribe_event(&self.client, plugin.settings(), event);
            }
        }
    }
}

/// Subscribe one plugin event; the listener closes over the plugin's settings
fn subscribe_event(client: &Client, settings: PluginSettings, event: &Event) {
    let name = event.event.clone();
    let action = event.action.clone();

    let listener = move |client: Arc<Client>, args: Vec<serde_json::Value>| {
        let name = name.clone();
        let action = action.clone();
        let settings = settings.clone();
        async move {
            let result = AssertUnwindSafe(async move { action(client, settings, args).await })
                .catch_unwind()
                .await;
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(event = %name, error = %e, "Error handling event"),
                Err(payload) => error!(
                    event = %name,
                    error = %panic_message(payload),
                    "Event handler panicked"
                ),
            }
        }
    };

    if event.once {
        client.once(event.event.clone(), listener);
    } else {
        client.on(event.event.clone(), listener);
    }
    debug!(event = %event.event, once = event.once, "Subscribed plugin event");
}

/// Push every plugin command descriptor in one replace-all call
async fn register_commands(
    client: &Client,
    plugins: &[Plugin],
    server: Option<&str>,
) -> Result<usize, BotError> {
    let Some(user) = client.user() else {
        error!("Client user is not available. Commands registration aborted.");
        return Err(BotError::NotFound("client user".to_string()));
    };

    let commands: Vec<serde_json::Value> = plugins
        .iter()
        .flat_map(|plugin| plugin.commands.iter().map(|cmd| cmd.data.to_json()))
        .collect();

    let scope = CommandScope::new(user.id, server);
    client.put_commands(&scope, &commands).await?;
    Ok(commands.len())
}

fn set_state(state: &RwLock<BotState>, next: BotState) {
    *state.write().unwrap_or_else(PoisonError::into_inner) = next;
    debug!(state = ?next, "Bot state changed");
}

fn default_plugins_dir() -> PathBuf {
    std::env::current_dir()
        .map(|cwd| cwd.join(DEFAULT_PLUGINS_DIR))
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_PLUGINS_DIR))
}
