//! Command dispatch table
//!
//! Built once at startup from every discovered plugin and read-only after.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::{debug, error, warn};

use super::errors::panic_message;
use crate::domain::entities::{Command, CommandInteraction, Plugin, PluginSettings, ReplyOptions};
use crate::domain::client::Client;

/// Generic acknowledgment shown to users when a command handler fails
pub const COMMAND_FAILURE_MESSAGE: &str = "There was an error executing this command!";

/// A command together with the plugin that contributed it
#[derive(Debug, Clone)]
pub struct RegisteredCommand {
    pub command: Command,
    pub plugin: String,
    pub settings: PluginSettings,
}

/// What happened to one inbound invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// No command with that name; dropped
    Unknown,
    Completed,
    /// The handler failed and the user was sent the generic acknowledgment
    Failed,
}

/// Name-keyed table of every plugin command
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, RegisteredCommand>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert every command of every plugin in discovery order.
    ///
    /// On a name collision the plugin discovered last wins.
    pub fn from_plugins(plugins: &[Plugin]) -> Self {
        let mut registry = Self::new();
        for plugin in plugins {
            for command in &plugin.commands {
                registry.register(plugin, command);
            }
        }
        registry
    }

    /// Insert one command, returning the entry it replaced
    pub fn register(&mut self, plugin: &Plugin, command: &Command) -> Option<RegisteredCommand> {
        let previous = self.commands.insert(
            command.name().to_string(),
            RegisteredCommand {
                command: command.clone(),
                plugin: plugin.name().to_string(),
                settings: plugin.settings(),
            },
        );

        if let Some(previous) = &previous {
            debug!(
                "Command /{} from {} overrides the one from {}",
                command.name(),
                plugin.name(),
                previous.plugin
            );
        }
        previous
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredCommand> {
        self.commands.get(name)
    }

    /// Registered command names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Route one invocation to its handler.
    ///
    /// Handler failures, panics included, are logged and answered with
    /// [`COMMAND_FAILURE_MESSAGE`]; they never reach the caller.
    pub async fn dispatch(&self, client: Arc<Client>, interaction: Arc<CommandInteraction>) -> Dispatch {
        let name = interaction.command_name.as_str();
        let Some(entry) = self.get(name) else {
            warn!("Command {} not found.", name);
            return Dispatch::Unknown;
        };

        let action = entry.command.action.clone();
        let settings = entry.settings.clone();
        let invocation = interaction.clone();
        let result = AssertUnwindSafe(async move { action(client, invocation, settings).await })
            .catch_unwind()
            .await;

        let failure = match result {
            Ok(Ok(())) => return Dispatch::Completed,
            Ok(Err(e)) => e.to_string(),
            Err(payload) => format!("handler panicked: {}", panic_message(payload)),
        };

        error!(command = %name, plugin = %entry.plugin, error = %failure, "Error executing command");
        acknowledge_failure(&interaction).await;
        Dispatch::Failed
    }
}

async fn acknowledge_failure(interaction: &CommandInteraction) {
    let ack = ReplyOptions::ephemeral(COMMAND_FAILURE_MESSAGE);
    let sent = if interaction.replied() || interaction.deferred() {
        interaction.follow_up(ack).await
    } else {
        interaction.reply(ack).await
    };

    if let Err(e) = sent {
        error!(command = %interaction.command_name, error = %e, "Failed to acknowledge command failure");
    }
}
