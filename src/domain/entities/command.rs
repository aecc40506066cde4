use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};

use super::{CommandInteraction, PluginSettings, Value};
use crate::application::errors::BotError;
use crate::domain::client::Client;

/// Result returned by every plugin handler
pub type ActionResult = Result<(), BotError>;

/// Command handler function type
pub type CommandAction = Arc<
    dyn Fn(Arc<Client>, Arc<CommandInteraction>, PluginSettings) -> BoxFuture<'static, ActionResult>
        + Send
        + Sync,
>;

/// Wrap an async closure as a [`CommandAction`].
pub fn command_action<F, Fut>(handler: F) -> CommandAction
where
    F: Fn(Arc<Client>, Arc<CommandInteraction>, PluginSettings) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ActionResult> + Send + 'static,
{
    Arc::new(move |client, interaction, settings| handler(client, interaction, settings).boxed())
}

/// Parameter types a slash command option can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    String,
    Integer,
    Number,
    Boolean,
    User,
    Channel,
}

/// One declared parameter of a slash command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOption {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: OptionKind,
    #[serde(default)]
    pub required: bool,
}

impl CommandOption {
    pub fn new(name: impl Into<String>, kind: OptionKind) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            kind,
            required: false,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Command schema descriptor pushed to the platform's command registry.
///
/// `name` is the dispatch key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlashCommandBuilder {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
}

impl SlashCommandBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            options: Vec::new(),
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn with_option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Serialized form sent to the platform
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// A validated, invokable plugin command
#[derive(Clone)]
pub struct Command {
    pub data: SlashCommandBuilder,
    pub action: CommandAction,
}

impl Command {
    pub fn new(data: SlashCommandBuilder, action: CommandAction) -> Self {
        Self { data, action }
    }

    pub fn name(&self) -> &str {
        self.data.name()
    }

    /// Take a module export apart into a typed command.
    ///
    /// Returns `None` unless the value has a schema `data` and a command `action`.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut fields) = value else {
            return None;
        };
        let Some(Value::Schema(data)) = fields.remove("data") else {
            return None;
        };
        let Some(Value::Function(function)) = fields.remove("action") else {
            return None;
        };
        let action = function.into_command()?;
        Some(Self { data, action })
    }

    /// Build the module export a plugin library returns for this command.
    pub fn into_value(self) -> Value {
        Value::object([
            ("data", Value::Schema(self.data)),
            ("action", Value::Function(super::Function::Command(self.action))),
        ])
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}
