use std::sync::Arc;

use async_trait::async_trait;

use crate::application::errors::BotError;
use crate::domain::client::Client;

/// Gateway trait - transport to a chat platform
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Capabilities requested when the bot is not configured with its own
    fn default_intents(&self) -> Vec<String> {
        Vec::new()
    }

    /// Authenticate with the platform and report the bot's own identity
    async fn connect(&self, token: &str, intents: &[String]) -> Result<ClientUser, BotError>;

    /// Pump inbound traffic into the client until the connection ends
    async fn listen(&self, client: Arc<Client>) -> Result<(), BotError>;

    /// Replace every remotely registered command in `scope` with `commands`
    async fn put_commands(
        &self,
        scope: &CommandScope,
        commands: &[serde_json::Value],
    ) -> Result<(), BotError>;
}

/// The bot's own identity on the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientUser {
    pub id: String,
    pub username: String,
}

/// Where remote command registration applies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandScope {
    /// Every deployment the bot is part of
    Global { application_id: String },
    /// A single deployment target (a guild, a chat)
    Deployment {
        application_id: String,
        target: String,
    },
}

impl CommandScope {
    /// Deployment scope for a non-empty `target`, global otherwise
    pub fn new(application_id: impl Into<String>, target: Option<&str>) -> Self {
        let application_id = application_id.into();
        match target.filter(|target| !target.is_empty()) {
            Some(target) => CommandScope::Deployment {
                application_id,
                target: target.to_string(),
            },
            None => CommandScope::Global { application_id },
        }
    }
}
