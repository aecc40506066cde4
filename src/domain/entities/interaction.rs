use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::application::errors::{BotError, CommandError};

/// Delivery channel for interaction replies, supplied by the gateway
#[async_trait]
pub trait Responder: Send + Sync {
    /// Send a message back to the channel the interaction came from
    async fn send(&self, channel_id: &str, content: &str, ephemeral: bool) -> Result<(), BotError>;

    /// Signal that a reply is being prepared
    async fn typing(&self, _channel_id: &str) -> Result<(), BotError> {
        Ok(())
    }
}

/// Who invoked a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionUser {
    pub id: String,
    pub username: Option<String>,
}

/// Reply payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyOptions {
    pub content: String,
    pub ephemeral: bool,
}

impl ReplyOptions {
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }
}

impl From<&str> for ReplyOptions {
    fn from(content: &str) -> Self {
        Self {
            content: content.to_string(),
            ephemeral: false,
        }
    }
}

impl From<String> for ReplyOptions {
    fn from(content: String) -> Self {
        Self {
            content,
            ephemeral: false,
        }
    }
}

/// An inbound slash-command invocation
pub struct CommandInteraction {
    pub id: String,
    pub command_name: String,
    pub args: Vec<String>,
    pub channel_id: String,
    pub user: Option<InteractionUser>,
    pub created_at: DateTime<Utc>,
    responder: Arc<dyn Responder>,
    replied: AtomicBool,
    deferred: AtomicBool,
}

impl CommandInteraction {
    pub fn new(
        command_name: impl Into<String>,
        channel_id: impl Into<String>,
        responder: Arc<dyn Responder>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            command_name: command_name.into(),
            args: Vec::new(),
            channel_id: channel_id.into(),
            user: None,
            created_at: Utc::now(),
            responder,
            replied: AtomicBool::new(false),
            deferred: AtomicBool::new(false),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_user(mut self, user: InteractionUser) -> Self {
        self.user = Some(user);
        self
    }

    pub fn replied(&self) -> bool {
        self.replied.load(Ordering::SeqCst)
    }

    pub fn deferred(&self) -> bool {
        self.deferred.load(Ordering::SeqCst)
    }

    /// Send the initial reply. Fails if a reply or deferral already happened.
    pub async fn reply(&self, options: impl Into<ReplyOptions>) -> Result<(), BotError> {
        let options = options.into();
        if self.deferred() || self.replied.swap(true, Ordering::SeqCst) {
            return Err(CommandError::AlreadyReplied.into());
        }
        self.responder
            .send(&self.channel_id, &options.content, options.ephemeral)
            .await
    }

    /// Acknowledge now, reply later through [`follow_up`](Self::follow_up).
    pub async fn defer_reply(&self) -> Result<(), BotError> {
        if self.replied() || self.deferred.swap(true, Ordering::SeqCst) {
            return Err(CommandError::AlreadyReplied.into());
        }
        self.responder.typing(&self.channel_id).await
    }

    /// Append a message after a reply or deferral.
    pub async fn follow_up(&self, options: impl Into<ReplyOptions>) -> Result<(), BotError> {
        if !self.replied() && !self.deferred() {
            return Err(CommandError::NotReplied.into());
        }
        let options = options.into();
        self.responder
            .send(&self.channel_id, &options.content, options.ephemeral)
            .await
    }
}

impl std::fmt::Debug for CommandInteraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandInteraction")
            .field("id", &self.id)
            .field("command_name", &self.command_name)
            .field("args", &self.args)
            .field("channel_id", &self.channel_id)
            .field("user", &self.user)
            .field("replied", &self.replied())
            .field("deferred", &self.deferred())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Responder for Recorder {
        async fn send(&self, _channel_id: &str, content: &str, _ephemeral: bool) -> Result<(), BotError> {
            self.sent.lock().unwrap().push(content.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_reply_then_follow_up() {
        let recorder = Arc::new(Recorder::default());
        let interaction = CommandInteraction::new("ping", "chat-1", recorder.clone());

        interaction.reply("pong").await.unwrap();
        assert!(interaction.replied());
        assert!(interaction.reply("again").await.is_err());

        interaction.follow_up("more").await.unwrap();
        assert_eq!(*recorder.sent.lock().unwrap(), vec!["pong", "more"]);
    }

    #[tokio::test]
    async fn test_follow_up_requires_reply() {
        let interaction = CommandInteraction::new("ping", "chat-1", Arc::new(Recorder::default()));
        assert!(interaction.follow_up("too early").await.is_err());

        interaction.defer_reply().await.unwrap();
        assert!(interaction.deferred());
        assert!(interaction.reply("late").await.is_err());
        assert!(interaction.follow_up("done").await.is_ok());
    }
}
