//! Telegram adapter
//!
//! Long-polls the Bot API for updates, turns `/command` messages into
//! interactions and maps command registration onto `setMyCommands`.
//! Telegram has no ephemeral messages, so ephemeral replies are sent as
//! ordinary ones.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::application::errors::BotError;
use crate::application::messaging::parse_command;
use crate::domain::entities::{CommandInteraction, InteractionUser, Responder};
use crate::domain::traits::{ClientUser, CommandScope, Gateway};
use crate::domain::client::{Client, MESSAGE_EVENT};

/// Telegram API base URL
const API_BASE: &str = "https://api.telegram.org";

/// Long-poll timeout for getUpdates
const POLL_TIMEOUT_SECS: i64 = 30;

/// Back-off after a failed poll
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Telegram update type
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
}

/// Envelope of every Bot API response
#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Authenticated Bot API handle
#[derive(Clone)]
struct TelegramApi {
    http: HttpClient,
    api_base: String,
    token: String,
}

impl TelegramApi {
    /// Get the API URL for a method
    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    async fn call<T, B>(&self, method: &str, body: &B) -> Result<T, BotError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self
            .http
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        let status = response.status();
        let data: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| BotError::Parse(e.to_string()))?;

        if !data.ok {
            let reason = data.description.unwrap_or_else(|| status.to_string());
            return Err(if status == reqwest::StatusCode::UNAUTHORIZED {
                BotError::Auth(reason)
            } else {
                BotError::Network(format!("Telegram API error in {}: {}", method, reason))
            });
        }

        data.result
            .ok_or_else(|| BotError::Parse(format!("Telegram {} returned no result", method)))
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), BotError> {
        let _: serde_json::Value = self
            .call("sendMessage", &serde_json::json!({ "chat_id": chat_id, "text": text }))
            .await?;
        Ok(())
    }

    /// Send chat action (typing, upload_photo, etc.)
    async fn send_chat_action(&self, chat_id: &str, action: &str) -> Result<(), BotError> {
        let _: bool = self
            .call("sendChatAction", &serde_json::json!({ "chat_id": chat_id, "action": action }))
            .await?;
        Ok(())
    }

    async fn get_updates(
        &self,
        offset: i64,
        allowed_updates: &[String],
    ) -> Result<Vec<Update>, BotError> {
        self.call(
            "getUpdates",
            &serde_json::json!({
                "offset": offset,
                "timeout": POLL_TIMEOUT_SECS,
                "allowed_updates": allowed_updates,
            }),
        )
        .await
    }
}

/// Telegram gateway
pub struct TelegramGateway {
    http: HttpClient,
    api_base: String,
    session: RwLock<Option<Session>>,
}

#[derive(Clone)]
struct Session {
    api: TelegramApi,
    username: String,
    allowed_updates: Vec<String>,
}

impl TelegramGateway {
    pub fn new() -> Self {
        Self::with_api_base(API_BASE)
    }

    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self {
            http: HttpClient::builder()
                .timeout(Duration::from_secs(POLL_TIMEOUT_SECS as u64 + 10))
                .build()
                .unwrap_or_default(),
            api_base: api_base.into(),
            session: RwLock::new(None),
        }
    }

    fn session(&self) -> Result<Session, BotError> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| BotError::Auth("Telegram gateway is not connected".to_string()))
    }

    /// Get the next update offset
    pub fn get_next_offset(updates: &[Update]) -> i64 {
        updates.iter().map(|u| u.update_id + 1).max().unwrap_or(0)
    }

    async fn handle_update(client: &Arc<Client>, session: &Session, update: Update) {
        let Some(message) = update.message else {
            return;
        };
        let chat_id = message.chat.id.to_string();

        let parsed = message
            .text
            .as_deref()
            .and_then(parse_command)
            .filter(|parsed| parsed.is_for(&session.username));

        let Some(parsed) = parsed else {
            match serde_json::to_value(&message) {
                Ok(payload) => {
                    client.emit(MESSAGE_EVENT, vec![payload]);
                }
                Err(e) => tracing::warn!("Failed to encode message {}: {}", message.message_id, e),
            }
            return;
        };

        let responder = Arc::new(TelegramResponder {
            api: session.api.clone(),
        });
        let mut interaction =
            CommandInteraction::new(parsed.name, chat_id, responder).with_args(parsed.args);
        if let Some(from) = message.from {
            interaction = interaction.with_user(InteractionUser {
                id: from.id.to_string(),
                username: from.username,
            });
        }

        let client = client.clone();
        tokio::spawn(async move {
            client.dispatch_interaction(interaction).await;
        });
    }
}

impl Default for TelegramGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Gateway for TelegramGateway {
    fn default_intents(&self) -> Vec<String> {
        vec!["message".to_string()]
    }

    async fn connect(&self, token: &str, intents: &[String]) -> Result<ClientUser, BotError> {
        #[derive(Deserialize)]
        struct BotInfoResponse {
            id: i64,
            username: String,
        }

        let token_preview: String = token.chars().take(8).collect();
        tracing::info!("Starting Telegram bot (token: {}...)", token_preview);

        let api = TelegramApi {
            http: self.http.clone(),
            api_base: self.api_base.clone(),
            token: token.to_string(),
        };
        let me: BotInfoResponse = api.call("getMe", &serde_json::json!({})).await?;

        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(Session {
            api,
            username: me.username.clone(),
            allowed_updates: intents.to_vec(),
        });

        Ok(ClientUser {
            id: me.id.to_string(),
            username: me.username,
        })
    }

    async fn listen(&self, client: Arc<Client>) -> Result<(), BotError> {
        let session = self.session()?;
        let mut offset = 0;

        loop {
            let updates = match session.api.get_updates(offset, &session.allowed_updates).await {
                Ok(updates) => updates,
                Err(BotError::Auth(reason)) => return Err(BotError::Auth(reason)),
                Err(e) => {
                    tracing::warn!("Failed to fetch updates: {}", e);
                    tokio::time::sleep(RETRY_DELAY).await;
                    continue;
                }
            };

            if !updates.is_empty() {
                offset = Self::get_next_offset(&updates);
            }
            for update in updates {
                Self::handle_update(&client, &session, update).await;
            }
        }
    }

    async fn put_commands(
        &self,
        scope: &CommandScope,
        commands: &[serde_json::Value],
    ) -> Result<(), BotError> {
        let session = self.session()?;
        let request = set_my_commands_request(scope, commands);

        let _: bool = session.api.call("setMyCommands", &request).await?;
        tracing::info!("Registered {} bot commands with Telegram", commands.len());
        Ok(())
    }
}

/// Body of `setMyCommands` for the given scope
fn set_my_commands_request(scope: &CommandScope, commands: &[serde_json::Value]) -> serde_json::Value {
    let commands: Vec<serde_json::Value> = commands
        .iter()
        .filter_map(|data| {
            let name = data["name"].as_str()?;
            let description = match data["description"].as_str() {
                Some(d) if !d.is_empty() => d,
                _ => name,
            };
            Some(serde_json::json!({ "command": name, "description": description }))
        })
        .collect();

    let scope = match scope {
        CommandScope::Global { .. } => serde_json::json!({ "type": "default" }),
        CommandScope::Deployment { target, .. } => {
            serde_json::json!({ "type": "chat", "chat_id": target })
        }
    };

    serde_json::json!({ "commands": commands, "scope": scope })
}

/// Replies into the chat the command came from
struct TelegramResponder {
    api: TelegramApi,
}

#[async_trait]
impl Responder for TelegramResponder {
    async fn send(&self, channel_id: &str, content: &str, _ephemeral: bool) -> Result<(), BotError> {
        self.api.send_message(channel_id, content).await
    }

    async fn typing(&self, channel_id: &str) -> Result<(), BotError> {
        self.api.send_chat_action(channel_id, "typing").await
    }
}
