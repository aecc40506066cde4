//! Console adapter for development/testing

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::application::errors::BotError;
use crate::application::messaging::parse_command;
use crate::domain::entities::{CommandInteraction, InteractionUser, Responder};
use crate::domain::traits::{ClientUser, CommandScope, Gateway};
use crate::domain::client::{Client, MESSAGE_EVENT};

/// Channel id every console interaction is attributed to
const CONSOLE_CHANNEL: &str = "console";

/// Console gateway for local development: reads commands from stdin
pub struct ConsoleGateway {
    username: String,
}

impl ConsoleGateway {
    pub fn new() -> Self {
        Self {
            username: "blitz-bot".to_string(),
        }
    }
}

impl Default for ConsoleGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Gateway for ConsoleGateway {
    fn default_intents(&self) -> Vec<String> {
        vec!["messages".to_string()]
    }

    async fn connect(&self, _token: &str, _intents: &[String]) -> Result<ClientUser, BotError> {
        tracing::info!("Starting console bot (dev mode)");
        Ok(ClientUser {
            id: "console".to_string(),
            username: self.username.clone(),
        })
    }

    async fn listen(&self, client: Arc<Client>) -> Result<(), BotError> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        println!("Type /command [args] to invoke a plugin command, 'quit' to exit.");

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| BotError::Internal(format!("Failed to read stdin: {}", e)))?
        {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line == "quit" || line == "exit" {
                break;
            }

            match parse_command(line) {
                Some(parsed) => {
                    let interaction = CommandInteraction::new(
                        parsed.name,
                        CONSOLE_CHANNEL,
                        Arc::new(ConsoleResponder),
                    )
                    .with_args(parsed.args)
                    .with_user(InteractionUser {
                        id: "console-user".to_string(),
                        username: std::env::var("USER").ok(),
                    });

                    let client = client.clone();
                    tokio::spawn(async move {
                        client.dispatch_interaction(interaction).await;
                    });
                }
                None => {
                    let payload = serde_json::json!({
                        "channel_id": CONSOLE_CHANNEL,
                        "text": line,
                    });
                    client.emit(MESSAGE_EVENT, vec![payload]);
                }
            }
        }

        tracing::info!("Console input closed");
        Ok(())
    }

    async fn put_commands(
        &self,
        scope: &CommandScope,
        commands: &[serde_json::Value],
    ) -> Result<(), BotError> {
        tracing::info!(scope = ?scope, "Registering {} commands with console", commands.len());
        for command in commands {
            println!(
                "  /{} - {}",
                command["name"].as_str().unwrap_or_default(),
                command["description"].as_str().unwrap_or_default()
            );
        }
        Ok(())
    }
}

/// Prints replies to stdout
struct ConsoleResponder;

#[async_trait]
impl Responder for ConsoleResponder {
    async fn send(&self, _channel_id: &str, content: &str, ephemeral: bool) -> Result<(), BotError> {
        if ephemeral {
            println!("[BOT] (only you) {}", content);
        } else {
            println!("[BOT] {}", content);
        }
        Ok(())
    }

    async fn typing(&self, _channel_id: &str) -> Result<(), BotError> {
        println!("[BOT] ...");
        Ok(())
    }
}
