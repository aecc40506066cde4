//! blitz-bot - plugin-driven chat bot runtime
//!
//! Plugins live in directories under a plugins root. Each one may carry a
//! `blitz.config.yaml` plus `commands/` and `events/` module directories;
//! the bot loads them all into one dispatch table at startup.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{Bot, BotOptions, BotState};
pub use application::errors::BotError;
pub use domain::entities::{Command, Event, Plugin, PluginConfig, SlashCommandBuilder, Value};
pub use domain::client::Client;
