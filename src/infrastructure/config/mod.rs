//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::application::bot::{BotOptions, DEFAULT_PLUGINS_DIR};
use crate::application::errors::ConfigError;

/// Bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub bot: BotConfig,
    pub plugins: PluginsConfig,
    #[serde(default)]
    pub adapter: AdapterKind,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BotConfig {
    pub token: Option<String>,
    /// Platform capabilities; adapter defaults when omitted
    pub intents: Option<Vec<String>>,
    /// Deployment target for command registration
    pub server: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PluginsConfig {
    pub directory: PathBuf,
}

/// Which chat platform to connect to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdapterKind {
    #[default]
    Console,
    Telegram,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig::default(),
            plugins: PluginsConfig {
                directory: PathBuf::from(DEFAULT_PLUGINS_DIR),
            },
            adapter: AdapterKind::Console,
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    pub fn load_env() -> Self {
        let mut config = Config::default();
        config.apply_env();
        config
    }

    /// Override fields from `BLITZ_*` environment variables
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("BLITZ_TOKEN") {
            self.bot.token = Some(token);
        }

        if let Ok(dir) = std::env::var("BLITZ_PLUGINS_DIR") {
            self.plugins.directory = PathBuf::from(dir);
        }

        if let Ok(server) = std::env::var("BLITZ_SERVER") {
            self.bot.server = Some(server).filter(|server| !server.is_empty());
        }
    }

    /// Startup parameters for the bot; a token is required
    pub fn bot_options(&self) -> Result<BotOptions, ConfigError> {
        let token = match (&self.bot.token, self.adapter) {
            (Some(token), _) if !token.is_empty() => token.clone(),
            // The console adapter has nothing to authenticate against
            (_, AdapterKind::Console) => "console".to_string(),
            _ => return Err(ConfigError::MissingField("bot.token".to_string())),
        };

        Ok(BotOptions {
            token,
            intents: self.bot.intents.clone(),
            plugins_dir: Some(self.plugins.directory.clone()),
            server: self.bot.server.clone().filter(|server| !server.is_empty()),
        })
    }
}
