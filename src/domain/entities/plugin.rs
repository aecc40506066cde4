use std::sync::Arc;

use tokio::sync::RwLock;

use super::{Command, Event};

/// Opaque plugin-specific settings, shared by every handler of one plugin
pub type PluginSettings = Arc<RwLock<serde_json::Map<String, serde_json::Value>>>;

/// Version used when the declarative config does not supply one
pub const DEFAULT_VERSION: &str = "unknown";

/// Description used when the declarative config does not supply one
pub const DEFAULT_DESCRIPTION: &str = "No description provided";

/// Resolved plugin metadata
#[derive(Debug, Clone)]
pub struct PluginConfig {
    pub name: String,
    pub version: String,
    pub description: String,
    pub config: PluginSettings,
}

impl PluginConfig {
    /// Metadata with every field defaulted from the plugin's directory name
    pub fn with_defaults(dir_name: impl Into<String>) -> Self {
        Self {
            name: dir_name.into(),
            version: DEFAULT_VERSION.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            config: Arc::new(RwLock::new(serde_json::Map::new())),
        }
    }
}

/// One discovered plugin: metadata plus everything it contributes
#[derive(Debug, Clone)]
pub struct Plugin {
    pub config: PluginConfig,
    pub commands: Vec<Command>,
    pub events: Vec<Event>,
}

impl Plugin {
    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    pub fn settings(&self) -> PluginSettings {
        self.config.config.clone()
    }
}
