//! Plugin loader - Discovers plugin directories and assembles them
//!
//! Every immediate subdirectory of the plugins root is one plugin. A broken
//! plugin is logged and skipped; it never stops discovery of its siblings.

use std::io::ErrorKind;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::{debug, error, info, warn};

use super::manifest::{parse_yaml, ConfigParser, DeclaredConfig, CONFIG_FILE};
use crate::application::errors::{panic_message, PluginError};
use crate::application::validators::{is_command, is_event};
use crate::domain::entities::{Command, Event, Plugin, Value};
use crate::infrastructure::modules::loader::read_dir_sorted;
use crate::infrastructure::modules::{load_modules_from_directory, ModuleLoader};

/// Subdirectory holding a plugin's command modules
pub const COMMANDS_DIR: &str = "commands";

/// Subdirectory holding a plugin's event modules
pub const EVENTS_DIR: &str = "events";

/// Plugin loader
pub struct PluginLoader {
    plugins_dir: PathBuf,
    modules: Arc<dyn ModuleLoader>,
    parser: ConfigParser,
}

impl PluginLoader {
    pub fn new(plugins_dir: impl Into<PathBuf>, modules: Arc<dyn ModuleLoader>) -> Self {
        Self {
            plugins_dir: plugins_dir.into(),
            modules,
            parser: parse_yaml,
        }
    }

    /// Replace the declarative-config parser
    pub fn with_parser(mut self, parser: ConfigParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn plugins_dir(&self) -> &Path {
        &self.plugins_dir
    }

    /// Load all plugins from the plugin directory, in lexical directory order
    pub async fn load_plugins(&self) -> Vec<Plugin> {
        let mut plugins = Vec::new();

        let entries = match read_dir_sorted(&self.plugins_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                error!(dir = %self.plugins_dir.display(), error = %e, "Failed to load plugins directory");
                return plugins;
            }
        };

        for (path, file_type) in entries {
            if !file_type.is_dir() {
                continue;
            }

            let result = AssertUnwindSafe(self.load_plugin(&path))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    Err(PluginError::Panicked(format!(
                        "{}: {}",
                        path.display(),
                        panic_message(payload)
                    )))
                });

            match result {
                Ok(plugin) => plugins.push(plugin),
                Err(e) => {
                    error!(dir = %path.display(), error = %e, "Failed to load plugin");
                }
            }
        }

        plugins
    }

    /// Load a single plugin from its directory
    pub async fn load_plugin(&self, path: &Path) -> Result<Plugin, PluginError> {
        let dir_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let config = self.load_plugin_config(path).await.resolve(&dir_name);

        if config.name.is_empty() {
            return Err(PluginError::MissingField { plugin: dir_name, field: "name" });
        }
        if config.version.is_empty() {
            return Err(PluginError::MissingField { plugin: dir_name, field: "version" });
        }

        let commands = self.load_plugin_commands(path).await;
        let events = self.load_plugin_events(path).await;

        info!(
            commands = commands.len(),
            events = events.len(),
            "Successfully loaded plugin: {} v{}",
            config.name,
            config.version
        );

        Ok(Plugin { config, commands, events })
    }

    /// Read, parse and validate `blitz.config.yaml` in `path`
    pub async fn load_plugin_config(&self, path: &Path) -> DeclaredConfig {
        let config_path = path.join(CONFIG_FILE);

        let raw = match tokio::fs::read_to_string(&config_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(dir = %path.display(), "No configuration file found; proceeding without config");
                return DeclaredConfig::Absent;
            }
            Err(e) => {
                warn!(path = %config_path.display(), error = %e, "Unreadable configuration file; proceeding without config");
                return DeclaredConfig::Invalid(e.to_string());
            }
        };

        let declared = match (self.parser)(&raw) {
            Ok(value) => DeclaredConfig::from_value(value),
            Err(e) => DeclaredConfig::Invalid(e.to_string()),
        };

        if let DeclaredConfig::Invalid(reason) = &declared {
            warn!(path = %config_path.display(), reason = %reason, "Invalid plugin configuration; proceeding without config");
        }

        declared
    }

    async fn load_plugin_commands(&self, path: &Path) -> Vec<Command> {
        self.load_subdirectory(&path.join(COMMANDS_DIR), is_command)
            .await
            .into_iter()
            .filter_map(Command::from_value)
            .collect()
    }

    async fn load_plugin_events(&self, path: &Path) -> Vec<Event> {
        self.load_subdirectory(&path.join(EVENTS_DIR), is_event)
            .await
            .into_iter()
            .filter_map(Event::from_value)
            .collect()
    }

    /// Modules of an optional subdirectory; a missing one contributes nothing
    async fn load_subdirectory(&self, dir: &Path, accept: fn(&Value) -> bool) -> Vec<Value> {
        match tokio::fs::metadata(dir).await {
            Ok(meta) if meta.is_dir() => {
                load_modules_from_directory(self.modules.as_ref(), dir, accept).await
            }
            Ok(_) => Vec::new(),
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                error!(dir = %dir.display(), error = %e, "Failed to load modules");
                Vec::new()
            }
        }
    }
}
