//! Plugin system for blitz-bot
//! 
//! Each plugin is a directory holding an optional `blitz.config.yaml` plus
//! `commands/` and `events/` module directories.

pub mod loader;
pub mod manifest;

pub use loader::{PluginLoader, COMMANDS_DIR, EVENTS_DIR};
pub use manifest::{parse_yaml, ConfigDocument, ConfigParser, DeclaredConfig, CONFIG_FILE};
