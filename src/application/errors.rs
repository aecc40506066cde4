//! Application layer errors

use std::path::PathBuf;
use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Plugin error: {0}")]
    Plugin(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Command execution errors
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Interaction has already been replied to")]
    AlreadyReplied,

    #[error("Interaction has not been replied to or deferred")]
    NotReplied,
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Errors raised while assembling a single plugin
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Plugin {plugin} is missing mandatory field '{field}'")]
    MissingField { plugin: String, field: &'static str },

    #[error("Plugin {0} panicked during loading")]
    Panicked(String),
}

/// Errors raised while importing one module file
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("Failed to resolve {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load library {path}: {reason}")]
    Library { path: PathBuf, reason: String },

    #[error("Missing entry symbol in {0}")]
    MissingEntry(PathBuf),

    #[error("Module {0} exported nothing")]
    NullExport(PathBuf),

    #[error("Module {path} panicked during initialization: {message}")]
    Panicked { path: PathBuf, message: String },

    #[error("No built-in module registered for {0}")]
    NotRegistered(PathBuf),
}

/// Extract a readable message from a panic payload.
pub fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        return (*msg).to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}
