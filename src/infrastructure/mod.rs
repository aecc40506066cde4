//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Configuration loading
//! - Modules: Dynamic module loading
//! - Plugins: Plugin discovery
//! - Adapters: Platform integrations (console, Telegram)

pub mod adapters;
pub mod config;
pub mod modules;
pub mod plugins;
