//! Domain layer - Core plugin model
//! 
//! This layer contains:
//! - Client: The platform handle every plugin handler receives
//! - Entities: Plugins, commands, events and the untyped values modules export
//! - Traits: Abstractions for the chat platform transport

pub mod client;
pub mod entities;
pub mod traits;
