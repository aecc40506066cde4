//! Application layer - Use cases and business logic
//! 
//! This layer contains:
//! - Bot: Startup orchestration and the plugin lifecycle
//! - Registry: The command dispatch table and runtime routing
//! - Validators: Shape checks for dynamically loaded values
//! - Errors: Domain-specific errors
//! - Messaging: Inbound command parsing

pub mod bot;
pub mod errors;
pub mod messaging;
pub mod registry;
pub mod validators;

pub use bot::{Bot, BotOptions, BotState};
pub use registry::{CommandRegistry, Dispatch, RegisteredCommand, COMMAND_FAILURE_MESSAGE};
