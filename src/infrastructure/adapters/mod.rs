//! Platform adapters - Gateway implementations

pub mod console;
pub mod telegram;

pub use console::ConsoleGateway;
pub use telegram::TelegramGateway;
