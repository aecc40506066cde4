//! Message handling - Inbound text parsing shared by the adapters

pub mod parser;

pub use parser::{parse_command, ParsedCommand};
