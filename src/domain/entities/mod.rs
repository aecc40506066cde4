//! Domain entities - Plugins and everything they contribute

pub mod command;
pub mod event;
pub mod interaction;
pub mod plugin;
pub mod value;

pub use command::{
    command_action, ActionResult, Command, CommandAction, CommandOption, OptionKind,
    SlashCommandBuilder,
};
pub use event::{event_action, Event, EventAction};
pub use interaction::{CommandInteraction, InteractionUser, ReplyOptions, Responder};
pub use plugin::{Plugin, PluginConfig, PluginSettings, DEFAULT_DESCRIPTION, DEFAULT_VERSION};
pub use value::{Function, Value};
