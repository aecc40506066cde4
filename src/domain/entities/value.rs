//! Untyped module exports
//!
//! A loaded module hands back a [`Value`]; nothing about its shape is trusted
//! until a validator has looked at it.

use std::collections::BTreeMap;
use std::fmt;

use super::{Command, CommandAction, Event, EventAction, SlashCommandBuilder};

/// A callable slot inside a module export
#[derive(Clone)]
pub enum Function {
    Command(CommandAction),
    Event(EventAction),
}

impl Function {
    pub fn is_command(&self) -> bool {
        matches!(self, Function::Command(_))
    }

    pub fn is_event(&self) -> bool {
        matches!(self, Function::Event(_))
    }

    pub fn into_command(self) -> Option<CommandAction> {
        match self {
            Function::Command(action) => Some(action),
            Function::Event(_) => None,
        }
    }

    pub fn into_event(self) -> Option<EventAction> {
        match self {
            Function::Event(action) => Some(action),
            Function::Command(_) => None,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Command(_) => f.write_str("[Function: command]"),
            Function::Event(_) => f.write_str("[Function: event]"),
        }
    }
}

/// The primary export of a dynamically loaded module
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
    Schema(SlashCommandBuilder),
    Function(Function),
}

impl Value {
    pub fn object<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Look up a field of an object; `None` for anything else.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(fields) => fields.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Lossy conversion to JSON: functions become `null`, schemas their descriptor.
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Value::Null | Value::Function(_) => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Number(n) => serde_json::Value::Number(n),
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Value::into_json).collect())
            }
            Value::Object(fields) => serde_json::Value::Object(
                fields.into_iter().map(|(k, v)| (k, v.into_json())).collect(),
            ),
            Value::Schema(data) => data.to_json(),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => {
                Value::Object(fields.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<SlashCommandBuilder> for Value {
    fn from(data: SlashCommandBuilder) -> Self {
        Value::Schema(data)
    }
}

impl From<Function> for Value {
    fn from(function: Function) -> Self {
        Value::Function(function)
    }
}

impl From<Command> for Value {
    fn from(command: Command) -> Self {
        command.into_value()
    }
}

impl From<Event> for Value {
    fn from(event: Event) -> Self {
        event.into_value()
    }
}
