//! Shape checks for dynamically loaded values
//!
//! These are total predicates: they never log, allocate state or panic, so
//! they can be applied to anything a module hands back.

use crate::domain::entities::{Function, Value};

/// True if `value` is an object with a schema `data` and a command `action`.
pub fn is_command(value: &Value) -> bool {
    matches!(value.get("data"), Some(Value::Schema(_)))
        && matches!(value.get("action"), Some(Value::Function(f)) if f.is_command())
}

/// True if `value` is an object with a string `event`, an optional boolean
/// `once` and an event `action`.
pub fn is_event(value: &Value) -> bool {
    let once_ok = matches!(value.get("once"), None | Some(Value::Bool(_)));

    matches!(value.get("event"), Some(Value::String(_)))
        && once_ok
        && matches!(value.get("action"), Some(Value::Function(Function::Event(_))))
}

/// True if `value` is a declarative plugin config.
///
/// `name` and `version` must be non-empty strings. `description`, when
/// present, must be a string and `config`, when present, an object. A
/// wrongly typed optional field rejects the whole document.
pub fn is_plugin_config(value: &Value) -> bool {
    if !value.is_object() {
        return false;
    }

    let required_ok = ["name", "version"]
        .iter()
        .all(|field| matches!(value.get(field), Some(Value::String(s)) if !s.is_empty()));

    let description_ok = matches!(value.get("description"), None | Some(Value::String(_)));
    let config_ok = matches!(value.get("config"), None | Some(Value::Object(_)));

    required_ok && description_ok && config_ok
}
