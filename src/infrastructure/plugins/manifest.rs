//! Declarative plugin config (`blitz.config.yaml`)

use std::collections::BTreeMap;

use crate::application::errors::ConfigError;
use crate::application::validators::is_plugin_config;
use crate::domain::entities::{PluginConfig, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

/// File name of the declarative config inside a plugin directory
pub const CONFIG_FILE: &str = "blitz.config.yaml";

/// Turns raw declarative-config text into an untyped value
pub type ConfigParser = fn(&str) -> Result<Value, ConfigError>;

/// Default [`ConfigParser`]: YAML through `serde_yaml`
pub fn parse_yaml(raw: &str) -> Result<Value, ConfigError> {
    let parsed: serde_json::Value =
        serde_yaml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
    Ok(Value::from(parsed))
}

/// A declarative config that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub config: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Outcome of reading a plugin's declarative config
#[derive(Debug, Clone, PartialEq)]
pub enum DeclaredConfig {
    /// No config file in the plugin directory
    Absent,
    /// A file exists but could not be read, parsed or validated
    Invalid(String),
    Valid(ConfigDocument),
}

impl DeclaredConfig {
    /// Validate a parsed document. Anything short of a well-formed config is
    /// discarded as a whole.
    pub fn from_value(value: Value) -> Self {
        if !is_plugin_config(&value) {
            return DeclaredConfig::Invalid("Invalid plugin configuration format".to_string());
        }
        let Value::Object(mut fields) = value else {
            return DeclaredConfig::Invalid("Plugin configuration is not a mapping".to_string());
        };

        let (Some(name), Some(version)) = (
            take_string(&mut fields, "name"),
            take_string(&mut fields, "version"),
        ) else {
            return DeclaredConfig::Invalid("Missing 'name' or 'version'".to_string());
        };

        let config = fields.remove("config").map(|settings| match settings.into_json() {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        });

        DeclaredConfig::Valid(ConfigDocument {
            name,
            version,
            description: take_string(&mut fields, "description"),
            config,
        })
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, DeclaredConfig::Valid(_))
    }

    /// Final plugin metadata, filling every missing field with its default
    pub fn resolve(self, dir_name: &str) -> PluginConfig {
        let mut resolved = PluginConfig::with_defaults(dir_name);
        if let DeclaredConfig::Valid(doc) = self {
            resolved.name = doc.name;
            resolved.version = doc.version;
            if let Some(description) = doc.description {
                resolved.description = description;
            }
            if let Some(settings) = doc.config {
                resolved.config = Arc::new(RwLock::new(settings));
            }
        }
        resolved
    }
}

fn take_string(fields: &mut BTreeMap<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{DEFAULT_DESCRIPTION, DEFAULT_VERSION};
    use serde_json::json;

    #[test]
    fn test_parse_yaml_document() {
        let value = parse_yaml("name: foo\nversion: \"1.0\"\nconfig:\n  retries: 3\n").unwrap();
        assert_eq!(value.into_json(), json!({"name": "foo", "version": "1.0", "config": {"retries": 3}}));
    }

    #[test]
    fn test_parse_yaml_rejects_garbage() {
        assert!(parse_yaml("name: [unclosed").is_err());
    }

    #[tokio::test]
    async fn test_valid_document_resolves_all_fields() {
        let declared = DeclaredConfig::from_value(Value::from(json!({
            "name": "greeter",
            "version": "2.1.0",
            "description": "Says hello",
            "config": {"greeting": "hi"}
        })));
        assert!(declared.is_valid());

        let config = declared.resolve("dir-name");
        assert_eq!(config.name, "greeter");
        assert_eq!(config.version, "2.1.0");
        assert_eq!(config.description, "Says hello");
        assert_eq!(config.config.read().await.get("greeting"), Some(&json!("hi")));
    }

    #[tokio::test]
    async fn test_invalid_document_is_discarded_whole() {
        let declared = DeclaredConfig::from_value(Value::from(json!({
            "name": "greeter",
            "version": "2.1.0",
            "description": 12
        })));
        assert!(matches!(declared, DeclaredConfig::Invalid(_)));

        let config = declared.resolve("dir-name");
        assert_eq!(config.name, "dir-name");
        assert_eq!(config.version, DEFAULT_VERSION);
        assert_eq!(config.description, DEFAULT_DESCRIPTION);
        assert!(config.config.read().await.is_empty());
    }
}
