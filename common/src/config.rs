//! # Plugin Configuration
//!
//! A flat mapping of named parameters handed to a plugin factory.
//!
//! Callers supply values as `key=value` pairs (CLI flags, JSON bodies);
//! each plugin declares the parameters it understands as a [`ParamSpec`]
//! table and the dispatcher validates the mapping *before* the plugin is
//! constructed. Missing required parameters are a hard error, unrecognized
//! optional keys are ignored.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{KitError, KitResult};

/// A single configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<String>),
}

impl ConfigValue {
    /// Guesses the most specific type for a raw CLI string.
    ///
    /// `true`/`false` become booleans, integers become integers, anything
    /// containing a comma becomes a list, the rest stays a string.
    pub fn infer(raw: &str) -> ConfigValue {
        match raw {
            "true" => return ConfigValue::Bool(true),
            "false" => return ConfigValue::Bool(false),
            _ => {}
        }
        if let Ok(n) = raw.parse::<i64>() {
            return ConfigValue::Int(n);
        }
        if raw.contains(',') {
            return ConfigValue::List(
                raw.split(',')
                    .map(|part| part.trim().to_string())
                    .filter(|part| !part.is_empty())
                    .collect(),
            );
        }
        ConfigValue::Str(raw.to_string())
    }

    fn kind(&self) -> ParamKind {
        match self {
            ConfigValue::Bool(_) => ParamKind::Bool,
            ConfigValue::Int(_) => ParamKind::Int,
            ConfigValue::Str(_) => ParamKind::Str,
            ConfigValue::List(_) => ParamKind::List,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(b) => write!(f, "{b}"),
            ConfigValue::Int(n) => write!(f, "{n}"),
            ConfigValue::Str(s) => f.write_str(s),
            ConfigValue::List(items) => f.write_str(&items.join(",")),
        }
    }
}

/// Expected type of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Str,
    Int,
    Bool,
    List,
}

/// One parameter a plugin declares.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub help: &'static str,
}

impl ParamSpec {
    pub const fn required(name: &'static str, kind: ParamKind, help: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            help,
        }
    }

    pub const fn optional(name: &'static str, kind: ParamKind, help: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            help,
        }
    }
}

/// Flat `name -> value` map supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginConfig {
    values: BTreeMap<String, ConfigValue>,
}

impl PluginConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: ConfigValue) {
        self.values.insert(name.to_string(), value);
    }

    /// Builder-style insertion, handy in tests.
    pub fn with(mut self, name: &str, value: ConfigValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ConfigValue> {
        self.values.get(name)
    }

    /// String view of a value; non-string values render their display form.
    pub fn get_str(&self, name: &str) -> Option<String> {
        self.values.get(name).map(|v| v.to_string())
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ConfigValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(ConfigValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn get_list(&self, name: &str) -> Option<&[String]> {
        match self.values.get(name) {
            Some(ConfigValue::List(items)) => Some(items),
            _ => None,
        }
    }

    /// Checks this mapping against a plugin's declared parameter table.
    ///
    /// Runs before the plugin factory; a failure here means the plugin was
    /// never constructed. Any value satisfies a `Str` parameter via its
    /// display form, every other kind must match exactly.
    pub fn validate(&self, params: &[ParamSpec]) -> KitResult<()> {
        for spec in params {
            match self.values.get(spec.name) {
                None if spec.required => {
                    return Err(KitError::ConfigValidation(format!(
                        "missing required parameter '{}'",
                        spec.name
                    )));
                }
                None => {}
                Some(value) => {
                    let ok = matches!(spec.kind, ParamKind::Str) || value.kind() == spec.kind;
                    if !ok {
                        return Err(KitError::ConfigValidation(format!(
                            "parameter '{}' expects {:?}, got {:?}",
                            spec.name,
                            spec.kind,
                            value.kind()
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: &[ParamSpec] = &[
        ParamSpec::required("path", ParamKind::Str, "seed file location"),
        ParamSpec::optional("port", ParamKind::Int, "target port"),
    ];

    #[test]
    fn infer_picks_the_most_specific_type() {
        assert_eq!(ConfigValue::infer("true"), ConfigValue::Bool(true));
        assert_eq!(ConfigValue::infer("443"), ConfigValue::Int(443));
        assert_eq!(
            ConfigValue::infer("a,b"),
            ConfigValue::List(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(
            ConfigValue::infer("seeds.txt"),
            ConfigValue::Str("seeds.txt".to_string())
        );
    }

    #[test]
    fn missing_required_parameter_is_rejected() {
        let config = PluginConfig::new();
        let err = config.validate(PARAMS).unwrap_err();
        assert!(matches!(err, KitError::ConfigValidation(_)));
    }

    #[test]
    fn wrong_type_is_rejected_but_unknown_keys_pass() {
        let config = PluginConfig::new()
            .with("path", ConfigValue::Str("seeds.txt".to_string()))
            .with("port", ConfigValue::Str("not-a-port".to_string()))
            .with("totally-unknown", ConfigValue::Bool(true));
        assert!(config.validate(PARAMS).is_err());

        let config = PluginConfig::new()
            .with("path", ConfigValue::Int(7))
            .with("totally-unknown", ConfigValue::Bool(true));
        // ints satisfy string parameters through their display form
        assert!(config.validate(PARAMS).is_ok());
        assert_eq!(config.get_str("path").as_deref(), Some("7"));
    }
}
