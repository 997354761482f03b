//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$SCHEMAREF_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/schemaref/config.toml`
//! 3. `~/.schemaref/config.toml`
//!
//! # Project Config
//!
//! Located at `<dir>/.schemaref.toml`.
//!
//! # Validation
//!
//! Values are validated after parsing (e.g., registry regexes must compile
//! and namespaces may not contain whitespace).

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::validate_namespace;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// default_namespace = "default"
///
/// [codec]
/// root_as_entity = true
/// http_timeout_secs = 30
///
/// [[registries]]
/// pattern = "^tenant_"
/// regex = true
/// default_schema = "tenant"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Namespace used when none is given
    pub default_namespace: Option<String>,

    /// Codec defaults
    pub codec: Option<CodecDefaults>,

    /// Registry patterns
    pub registries: Vec<RegistryEntry>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_common(
            self.default_namespace.as_deref(),
            self.codec.as_ref(),
            &self.registries,
        )
    }
}

/// Project configuration, overriding the global one.
///
/// # Example
///
/// ```toml
/// default_namespace = "fleet"
///
/// [codec]
/// prepend_class = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Namespace used when none is given
    pub default_namespace: Option<String>,

    /// Codec defaults
    pub codec: Option<CodecDefaults>,

    /// Registry patterns, consulted before the global ones
    pub registries: Vec<RegistryEntry>,
}

impl ProjectConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_common(
            self.default_namespace.as_deref(),
            self.codec.as_ref(),
            &self.registries,
        )
    }
}

fn validate_common(
    namespace: Option<&str>,
    codec: Option<&CodecDefaults>,
    registries: &[RegistryEntry],
) -> Result<(), ConfigError> {
    if let Some(ns) = namespace {
        validate_namespace(ns).map_err(|e| {
            ConfigError::InvalidValue(format!("invalid default_namespace: {}", e))
        })?;
    }
    if let Some(codec) = codec {
        codec.validate()?;
    }
    for entry in registries {
        entry.validate()?;
    }
    Ok(())
}

/// Codec defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CodecDefaults {
    /// Treat the document root as an entity
    pub root_as_entity: Option<bool>,

    /// Tag serialized definitions with `$namespace`
    pub append_namespace: Option<bool>,

    /// Prefix names synthesized from property names with the owner's name
    pub prepend_class: Option<bool>,

    /// Timeout for remote `$ref` fetches
    pub http_timeout_secs: Option<u64>,
}

impl CodecDefaults {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "http_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// A namespace pattern with its own registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RegistryEntry {
    /// Literal namespace, or a regular expression when `regex` is set
    pub pattern: String,

    #[serde(default)]
    pub regex: bool,

    /// Schema for entities without explicit membership
    #[serde(default)]
    pub default_schema: Option<String>,
}

impl RegistryEntry {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pattern.is_empty() {
            return Err(ConfigError::InvalidValue(
                "registry pattern cannot be empty".to_string(),
            ));
        }
        if self.regex {
            Regex::new(&self.pattern).map_err(|e| {
                ConfigError::InvalidValue(format!(
                    "invalid registry regex '{}': {}",
                    self.pattern, e
                ))
            })?;
        }
        if self.default_schema.as_deref() == Some("") {
            return Err(ConfigError::InvalidValue(
                "default_schema cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod global {
        use super::*;

        #[test]
        fn parses_full_example() {
            let config: GlobalConfig = toml::from_str(
                r#"
                default_namespace = "fleet"

                [codec]
                root_as_entity = false
                http_timeout_secs = 5

                [[registries]]
                pattern = "^tenant_"
                regex = true
                default_schema = "tenant"

                [[registries]]
                pattern = "archive"
                "#,
            )
            .unwrap();

            assert_eq!(config.default_namespace.as_deref(), Some("fleet"));
            assert_eq!(config.codec.as_ref().unwrap().http_timeout_secs, Some(5));
            assert_eq!(config.registries.len(), 2);
            assert!(!config.registries[1].regex);
            assert!(config.validate().is_ok());
        }

        #[test]
        fn empty_is_valid() {
            assert!(GlobalConfig::default().validate().is_ok());
        }

        #[test]
        fn unknown_field_rejected() {
            let result: Result<GlobalConfig, _> = toml::from_str("colour = \"red\"");
            assert!(result.is_err());
        }

        #[test]
        fn bad_namespace_rejected() {
            let config = GlobalConfig {
                default_namespace: Some(String::new()),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }
    }

    mod entries {
        use super::*;

        #[test]
        fn invalid_regex_rejected() {
            let entry = RegistryEntry {
                pattern: "([".to_string(),
                regex: true,
                default_schema: None,
            };
            assert!(entry.validate().is_err());
        }

        #[test]
        fn literal_pattern_not_compiled() {
            let entry = RegistryEntry {
                pattern: "([".to_string(),
                regex: false,
                default_schema: None,
            };
            assert!(entry.validate().is_ok());
        }

        #[test]
        fn zero_timeout_rejected() {
            let codec = CodecDefaults {
                http_timeout_secs: Some(0),
                ..Default::default()
            };
            assert!(codec.validate().is_err());
        }
    }
}
