//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! Two configuration scopes:
//! - **Global**: User-level settings
//! - **Project**: Per-directory overrides
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Project config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$SCHEMAREF_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/schemaref/config.toml`
//! 3. `~/.schemaref/config.toml`
//!
//! # Project Config Locations
//!
//! Searched in order:
//! 1. `.schemaref.toml`
//! 2. `.schemaref/config.toml`
//!
//! When both exist the first wins and the second is reported as ignored.
//!
//! # Example
//!
//! ```no_run
//! use schemaref::core::config::Config;
//! use std::path::Path;
//!
//! let result = Config::load(Some(Path::new("/path/to/project"))).unwrap();
//! let config = result.config;
//!
//! println!("Namespace: {}", config.default_namespace());
//! println!("Root as entity: {}", config.root_as_entity());
//! ```

pub mod schema;

pub use schema::{CodecDefaults, GlobalConfig, ProjectConfig, RegistryEntry};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::core::types::DEFAULT_NAMESPACE;

/// Default timeout for remote `$ref` fetches.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Merged configuration from all sources.
///
/// Accessors apply precedence: project config overrides global config.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Project configuration (if found)
    pub project: Option<ProjectConfig>,
    /// Path to the global config file (if loaded)
    global_path: Option<PathBuf>,
    /// Path to the project config file (if loaded)
    project_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `project_dir` is provided, also loads its project config.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or hold
    /// invalid values. Missing config files are not an error.
    pub fn load(project_dir: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let global_path = Self::locate_global();
        Self::load_from(global_path.as_deref(), project_dir)
    }

    /// Load from an explicit global config file instead of searching.
    pub fn load_from(
        global_path: Option<&Path>,
        project_dir: Option<&Path>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let global = match global_path {
            Some(path) => read_toml::<GlobalConfig>(path)?,
            None => GlobalConfig::default(),
        };

        let (project, project_path) = match project_dir {
            Some(dir) => Self::load_project(dir, &mut warnings)?,
            None => (None, None),
        };

        global.validate()?;
        if let Some(ref p) = project {
            p.validate()?;
        }

        Ok(ConfigLoadResult {
            config: Config {
                global,
                project,
                global_path: global_path.map(Path::to_path_buf),
                project_path,
            },
            warnings,
        })
    }

    /// Find the global config file, if any.
    fn locate_global() -> Option<PathBuf> {
        // 1. Check $SCHEMAREF_CONFIG
        if let Ok(path) = std::env::var("SCHEMAREF_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check $XDG_CONFIG_HOME/schemaref/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("schemaref/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. Check ~/.schemaref/config.toml
        dirs::home_dir()
            .map(|home| home.join(".schemaref/config.toml"))
            .filter(|path| path.exists())
    }

    fn load_project(
        dir: &Path,
        warnings: &mut Vec<ConfigWarning>,
    ) -> Result<(Option<ProjectConfig>, Option<PathBuf>), ConfigError> {
        let mut found = [
            Self::project_config_path(dir),
            dir.join(".schemaref/config.toml"),
        ]
        .into_iter()
        .filter(|path| path.exists());

        let Some(path) = found.next() else {
            return Ok((None, None));
        };
        for shadowed in found {
            warnings.push(ConfigWarning {
                message: format!("Ignoring config file, '{}' takes precedence", path.display()),
                path: shadowed,
            });
        }
        let config = read_toml::<ProjectConfig>(&path)?;
        Ok((Some(config), Some(path)))
    }

    /// Canonical project config path for a directory.
    pub fn project_config_path(dir: &Path) -> PathBuf {
        dir.join(".schemaref.toml")
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    fn codec<T>(&self, pick: impl Fn(&CodecDefaults) -> Option<T>) -> Option<T> {
        self.project
            .as_ref()
            .and_then(|p| p.codec.as_ref())
            .and_then(&pick)
            .or_else(|| self.global.codec.as_ref().and_then(&pick))
    }

    /// Namespace used when none is given.
    ///
    /// Defaults to "default" if not configured.
    pub fn default_namespace(&self) -> &str {
        self.project
            .as_ref()
            .and_then(|p| p.default_namespace.as_deref())
            .or(self.global.default_namespace.as_deref())
            .unwrap_or(DEFAULT_NAMESPACE)
    }

    /// Defaults to `true` if not configured.
    pub fn root_as_entity(&self) -> bool {
        self.codec(|c| c.root_as_entity).unwrap_or(true)
    }

    /// Defaults to `false` if not configured.
    pub fn append_namespace(&self) -> bool {
        self.codec(|c| c.append_namespace).unwrap_or(false)
    }

    /// Defaults to `false` if not configured.
    pub fn prepend_class(&self) -> bool {
        self.codec(|c| c.prepend_class).unwrap_or(false)
    }

    pub fn http_timeout(&self) -> Duration {
        self.codec(|c| c.http_timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT)
    }

    /// Registry patterns, project entries first.
    pub fn registries(&self) -> Vec<&RegistryEntry> {
        self.project
            .iter()
            .flat_map(|p| p.registries.iter())
            .chain(self.global.registries.iter())
            .collect()
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded project config file.
    pub fn project_config_loaded_from(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
