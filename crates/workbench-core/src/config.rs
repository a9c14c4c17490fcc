//! Workbench configuration.
//!
//! Values are layered, later sources winning:
//!
//! 1. built-in defaults ([`WorkbenchConfig::default`])
//! 2. an optional TOML file
//! 3. environment variables (`TEMPLATE_WORKBENCH_*`)

use crate::codec::ShareableState;
use crate::location::Location;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Directory name used under the platform config/data directories.
pub const APP_DIR: &str = "template-workbench";

/// Environment variable naming an explicit config file.
pub const ENV_CONFIG: &str = "TEMPLATE_WORKBENCH_CONFIG";
/// Environment override for [`WorkbenchConfig::base_url`].
pub const ENV_BASE_URL: &str = "TEMPLATE_WORKBENCH_BASE_URL";
/// Environment override for [`WorkbenchConfig::state_path`].
pub const ENV_STATE: &str = "TEMPLATE_WORKBENCH_STATE";
/// Environment override for [`WorkbenchConfig::log_filter`].
pub const ENV_LOG: &str = "TEMPLATE_WORKBENCH_LOG";
/// Environment override for [`WorkbenchConfig::log_path`].
pub const ENV_LOG_FILE: &str = "TEMPLATE_WORKBENCH_LOG_FILE";
/// Environment override for [`WorkbenchConfig::variables_syntax`].
pub const ENV_VARIABLES: &str = "TEMPLATE_WORKBENCH_VARIABLES";

/// Template shown when neither a link nor persisted state is available.
pub const DEFAULT_TEMPLATE: &str = "Hello, {{ name }}!";
/// Variable definitions shown when neither a link nor persisted state is available.
pub const DEFAULT_VARIABLES: &str = r#"{"name": "World"}"#;

#[derive(Debug, Error)]
/// Errors produced while loading configuration.
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    /// The config file could not be read.
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    #[error("TOML parse error: {0}")]
    /// The config file is not valid TOML for this schema.
    Toml(#[from] toml::de::Error),

    #[error("invalid value for {key}: {value:?}")]
    /// A setting has a value outside its domain.
    InvalidValue {
        /// The setting name.
        key: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Which language the variable-definition surface is written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariablesSyntax {
    /// A JSON object literal.
    #[default]
    Json,
    /// A template-language expression evaluating to a mapping (Python-style dict literals).
    Expression,
}

impl FromStr for VariablesSyntax {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "expression" | "expr" => Ok(Self::Expression),
            _ => Err(ConfigError::InvalidValue {
                key: "variables_syntax",
                value: s.to_string(),
            }),
        }
    }
}

/// Workbench settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbenchConfig {
    /// Location share links are built from.
    pub base_url: String,
    /// Persisted state file; `None` keeps state in memory only.
    pub state_path: Option<PathBuf>,
    /// `tracing` filter directive (e.g. `info`, `workbench_core=debug`).
    pub log_filter: String,
    /// Log file; defaults to `workbench.log` next to the state file.
    pub log_path: Option<PathBuf>,
    /// Variable-definition language.
    pub variables_syntax: VariablesSyntax,
    /// Built-in template.
    pub default_template: String,
    /// Built-in variable definitions.
    pub default_variables: String,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost/".to_string(),
            state_path: dirs::data_local_dir().map(|dir| dir.join(APP_DIR).join("state.json")),
            log_filter: "info".to_string(),
            log_path: None,
            variables_syntax: VariablesSyntax::default(),
            default_template: DEFAULT_TEMPLATE.to_string(),
            default_variables: DEFAULT_VARIABLES.to_string(),
        }
    }
}

impl WorkbenchConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Load configuration from the default file location and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let lookup = |key: &str| std::env::var(key).ok();
        let path = lookup(ENV_CONFIG)
            .map(PathBuf::from)
            .or_else(|| dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml")));
        Self::load_from(path.as_deref(), lookup)
    }

    /// Load configuration from `path` (skipped when absent or missing) and `lookup`.
    pub fn load_from(
        path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => Self::default(),
        };
        config.apply_env_with(lookup)
    }

    /// Apply `TEMPLATE_WORKBENCH_*` overrides read through `lookup`.
    pub fn apply_env_with(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.base_url = base_url;
        }
        if let Some(state) = lookup(ENV_STATE) {
            self.state_path = (!state.is_empty()).then(|| PathBuf::from(state));
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.log_filter = filter;
        }
        if let Some(log_file) = lookup(ENV_LOG_FILE) {
            self.log_path = Some(PathBuf::from(log_file));
        }
        if let Some(syntax) = lookup(ENV_VARIABLES) {
            self.variables_syntax = syntax.parse()?;
        }
        Ok(self)
    }

    /// The location share links are built from.
    pub fn location(&self) -> Result<Location, ConfigError> {
        Location::parse(&self.base_url).map_err(|_| ConfigError::InvalidValue {
            key: "base_url",
            value: self.base_url.clone(),
        })
    }

    /// The resolved log file path, if any.
    pub fn resolved_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(|| {
            self.state_path
                .as_ref()
                .and_then(|state| state.parent())
                .map(|dir| dir.join("workbench.log"))
        })
    }

    /// The built-in default input pair.
    pub fn default_state(&self) -> ShareableState {
        ShareableState::new(&self.default_template, &self.default_variables)
    }
}
