//! Configuration for fanlog loggers
//!
//! Holds the file-backed [`LoggerConfig`], the [`Capacity`] bound of the event
//! store, and the validation used when settings are changed at runtime.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Key the event log snapshot is stored under unless configured otherwise
pub const DEFAULT_STORAGE_KEY: &str = "eventLog";

/// Prefix of broadcast event names unless configured otherwise
pub const DEFAULT_EVENT_NAMESPACE: &str = "fanlog:";

/// Maximum number of nested pipeline runs on one thread
pub const DEFAULT_MAX_DISPATCH_DEPTH: usize = 8;

/// Errors raised when a setting receives a value of the wrong shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{setting} must be {expected}. Received: {received}")]
    InvalidType {
        setting: Setting,
        expected: &'static str,
        received: String,
    },

    #[error("maxEvents must be null or a non-negative integer. Received: {received}")]
    InvalidCapacity { received: String },

    #[error("unknown setting: {0}")]
    UnknownSetting(String),
}

/// Maximum number of retained events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capacity {
    #[default]
    Unbounded,
    /// At most this many events; `Bounded(0)` stores nothing
    Bounded(usize),
}

impl Capacity {
    /// Build from an optional limit, `None` meaning unbounded
    pub fn from_limit(limit: Option<usize>) -> Self {
        match limit {
            Some(n) => Capacity::Bounded(n),
            None => Capacity::Unbounded,
        }
    }

    /// The limit, or `None` when unbounded
    pub fn limit(&self) -> Option<usize> {
        match self {
            Capacity::Unbounded => None,
            Capacity::Bounded(n) => Some(*n),
        }
    }

    /// Validate a dynamically typed capacity: `null` or a non-negative integer
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        match value {
            Value::Null => Ok(Capacity::Unbounded),
            Value::Number(n) => n
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .map(Capacity::Bounded)
                .ok_or_else(|| ConfigError::InvalidCapacity {
                    received: describe_value(value),
                }),
            other => Err(ConfigError::InvalidCapacity {
                received: describe_value(other),
            }),
        }
    }
}

/// Runtime-adjustable logger settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    LoggingEnabled,
    SuppressNative,
    SuppressConsole,
    EnableDispatchEvents,
    MaxEvents,
}

impl Setting {
    /// Canonical name as used in messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Setting::LoggingEnabled => "loggingEnabled",
            Setting::SuppressNative => "suppressNative",
            Setting::SuppressConsole => "suppressConsole",
            Setting::EnableDispatchEvents => "enableDispatchEvents",
            Setting::MaxEvents => "maxEvents",
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Setting {
    type Err = ConfigError;

    /// Accepts both `snake_case` and `camelCase` spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "logging_enabled" | "loggingEnabled" => Ok(Setting::LoggingEnabled),
            "suppress_native" | "suppressNative" => Ok(Setting::SuppressNative),
            "suppress_console" | "suppressConsole" => Ok(Setting::SuppressConsole),
            "enable_dispatch_events" | "enableDispatchEvents" => {
                Ok(Setting::EnableDispatchEvents)
            }
            "max_events" | "maxEvents" => Ok(Setting::MaxEvents),
            other => Err(ConfigError::UnknownSetting(other.to_string())),
        }
    }
}

/// Validate a value for one of the boolean flags
pub fn expect_bool(setting: Setting, value: &Value) -> Result<bool, ConfigError> {
    value.as_bool().ok_or_else(|| ConfigError::InvalidType {
        setting,
        expected: "a boolean (true or false)",
        received: describe_value(value),
    })
}

/// Describe a value's JSON type and content for error messages
fn describe_value(value: &Value) -> String {
    let kind = match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    format!("{} with value: {}", kind, value)
}

/// Logger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Global switch for recording and dispatch
    #[serde(default = "default_true")]
    pub logging_enabled: bool,

    /// Skip appending to the event store
    #[serde(default)]
    pub suppress_native: bool,

    /// Skip writing to the console sink
    #[serde(default)]
    pub suppress_console: bool,

    /// Emit broadcast events when a broadcast sink is present
    #[serde(default = "default_true")]
    pub enable_dispatch_events: bool,

    /// Maximum number of stored events (absent = unbounded)
    #[serde(default)]
    pub max_events: Option<usize>,

    /// Storage key of the persisted snapshot
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Prefix prepended to broadcast event names (may be empty)
    #[serde(default = "default_event_namespace")]
    pub event_namespace: String,

    /// Maximum nesting of pipeline runs triggered from client handlers
    #[serde(default = "default_max_dispatch_depth")]
    pub max_dispatch_depth: usize,

    /// Directory for file-backed storage; `~` and env vars are expanded
    #[serde(default)]
    pub storage_dir: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn default_event_namespace() -> String {
    DEFAULT_EVENT_NAMESPACE.to_string()
}

fn default_max_dispatch_depth() -> usize {
    DEFAULT_MAX_DISPATCH_DEPTH
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            logging_enabled: true,
            suppress_native: false,
            suppress_console: false,
            enable_dispatch_events: true,
            max_events: None,
            storage_key: default_storage_key(),
            event_namespace: default_event_namespace(),
            max_dispatch_depth: default_max_dispatch_depth(),
            storage_dir: None,
        }
    }
}

impl LoggerConfig {
    /// Load configuration from `~/.fanlog/config.toml`, or defaults if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path, or defaults if not found
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Capacity bound described by `max_events`
    pub fn capacity(&self) -> Capacity {
        Capacity::from_limit(self.max_events)
    }

    /// Resolved storage directory
    pub fn storage_path(&self) -> PathBuf {
        match &self.storage_dir {
            Some(dir) => match shellexpand::full(dir) {
                Ok(expanded) => PathBuf::from(expanded.into_owned()),
                Err(e) => {
                    tracing::warn!(error = %e, "Could not expand storage_dir, using it verbatim");
                    PathBuf::from(shellexpand::tilde(dir).into_owned())
                }
            },
            None => config_dir().join("storage"),
        }
    }
}

/// Get the base configuration directory (~/.fanlog)
/// Falls back to ./.fanlog if home directory cannot be determined
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| {
        tracing::warn!("Could not determine home directory, using current directory for config");
        PathBuf::from(".fanlog")
    })
}

/// Try to get the base configuration directory, returning None if home dir is unavailable
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".fanlog"))
}

/// Get the path to the config file
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}
