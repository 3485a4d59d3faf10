//! Engine configuration.
//!
//! JSON, every field optional:
//!
//! ```json
//! {
//!   "store": { "kind": "sqlite", "path": "deps.sqlite", "busy_timeout_ms": 5000 },
//!   "notifications": { "enabled": true, "sink": "tracing" }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,
}

impl EngineConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    #[default]
    Memory,
    Sqlite {
        path: PathBuf,
        #[serde(default = "default_busy_timeout_ms")]
        busy_timeout_ms: u64,
    },
}

impl StoreConfig {
    pub fn busy_timeout(&self) -> Option<Duration> {
        match self {
            StoreConfig::Memory => None,
            StoreConfig::Sqlite {
                busy_timeout_ms, ..
            } => Some(Duration::from_millis(*busy_timeout_ms)),
        }
    }
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Log each notification.
    #[default]
    Tracing,
    /// Keep notifications in memory (see `App::recorded`).
    Recording,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub sink: SinkKind,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sink: SinkKind::default(),
        }
    }
}

fn default_enabled() -> bool {
    true
}
