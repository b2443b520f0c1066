//! Configuration for a group node.
//!
//! Configuration can be loaded from a TOML file; every field has a default,
//! so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use lockstep_sync_core::BroadcastPolicy;

/// Protocol timing and sizing knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Leader broadcast cadence in milliseconds (default: 100).
    #[serde(default = "default_broadcast_interval_ms")]
    pub broadcast_interval_ms: u64,
    /// Maximum events per broadcast message (default: 4).
    #[serde(default = "default_max_events_per_broadcast")]
    pub max_events_per_broadcast: usize,
    /// Leader drops events this many seconds past due (default: 1.0).
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: f64,
    /// Leader holds back events due further out than this (default: 1.0).
    #[serde(default = "default_horizon_secs")]
    pub horizon_secs: f64,
    /// How long delivered ids are remembered (default: 3.0).
    #[serde(default = "default_handled_retention_secs")]
    pub handled_retention_secs: f64,
    /// Longest single wait of an idle delivery stream (default: 10.0).
    #[serde(default = "default_idle_wait_secs")]
    pub idle_wait_secs: f64,
    /// Calls scheduled closer than this trigger a warning (default: 0.1).
    #[serde(default = "default_low_offset_warning_secs")]
    pub low_offset_warning_secs: f64,
}

// Default value functions
fn default_broadcast_interval_ms() -> u64 {
    100
}

fn default_max_events_per_broadcast() -> usize {
    4
}

fn default_stale_after_secs() -> f64 {
    1.0
}

fn default_horizon_secs() -> f64 {
    1.0
}

fn default_handled_retention_secs() -> f64 {
    3.0
}

fn default_idle_wait_secs() -> f64 {
    10.0
}

fn default_low_offset_warning_secs() -> f64 {
    0.1
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            broadcast_interval_ms: default_broadcast_interval_ms(),
            max_events_per_broadcast: default_max_events_per_broadcast(),
            stale_after_secs: default_stale_after_secs(),
            horizon_secs: default_horizon_secs(),
            handled_retention_secs: default_handled_retention_secs(),
            idle_wait_secs: default_idle_wait_secs(),
            low_offset_warning_secs: default_low_offset_warning_secs(),
        }
    }
}

impl GroupConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the runtime cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broadcast_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "broadcast_interval_ms",
                reason: "must be greater than zero".into(),
            });
        }
        if self.max_events_per_broadcast == 0 {
            return Err(ConfigError::Invalid {
                field: "max_events_per_broadcast",
                reason: "must be greater than zero".into(),
            });
        }
        let seconds = [
            ("stale_after_secs", self.stale_after_secs),
            ("horizon_secs", self.horizon_secs),
            ("handled_retention_secs", self.handled_retention_secs),
            ("low_offset_warning_secs", self.low_offset_warning_secs),
        ];
        for (field, value) in seconds {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be a non-negative number of seconds, got {}", value),
                });
            }
        }
        if !self.idle_wait_secs.is_finite() || self.idle_wait_secs <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "idle_wait_secs",
                reason: format!("must be positive, got {}", self.idle_wait_secs),
            });
        }
        Ok(())
    }

    /// Leader broadcast cadence.
    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_millis(self.broadcast_interval_ms)
    }

    /// Longest single wait of an idle delivery stream.
    pub fn idle_wait(&self) -> Duration {
        Duration::from_secs_f64(self.idle_wait_secs)
    }

    /// Planning parameters for the leader loop.
    pub fn broadcast_policy(&self) -> BroadcastPolicy {
        BroadcastPolicy {
            stale_after: self.stale_after_secs,
            horizon: self.horizon_secs,
            max_events_per_broadcast: self.max_events_per_broadcast,
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// A setting is out of range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}
