//! Queue configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-item timeout applied uniformly to every dispatched load.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_millis(8000);

/// Default concurrency ceiling.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 1;

/// Errors raised when a configuration value is unusable.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `max_connections` must allow at least one load.
    #[error("max_connections must be at least 1")]
    ZeroConnections,

    /// The timeout must be non-zero.
    #[error("timeout must be greater than zero")]
    ZeroTimeout,

    /// The base path cannot be used as a source prefix.
    #[error("invalid base path: {0}")]
    InvalidBasePath(String),
}

/// Configuration for creating a load queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadQueueConfig {
    /// Maximum number of loads in flight at once.
    pub max_connections: u32,
    /// Route image, CSS, script, and SVG items through the network strategy.
    pub prefer_network: bool,
    /// Surface script completions in enqueue order.
    pub maintain_script_order: bool,
    /// Freeze dispatch after the first failed item.
    pub stop_on_error: bool,
    /// Prefix prepended to relative sources.
    pub base_path: Option<String>,
    /// Timeout applied to each dispatched load.
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
}

impl Default for LoadQueueConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            prefer_network: true,
            maintain_script_order: true,
            stop_on_error: false,
            base_path: None,
            timeout: DEFAULT_LOAD_TIMEOUT,
        }
    }
}

impl LoadQueueConfig {
    /// Create a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of concurrent loads.
    #[must_use]
    pub const fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set whether tag-capable types prefer the network strategy.
    #[must_use]
    pub const fn with_prefer_network(mut self, prefer: bool) -> Self {
        self.prefer_network = prefer;
        self
    }

    /// Set whether script completions are surfaced in enqueue order.
    #[must_use]
    pub const fn with_maintain_script_order(mut self, maintain: bool) -> Self {
        self.maintain_script_order = maintain;
        self
    }

    /// Set whether the first failure halts further dispatch.
    #[must_use]
    pub const fn with_stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    /// Set the base path for relative sources.
    #[must_use]
    pub fn with_base_path(mut self, base_path: Option<String>) -> Self {
        self.base_path = base_path;
        self
    }

    /// Set the per-item timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check that the configuration can drive a queue.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::ZeroConnections);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if let Some(base) = &self.base_path {
            if base.chars().any(char::is_whitespace) {
                return Err(ConfigError::InvalidBasePath(base.clone()));
            }
        }
        Ok(())
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
