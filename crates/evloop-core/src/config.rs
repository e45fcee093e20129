//! Event loop configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default bound on each lane
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 1000;

/// Default worker thread name
pub const DEFAULT_LOOP_NAME: &str = "event-loop";

/// Settings for one event loop
///
/// ```toml
/// name = "io-loop"
/// max_queue_size = 4096
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoopConfig {
    /// Name of the worker thread
    pub name: String,

    /// Bound checked by admission on each lane
    pub max_queue_size: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_LOOP_NAME.to_string(),
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
        }
    }
}

impl LoopConfig {
    /// Default configuration with the given thread name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder-style override of the lane bound
    pub fn with_max_queue_size(mut self, max_queue_size: usize) -> Self {
        self.max_queue_size = max_queue_size;
        self
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: LoopConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Reject values a loop cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("name must not be empty".into()));
        }
        // Thread names with interior NULs make spawning fail
        if self.name.contains('\0') {
            return Err(ConfigError::Invalid("name must not contain NUL".into()));
        }
        check_max_queue_size(self.max_queue_size)
    }
}

/// A bound of zero would refuse every submission; rejected at load and at
/// runtime alike
pub(crate) fn check_max_queue_size(max_queue_size: usize) -> Result<(), ConfigError> {
    if max_queue_size == 0 {
        return Err(ConfigError::Invalid(
            "max_queue_size must be at least 1".into(),
        ));
    }
    Ok(())
}
