//! Interpreter limits, loadable from TOML

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default maximum nesting of function invocations
pub const DEFAULT_MAX_DEPTH: usize = 10_000;

/// Default width at which argument values are cut in stack frames
pub const DEFAULT_FRAME_VALUE_WIDTH: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InterpreterConfig {
    /// Invocations deeper than this fail with a stack overflow error
    pub max_depth: usize,
    pub frame_value_width: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            max_depth: DEFAULT_MAX_DEPTH,
            frame_value_width: DEFAULT_FRAME_VALUE_WIDTH,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid interpreter config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("max_depth must be at least 1")]
    ZeroDepth,
}

impl InterpreterConfig {
    /// Parse a config; omitted keys keep their defaults
    pub fn from_toml(src: &str) -> Result<Self, ConfigError> {
        let config: InterpreterConfig = toml::from_str(src)?;
        if config.max_depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        Ok(config)
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
