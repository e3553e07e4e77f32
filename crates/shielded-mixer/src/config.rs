//! pool configuration
//!
//! ```toml
//! tree_depth = 32
//! root_history = 64
//! verify_timeout_ms = 30000
//! ```
//!
//! every key is optional and falls back to [`PoolConfig::default`].

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{MixerError, Result};
use mixer_merkle::MAX_DEPTH;

pub const DEFAULT_TREE_DEPTH: usize = 32;
pub const DEFAULT_ROOT_HISTORY: usize = 64;
pub const DEFAULT_VERIFY_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// merkle tree depth, capacity is `2^tree_depth` notes
    pub tree_depth: usize,
    /// how many recent roots stay valid as anchors
    pub root_history: usize,
    /// upper bound on a single proof verification
    pub verify_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            tree_depth: DEFAULT_TREE_DEPTH,
            root_history: DEFAULT_ROOT_HISTORY,
            verify_timeout_ms: DEFAULT_VERIFY_TIMEOUT_MS,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tree_depth == 0 || self.tree_depth > MAX_DEPTH {
            return Err(MixerError::InvalidConfig(format!(
                "tree_depth must be in 1..={}, got {}",
                MAX_DEPTH, self.tree_depth
            )));
        }
        if self.root_history == 0 {
            return Err(MixerError::InvalidConfig("root_history must be at least 1".into()));
        }
        if self.verify_timeout_ms == 0 {
            return Err(MixerError::InvalidConfig("verify_timeout_ms must be non-zero".into()));
        }
        Ok(())
    }

    /// parse and validate
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| MixerError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            MixerError::InvalidConfig(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| MixerError::InvalidConfig(e.to_string()))
    }

    pub fn verify_timeout(&self) -> Duration {
        Duration::from_millis(self.verify_timeout_ms)
    }
}
