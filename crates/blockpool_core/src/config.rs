//! # Pool Configuration
//!
//! Pool geometry and run-search policy, loadable from TOML.
//!
//! ```toml
//! total_size = 1024
//! block_size = 128
//! run_policy = "address_order"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PoolError, PoolResult};
use crate::memory::Arena;

/// How `acquire` decides that free nodes form a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPolicy {
    /// Count consecutive nodes in list order without checking that they
    /// touch in memory.
    ///
    /// Once the free list is fragmented, a multi-block request can succeed
    /// with a start address whose trailing blocks were never reserved. The
    /// individual blocks that were unlinked are still tagged as acquired and
    /// must be released one by one.
    #[default]
    ListOrder,
    /// Only count nodes whose addresses are exactly one block apart, so a
    /// successful multi-block request always covers one contiguous range.
    AddressOrder,
}

/// Configuration for a [`BlockPool`](crate::BlockPool).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    /// Arena size in bytes.
    pub total_size: usize,
    /// Block size in bytes.
    pub block_size: usize,
    /// Run search policy for multi-block requests.
    pub run_policy: RunPolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            total_size: 1024,
            block_size: 128,
            run_policy: RunPolicy::ListOrder,
        }
    }
}

impl PoolConfig {
    /// Creates a configuration with the default run policy.
    #[must_use]
    pub fn new(total_size: usize, block_size: usize) -> Self {
        Self {
            total_size,
            block_size,
            ..Self::default()
        }
    }

    /// Sets the run policy.
    #[must_use]
    pub fn with_run_policy(mut self, run_policy: RunPolicy) -> Self {
        self.run_policy = run_policy;
        self
    }

    /// Number of blocks this geometry yields, if it is valid.
    #[must_use]
    pub fn block_count(&self) -> Option<usize> {
        self.validate().ok().map(|()| self.total_size / self.block_size)
    }

    /// Checks the geometry without reserving memory.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidConfiguration`] if the sizes are unusable.
    pub fn validate(&self) -> PoolResult<()> {
        Arena::check_geometry(self.total_size, self.block_size)
    }

    /// Parses and validates a TOML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// * [`PoolError::InvalidConfig`] if the document does not parse
    /// * [`PoolError::InvalidConfiguration`] if the geometry is unusable
    pub fn from_toml_str(source: &str) -> PoolResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| PoolError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// * [`PoolError::InvalidConfig`] if the file cannot be read or parsed
    /// * [`PoolError::InvalidConfiguration`] if the geometry is unusable
    pub fn from_toml_file(path: impl AsRef<Path>) -> PoolResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| PoolError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Renders the configuration as TOML.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidConfig`] if serialization fails.
    pub fn to_toml_string(&self) -> PoolResult<String> {
        toml::to_string(self).map_err(|e| PoolError::InvalidConfig(e.to_string()))
    }
}
