//! Engine configuration.
//!
//! Loaded from TOML; every section and field falls back to its default,
//! so an empty document is a valid configuration.

use std::path::Path;
use std::time::Duration;

use causeway_primitives::gas::MAX_GAS_LIMIT_PERCENT_USED_FOR_DEST_ME_TXS;
use causeway_primitives::{ShardId, SOVEREIGN_CHAIN_SHARD_ID};
use serde::Deserialize;

/// Configuration loading or validation failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Shard this node runs.
    pub self_shard_id: ShardId,
    pub tracker: TrackerConfig,
    pub processing: ProcessingConfig,
    pub incoming: IncomingConfig,
    pub sync: SyncConfig,
}

/// Chain tracker windows, in nonces.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// How far ahead of the last notarized header a header may be tracked.
    pub max_lag_window: u64,
    /// How far ahead of the last notarized header referenced
    /// transactions are whitelisted.
    pub max_headers_to_whitelist_in_advance: u64,
}

/// Result execution settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Built-in executions slower than this are logged at debug level.
    pub execute_duration_alarm_threshold_ms: u64,
    /// Share of the block gas ceiling available to mini-blocks after the first.
    pub max_gas_limit_percent_used_for_dest_me_txs: u64,
}

/// Incoming header settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IncomingConfig {
    /// Main-chain headers from earlier rounds are not notarized.
    pub main_chain_notarization_start_round: u64,
}

/// Sync progress settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub statistics_print_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            self_shard_id: SOVEREIGN_CHAIN_SHARD_ID,
            tracker: TrackerConfig::default(),
            processing: ProcessingConfig::default(),
            incoming: IncomingConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_lag_window: 1000,
            max_headers_to_whitelist_in_advance: 300,
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            execute_duration_alarm_threshold_ms: 100,
            max_gas_limit_percent_used_for_dest_me_txs: MAX_GAS_LIMIT_PERCENT_USED_FOR_DEST_ME_TXS,
        }
    }
}

impl Default for IncomingConfig {
    fn default() -> Self {
        Self {
            main_chain_notarization_start_round: 0,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            statistics_print_interval_ms: 2_000,
        }
    }
}

impl ProcessingConfig {
    pub fn execute_duration_alarm_threshold(&self) -> Duration {
        Duration::from_millis(self.execute_duration_alarm_threshold_ms)
    }
}

impl SyncConfig {
    pub fn statistics_print_interval(&self) -> Duration {
        Duration::from_millis(self.statistics_print_interval_ms)
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Reject zero windows, a whitelist window wider than the lag window,
    /// and percentages above 100.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tracker.max_lag_window == 0 {
            return Err(ConfigError::Invalid("tracker.max_lag_window must be > 0".into()));
        }
        if self.tracker.max_headers_to_whitelist_in_advance == 0 {
            return Err(ConfigError::Invalid(
                "tracker.max_headers_to_whitelist_in_advance must be > 0".into(),
            ));
        }
        if self.tracker.max_headers_to_whitelist_in_advance > self.tracker.max_lag_window {
            return Err(ConfigError::Invalid(format!(
                "tracker.max_headers_to_whitelist_in_advance ({}) exceeds tracker.max_lag_window ({})",
                self.tracker.max_headers_to_whitelist_in_advance, self.tracker.max_lag_window
            )));
        }
        if self.processing.max_gas_limit_percent_used_for_dest_me_txs > 100 {
            return Err(ConfigError::Invalid(format!(
                "processing.max_gas_limit_percent_used_for_dest_me_txs is {}, max 100",
                self.processing.max_gas_limit_percent_used_for_dest_me_txs
            )));
        }
        if self.sync.statistics_print_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "sync.statistics_print_interval_ms must be > 0".into(),
            ));
        }
        Ok(())
    }
}
