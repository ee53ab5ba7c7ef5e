//! Configuration management for TallyChain

use crate::blockchain::{DEFAULT_BATCH_THRESHOLD, DEFAULT_DIFFICULTY};
use crate::crypto::FINGERPRINT_HEX_LEN;
use crate::error::ChainError;
use crate::miner::{MiningBudget, MiningControl};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "tallychain.toml";

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub mining: MiningConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LedgerConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
    #[serde(default = "default_batch_threshold")]
    pub batch_threshold: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            batch_threshold: default_batch_threshold(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct MiningConfig {
    #[serde(default)]
    pub max_attempts: Option<u64>,
    #[serde(default)]
    pub time_limit_secs: Option<u64>,
}

impl MiningConfig {
    pub fn budget(&self) -> MiningBudget {
        MiningBudget {
            max_attempts: self.max_attempts,
            time_limit: self.time_limit_secs.map(Duration::from_secs),
        }
    }

    pub fn control(&self) -> MiningControl {
        MiningControl::new(self.budget())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    #[serde(default = "default_chain_path")]
    pub chain_path: String,
    #[serde(default = "default_registry_path")]
    pub registry_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            chain_path: default_chain_path(),
            registry_path: default_registry_path(),
        }
    }
}

fn default_difficulty() -> usize {
    DEFAULT_DIFFICULTY
}

fn default_batch_threshold() -> usize {
    DEFAULT_BATCH_THRESHOLD
}

fn default_chain_path() -> String {
    "blockchain.json".to_string()
}

fn default_registry_path() -> String {
    "parties.json".to_string()
}

impl Config {
    pub fn from_toml(config_str: &str) -> Result<Self, ChainError> {
        let config: Config = toml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        if self.ledger.batch_threshold == 0 {
            return Err(ChainError::InvalidConfig(
                "ledger.batch_threshold must be at least 1".to_string(),
            ));
        }

        if self.ledger.difficulty > FINGERPRINT_HEX_LEN {
            return Err(ChainError::InvalidConfig(format!(
                "ledger.difficulty must be at most {}",
                FINGERPRINT_HEX_LEN
            )));
        }

        if self.storage.chain_path.is_empty() || self.storage.registry_path.is_empty() {
            return Err(ChainError::InvalidConfig(
                "storage paths must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Load `tallychain.toml` from the working directory, falling back to
/// defaults when it is absent.
pub fn load_config() -> Result<Config, ChainError> {
    load_config_from(Path::new(DEFAULT_CONFIG_PATH))
}

pub fn load_config_from(path: &Path) -> Result<Config, ChainError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let config_str = fs::read_to_string(path)?;
    Config::from_toml(&config_str)
}
