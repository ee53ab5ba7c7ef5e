//! Error types for TallyChain

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u64, available: i64 },
    #[error("Cannot transfer to self: {0}")]
    SelfTransfer(String),
    #[error("Negative amount: {0}")]
    NegativeAmount(i64),
    #[error("Unknown receiver: {0}")]
    UnknownReceiver(String),
    #[error("Index {index} out of range (chain length {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Unresolved identity: {0}")]
    UnresolvedIdentity(String),
    #[error("Integrity violation at block {index}: {reason}")]
    IntegrityViolation { index: usize, reason: String },
    #[error("Balance overflow: {0}")]
    BalanceOverflow(String),
    #[error("Mining aborted: {0}")]
    MiningAborted(String),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Registry error: {0}")]
    RegistryError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::SerializationError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::InvalidConfig(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
