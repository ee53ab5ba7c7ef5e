//! JSON persistence of the chain.
//!
//! One array element per block, in chain order. Block hashes and Merkle
//! roots are not stored: they are recomputed on load from `previous_hash`,
//! `nonce` and the listed transactions, so a file edited after saving shows
//! up as a broken chain on validation rather than being silently accepted.

use crate::blockchain::{Block, Blockchain};
use crate::crypto::Fingerprint;
use crate::error::ChainError;
use crate::miner::MiningControl;
use crate::registry::{write_atomic, PartyRegistry};
use crate::transaction::Transaction;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// A block as it appears in the chain file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedBlock {
    pub previous_hash: Option<String>,
    pub transactions: Vec<Transaction>,
    pub timestamp: f64,
    pub nonce: u64,
}

impl From<&Block> for PersistedBlock {
    fn from(block: &Block) -> Self {
        PersistedBlock {
            previous_hash: block.previous_hash.as_ref().map(|h| h.as_str().to_string()),
            transactions: block.transactions.clone(),
            timestamp: block.timestamp,
            nonce: block.nonce,
        }
    }
}

impl PersistedBlock {
    /// Rebuild the block, resolving every party id against `registry`.
    pub fn restore(self, registry: &PartyRegistry) -> Result<Block, ChainError> {
        for tx in &self.transactions {
            registry.resolve(&tx.sender)?;
            registry.resolve(&tx.receiver)?;
        }

        let previous_hash = match self.previous_hash {
            Some(hex_str) => Some(Fingerprint::from_hex(&hex_str).ok_or_else(|| {
                ChainError::SerializationError(format!("Malformed previous hash '{}'", hex_str))
            })?),
            None => None,
        };

        Ok(Block::seal_at(self.transactions, previous_hash, self.timestamp, self.nonce))
    }
}

/// Abstraction for chain storage backends.
pub trait Persistence: Send + Sync {
    fn save_blocks(&self, blocks: &[PersistedBlock]) -> Result<(), ChainError>;
    fn load_blocks(&self) -> Result<Vec<PersistedBlock>, ChainError>;

    fn save_chain(&self, chain: &Blockchain) -> Result<(), ChainError> {
        let blocks: Vec<PersistedBlock> = chain.blocks.iter().map(PersistedBlock::from).collect();
        self.save_blocks(&blocks)
    }

    /// Load and rebuild a ledger. Nothing is validated beyond identity
    /// resolution; the caller decides what to do with a broken chain.
    fn load_chain(
        &self,
        registry: &PartyRegistry,
        difficulty: usize,
        batch_threshold: usize,
        mining: MiningControl,
    ) -> Result<Blockchain, ChainError> {
        let blocks = self
            .load_blocks()?
            .into_iter()
            .map(|b| b.restore(registry))
            .collect::<Result<Vec<_>, _>>()?;
        Blockchain::from_blocks(blocks, difficulty, batch_threshold, mining)
    }
}

/// Chain file on disk, pretty-printed JSON.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Persistence for JsonFileStore {
    fn save_blocks(&self, blocks: &[PersistedBlock]) -> Result<(), ChainError> {
        let json = serde_json::to_string_pretty(blocks)?;
        write_atomic(&self.path, json.as_bytes())?;
        info!("Saved {} blocks to {}", blocks.len(), self.path.display());
        Ok(())
    }

    fn load_blocks(&self) -> Result<Vec<PersistedBlock>, ChainError> {
        let contents = fs::read_to_string(&self.path)?;
        let blocks: Vec<PersistedBlock> = serde_json::from_str(&contents)?;
        info!("Loaded {} blocks from {}", blocks.len(), self.path.display());
        Ok(blocks)
    }
}

/// Simple in-memory persistence implementation useful for tests and ephemeral runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPersistence {
    pub blocks: Arc<Mutex<Vec<PersistedBlock>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for InMemoryPersistence {
    fn save_blocks(&self, blocks: &[PersistedBlock]) -> Result<(), ChainError> {
        *self.blocks.lock() = blocks.to_vec();
        Ok(())
    }

    fn load_blocks(&self) -> Result<Vec<PersistedBlock>, ChainError> {
        Ok(self.blocks.lock().clone())
    }
}
