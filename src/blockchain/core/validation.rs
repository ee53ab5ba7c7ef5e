use crate::error::ChainError;
use crate::merkle::MerkleTree;
use tracing::warn;

use super::chain::{Block, Blockchain};

/// Check that `digest` commits to exactly the hashes of `blocks`, in order.
pub fn validate_chain_digest(blocks: &[Block], digest: &MerkleTree) -> Result<(), ChainError> {
    let fresh = MerkleTree::from_leaves(blocks.iter().map(|b| b.hash.as_str()));
    if fresh.root_hash() != digest.root_hash() {
        return Err(ChainError::IntegrityViolation {
            index: 0,
            reason: format!(
                "chain digest root {} does not match block hashes (expected {})",
                digest.root_hash().map_or("None", |h| h.as_str()),
                fresh.root_hash().map_or("None", |h| h.as_str())
            ),
        });
    }
    Ok(())
}

/// Walk the chain from index 1, checking every stored hash against the
/// block's contents and every back-link against its predecessor.
pub fn validate_chain_links(blocks: &[Block]) -> Result<(), ChainError> {
    for (i, pair) in blocks.windows(2).enumerate() {
        let (previous, current) = (&pair[0], &pair[1]);
        let index = i + 1;

        let recomputed = current.recompute_hash();
        if recomputed != current.hash {
            return Err(ChainError::IntegrityViolation {
                index,
                reason: format!(
                    "stored hash {} but contents hash to {}",
                    current.hash, recomputed
                ),
            });
        }

        if current.previous_hash.as_ref() != Some(&previous.hash) {
            return Err(ChainError::IntegrityViolation {
                index,
                reason: format!(
                    "previous hash {} does not match block #{} hash {}",
                    current
                        .previous_hash
                        .as_ref()
                        .map_or("None", |h| h.as_str()),
                    i,
                    previous.hash
                ),
            });
        }
    }
    Ok(())
}

/// Check that every block, genesis included, carries a hash matching its
/// contents that meets `difficulty`.
pub fn validate_proof_of_work(blocks: &[Block], difficulty: usize) -> Result<(), ChainError> {
    for (index, block) in blocks.iter().enumerate() {
        if block.recompute_hash() != block.hash {
            return Err(ChainError::IntegrityViolation {
                index,
                reason: "stored hash does not match contents".to_string(),
            });
        }
        if !block.satisfies_difficulty(difficulty) {
            return Err(ChainError::IntegrityViolation {
                index,
                reason: format!("hash {} does not meet difficulty {}", block.hash, difficulty),
            });
        }
    }
    Ok(())
}

impl Blockchain {
    /// Structural check of the chain digest followed by the hash and link
    /// walk. The first failure is returned; nothing is repaired.
    pub fn verify(&self) -> Result<(), ChainError> {
        validate_chain_digest(&self.blocks, &self.chain_digest)?;
        validate_chain_links(&self.blocks)
    }

    /// `true` when [`Blockchain::verify`] passes. Failures are logged.
    pub fn validate(&self) -> bool {
        match self.verify() {
            Ok(()) => true,
            Err(e) => {
                warn!("Chain validation failed: {}", e);
                false
            }
        }
    }

    /// [`Blockchain::verify`] plus a proof-of-work check of every block.
    pub fn audit(&self) -> Result<(), ChainError> {
        self.verify()?;
        validate_proof_of_work(&self.blocks, self.difficulty)
    }
}
