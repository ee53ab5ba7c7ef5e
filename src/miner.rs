//! Proof-of-work search.
//!
//! A block is mined by walking nonces upward from 0 until the block hash
//! starts with `difficulty` hex zeros. The search can be stopped from another
//! thread through a [`CancelToken`] and bounded by a [`MiningBudget`]; for a
//! given nonce range it produces exactly the hashes of the unbounded search.

use crate::blockchain::Block;
use crate::crypto::FINGERPRINT_HEX_LEN;
use crate::error::ChainError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// How many attempts pass between wall-clock checks.
const TIME_CHECK_INTERVAL: u64 = 1024;

/// Shared flag that stops an in-progress search. [`mine_block_with`] clears
/// it again once it has stopped a search.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clear a previous cancellation so the token can be reused.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Limits on a single search. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MiningBudget {
    pub max_attempts: Option<u64>,
    pub time_limit: Option<Duration>,
}

impl MiningBudget {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, attempts: u64) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct MiningControl {
    pub budget: MiningBudget,
    pub cancel: CancelToken,
}

impl MiningControl {
    pub fn new(budget: MiningBudget) -> Self {
        MiningControl {
            budget,
            cancel: CancelToken::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningOutcome {
    Found { nonce: u64, attempts: u64 },
    Exhausted { attempts: u64 },
    Cancelled { attempts: u64 },
}

impl MiningOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, MiningOutcome::Found { .. })
    }
}

impl Block {
    /// Search for the first nonce from 0 whose hash meets `difficulty`.
    ///
    /// On `Found` the block's `nonce` and `hash` hold the winning values.
    /// Otherwise they are left at the last attempt and the block must not be
    /// appended.
    pub fn mine(&mut self, difficulty: usize, control: &MiningControl) -> MiningOutcome {
        if difficulty > FINGERPRINT_HEX_LEN {
            return MiningOutcome::Exhausted { attempts: 0 };
        }

        let merkle_root = self.merkle_root.clone();
        let started = Instant::now();
        let mut attempts: u64 = 0;
        self.nonce = 0;

        loop {
            if control.cancel.is_cancelled() {
                return MiningOutcome::Cancelled { attempts };
            }
            if control.budget.max_attempts.is_some_and(|max| attempts >= max) {
                return MiningOutcome::Exhausted { attempts };
            }
            if let Some(limit) = control.budget.time_limit {
                if attempts % TIME_CHECK_INTERVAL == 0 && started.elapsed() >= limit {
                    return MiningOutcome::Exhausted { attempts };
                }
            }

            self.hash = Block::hash_parts(self.previous_hash.as_ref(), self.nonce, merkle_root.as_ref());
            attempts += 1;

            if self.hash.meets_difficulty(difficulty) {
                return MiningOutcome::Found {
                    nonce: self.nonce,
                    attempts,
                };
            }

            match self.nonce.checked_add(1) {
                Some(next) => self.nonce = next,
                None => return MiningOutcome::Exhausted { attempts },
            }
        }
    }
}

/// Mine `block` with no budget and no way to cancel.
pub fn mine_block(block: Block, difficulty: usize) -> Result<Block, ChainError> {
    mine_block_with(block, difficulty, &MiningControl::default())
}

/// Mine `block` under `control`, turning an unsuccessful search into
/// [`ChainError::MiningAborted`].
pub fn mine_block_with(
    mut block: Block,
    difficulty: usize,
    control: &MiningControl,
) -> Result<Block, ChainError> {
    let started = Instant::now();
    match block.mine(difficulty, control) {
        MiningOutcome::Found { nonce, attempts } => {
            debug!(
                "Mined {} at difficulty {} with nonce {} after {} attempts in {:.3}s",
                block.hash.short(),
                difficulty,
                nonce,
                attempts,
                started.elapsed().as_secs_f64()
            );
            Ok(block)
        }
        MiningOutcome::Exhausted { attempts } => Err(ChainError::MiningAborted(format!(
            "budget exhausted after {} attempts at difficulty {}",
            attempts, difficulty
        ))),
        MiningOutcome::Cancelled { attempts } => {
            // The cancellation is spent on this search.
            control.cancel.reset();
            Err(ChainError::MiningAborted(format!(
                "cancelled after {} attempts",
                attempts
            )))
        }
    }
}
