use crate::error::ChainError;
use crate::miner::CancelToken;
use crate::transaction::Transaction;
use parking_lot::Mutex;
use std::sync::Arc;

use super::chain::Blockchain;
use super::state::{BalanceSheet, StartingBalances};

/// A ledger shared between threads behind a single lock.
///
/// Draining the pending batch, mining and appending all happen while the
/// lock is held, so two blocks are never minted from overlapping batches and
/// readers never see the digest half-updated.
#[derive(Debug, Clone)]
pub struct SharedLedger {
    inner: Arc<Mutex<Blockchain>>,
    cancel: CancelToken,
}

impl SharedLedger {
    pub fn new(blockchain: Blockchain) -> Self {
        let cancel = blockchain.mining.cancel.clone();
        SharedLedger {
            inner: Arc::new(Mutex::new(blockchain)),
            cancel,
        }
    }

    pub fn submit_transaction(&self, tx: Transaction) -> Result<Option<usize>, ChainError> {
        self.inner.lock().submit_transaction(tx)
    }

    pub fn seal_pending(&self) -> Result<Option<usize>, ChainError> {
        self.inner.lock().seal_pending()
    }

    pub fn validate(&self) -> bool {
        self.inner.lock().validate()
    }

    pub fn replay_balances<S: StartingBalances + ?Sized>(
        &self,
        up_to_index: usize,
        starting: &S,
    ) -> Result<BalanceSheet, ChainError> {
        self.inner.lock().replay_balances(up_to_index, starting)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Stop a search without waiting for the lock. Only one search is
    /// stopped: the one running now, or the next one if none is.
    pub fn cancel_mining(&self) {
        self.cancel.cancel();
    }

    /// Run `f` with exclusive access to the ledger.
    pub fn with_ledger<R>(&self, f: impl FnOnce(&mut Blockchain) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut *guard)
    }

    /// Copy of the ledger as of now.
    pub fn snapshot(&self) -> Blockchain {
        self.inner.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::PartyId;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_concurrent_submitters_never_share_a_batch() {
        let ledger = SharedLedger::new(Blockchain::new(1, 3).unwrap());
        let mut handles = Vec::new();
        for worker in 0..4 {
            let ledger = ledger.clone();
            handles.push(thread::spawn(move || {
                for i in 0..6 {
                    let tx = Transaction::new(
                        format!("w{worker}-{i}"),
                        PartyId::new(format!("sender-{worker}")),
                        PartyId::new("sink"),
                        1,
                    );
                    ledger.submit_transaction(tx).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let chain = ledger.snapshot();
        // 24 transactions in batches of 3.
        assert_eq!(chain.len(), 9);
        assert!(chain.pending.is_empty());
        assert!(ledger.validate());

        let mut seen = HashSet::new();
        for block in &chain.blocks[1..] {
            assert_eq!(block.transactions.len(), 3);
            for tx in &block.transactions {
                assert!(seen.insert(tx.id.clone()), "{} sealed twice", tx.id);
            }
        }
        assert_eq!(seen.len(), 24);
    }

    #[test]
    fn test_with_ledger_and_seal_pending() {
        let ledger = SharedLedger::new(Blockchain::new(1, 10).unwrap());
        let tx = Transaction::new("t1", PartyId::new("a"), PartyId::new("b"), 1);
        assert_eq!(ledger.submit_transaction(tx).unwrap(), None);
        assert_eq!(ledger.with_ledger(|chain| chain.pending.len()), 1);
        assert_eq!(ledger.seal_pending().unwrap(), Some(1));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_cancel_mining_aborts_submission() {
        let ledger = SharedLedger::new(Blockchain::new(1, 1).unwrap());
        ledger.with_ledger(|chain| chain.difficulty = 64);
        ledger.cancel_mining();
        let tx = Transaction::new("t1", PartyId::new("a"), PartyId::new("b"), 1);
        assert!(matches!(
            ledger.submit_transaction(tx),
            Err(ChainError::MiningAborted(_))
        ));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_submissions_resume_after_cancel() {
        let ledger = SharedLedger::new(Blockchain::new(1, 1).unwrap());
        ledger.cancel_mining();
        let first = Transaction::new("t1", PartyId::new("a"), PartyId::new("b"), 1);
        assert!(ledger.submit_transaction(first).is_err());

        let second = Transaction::new("t2", PartyId::new("a"), PartyId::new("b"), 1);
        assert_eq!(ledger.submit_transaction(second).unwrap(), Some(1));
        assert!(ledger.validate());
    }
}
