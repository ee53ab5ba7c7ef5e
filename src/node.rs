//! The ledger node: the context object tying the chain, the party registry
//! and the configuration together.

use crate::blockchain::{BalanceSheet, Blockchain};
use crate::config::Config;
use crate::error::ChainError;
use crate::persistence::{JsonFileStore, Persistence};
use crate::registry::PartyRegistry;
use crate::transaction::{Balance, PartyId, Transaction};
use std::path::Path;
use tracing::{info, warn};

pub struct Node {
    pub config: Config,
    pub blockchain: Blockchain,
    pub registry: PartyRegistry,
}

impl Node {
    /// Create a node with an empty registry and a freshly mined genesis block.
    pub fn new(config: Config) -> Result<Self, ChainError> {
        config.validate()?;
        let blockchain = Blockchain::with_mining(
            config.ledger.difficulty,
            config.ledger.batch_threshold,
            config.mining.control(),
        )?;
        info!(
            "Node ready (difficulty {}, batch threshold {})",
            config.ledger.difficulty, config.ledger.batch_threshold
        );

        Ok(Node {
            config,
            blockchain,
            registry: PartyRegistry::new(),
        })
    }

    /// Open the registry and chain files named in `config.storage`.
    ///
    /// Nothing is mined unless the chain file holds no blocks at all.
    pub fn open(config: Config) -> Result<Self, ChainError> {
        config.validate()?;
        let registry = PartyRegistry::load(Path::new(&config.storage.registry_path))?;
        let blockchain =
            load_blockchain(&config, &registry, Path::new(&config.storage.chain_path))?;
        info!(
            "Opened {} with {} blocks and {} parties",
            config.storage.chain_path,
            blockchain.len(),
            registry.len()
        );

        Ok(Node {
            config,
            blockchain,
            registry,
        })
    }

    pub fn register_party(&mut self, name: &str, balance: Balance) -> Result<PartyId, ChainError> {
        let id = self.registry.register(name, balance)?;
        info!("Registered party {} as {}", name, id);
        Ok(id)
    }

    /// Build a transfer from `sender`, checked against their live balance.
    pub fn try_create_transaction(
        &self,
        sender: &PartyId,
        receiver: &PartyId,
        amount: i64,
    ) -> Result<Transaction, ChainError> {
        let available = self.registry.resolve(sender)?.balance;
        Transaction::new_transfer(sender.clone(), receiver.clone(), amount, available)
    }

    /// Same as [`Node::try_create_transaction`], logging the rejection instead
    /// of returning it.
    pub fn create_transaction(
        &self,
        sender: &PartyId,
        receiver: &PartyId,
        amount: i64,
    ) -> Option<Transaction> {
        match self.try_create_transaction(sender, receiver, amount) {
            Ok(tx) => Some(tx),
            Err(e) => {
                warn!("Rejected transfer of {} from {} to {}: {}", amount, sender, receiver, e);
                None
            }
        }
    }

    /// Submit `tx` to the ledger, then debit the sender and credit the
    /// receiver. Balances are left alone when the ledger rejects the
    /// submission.
    pub fn route_and_apply(&mut self, tx: Transaction) -> Result<Option<usize>, ChainError> {
        if !self.registry.contains(&tx.receiver) {
            return Err(ChainError::UnknownReceiver(tx.receiver.to_string()));
        }

        let available = self.registry.resolve(&tx.sender)?.balance;
        let amount = tx.signed_amount()?;
        if amount > available {
            return Err(ChainError::InsufficientBalance {
                requested: tx.amount,
                available,
            });
        }

        // Work out both new balances before anything is queued.
        let sender_after = available - amount;
        let receiver_after = if tx.sender == tx.receiver {
            available
        } else {
            self.registry
                .resolve(&tx.receiver)?
                .balance
                .checked_add(amount)
                .ok_or_else(|| {
                    ChainError::BalanceOverflow(format!(
                        "crediting {} to {} exceeds the maximum balance",
                        amount, tx.receiver
                    ))
                })?
        };

        let sender = tx.sender.clone();
        let receiver = tx.receiver.clone();
        let minted = self.blockchain.submit_transaction(tx)?;

        if let Some(party) = self.registry.get_mut(&sender) {
            party.balance = sender_after;
        }
        if let Some(party) = self.registry.get_mut(&receiver) {
            party.balance = receiver_after;
        }

        Ok(minted)
    }

    /// Create and route in one step.
    pub fn transfer(
        &mut self,
        sender: &PartyId,
        receiver: &PartyId,
        amount: i64,
    ) -> Result<Option<usize>, ChainError> {
        let tx = self.try_create_transaction(sender, receiver, amount)?;
        self.route_and_apply(tx)
    }

    pub fn validate(&self) -> bool {
        self.blockchain.validate()
    }

    /// Balances as of block `up_to_index`, replayed from the registry's
    /// starting balances.
    pub fn replay_balances(&self, up_to_index: usize) -> Result<BalanceSheet, ChainError> {
        self.blockchain.replay_balances(up_to_index, &self.registry)
    }

    /// Write the chain to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ChainError> {
        JsonFileStore::new(path).save_chain(&self.blockchain)
    }

    /// Replace the chain with the one stored at `path`.
    ///
    /// Party ids are resolved against the current registry. The loaded chain
    /// is not validated; a broken file is only logged.
    pub fn load(&mut self, path: &Path) -> Result<(), ChainError> {
        self.blockchain = load_blockchain(&self.config, &self.registry, path)?;
        Ok(())
    }

    pub fn save_registry(&self, path: &Path) -> Result<(), ChainError> {
        self.registry.save(path)
    }

    pub fn load_registry(&mut self, path: &Path) -> Result<(), ChainError> {
        self.registry = PartyRegistry::load(path)?;
        Ok(())
    }
}

fn load_blockchain(
    config: &Config,
    registry: &PartyRegistry,
    path: &Path,
) -> Result<Blockchain, ChainError> {
    let blockchain = JsonFileStore::new(path).load_chain(
        registry,
        config.ledger.difficulty,
        config.ledger.batch_threshold,
        config.mining.control(),
    )?;
    if !blockchain.validate() {
        warn!("Chain loaded from {} does not validate", path.display());
    }
    Ok(blockchain)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_node(threshold: usize) -> Node {
        let mut config = Config::default();
        config.ledger.difficulty = 1;
        config.ledger.batch_threshold = threshold;
        Node::new(config).unwrap()
    }

    #[test]
    fn test_create_transaction_checks_live_balance() {
        let mut node = test_node(3);
        let alice = node.register_party("Alice", 100).unwrap();
        let bob = node.register_party("Bob", 0).unwrap();

        assert!(node.create_transaction(&alice, &bob, 100).is_some());
        assert!(node.create_transaction(&alice, &bob, 101).is_none());
        assert!(node.create_transaction(&alice, &alice, 10).is_none());
        assert!(node.create_transaction(&alice, &bob, -5).is_none());
    }

    #[test]
    fn test_rejection_order() {
        let mut node = test_node(3);
        let alice = node.register_party("Alice", 10).unwrap();
        let bob = node.register_party("Bob", 10).unwrap();

        // Over-balance self-transfer reports the balance first.
        assert!(matches!(
            node.try_create_transaction(&alice, &alice, 50),
            Err(ChainError::InsufficientBalance { requested: 50, available: 10 })
        ));
        assert_eq!(
            node.try_create_transaction(&alice, &alice, -1).unwrap_err(),
            ChainError::SelfTransfer(alice.to_string())
        );
        assert_eq!(
            node.try_create_transaction(&alice, &bob, -1).unwrap_err(),
            ChainError::NegativeAmount(-1)
        );
    }

    #[test]
    fn test_unknown_sender_is_unresolved() {
        let mut node = test_node(3);
        let bob = node.register_party("Bob", 10).unwrap();
        let ghost = PartyId::new("ghost");
        assert_eq!(
            node.try_create_transaction(&ghost, &bob, 1).unwrap_err(),
            ChainError::UnresolvedIdentity("ghost".to_string())
        );
    }

    #[test]
    fn test_route_and_apply_moves_balances() {
        let mut node = test_node(2);
        let alice = node.register_party("Alice", 100).unwrap();
        let bob = node.register_party("Bob", 5).unwrap();

        let tx = node.try_create_transaction(&alice, &bob, 40).unwrap();
        assert_eq!(node.route_and_apply(tx).unwrap(), None);
        assert_eq!(node.registry.get(&alice).unwrap().balance, 60);
        assert_eq!(node.registry.get(&bob).unwrap().balance, 45);
        assert_eq!(node.blockchain.pending.len(), 1);

        assert_eq!(node.transfer(&bob, &alice, 45).unwrap(), Some(1));
        assert_eq!(node.registry.get(&alice).unwrap().balance, 105);
        assert_eq!(node.registry.get(&bob).unwrap().balance, 0);
        assert!(node.validate());
    }

    #[test]
    fn test_route_to_unknown_receiver() {
        let mut node = test_node(1);
        let alice = node.register_party("Alice", 100).unwrap();
        let tx = node
            .try_create_transaction(&alice, &PartyId::new("nobody"), 10)
            .unwrap();

        assert_eq!(
            node.route_and_apply(tx).unwrap_err(),
            ChainError::UnknownReceiver("nobody".to_string())
        );
        assert_eq!(node.registry.get(&alice).unwrap().balance, 100);
        assert_eq!(node.blockchain.len(), 1);
    }

    #[test]
    fn test_stale_transaction_cannot_overdraw() {
        let mut node = test_node(5);
        let alice = node.register_party("Alice", 50).unwrap();
        let bob = node.register_party("Bob", 0).unwrap();

        let first = node.try_create_transaction(&alice, &bob, 50).unwrap();
        let second = node.try_create_transaction(&alice, &bob, 50).unwrap();
        node.route_and_apply(first).unwrap();
        assert!(matches!(
            node.route_and_apply(second),
            Err(ChainError::InsufficientBalance { .. })
        ));
        assert_eq!(node.registry.get(&alice).unwrap().balance, 0);
    }

    #[test]
    fn test_credit_overflow_is_rejected_before_queueing() {
        let mut node = test_node(1);
        let alice = node.register_party("Alice", 10).unwrap();
        let whale = node.register_party("Whale", Balance::MAX).unwrap();

        assert!(matches!(
            node.transfer(&alice, &whale, 1),
            Err(ChainError::BalanceOverflow(_))
        ));
        assert_eq!(node.registry.get(&alice).unwrap().balance, 10);
        assert_eq!(node.registry.get(&whale).unwrap().balance, Balance::MAX);
        assert_eq!(node.blockchain.len(), 1);
        assert!(node.blockchain.pending.is_empty());

        // The other direction still works.
        assert_eq!(node.transfer(&whale, &alice, 5).unwrap(), Some(1));
        assert_eq!(node.registry.get(&alice).unwrap().balance, 15);
    }

    #[test]
    fn test_aborted_mining_leaves_balances() {
        let mut node = test_node(1);
        let alice = node.register_party("Alice", 100).unwrap();
        let bob = node.register_party("Bob", 0).unwrap();
        node.blockchain.mining.cancel.cancel();

        assert!(matches!(
            node.transfer(&alice, &bob, 10),
            Err(ChainError::MiningAborted(_))
        ));
        assert_eq!(node.registry.get(&alice).unwrap().balance, 100);
        assert_eq!(node.registry.get(&bob).unwrap().balance, 0);
        assert!(node.blockchain.pending.is_empty());
    }

    #[test]
    fn test_save_and_load_chain() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("blockchain.json");

        let mut node = test_node(1);
        let alice = node.register_party("Alice", 100)?;
        let bob = node.register_party("Bob", 0)?;
        node.transfer(&alice, &bob, 30)?;
        node.save(&path)?;

        let mut restored = test_node(1);
        restored.registry = node.registry.clone();
        restored.load(&path)?;

        let hashes = |n: &Node| n.blockchain.blocks.iter().map(|b| b.hash.clone()).collect::<Vec<_>>();
        assert_eq!(hashes(&restored), hashes(&node));
        assert!(restored.validate());
        Ok(())
    }
}
