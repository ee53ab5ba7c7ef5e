use crate::crypto::{sha256_hex, Fingerprint, FINGERPRINT_HEX_LEN};
use crate::error::ChainError;
use crate::merkle::MerkleTree;
use crate::miner::{mine_block_with, MiningControl};
use crate::transaction::Transaction;
use tracing::{debug, info};

/// A sealed batch of transactions.
///
/// `hash` is `SHA256(text(previous_hash) + text(nonce) + text(merkle_root))`,
/// the root term left out for an empty batch and a missing predecessor
/// rendered as `"None"`.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub previous_hash: Option<Fingerprint>,
    /// Seconds since the Unix epoch, UTC.
    pub timestamp: f64,
    pub transactions: Vec<Transaction>,
    pub merkle_root: Option<Fingerprint>,
    pub nonce: u64,
    pub hash: Fingerprint,
}

impl Block {
    /// Seal `transactions` on top of `previous`, with nonce 0.
    pub fn seal(transactions: Vec<Transaction>, previous: Option<&Block>) -> Self {
        let timestamp = chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0;
        Self::seal_at(transactions, previous.map(|b| b.hash.clone()), timestamp, 0)
    }

    /// Rebuild a block from its persisted parts, recomputing root and hash.
    pub fn seal_at(
        transactions: Vec<Transaction>,
        previous_hash: Option<Fingerprint>,
        timestamp: f64,
        nonce: u64,
    ) -> Self {
        let merkle_root = Block::calculate_merkle_root(&transactions);
        let hash = Block::hash_parts(previous_hash.as_ref(), nonce, merkle_root.as_ref());

        Block {
            previous_hash,
            timestamp,
            transactions,
            merkle_root,
            nonce,
            hash,
        }
    }

    /// Root of a fresh tree over each transaction's fingerprint input, or
    /// `None` for an empty batch.
    pub fn calculate_merkle_root(transactions: &[Transaction]) -> Option<Fingerprint> {
        let tree = MerkleTree::from_leaves(transactions.iter().map(Transaction::fingerprint_input));
        tree.root_hash().cloned()
    }

    pub fn hash_parts(
        previous_hash: Option<&Fingerprint>,
        nonce: u64,
        merkle_root: Option<&Fingerprint>,
    ) -> Fingerprint {
        let previous = previous_hash.map_or("None", Fingerprint::as_str);
        match merkle_root {
            Some(root) => sha256_hex(&format!("{}{}{}", previous, nonce, root)),
            None => sha256_hex(&format!("{}{}", previous, nonce)),
        }
    }

    /// Hash of the block as it currently stands, with the Merkle root rebuilt
    /// from `transactions`. Differs from `hash` once any field was altered.
    pub fn recompute_hash(&self) -> Fingerprint {
        let merkle_root = Block::calculate_merkle_root(&self.transactions);
        Block::hash_parts(self.previous_hash.as_ref(), self.nonce, merkle_root.as_ref())
    }

    pub fn satisfies_difficulty(&self, difficulty: usize) -> bool {
        self.hash.meets_difficulty(difficulty)
    }

    pub fn is_genesis(&self) -> bool {
        self.previous_hash.is_none()
    }
}

pub const DEFAULT_DIFFICULTY: usize = 4;
pub const DEFAULT_BATCH_THRESHOLD: usize = 3;

/// The append-only ledger: mined blocks, a Merkle digest over their hashes,
/// and the batch of transactions waiting for the next block.
#[derive(Debug, Clone)]
pub struct Blockchain {
    pub blocks: Vec<Block>,
    pub difficulty: usize,
    pub batch_threshold: usize,
    pub pending: Vec<Transaction>,
    pub chain_digest: MerkleTree,
    pub mining: MiningControl,
}

impl Blockchain {
    /// Create a ledger with an unbounded miner and bootstrap its genesis block.
    pub fn new(difficulty: usize, batch_threshold: usize) -> Result<Self, ChainError> {
        Self::with_mining(difficulty, batch_threshold, MiningControl::default())
    }

    pub fn with_mining(
        difficulty: usize,
        batch_threshold: usize,
        mining: MiningControl,
    ) -> Result<Self, ChainError> {
        let mut blockchain = Self::empty(difficulty, batch_threshold, mining)?;
        blockchain.bootstrap()?;
        Ok(blockchain)
    }

    /// Rebuild a ledger from already-sealed blocks, exactly as given.
    ///
    /// Nothing is checked or corrected here; run [`Blockchain::validate`]
    /// afterwards. An empty block list bootstraps a fresh genesis block.
    pub fn from_blocks(
        blocks: Vec<Block>,
        difficulty: usize,
        batch_threshold: usize,
        mining: MiningControl,
    ) -> Result<Self, ChainError> {
        let mut blockchain = Self::empty(difficulty, batch_threshold, mining)?;
        for block in blocks {
            blockchain.push_block(block);
        }
        blockchain.bootstrap()?;
        Ok(blockchain)
    }

    fn empty(
        difficulty: usize,
        batch_threshold: usize,
        mining: MiningControl,
    ) -> Result<Self, ChainError> {
        if batch_threshold == 0 {
            return Err(ChainError::InvalidConfig(
                "batch threshold must be at least 1".to_string(),
            ));
        }
        if difficulty > FINGERPRINT_HEX_LEN {
            return Err(ChainError::InvalidConfig(format!(
                "difficulty {} exceeds the {} hex characters of a hash",
                difficulty, FINGERPRINT_HEX_LEN
            )));
        }

        Ok(Blockchain {
            blocks: Vec::new(),
            difficulty,
            batch_threshold,
            pending: Vec::new(),
            chain_digest: MerkleTree::new(),
            mining,
        })
    }

    /// Seal and mine the genesis block when the chain is empty.
    fn bootstrap(&mut self) -> Result<(), ChainError> {
        if !self.blocks.is_empty() {
            return Ok(());
        }
        let genesis = mine_block_with(Block::seal(Vec::new(), None), self.difficulty, &self.mining)?;
        info!("Genesis block {} mined (nonce {})", genesis.hash.short(), genesis.nonce);
        self.push_block(genesis);
        Ok(())
    }

    /// Queue a transaction; once the batch threshold is reached the whole
    /// pending batch is sealed, mined and appended.
    ///
    /// Returns the index of the appended block, if one was minted. When
    /// mining aborts the submission is rolled back: the chain is untouched
    /// and `pending` is exactly as it was before the call.
    pub fn submit_transaction(&mut self, tx: Transaction) -> Result<Option<usize>, ChainError> {
        debug!("Queued transaction {} ({} pending)", tx.id, self.pending.len() + 1);
        self.pending.push(tx);
        if self.pending.len() < self.batch_threshold {
            return Ok(None);
        }

        let sealed = self.seal_pending();
        if sealed.is_err() {
            self.pending.pop();
        }
        sealed
    }

    /// Seal, mine and append every pending transaction regardless of the
    /// threshold. Does nothing when the batch is empty.
    pub fn seal_pending(&mut self) -> Result<Option<usize>, ChainError> {
        if self.pending.is_empty() {
            return Ok(None);
        }

        let block = Block::seal(self.pending.clone(), self.blocks.last());
        let block = mine_block_with(block, self.difficulty, &self.mining)?;
        let index = self.push_block(block);
        self.pending.clear();
        Ok(Some(index))
    }

    /// Append a block sealed and mined elsewhere.
    ///
    /// The block must link to the current tail, carry a hash matching its
    /// contents, and satisfy the ledger difficulty.
    pub fn append_block(&mut self, block: Block) -> Result<usize, ChainError> {
        let index = self.blocks.len();
        let expected_previous = self.blocks.last().map(|b| &b.hash);

        if block.previous_hash.as_ref() != expected_previous {
            return Err(ChainError::IntegrityViolation {
                index,
                reason: format!(
                    "previous hash {} does not match tail {}",
                    block.previous_hash.as_ref().map_or("None", Fingerprint::as_str),
                    expected_previous.map_or("None", Fingerprint::as_str)
                ),
            });
        }

        let recomputed = block.recompute_hash();
        if recomputed != block.hash {
            return Err(ChainError::IntegrityViolation {
                index,
                reason: format!("stored hash {} but contents hash to {}", block.hash, recomputed),
            });
        }

        if !block.satisfies_difficulty(self.difficulty) {
            return Err(ChainError::IntegrityViolation {
                index,
                reason: format!(
                    "hash {} does not meet difficulty {}",
                    block.hash, self.difficulty
                ),
            });
        }

        Ok(self.push_block(block))
    }

    fn push_block(&mut self, block: Block) -> usize {
        let index = self.blocks.len();
        self.chain_digest.add_leaf(block.hash.as_str().as_bytes());
        info!(
            "Appended block #{} {} ({} transactions, nonce {})",
            index,
            block.hash.short(),
            block.transactions.len(),
            block.nonce
        );
        self.blocks.push(block);
        index
    }

    pub fn block(&self, index: usize) -> Result<&Block, ChainError> {
        self.blocks.get(index).ok_or(ChainError::IndexOutOfRange {
            index,
            len: self.blocks.len(),
        })
    }

    pub fn tail(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Root of the chain-level digest over block hashes.
    pub fn chain_root(&self) -> Option<&Fingerprint> {
        self.chain_digest.root_hash()
    }
}
