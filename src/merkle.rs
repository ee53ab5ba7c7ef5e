//! Merkle commitment tree over an ordered sequence of data fingerprints.
//!
//! Leaves are SHA-256 fingerprints of raw data; an internal node is the
//! SHA-256 of its two children's hex fingerprints concatenated. The root is
//! rebuilt from the full leaf sequence on every insertion. When a level has
//! an odd number of nodes its final node is duplicated before pairing; that
//! padding lives only in the reduction's working copy, never in `leaves`.

use crate::crypto::Fingerprint;

/// A node of the tree. Each internal node exclusively owns its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MerkleNode {
    Leaf {
        fingerprint: Fingerprint,
    },
    Internal {
        fingerprint: Fingerprint,
        left: Box<MerkleNode>,
        right: Box<MerkleNode>,
    },
}

impl MerkleNode {
    pub fn leaf(data: &[u8]) -> Self {
        MerkleNode::Leaf {
            fingerprint: Fingerprint::of(data),
        }
    }

    pub fn parent(left: MerkleNode, right: MerkleNode) -> Self {
        let fingerprint = Fingerprint::of_pair(left.fingerprint(), right.fingerprint());
        MerkleNode::Internal {
            fingerprint,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        match self {
            MerkleNode::Leaf { fingerprint } => fingerprint,
            MerkleNode::Internal { fingerprint, .. } => fingerprint,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, MerkleNode::Leaf { .. })
    }

    /// Number of edges on the longest path down to a leaf.
    pub fn height(&self) -> usize {
        match self {
            MerkleNode::Leaf { .. } => 0,
            MerkleNode::Internal { left, right, .. } => 1 + left.height().max(right.height()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MerkleTree {
    leaves: Vec<MerkleNode>,
    root: Option<MerkleNode>,
}

impl MerkleTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree by adding each item in order.
    pub fn from_leaves<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let mut tree = MerkleTree::new();
        tree.leaves = items
            .into_iter()
            .map(|item| MerkleNode::leaf(item.as_ref()))
            .collect();
        tree.rebuild();
        tree
    }

    /// Append a leaf fingerprinting `data` and rebuild the root.
    pub fn add_leaf(&mut self, data: &[u8]) {
        self.leaves.push(MerkleNode::leaf(data));
        self.rebuild();
    }

    pub fn root(&self) -> Option<&MerkleNode> {
        self.root.as_ref()
    }

    pub fn root_hash(&self) -> Option<&Fingerprint> {
        self.root.as_ref().map(MerkleNode::fingerprint)
    }

    pub fn leaves(&self) -> &[MerkleNode] {
        &self.leaves
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    fn rebuild(&mut self) {
        if self.leaves.is_empty() {
            self.root = None;
            return;
        }

        let mut level = self.leaves.clone();
        while level.len() > 1 {
            if level.len() % 2 == 1 {
                if let Some(last) = level.last().cloned() {
                    level.push(last);
                }
            }
            let mut next = Vec::with_capacity(level.len() / 2);
            let mut nodes = level.into_iter();
            while let (Some(left), Some(right)) = (nodes.next(), nodes.next()) {
                next.push(MerkleNode::parent(left, right));
            }
            level = next;
        }

        self.root = level.pop();
    }
}
