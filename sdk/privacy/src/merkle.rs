//! Incremental Merkle Tree for Note Commitments
//!
//! Append-only Poseidon tree with O(depth) inserts and proofs.
//!
//! ```text
//!                    Root
//!                   /    \
//!                 H01    H23
//!                /  \   /   \
//!               H0  H1 H2   H3
//!               |   |   |    |
//!              C0  C1  C2   C3  (note commitments)
//! ```
//!
//! Empty subtrees use a precomputed zero ladder (Z₀ = 0,
//! Z_{L+1} = Poseidon(Z_L, Z_L)). A rolling history of recent roots lets a
//! withdrawal prove against a slightly stale root when the tree advanced
//! between proof generation and submission.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::OnceLock;

use veilkit_crypto::{poseidon_hash, CryptoError, FieldElement, Result};

/// Default tree depth (2^20 leaves).
pub const DEFAULT_TREE_DEPTH: usize = 20;

/// Default number of recent roots kept for proof validation.
pub const DEFAULT_ROOT_HISTORY: usize = 100;

/// Deepest supported tree; the zero ladder is precomputed to this depth.
pub const MAX_TREE_DEPTH: usize = 32;

static ZERO_LADDER: OnceLock<Vec<FieldElement>> = OnceLock::new();

/// Zero values for empty subtrees, one per level up to `MAX_TREE_DEPTH`.
///
/// Computed once per process; safe to call from any entry point.
fn zero_ladder() -> &'static [FieldElement] {
    ZERO_LADDER.get_or_init(|| {
        let mut ladder = Vec::with_capacity(MAX_TREE_DEPTH + 1);
        ladder.push(FieldElement::zero());
        for level in 0..MAX_TREE_DEPTH {
            let prev = ladder[level];
            let next = poseidon_hash(prev, prev).expect("poseidon over fixed parameters");
            ladder.push(next);
        }
        ladder
    })
}

/// A Merkle inclusion proof against the tree's current root.
///
/// `path_indices[L]` is the L-th bit of the leaf index (LSB first): 0 when the
/// running node is a left child, 1 when it is a right child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub path_elements: Vec<FieldElement>,
    pub path_indices: Vec<u8>,
    pub root: FieldElement,
    pub leaf: FieldElement,
}

/// Append-only incremental Merkle tree over field elements.
///
/// Stores only non-empty nodes; empty positions fall back to the zero ladder.
/// Inserting the zero element is legal and distinct from an empty slot
/// because the node map records it explicitly.
pub struct MerkleTree {
    depth: usize,
    /// Non-empty nodes: (level, index) -> value
    nodes: HashMap<(usize, u64), FieldElement>,
    next_index: u64,
    root: FieldElement,
    /// Recent roots, most recent first
    history: VecDeque<FieldElement>,
    history_capacity: usize,
}

impl MerkleTree {
    /// Create an empty tree of the given depth with the default root history.
    pub fn new(depth: usize) -> Result<Self> {
        Self::with_history(depth, DEFAULT_ROOT_HISTORY)
    }

    /// Create an empty tree with an explicit root-history capacity.
    pub fn with_history(depth: usize, history_capacity: usize) -> Result<Self> {
        if depth == 0 || depth > MAX_TREE_DEPTH {
            return Err(CryptoError::InvalidInput(format!(
                "tree depth must be in 1..={MAX_TREE_DEPTH}, got {depth}"
            )));
        }
        if history_capacity == 0 {
            return Err(CryptoError::InvalidInput(
                "root history capacity must be nonzero".into(),
            ));
        }

        let root = zero_ladder()[depth];
        let mut history = VecDeque::with_capacity(history_capacity);
        history.push_front(root);

        Ok(Self {
            depth,
            nodes: HashMap::new(),
            next_index: 0,
            root,
            history,
            history_capacity,
        })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Current root.
    pub fn root(&self) -> FieldElement {
        self.root
    }

    /// Next free leaf position (equals the number of inserted leaves).
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Total leaf capacity, 2^depth.
    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    /// Leaf value at a position, if inserted.
    pub fn leaf(&self, index: u64) -> Option<FieldElement> {
        self.nodes.get(&(0, index)).copied()
    }

    fn node(&self, level: usize, index: u64) -> FieldElement {
        self.nodes
            .get(&(level, index))
            .copied()
            .unwrap_or_else(|| zero_ladder()[level])
    }

    /// Insert a leaf at the next free position and return that position.
    pub fn insert(&mut self, leaf: FieldElement) -> Result<u64> {
        if self.next_index >= self.capacity() {
            return Err(CryptoError::TreeFull(self.capacity()));
        }

        let position = self.next_index;
        self.nodes.insert((0, position), leaf);

        let mut current = leaf;
        let mut index = position;
        for level in 0..self.depth {
            let sibling = self.node(level, index ^ 1);
            current = if index & 1 == 1 {
                poseidon_hash(sibling, current)?
            } else {
                poseidon_hash(current, sibling)?
            };
            index >>= 1;
            self.nodes.insert((level + 1, index), current);
        }

        self.root = current;
        self.history.push_front(current);
        self.history.truncate(self.history_capacity);
        self.next_index += 1;
        Ok(position)
    }

    /// Build an inclusion proof for an inserted leaf against the current root.
    pub fn generate_proof(&self, index: u64) -> Result<MerkleProof> {
        if index >= self.next_index {
            return Err(CryptoError::NotFound(index));
        }

        let mut path_elements = Vec::with_capacity(self.depth);
        let mut path_indices = Vec::with_capacity(self.depth);
        let mut idx = index;
        for level in 0..self.depth {
            path_indices.push((idx & 1) as u8);
            path_elements.push(self.node(level, idx ^ 1));
            idx >>= 1;
        }

        Ok(MerkleProof {
            path_elements,
            path_indices,
            root: self.root,
            leaf: self.node(0, index),
        })
    }

    /// Recompute the root from a leaf and proof; true iff it matches the
    /// proof's root.
    pub fn verify_proof(leaf: FieldElement, proof: &MerkleProof) -> bool {
        if proof.path_elements.len() != proof.path_indices.len() {
            return false;
        }

        let mut current = leaf;
        for (sibling, bit) in proof.path_elements.iter().zip(&proof.path_indices) {
            let hashed = if *bit == 1 {
                poseidon_hash(*sibling, current)
            } else {
                poseidon_hash(current, *sibling)
            };
            match hashed {
                Ok(h) => current = h,
                Err(_) => return false,
            }
        }
        current == proof.root
    }

    /// True iff `root` was the tree root within the last K insertions.
    pub fn is_known_root(&self, root: FieldElement) -> bool {
        self.history.iter().any(|r| *r == root)
    }
}

impl Default for MerkleTree {
    fn default() -> Self {
        Self::new(DEFAULT_TREE_DEPTH).expect("default depth is valid")
    }
}
