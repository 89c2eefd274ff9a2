//! Domain-separated merkle tree used for proof-of-storage solutions.
//!
//! Pairs are combined as `SHA256(prefix || left || right)` where the prefix is
//! [`LEAF_PREFIX`] on level 0 and [`NODE_PREFIX`] on every level above it.
//! An unpaired node at the end of a level is carried up unchanged; it is never
//! duplicated or re-hashed.

use crate::hash::{hash_concat, Hash};

/// Prefix used when combining two leaves.
pub const LEAF_PREFIX: u8 = 0x00;
/// Prefix used when combining two inner nodes.
pub const NODE_PREFIX: u8 = 0x01;

fn level_prefix(level: usize) -> u8 {
    if level == 0 {
        LEAF_PREFIX
    } else {
        NODE_PREFIX
    }
}

/// Combine two siblings sitting on `level`.
pub fn combine(level: usize, left: &Hash, right: &Hash) -> Hash {
    hash_concat(&[&[level_prefix(level)], left.as_ref(), right.as_ref()])
}

fn next_level(level: usize, current: &[Hash]) -> Vec<Hash> {
    current
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => combine(level, left, right),
            [single] => *single,
            _ => unreachable!("chunks(2) yields one or two elements"),
        })
        .collect()
}

/// Compute the merkle root of an ordered list of leaves.
///
/// Returns `None` for an empty list. A single leaf is its own root.
pub fn merkle_root(leaves: &[Hash]) -> Option<Hash> {
    if leaves.is_empty() {
        return None;
    }

    let mut current = leaves.to_vec();
    let mut level = 0;
    while current.len() > 1 {
        current = next_level(level, &current);
        level += 1;
    }

    Some(current[0])
}

/// A merkle tree that keeps every level for inclusion proofs.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// All nodes in the tree, level by level (leaves first).
    levels: Vec<Vec<Hash>>,
}

/// One step of an inclusion proof, from the leaf upwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofStep {
    /// Sibling sits to the left of the proven node.
    Left(Hash),
    /// Sibling sits to the right of the proven node.
    Right(Hash),
    /// The proven node was unpaired on this level and carried up as-is.
    PassThrough,
}

/// A merkle proof for a single leaf.
#[derive(Debug, Clone)]
pub struct MerkleProof {
    /// The leaf being proven.
    pub leaf: Hash,
    /// One step per level below the root.
    pub steps: Vec<ProofStep>,
}

impl MerkleTree {
    /// Build a merkle tree from a list of leaf hashes.
    pub fn new(leaves: &[Hash]) -> Self {
        if leaves.is_empty() {
            return Self { levels: Vec::new() };
        }

        let mut levels = vec![leaves.to_vec()];
        while let Some(current) = levels.last().filter(|l| l.len() > 1) {
            let next = next_level(levels.len() - 1, current);
            levels.push(next);
        }

        Self { levels }
    }

    /// Get the root of the tree, or `None` when built from no leaves.
    pub fn root(&self) -> Option<Hash> {
        self.levels.last().and_then(|level| level.first()).copied()
    }

    /// Get the number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        self.levels.first().map(|l| l.len()).unwrap_or(0)
    }

    /// Number of levels, leaves included.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Generate a proof for the leaf at the given index.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        if index >= self.leaf_count() {
            return None;
        }

        let leaf = self.levels[0][index];
        let mut steps = Vec::with_capacity(self.levels.len().saturating_sub(1));
        let mut idx = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let step = if idx % 2 == 1 {
                ProofStep::Left(level[idx - 1])
            } else if idx + 1 < level.len() {
                ProofStep::Right(level[idx + 1])
            } else {
                ProofStep::PassThrough
            };
            steps.push(step);
            idx /= 2;
        }

        Some(MerkleProof { leaf, steps })
    }

    /// Verify a merkle proof against this tree's root.
    pub fn verify_proof(&self, proof: &MerkleProof) -> bool {
        match self.root() {
            Some(root) => verify_proof(&root, proof),
            None => false,
        }
    }
}

/// Verify a merkle proof against a given root.
pub fn verify_proof(root: &Hash, proof: &MerkleProof) -> bool {
    let mut current = proof.leaf;

    for (level, step) in proof.steps.iter().enumerate() {
        current = match step {
            ProofStep::Left(sibling) => combine(level, sibling, &current),
            ProofStep::Right(sibling) => combine(level, &current, sibling),
            ProofStep::PassThrough => current,
        };
    }

    current == *root
}
