//! Proof-of-storage challenge solver.
//!
//! A challenge names an ordered list of byte ranges. Each range is read from
//! the chunk store and hashed with SHA-256; those digests are the leaves of a
//! [`MerkleTree`] and the hex-encoded root is the solution.

use thiserror::Error;
use tracing::{debug, info};
use vaultnode_core::{hash, Challenge, ChallengeSolution, Hash, MerkleTree};
use vaultnode_storage::{ChunkStore, StorageError};

/// Errors that abort a solve.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("challenge for container {0} names no chunks")]
    EmptyChallenge(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, SolverError>;

/// Answers challenges from the chunks held in a [`ChunkStore`].
#[derive(Clone)]
pub struct ChallengeSolver {
    store: ChunkStore,
}

impl ChallengeSolver {
    pub fn new(store: ChunkStore) -> Self {
        Self { store }
    }

    /// Digest of every challenged range, in challenge order.
    ///
    /// Every chunk must belong to the challenged container. Range reads are
    /// not hash-verified; any read failure aborts.
    fn leaves(&self, challenge: &Challenge) -> Result<Vec<Hash>> {
        challenge
            .chunks
            .iter()
            .map(|chunk| {
                let bytes = self.store.fetch_range_in(
                    &chunk.chunk_id,
                    &challenge.container_id,
                    chunk.offset,
                    chunk.length,
                )?;
                Ok(hash(&bytes))
            })
            .collect()
    }

    fn root(&self, challenge: &Challenge) -> Result<Hash> {
        let leaves = self.leaves(challenge)?;
        MerkleTree::new(&leaves)
            .root()
            .ok_or_else(|| SolverError::EmptyChallenge(challenge.container_id.clone()))
    }

    /// Compute the solution for `challenge`.
    ///
    /// Only `chunk_hash` is filled in; anchoring data comes from the chain.
    pub fn solve(&self, challenge: &Challenge) -> Result<ChallengeSolution> {
        if challenge.chunks.is_empty() {
            return Err(SolverError::EmptyChallenge(challenge.container_id.clone()));
        }

        let root = self.root(challenge)?;
        info!(
            container_id = %challenge.container_id,
            chunks = challenge.chunks.len(),
            root = %root,
            "challenge solved"
        );
        Ok(ChallengeSolution::new(root.to_hex()))
    }

    /// Recompute the solution and compare it with `chunk_hash`.
    pub fn verify(&self, challenge: &Challenge, chunk_hash: &str) -> Result<bool> {
        let solution = self.solve(challenge)?;
        let matches = solution.chunk_hash.eq_ignore_ascii_case(chunk_hash);
        debug!(container_id = %challenge.container_id, matches, "challenge solution checked");
        Ok(matches)
    }
}
