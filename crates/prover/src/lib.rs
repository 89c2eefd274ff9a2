//! Proof-of-storage for vaultnode.
//!
//! Answers storage challenges by reading the challenged byte ranges from the
//! chunk store and aggregating their digests into a domain-separated merkle
//! root.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vaultnode_core::{Challenge, ChallengeChunkInfo};
//! use vaultnode_prover::ChallengeSolver;
//! use vaultnode_storage::{ChunkStore, FsBackend, SledRepository};
//!
//! let repository = Arc::new(SledRepository::open("./data/metadata").unwrap());
//! let backend = Arc::new(FsBackend::new("./data/chunks").unwrap());
//! let solver = ChallengeSolver::new(ChunkStore::new(repository, backend));
//!
//! let challenge = Challenge::new("c1", vec![ChallengeChunkInfo::new("0", 0, 64)]);
//! let solution = solver.solve(&challenge).unwrap();
//! println!("{}", solution.chunk_hash);
//! ```

pub mod solver;

pub use solver::{ChallengeSolver, Result, SolverError};
