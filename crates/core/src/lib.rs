//! Core primitives for vaultnode.
//!
//! This crate provides the types shared by every other crate in the workspace:
//! - Hashing (raw SHA-256 and `ALGORITHM:base64` encoded hashes)
//! - The domain-separated merkle tree used for proof-of-storage
//! - Container, data item and micro-network records
//! - Challenges and challenge solutions

pub mod challenge;
pub mod container;
pub mod data_item;
pub mod hash;
pub mod merkle;
pub mod network;

// Re-export commonly used types at the crate root
pub use challenge::{Challenge, ChallengeChunkInfo, ChallengeSolution};
pub use container::ContainerRecord;
pub use data_item::DataItemRecord;
pub use hash::{
    generate_hash, generate_hash_reader, hash, hash_concat, verify_hash, verify_hash_reader,
    EncodedHash, Hash, HashAlgorithm, HashError, H256,
};
pub use merkle::{merkle_root, MerkleProof, MerkleTree, ProofStep};
pub use network::{
    ConnectionInfo, ContainerState, MicroNetworkRecord, MicroNetworkState, NodeConnectionInfo,
};
