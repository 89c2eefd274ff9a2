//! Storage layer for vaultnode.
//!
//! This crate provides everything that persists on a storage node:
//! - Metadata records (containers, data items, micro-networks, peer nodes)
//! - Raw byte storage for chunks (filesystem or memory)
//! - The content-addressed chunk store tying the two together
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │               Orchestrator / Proof Solver                │
//! └────────────────────────┬────────────────────────────────┘
//!                          │
//! ┌────────────────────────▼────────────────────────────────┐
//! │                     ChunkStore                           │
//! │   hash verification · corruption purge · membership      │
//! └───────────────┬─────────────────────────┬───────────────┘
//!                 │                         │
//! ┌───────────────▼──────────────┐ ┌────────▼───────────────┐
//! │     MetadataRepository       │ │      ByteStorage        │
//! │  SledRepository (sled/bincode)│ │  FsBackend · Memory     │
//! └──────────────────────────────┘ └────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vaultnode_core::{generate_hash, HashAlgorithm};
//! use vaultnode_storage::{ChunkStore, FsBackend, SledRepository};
//!
//! let repository = Arc::new(SledRepository::open("./data/metadata").unwrap());
//! let backend = Arc::new(FsBackend::new("./data/chunks").unwrap());
//! let store = ChunkStore::new(repository, backend);
//!
//! let data = b"hello";
//! let hash = generate_hash(HashAlgorithm::Sha256, data).to_string();
//! store.save("chunk-0", "container-1", &hash, data).unwrap();
//! assert_eq!(store.fetch("chunk-0", "container-1", None).unwrap(), data);
//! ```

pub mod backend;
pub mod chunk_store;
pub mod db;
pub mod repository;

// Re-export commonly used types
pub use backend::{ByteStorage, FsBackend, MemoryBackend};
pub use chunk_store::ChunkStore;
pub use db::{BatchOp, Result, Storage, StorageError};
pub use repository::{MetadataRepository, SledRepository};
