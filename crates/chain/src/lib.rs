//! Container orchestration for vaultnode.
//!
//! This crate runs the containers hosted on a node:
//! - **Orchestrator**: queued create/replicate/remove operations and state reads
//! - **Micro-networks**: the client trait for per-container blockchains and a
//!   local implementation
//! - **Config**: node configuration and provider selection
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vaultnode_chain::{LocalMicroNetworks, NodeConfig, Orchestrator};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = NodeConfig::for_data_dir("./data");
//! let repository = config.repository.open()?;
//! let networks = Arc::new(LocalMicroNetworks::new(
//!     repository.clone(),
//!     config.micro_networks.clone(),
//! ));
//!
//! let orchestrator = Orchestrator::start(repository, networks, config.orchestrator);
//! let info = orchestrator.create_container("my-container")?.await?;
//! println!("rpc: {}", info.rpc_url);
//!
//! orchestrator.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod micronet;
pub mod orchestrator;
pub mod pending;

// Re-export commonly used types
pub use config::{
    BackendConfig, ConfigError, LocalNetworkConfig, NodeConfig, OrchestratorConfig,
    RepositoryConfig,
};
pub use micronet::{LocalMicroNetworks, MicroNetworkClient, MicroNetworkError};
pub use orchestrator::{Orchestrator, OrchestratorError, Result};
pub use pending::PendingOperation;
