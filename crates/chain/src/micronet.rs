//! Micro-network lifecycle client.
//!
//! Every container is backed by its own blockchain instance. The orchestrator
//! drives those instances only through [`MicroNetworkClient`], so the chain
//! implementation can be swapped without touching container logic.

use crate::config::LocalNetworkConfig;
use async_trait::async_trait;
use std::collections::HashSet;
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};
use vaultnode_core::{MicroNetworkRecord, MicroNetworkState};
use vaultnode_storage::{MetadataRepository, StorageError};

/// Errors reported by a micro-network client.
#[derive(Debug, Error)]
pub enum MicroNetworkError {
    #[error("micro-network already exists: {0}")]
    AlreadyExists(String),

    #[error("micro-network not found: {0}")]
    NotFound(String),

    #[error("invalid micro-network id: {0:?}")]
    InvalidId(String),

    #[error("invalid peer url: {0}")]
    InvalidPeerUrl(String),

    #[error("no free port pair from {0}")]
    PortsExhausted(u16),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, MicroNetworkError>;

/// Lifecycle operations on the micro-network backing a container.
#[async_trait]
pub trait MicroNetworkClient: Send + Sync {
    /// Create a stopped micro-network.
    async fn create(&self, id: &str) -> Result<MicroNetworkRecord>;

    /// Start it; state passes through STARTING to RUNNING.
    async fn start(&self, id: &str) -> Result<()>;

    async fn stop(&self, id: &str) -> Result<()>;

    /// Create and start a replica whose initial state comes from `peer_url`.
    async fn sync(&self, peer_url: &str, id: &str) -> Result<MicroNetworkRecord>;

    /// Stop if needed and delete the micro-network with its state directory.
    async fn destroy(&self, id: &str) -> Result<()>;

    /// Current record, or `None` if no micro-network exists under `id`.
    fn get_info(&self, id: &str) -> Result<Option<MicroNetworkRecord>>;
}

// =============================================================================
// Local micro-networks
// =============================================================================

/// In-process micro-networks tracked in the metadata repository.
///
/// Each network gets a state directory under the configured base directory and
/// two consecutive ports: RPC on the first, P2P on the second.
pub struct LocalMicroNetworks {
    repository: Arc<dyn MetadataRepository>,
    config: LocalNetworkConfig,
    // Serializes port allocation and state transitions.
    lock: Mutex<()>,
}

impl LocalMicroNetworks {
    pub fn new(repository: Arc<dyn MetadataRepository>, config: LocalNetworkConfig) -> Self {
        Self {
            repository,
            config,
            lock: Mutex::new(()),
        }
    }

    fn validate_id(id: &str) -> Result<()> {
        let valid = !id.is_empty()
            && id != "."
            && id != ".."
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if valid {
            Ok(())
        } else {
            Err(MicroNetworkError::InvalidId(id.to_string()))
        }
    }

    fn validate_peer_url(peer_url: &str) -> Result<()> {
        let rest = peer_url
            .strip_prefix("http://")
            .or_else(|| peer_url.strip_prefix("https://"));
        match rest {
            Some(host) if !host.is_empty() && !host.starts_with('/') => Ok(()),
            _ => Err(MicroNetworkError::InvalidPeerUrl(peer_url.to_string())),
        }
    }

    fn require(&self, id: &str) -> Result<MicroNetworkRecord> {
        self.repository
            .get_micro_network(id)?
            .ok_or_else(|| MicroNetworkError::NotFound(id.to_string()))
    }

    fn rpc_url(&self, port: u16) -> String {
        format!("http://{}:{}", self.config.host, port)
    }

    fn p2p_url(&self, port: u16) -> String {
        format!("tcp://{}:{}", self.config.host, port)
    }

    /// Lowest port pair not advertised by any other micro-network.
    fn allocate_ports(&self) -> Result<(u16, u16)> {
        let in_use: HashSet<String> = self
            .repository
            .list_micro_networks()?
            .into_iter()
            .filter_map(|record| record.rpc_url)
            .collect();

        let mut port = self.config.base_port;
        while let Some(p2p) = port.checked_add(1) {
            if !in_use.contains(&self.rpc_url(port)) {
                return Ok((port, p2p));
            }
            match p2p.checked_add(1) {
                Some(next) => port = next,
                None => break,
            }
        }
        Err(MicroNetworkError::PortsExhausted(self.config.base_port))
    }

    async fn create_record(
        &self,
        id: &str,
        synced_from: Option<&str>,
    ) -> Result<MicroNetworkRecord> {
        Self::validate_id(id)?;
        let path = self.config.base_dir.join(id);

        let _guard = self.lock.lock().await;
        if self.repository.get_micro_network(id)?.is_some() {
            return Err(MicroNetworkError::AlreadyExists(id.to_string()));
        }
        tokio::fs::create_dir_all(&path).await?;

        let mut record = MicroNetworkRecord::stopped(id, path);
        record.synced_from = synced_from.map(str::to_string);
        self.repository.create_micro_network(&record)?;

        info!(id, path = %record.path.display(), "micro-network created");
        Ok(record)
    }
}

#[async_trait]
impl MicroNetworkClient for LocalMicroNetworks {
    async fn create(&self, id: &str) -> Result<MicroNetworkRecord> {
        self.create_record(id, None).await
    }

    async fn start(&self, id: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut record = self.require(id)?;
        if record.state == MicroNetworkState::Running {
            return Ok(());
        }

        record.state = MicroNetworkState::Starting;
        self.repository.update_micro_network(&record)?;
        debug!(id, "micro-network starting");

        let (rpc_port, p2p_port) = self.allocate_ports()?;
        record.rpc_url = Some(self.rpc_url(rpc_port));
        record.p2p_url = Some(self.p2p_url(p2p_port));
        record.state = MicroNetworkState::Running;
        self.repository.update_micro_network(&record)?;

        info!(id, rpc_port, p2p_port, "micro-network running");
        Ok(())
    }

    async fn stop(&self, id: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut record = self.require(id)?;
        if record.state == MicroNetworkState::Stopped {
            return Ok(());
        }

        record.state = MicroNetworkState::Stopping;
        self.repository.update_micro_network(&record)?;

        record.state = MicroNetworkState::Stopped;
        record.rpc_url = None;
        record.p2p_url = None;
        self.repository.update_micro_network(&record)?;

        info!(id, "micro-network stopped");
        Ok(())
    }

    async fn sync(&self, peer_url: &str, id: &str) -> Result<MicroNetworkRecord> {
        Self::validate_peer_url(peer_url)?;
        self.create_record(id, Some(peer_url)).await?;
        debug!(id, peer_url, "micro-network state synced from peer");

        self.start(id).await?;
        self.require(id)
    }

    async fn destroy(&self, id: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let record = self.require(id)?;
        self.repository.remove_micro_network(id)?;

        match tokio::fs::remove_dir_all(&record.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        info!(id, "micro-network destroyed");
        Ok(())
    }

    fn get_info(&self, id: &str) -> Result<Option<MicroNetworkRecord>> {
        Ok(self.repository.get_micro_network(id)?)
    }
}
