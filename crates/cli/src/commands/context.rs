//! Opening an initialized node.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::Arc;
use vaultnode_chain::{LocalMicroNetworks, NodeConfig, Orchestrator};
use vaultnode_storage::{ChunkStore, MetadataRepository};

/// Everything a command needs from an initialized data directory.
pub struct NodeContext {
    pub config: NodeConfig,
    pub repository: Arc<dyn MetadataRepository>,
    pub store: ChunkStore,
}

impl NodeContext {
    pub fn open(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join(NodeConfig::FILE_NAME);
        if !config_path.is_file() {
            bail!(
                "No node found in {}; run 'vaultnode init' first",
                data_dir.display()
            );
        }

        let config = NodeConfig::load(&config_path)
            .with_context(|| format!("Failed to load config: {}", config_path.display()))?;
        let repository = config
            .repository
            .open()
            .context("Failed to open metadata repository")?;
        let backend = config
            .backend
            .open()
            .context("Failed to open chunk storage")?;
        let store = ChunkStore::new(repository.clone(), backend);

        Ok(Self {
            config,
            repository,
            store,
        })
    }

    /// Start an orchestrator over the local micro-networks.
    pub fn orchestrator(&self) -> Orchestrator {
        let networks = Arc::new(LocalMicroNetworks::new(
            self.repository.clone(),
            self.config.micro_networks.clone(),
        ));
        Orchestrator::start(
            self.repository.clone(),
            networks,
            self.config.orchestrator.clone(),
        )
    }

    /// Flush metadata to disk.
    pub fn close(self) -> Result<()> {
        self.repository
            .flush()
            .context("Failed to flush metadata repository")
    }
}
