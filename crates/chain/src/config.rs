//! Node configuration.
//!
//! Stored as `config.json` in the data directory. Every field has a default,
//! so a partial file is enough:
//!
//! ```json
//! {
//!   "repository": { "kind": "sled", "path": "./data/metadata" },
//!   "backend": { "kind": "memory" },
//!   "orchestrator": { "start_timeout_ms": 60000 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use vaultnode_storage::{ByteStorage, FsBackend, MemoryBackend, MetadataRepository, SledRepository};

/// Errors loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where node metadata is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RepositoryConfig {
    Sled { path: PathBuf },
    /// Temporary sled database, discarded on exit.
    Memory,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        RepositoryConfig::Sled {
            path: PathBuf::from("./data/metadata"),
        }
    }
}

impl RepositoryConfig {
    pub fn open(&self) -> vaultnode_storage::Result<Arc<dyn MetadataRepository>> {
        let repository = match self {
            RepositoryConfig::Sled { path } => SledRepository::open(path)?,
            RepositoryConfig::Memory => SledRepository::temporary()?,
        };
        Ok(Arc::new(repository))
    }
}

/// Where chunk bytes are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    Filesystem { path: PathBuf },
    Memory,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Filesystem {
            path: PathBuf::from("./data/chunks"),
        }
    }
}

impl BackendConfig {
    pub fn open(&self) -> vaultnode_storage::Result<Arc<dyn ByteStorage>> {
        Ok(match self {
            BackendConfig::Filesystem { path } => Arc::new(FsBackend::new(path)?),
            BackendConfig::Memory => Arc::new(MemoryBackend::new()),
        })
    }
}

/// Orchestrator worker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Maximum number of queued lifecycle operations.
    pub queue_capacity: usize,
    /// Delay between micro-network status checks while waiting for RUNNING.
    pub poll_interval_ms: u64,
    /// How long a new micro-network may take to reach RUNNING.
    pub start_timeout_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            poll_interval_ms: 500,
            start_timeout_ms: 30_000,
        }
    }
}

impl OrchestratorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }
}

/// Settings for the in-process micro-network client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalNetworkConfig {
    /// Parent directory of every micro-network's state directory.
    pub base_dir: PathBuf,
    /// Host advertised in RPC and P2P endpoints.
    pub host: String,
    /// First port handed out; each micro-network takes two consecutive ports.
    pub base_port: u16,
}

impl Default for LocalNetworkConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./data/networks"),
            host: "127.0.0.1".to_string(),
            base_port: 26600,
        }
    }
}

/// Complete node configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub repository: RepositoryConfig,
    pub backend: BackendConfig,
    pub orchestrator: OrchestratorConfig,
    pub micro_networks: LocalNetworkConfig,
}

impl NodeConfig {
    /// File name of the config inside a data directory.
    pub const FILE_NAME: &'static str = "config.json";

    /// Persistent layout rooted at `data_dir`.
    pub fn for_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            repository: RepositoryConfig::Sled {
                path: data_dir.join("metadata"),
            },
            backend: BackendConfig::Filesystem {
                path: data_dir.join("chunks"),
            },
            orchestrator: OrchestratorConfig::default(),
            micro_networks: LocalNetworkConfig {
                base_dir: data_dir.join("networks"),
                ..LocalNetworkConfig::default()
            },
        }
    }

    /// Everything in memory; nothing touches disk except micro-network directories.
    pub fn in_memory(network_dir: impl Into<PathBuf>) -> Self {
        Self {
            repository: RepositoryConfig::Memory,
            backend: BackendConfig::Memory,
            orchestrator: OrchestratorConfig::default(),
            micro_networks: LocalNetworkConfig {
                base_dir: network_dir.into(),
                ..LocalNetworkConfig::default()
            },
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.orchestrator.queue_capacity, 64);
        assert_eq!(config.orchestrator.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.micro_networks.host, "127.0.0.1");
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let json = r#"{
            "backend": { "kind": "memory" },
            "orchestrator": { "start_timeout_ms": 1000 }
        }"#;
        let config: NodeConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.backend, BackendConfig::Memory);
        assert_eq!(config.repository, RepositoryConfig::default());
        assert_eq!(config.orchestrator.start_timeout_ms, 1000);
        assert_eq!(config.orchestrator.queue_capacity, 64);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let config = NodeConfig::for_data_dir(dir.path());
        let path = dir.path().join(NodeConfig::FILE_NAME);

        config.save(&path).unwrap();
        let loaded = NodeConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(NodeConfig::FILE_NAME);
        fs::write(&path, "not json").unwrap();

        assert!(matches!(NodeConfig::load(&path), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_open_providers() {
        let dir = TempDir::new().unwrap();
        let config = NodeConfig::for_data_dir(dir.path());

        let repository = config.repository.open().unwrap();
        assert!(repository.list_containers().unwrap().is_empty());

        let backend = config.backend.open().unwrap();
        backend.save("x", b"y").unwrap();
        assert!(dir.path().join("chunks").join("objects").is_dir());
    }
}
