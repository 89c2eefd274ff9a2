//! Container orchestrator.
//!
//! Lifecycle operations (create, replicate, remove) are validated on the
//! caller's side, then queued for a single worker task that runs them one at a
//! time in submission order. Reads go straight to the repository and the
//! micro-network client without queueing.

use crate::config::OrchestratorConfig;
use crate::micronet::{MicroNetworkClient, MicroNetworkError};
use crate::pending::PendingOperation;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vaultnode_core::{Challenge, ConnectionInfo, ContainerRecord, ContainerState};
use vaultnode_storage::{MetadataRepository, StorageError};

/// Orchestrator errors.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("no such container: {0}")]
    NoSuchContainer(String),

    #[error("container already exists on this node: {0}")]
    ContainerAlreadyExists(String),

    #[error("no such node: {0}")]
    NoSuchNode(String),

    #[error("failed to create container {container_id}: {reason}")]
    FailedToCreateContainer {
        container_id: String,
        reason: String,
        source: Option<MicroNetworkError>,
    },

    #[error("failed to replicate container {container_id}: {reason}")]
    FailedToReplicateContainer {
        container_id: String,
        reason: String,
        source: Option<MicroNetworkError>,
    },

    #[error("operation queue is full ({0} pending)")]
    QueueFull(usize),

    #[error("orchestrator worker has stopped")]
    WorkerStopped,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("micro-network error: {0}")]
    MicroNetwork(#[from] MicroNetworkError),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

// =============================================================================
// Orchestrator
// =============================================================================

/// Manages the containers hosted on this node.
pub struct Orchestrator {
    repository: Arc<dyn MetadataRepository>,
    networks: Arc<dyn MicroNetworkClient>,
    config: OrchestratorConfig,
    jobs: mpsc::Sender<Job>,
    worker: JoinHandle<()>,
}

impl Orchestrator {
    /// Spawn the worker and return a handle to it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        repository: Arc<dyn MetadataRepository>,
        networks: Arc<dyn MicroNetworkClient>,
        config: OrchestratorConfig,
    ) -> Self {
        let (jobs, mut queue) = mpsc::channel::<Job>(config.queue_capacity.max(1));
        let worker = tokio::spawn(async move {
            debug!("orchestrator worker started");
            while let Some(job) = queue.recv().await {
                job.await;
            }
            debug!("orchestrator worker stopped");
        });

        Self {
            repository,
            networks,
            config,
            jobs,
            worker,
        }
    }

    /// Stop accepting work, let queued operations finish, and wait for the worker.
    pub async fn shutdown(self) {
        let Orchestrator { jobs, worker, .. } = self;
        drop(jobs);
        if let Err(e) = worker.await {
            warn!(error = %e, "orchestrator worker ended abnormally");
        }
    }

    /// Queue `work` behind everything submitted before it.
    fn submit<T, F>(
        &self,
        operation: &'static str,
        container_id: &str,
        work: F,
    ) -> Result<PendingOperation<T>>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let id = container_id.to_string();
        let job: Job = Box::pin(async move {
            let result = work.await;
            match &result {
                Ok(_) => {
                    info!(operation, container_id = %id, "container operation completed")
                }
                Err(e) => {
                    warn!(operation, container_id = %id, error = %e, "container operation failed")
                }
            }
            // The caller may have dropped its handle.
            let _ = tx.send(result);
        });

        self.jobs.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => OrchestratorError::QueueFull(self.config.queue_capacity),
            TrySendError::Closed(_) => OrchestratorError::WorkerStopped,
        })?;
        debug!(operation, container_id, "container operation queued");
        Ok(PendingOperation::new(rx))
    }

    fn require_container(&self, container_id: &str) -> Result<ContainerRecord> {
        self.repository
            .get_container(container_id)?
            .ok_or_else(|| OrchestratorError::NoSuchContainer(container_id.to_string()))
    }

    fn is_hosted(&self, container_id: &str) -> Result<bool> {
        Ok(self.networks.get_info(container_id)?.is_some())
    }

    // =========================================================================
    // Lifecycle operations
    // =========================================================================

    /// Create and start the micro-network for a known container.
    ///
    /// The handle resolves with the connection info once the micro-network is
    /// RUNNING, or with [`OrchestratorError::FailedToCreateContainer`] if it does
    /// not get there within the configured start timeout.
    pub fn create_container(&self, container_id: &str) -> Result<PendingOperation<ConnectionInfo>> {
        self.require_container(container_id)?;
        if self.is_hosted(container_id)? {
            return Err(OrchestratorError::ContainerAlreadyExists(container_id.to_string()));
        }

        let repository = Arc::clone(&self.repository);
        let networks = Arc::clone(&self.networks);
        let config = self.config.clone();
        let id = container_id.to_string();

        self.submit("create", container_id, async move {
            // Earlier queued operations may have changed things since submission.
            if repository.get_container(&id)?.is_none() {
                return Err(OrchestratorError::NoSuchContainer(id));
            }
            if networks.get_info(&id)?.is_some() {
                return Err(OrchestratorError::ContainerAlreadyExists(id));
            }

            let result = bring_up(networks.as_ref(), &id, &config).await;
            if result.is_err() {
                if let Err(e) = networks.destroy(&id).await {
                    debug!(container_id = %id, error = %e, "cleanup after failed create");
                }
            }
            result
        })
    }

    /// Replicate a container from a peer node.
    ///
    /// The handle resolves with the replica's connection info once it is
    /// RUNNING.
    pub fn replicate_container(
        &self,
        container_id: &str,
        peer_node_id: &str,
    ) -> Result<PendingOperation<ConnectionInfo>> {
        self.require_container(container_id)?;
        if self.is_hosted(container_id)? {
            return Err(OrchestratorError::ContainerAlreadyExists(container_id.to_string()));
        }
        let peer = self
            .repository
            .get_node(peer_node_id)?
            .ok_or_else(|| OrchestratorError::NoSuchNode(peer_node_id.to_string()))?;

        let repository = Arc::clone(&self.repository);
        let networks = Arc::clone(&self.networks);
        let id = container_id.to_string();

        self.submit("replicate", container_id, async move {
            if repository.get_container(&id)?.is_none() {
                return Err(OrchestratorError::NoSuchContainer(id));
            }
            if networks.get_info(&id)?.is_some() {
                return Err(OrchestratorError::ContainerAlreadyExists(id));
            }

            let record = networks.sync(&peer.url, &id).await.map_err(|e| {
                OrchestratorError::FailedToReplicateContainer {
                    container_id: id.clone(),
                    reason: format!("sync from {} ({}) failed", peer.node_id, peer.url),
                    source: Some(e),
                }
            })?;

            record
                .connection_info()
                .ok_or_else(|| OrchestratorError::FailedToReplicateContainer {
                    container_id: id.clone(),
                    reason: format!(
                        "replica is {} without endpoints",
                        ContainerState::from(record.state)
                    ),
                    source: None,
                })
        })
    }

    /// Destroy the micro-network of a hosted container.
    ///
    /// The container record itself stays in the repository.
    pub fn remove_container(&self, container_id: &str) -> Result<PendingOperation<()>> {
        self.require_container(container_id)?;
        if !self.is_hosted(container_id)? {
            return Err(OrchestratorError::NoSuchContainer(container_id.to_string()));
        }

        let repository = Arc::clone(&self.repository);
        let networks = Arc::clone(&self.networks);
        let id = container_id.to_string();

        self.submit("remove", container_id, async move {
            if repository.get_container(&id)?.is_none() || networks.get_info(&id)?.is_none() {
                return Err(OrchestratorError::NoSuchContainer(id));
            }
            networks.destroy(&id).await.map_err(OrchestratorError::from)
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn get_container(&self, container_id: &str) -> Result<Option<ContainerRecord>> {
        Ok(self.repository.get_container(container_id)?)
    }

    /// Whether the container is known and has a micro-network on this node.
    pub fn has_container(&self, container_id: &str) -> Result<bool> {
        Ok(self.repository.get_container(container_id)?.is_some() && self.is_hosted(container_id)?)
    }

    /// State derived from the micro-network record; `Unknown` when there is none.
    pub fn get_container_state(&self, container_id: &str) -> Result<ContainerState> {
        let record = self.networks.get_info(container_id)?;
        Ok(ContainerState::derive(record.as_ref()))
    }

    /// Endpoints of a RUNNING container, `None` in any other state.
    pub fn get_container_connection_info(
        &self,
        container_id: &str,
    ) -> Result<Option<ConnectionInfo>> {
        let record = self.networks.get_info(container_id)?;
        Ok(record.and_then(|r| r.connection_info()))
    }

    /// Attach a pending challenge to its container.
    pub fn save_challenge(&self, challenge: Challenge) -> Result<()> {
        let mut record = self.require_container(&challenge.container_id)?;
        debug!(
            container_id = %record.container_id,
            chunks = challenge.chunks.len(),
            "challenge saved"
        );
        record.pending_challenge = Some(challenge);
        self.repository.update_container(&record)?;
        Ok(())
    }

    /// Every known container with its current state.
    pub fn list_containers(&self) -> Result<Vec<(ContainerRecord, ContainerState)>> {
        self.repository
            .list_containers()?
            .into_iter()
            .map(|record| {
                let state = self.get_container_state(&record.container_id)?;
                Ok((record, state))
            })
            .collect()
    }
}

// =============================================================================
// Worker-side helpers
// =============================================================================

async fn bring_up(
    networks: &dyn MicroNetworkClient,
    container_id: &str,
    config: &OrchestratorConfig,
) -> Result<ConnectionInfo> {
    let failed = |reason: String, source: Option<MicroNetworkError>| {
        OrchestratorError::FailedToCreateContainer {
            container_id: container_id.to_string(),
            reason,
            source,
        }
    };

    networks
        .create(container_id)
        .await
        .map_err(|e| failed("micro-network creation failed".to_string(), Some(e)))?;
    networks
        .start(container_id)
        .await
        .map_err(|e| failed("micro-network start failed".to_string(), Some(e)))?;

    let timeout = config.start_timeout();
    let waiting = wait_until_running(networks, container_id, config.poll_interval());
    match tokio::time::timeout(timeout, waiting).await {
        Ok(Ok(info)) => Ok(info),
        Ok(Err(e)) => Err(failed("status check failed".to_string(), Some(e))),
        Err(_) => Err(failed(format!("not RUNNING after {:?}", timeout), None)),
    }
}

async fn wait_until_running(
    networks: &dyn MicroNetworkClient,
    container_id: &str,
    poll_interval: Duration,
) -> std::result::Result<ConnectionInfo, MicroNetworkError> {
    let mut ticker = tokio::time::interval(poll_interval.max(Duration::from_millis(1)));
    loop {
        ticker.tick().await;
        let record = networks
            .get_info(container_id)?
            .ok_or_else(|| MicroNetworkError::NotFound(container_id.to_string()))?;
        if let Some(info) = record.connection_info() {
            return Ok(info);
        }
        debug!(container_id, state = ?record.state, "waiting for micro-network");
    }
}
