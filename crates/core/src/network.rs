//! Micro-network records and the container states derived from them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Lifecycle state of a container's micro-network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MicroNetworkState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Container state as seen by callers.
///
/// Never stored; always derived from the micro-network record, with
/// `Unknown` standing for "no micro-network record".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerState {
    Unknown,
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl From<MicroNetworkState> for ContainerState {
    fn from(state: MicroNetworkState) -> Self {
        match state {
            MicroNetworkState::Starting => ContainerState::Starting,
            MicroNetworkState::Running => ContainerState::Running,
            MicroNetworkState::Stopping => ContainerState::Stopping,
            MicroNetworkState::Stopped => ContainerState::Stopped,
        }
    }
}

impl ContainerState {
    /// Derive the state from an optional micro-network record.
    pub fn derive(record: Option<&MicroNetworkRecord>) -> Self {
        record.map_or(ContainerState::Unknown, |r| r.state.into())
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContainerState::Unknown => "UNKNOWN",
            ContainerState::Starting => "STARTING",
            ContainerState::Running => "RUNNING",
            ContainerState::Stopping => "STOPPING",
            ContainerState::Stopped => "STOPPED",
        };
        f.write_str(name)
    }
}

/// The dedicated blockchain instance backing one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicroNetworkRecord {
    /// Usually equal to the container ID.
    pub id: String,
    /// On-disk location of the chain state.
    pub path: PathBuf,
    pub state: MicroNetworkState,
    pub rpc_url: Option<String>,
    pub p2p_url: Option<String>,
    /// Peer URL this replica was synced from, if it was replicated.
    pub synced_from: Option<String>,
}

impl MicroNetworkRecord {
    /// A freshly created, not yet started micro-network.
    pub fn stopped(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            state: MicroNetworkState::Stopped,
            rpc_url: None,
            p2p_url: None,
            synced_from: None,
        }
    }

    /// Connection info, available only while running with both endpoints known.
    pub fn connection_info(&self) -> Option<ConnectionInfo> {
        if self.state != MicroNetworkState::Running {
            return None;
        }
        Some(ConnectionInfo {
            container_id: self.id.clone(),
            rpc_url: self.rpc_url.clone()?,
            p2p_url: self.p2p_url.clone()?,
        })
    }
}

/// How clients reach a running container's micro-network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub container_id: String,
    pub rpc_url: String,
    pub p2p_url: String,
}

/// Where another storage node can be reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConnectionInfo {
    pub node_id: String,
    pub url: String,
}
