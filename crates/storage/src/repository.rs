//! Metadata repository: containers, data items, micro-networks and peer nodes.

use crate::db::{BatchOp, Result, Storage, StorageError};
use std::path::Path;
use vaultnode_core::{ContainerRecord, DataItemRecord, MicroNetworkRecord, NodeConnectionInfo};

/// Persistence for node metadata.
///
/// Every "already exists" and "not found" condition is reported as its own
/// [`StorageError`] variant; `get_*` methods return `Ok(None)` instead.
pub trait MetadataRepository: Send + Sync {
    // Containers
    fn create_container(&self, record: &ContainerRecord) -> Result<()>;
    fn get_container(&self, container_id: &str) -> Result<Option<ContainerRecord>>;
    fn update_container(&self, record: &ContainerRecord) -> Result<()>;
    fn remove_container(&self, container_id: &str) -> Result<()>;
    fn list_containers(&self) -> Result<Vec<ContainerRecord>>;

    // Data items
    fn create_data_item(&self, record: &DataItemRecord) -> Result<()>;
    fn get_data_item(&self, data_id: &str) -> Result<Option<DataItemRecord>>;
    fn update_data_item(&self, record: &DataItemRecord) -> Result<()>;
    fn remove_data_item(&self, data_id: &str) -> Result<()>;
    /// Remove every listed item that exists; returns how many were removed.
    fn remove_data_items(&self, data_ids: &[String]) -> Result<usize>;
    fn list_data_items(&self, container_id: &str) -> Result<Vec<DataItemRecord>>;

    // Micro-networks
    fn create_micro_network(&self, record: &MicroNetworkRecord) -> Result<()>;
    fn get_micro_network(&self, id: &str) -> Result<Option<MicroNetworkRecord>>;
    fn update_micro_network(&self, record: &MicroNetworkRecord) -> Result<()>;
    fn remove_micro_network(&self, id: &str) -> Result<()>;
    fn list_micro_networks(&self) -> Result<Vec<MicroNetworkRecord>>;

    // Peer nodes
    fn create_node(&self, node: &NodeConnectionInfo) -> Result<()>;
    fn get_node(&self, node_id: &str) -> Result<Option<NodeConnectionInfo>>;
    fn update_node(&self, node: &NodeConnectionInfo) -> Result<()>;
    fn remove_node(&self, node_id: &str) -> Result<()>;
    fn list_nodes(&self) -> Result<Vec<NodeConnectionInfo>>;

    /// Make pending writes durable.
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// [`MetadataRepository`] backed by a sled database.
///
/// With [`SledRepository::temporary`] the database lives in memory only,
/// which serves as the in-memory repository.
#[derive(Clone)]
pub struct SledRepository {
    storage: Storage,
}

impl SledRepository {
    /// Wrap an already opened storage.
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Open a persistent repository at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(Storage::open(path)?))
    }

    /// Open a repository that is discarded when dropped.
    pub fn temporary() -> Result<Self> {
        Ok(Self::new(Storage::open_temporary()?))
    }

    fn create<V: serde::Serialize>(
        &self,
        key: Vec<u8>,
        value: &V,
        exists: impl FnOnce() -> StorageError,
    ) -> Result<()> {
        if self.storage.put_new(key, value)? {
            Ok(())
        } else {
            Err(exists())
        }
    }

    fn update<V: serde::Serialize>(
        &self,
        key: Vec<u8>,
        value: &V,
        missing: impl FnOnce() -> StorageError,
    ) -> Result<()> {
        if !self.storage.contains(&key)? {
            return Err(missing());
        }
        self.storage.put(key, value)
    }

    fn remove(&self, key: Vec<u8>, missing: impl FnOnce() -> StorageError) -> Result<()> {
        if self.storage.delete(key)? {
            Ok(())
        } else {
            Err(missing())
        }
    }
}

impl MetadataRepository for SledRepository {
    // =========================================================================
    // Containers
    // =========================================================================

    fn create_container(&self, record: &ContainerRecord) -> Result<()> {
        let id = &record.container_id;
        self.create(Storage::container_key(id), record, || {
            StorageError::ContainerAlreadyExists(id.clone())
        })
    }

    fn get_container(&self, container_id: &str) -> Result<Option<ContainerRecord>> {
        self.storage.get(Storage::container_key(container_id))
    }

    fn update_container(&self, record: &ContainerRecord) -> Result<()> {
        let id = &record.container_id;
        self.update(Storage::container_key(id), record, || {
            StorageError::NoSuchContainer(id.clone())
        })
    }

    fn remove_container(&self, container_id: &str) -> Result<()> {
        self.remove(Storage::container_key(container_id), || {
            StorageError::NoSuchContainer(container_id.to_string())
        })
    }

    fn list_containers(&self) -> Result<Vec<ContainerRecord>> {
        self.storage.scan_prefix(Storage::CONTAINER_PREFIX)
    }

    // =========================================================================
    // Data items
    // =========================================================================

    fn create_data_item(&self, record: &DataItemRecord) -> Result<()> {
        let id = &record.data_id;
        self.create(Storage::data_item_key(id), record, || {
            StorageError::DataItemAlreadyExists(id.clone())
        })
    }

    fn get_data_item(&self, data_id: &str) -> Result<Option<DataItemRecord>> {
        self.storage.get(Storage::data_item_key(data_id))
    }

    fn update_data_item(&self, record: &DataItemRecord) -> Result<()> {
        let id = &record.data_id;
        self.update(Storage::data_item_key(id), record, || {
            StorageError::NoSuchDataItem(id.clone())
        })
    }

    fn remove_data_item(&self, data_id: &str) -> Result<()> {
        self.remove(Storage::data_item_key(data_id), || {
            StorageError::NoSuchDataItem(data_id.to_string())
        })
    }

    fn remove_data_items(&self, data_ids: &[String]) -> Result<usize> {
        let mut ops = Vec::with_capacity(data_ids.len());
        for id in data_ids {
            let key = Storage::data_item_key(id);
            if self.storage.contains(&key)? {
                ops.push(BatchOp::Remove { key });
            }
        }
        let removed = ops.len();
        self.storage.batch(ops)?;
        Ok(removed)
    }

    fn list_data_items(&self, container_id: &str) -> Result<Vec<DataItemRecord>> {
        let items: Vec<DataItemRecord> = self.storage.scan_prefix(Storage::DATA_ITEM_PREFIX)?;
        Ok(items
            .into_iter()
            .filter(|item| item.belongs_to(container_id))
            .collect())
    }

    // =========================================================================
    // Micro-networks
    // =========================================================================

    fn create_micro_network(&self, record: &MicroNetworkRecord) -> Result<()> {
        let id = &record.id;
        self.create(Storage::micro_network_key(id), record, || {
            StorageError::MicroNetworkAlreadyExists(id.clone())
        })
    }

    fn get_micro_network(&self, id: &str) -> Result<Option<MicroNetworkRecord>> {
        self.storage.get(Storage::micro_network_key(id))
    }

    fn update_micro_network(&self, record: &MicroNetworkRecord) -> Result<()> {
        let id = &record.id;
        self.update(Storage::micro_network_key(id), record, || {
            StorageError::NoSuchMicroNetwork(id.clone())
        })
    }

    fn remove_micro_network(&self, id: &str) -> Result<()> {
        self.remove(Storage::micro_network_key(id), || {
            StorageError::NoSuchMicroNetwork(id.to_string())
        })
    }

    fn list_micro_networks(&self) -> Result<Vec<MicroNetworkRecord>> {
        self.storage.scan_prefix(Storage::MICRO_NETWORK_PREFIX)
    }

    // =========================================================================
    // Peer nodes
    // =========================================================================

    fn create_node(&self, node: &NodeConnectionInfo) -> Result<()> {
        let id = &node.node_id;
        self.create(Storage::node_key(id), node, || {
            StorageError::NodeAlreadyExists(id.clone())
        })
    }

    fn get_node(&self, node_id: &str) -> Result<Option<NodeConnectionInfo>> {
        self.storage.get(Storage::node_key(node_id))
    }

    fn update_node(&self, node: &NodeConnectionInfo) -> Result<()> {
        let id = &node.node_id;
        self.update(Storage::node_key(id), node, || {
            StorageError::NoSuchNode(id.clone())
        })
    }

    fn remove_node(&self, node_id: &str) -> Result<()> {
        self.remove(Storage::node_key(node_id), || {
            StorageError::NoSuchNode(node_id.to_string())
        })
    }

    fn list_nodes(&self) -> Result<Vec<NodeConnectionInfo>> {
        self.storage.scan_prefix(Storage::NODE_PREFIX)
    }

    fn flush(&self) -> Result<()> {
        self.storage.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use vaultnode_core::{generate_hash, HashAlgorithm, MicroNetworkState};

    fn setup() -> SledRepository {
        SledRepository::temporary().unwrap()
    }

    fn container(id: &str) -> ContainerRecord {
        ContainerRecord::new(id, Utc::now() + Duration::days(30))
    }

    fn data_item(id: &str, container_id: &str) -> DataItemRecord {
        let hash = generate_hash(HashAlgorithm::Sha256, id.as_bytes());
        DataItemRecord::new(id, id.len() as u64, hash).in_container(container_id)
    }

    #[test]
    fn test_container_crud() {
        let repo = setup();
        let mut record = container("c1");

        repo.create_container(&record).unwrap();
        assert_eq!(repo.get_container("c1").unwrap(), Some(record.clone()));

        record.expiration_date = record.expiration_date + Duration::days(1);
        repo.update_container(&record).unwrap();
        assert_eq!(repo.get_container("c1").unwrap(), Some(record));

        repo.remove_container("c1").unwrap();
        assert_eq!(repo.get_container("c1").unwrap(), None);
    }

    #[test]
    fn test_container_conflicts_are_typed() {
        let repo = setup();
        repo.create_container(&container("c1")).unwrap();

        let result = repo.create_container(&container("c1"));
        assert!(matches!(result, Err(StorageError::ContainerAlreadyExists(id)) if id == "c1"));

        let result = repo.update_container(&container("c2"));
        assert!(matches!(result, Err(StorageError::NoSuchContainer(_))));

        let result = repo.remove_container("c2");
        assert!(matches!(result, Err(StorageError::NoSuchContainer(_))));
    }

    #[test]
    fn test_list_containers() {
        let repo = setup();
        repo.create_container(&container("c1")).unwrap();
        repo.create_container(&container("c2")).unwrap();

        let ids: Vec<String> = repo
            .list_containers()
            .unwrap()
            .into_iter()
            .map(|c| c.container_id)
            .collect();
        assert_eq!(ids, vec!["c1", "c2"]);
    }

    #[test]
    fn test_data_items_by_container() {
        let repo = setup();
        repo.create_data_item(&data_item("0", "c1")).unwrap();
        repo.create_data_item(&data_item("1", "c1")).unwrap();
        repo.create_data_item(&data_item("2", "c2")).unwrap();

        assert_eq!(repo.list_data_items("c1").unwrap().len(), 2);
        assert_eq!(repo.list_data_items("c2").unwrap().len(), 1);
        assert!(repo.list_data_items("c3").unwrap().is_empty());

        let result = repo.create_data_item(&data_item("0", "c2"));
        assert!(matches!(result, Err(StorageError::DataItemAlreadyExists(_))));
    }

    #[test]
    fn test_remove_data_items_counts_existing() {
        let repo = setup();
        repo.create_data_item(&data_item("0", "c1")).unwrap();
        repo.create_data_item(&data_item("1", "c1")).unwrap();

        let removed = repo
            .remove_data_items(&["0".to_string(), "1".to_string(), "9".to_string()])
            .unwrap();
        assert_eq!(removed, 2);
        assert!(repo.get_data_item("0").unwrap().is_none());

        let result = repo.remove_data_item("0");
        assert!(matches!(result, Err(StorageError::NoSuchDataItem(_))));
    }

    #[test]
    fn test_micro_network_crud() {
        let repo = setup();
        let mut record = MicroNetworkRecord::stopped("c1", "/tmp/c1");

        repo.create_micro_network(&record).unwrap();
        let result = repo.create_micro_network(&record);
        assert!(matches!(result, Err(StorageError::MicroNetworkAlreadyExists(_))));

        record.state = MicroNetworkState::Running;
        repo.update_micro_network(&record).unwrap();
        let stored = repo.get_micro_network("c1").unwrap().unwrap();
        assert_eq!(stored.state, MicroNetworkState::Running);
        assert_eq!(repo.list_micro_networks().unwrap().len(), 1);

        repo.remove_micro_network("c1").unwrap();
        let result = repo.remove_micro_network("c1");
        assert!(matches!(result, Err(StorageError::NoSuchMicroNetwork(_))));
    }

    #[test]
    fn test_node_crud() {
        let repo = setup();
        let node = NodeConnectionInfo {
            node_id: "peer-1".into(),
            url: "http://10.0.0.2:8080".into(),
        };

        repo.create_node(&node).unwrap();
        assert_eq!(repo.get_node("peer-1").unwrap(), Some(node.clone()));
        assert_eq!(repo.list_nodes().unwrap().len(), 1);

        let moved = NodeConnectionInfo {
            url: "http://10.0.0.3:8080".into(),
            ..node
        };
        repo.update_node(&moved).unwrap();
        assert_eq!(repo.get_node("peer-1").unwrap(), Some(moved));

        repo.remove_node("peer-1").unwrap();
        let result = repo.get_node("peer-1").unwrap();
        assert!(result.is_none());
        assert!(matches!(
            repo.remove_node("peer-1"),
            Err(StorageError::NoSuchNode(_))
        ));
    }

    #[test]
    fn test_persistent_repository_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        {
            let repo = SledRepository::open(dir.path()).unwrap();
            repo.create_container(&container("c1")).unwrap();
            repo.flush().unwrap();
        }
        let repo = SledRepository::open(dir.path()).unwrap();
        assert!(repo.get_container("c1").unwrap().is_some());
    }
}
