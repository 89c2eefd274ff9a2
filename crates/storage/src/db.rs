//! sled database wrapper with serialization helpers.

use sled::Db;
use std::path::Path;
use thiserror::Error;
use vaultnode_core::HashError;

/// Storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Hash error: {0}")]
    Hash(#[from] HashError),

    #[error("No such container: {0}")]
    NoSuchContainer(String),

    #[error("Container already exists: {0}")]
    ContainerAlreadyExists(String),

    #[error("No such data item: {0}")]
    NoSuchDataItem(String),

    #[error("Data item already exists: {0}")]
    DataItemAlreadyExists(String),

    #[error("Corrupt data item: {0}")]
    CorruptDataItem(String),

    #[error("No such micro-network: {0}")]
    NoSuchMicroNetwork(String),

    #[error("Micro-network already exists: {0}")]
    MicroNetworkAlreadyExists(String),

    #[error("No such node: {0}")]
    NoSuchNode(String),

    #[error("Node already exists: {0}")]
    NodeAlreadyExists(String),

    #[error("Range out of bounds for {id}: offset {offset}, length {length}, size {size}")]
    OutOfRange {
        id: String,
        offset: u64,
        length: u64,
        size: u64,
    },
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Wrapper around sled database with serialization helpers.
#[derive(Clone)]
pub struct Storage {
    db: Db,
}

impl Storage {
    /// Open a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Open an in-memory database (for testing and the `Memory` repository).
    pub fn open_temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    /// Store a serializable value.
    pub fn put<K, V>(&self, key: K, value: &V) -> Result<()>
    where
        K: AsRef<[u8]>,
        V: serde::Serialize,
    {
        let encoded = bincode::serialize(value)?;
        self.db.insert(key, encoded)?;
        Ok(())
    }

    /// Store a value only if the key is vacant.
    ///
    /// Returns `false` without writing when the key is already taken.
    pub fn put_new<K, V>(&self, key: K, value: &V) -> Result<bool>
    where
        K: AsRef<[u8]>,
        V: serde::Serialize,
    {
        let encoded = bincode::serialize(value)?;
        let swapped = self
            .db
            .compare_and_swap(key, None::<&[u8]>, Some(encoded))?;
        Ok(swapped.is_ok())
    }

    /// Retrieve and deserialize a value.
    pub fn get<K, V>(&self, key: K) -> Result<Option<V>>
    where
        K: AsRef<[u8]>,
        V: serde::de::DeserializeOwned,
    {
        match self.db.get(key)? {
            Some(bytes) => {
                let value = bincode::deserialize(&bytes)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Deserialize every value whose key starts with `prefix`, in key order.
    pub fn scan_prefix<P, V>(&self, prefix: P) -> Result<Vec<V>>
    where
        P: AsRef<[u8]>,
        V: serde::de::DeserializeOwned,
    {
        self.db
            .scan_prefix(prefix)
            .values()
            .map(|item| -> Result<V> {
                let bytes = item?;
                Ok(bincode::deserialize(&bytes)?)
            })
            .collect()
    }

    /// Delete a key, returning whether it was present.
    pub fn delete<K: AsRef<[u8]>>(&self, key: K) -> Result<bool> {
        Ok(self.db.remove(key)?.is_some())
    }

    /// Check if a key exists.
    pub fn contains<K: AsRef<[u8]>>(&self, key: K) -> Result<bool> {
        Ok(self.db.contains_key(key)?)
    }

    /// Apply multiple operations atomically.
    ///
    /// Note: Atomicity is provided by sled's `apply_batch`, not by Rust's `FnOnce`.
    /// The batch collects operations in memory, then `apply_batch` writes them
    /// atomically using sled's write-ahead log (WAL).
    pub fn batch(&self, operations: Vec<BatchOp>) -> Result<()> {
        let mut batch = sled::Batch::default();
        for op in operations {
            match op {
                BatchOp::Insert { key, value } => batch.insert(key, value),
                BatchOp::Remove { key } => batch.remove(key),
            }
        }
        self.db.apply_batch(batch)?;
        Ok(())
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    // =========================================================================
    // Key Construction Helpers
    // =========================================================================

    /// Key prefix shared by all container records.
    pub const CONTAINER_PREFIX: &'static str = "container:";
    /// Key prefix shared by all data item records.
    pub const DATA_ITEM_PREFIX: &'static str = "data:";
    /// Key prefix shared by all micro-network records.
    pub const MICRO_NETWORK_PREFIX: &'static str = "micronet:";
    /// Key prefix shared by all node connection records.
    pub const NODE_PREFIX: &'static str = "node:";

    /// Format: "container:{container_id}"
    pub fn container_key(container_id: &str) -> Vec<u8> {
        format!("{}{}", Self::CONTAINER_PREFIX, container_id).into_bytes()
    }

    /// Format: "data:{data_id}"
    pub fn data_item_key(data_id: &str) -> Vec<u8> {
        format!("{}{}", Self::DATA_ITEM_PREFIX, data_id).into_bytes()
    }

    /// Format: "micronet:{id}"
    pub fn micro_network_key(id: &str) -> Vec<u8> {
        format!("{}{}", Self::MICRO_NETWORK_PREFIX, id).into_bytes()
    }

    /// Format: "node:{node_id}"
    pub fn node_key(node_id: &str) -> Vec<u8> {
        format!("{}{}", Self::NODE_PREFIX, node_id).into_bytes()
    }
}

/// Batch operation for atomic updates.
pub enum BatchOp {
    Insert { key: Vec<u8>, value: Vec<u8> },
    Remove { key: Vec<u8> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_temporary() {
        let storage = Storage::open_temporary().unwrap();
        assert!(storage.db.is_empty());
    }

    #[test]
    fn test_put_get() {
        let storage = Storage::open_temporary().unwrap();

        storage.put("key1", &42u64).unwrap();

        let value: Option<u64> = storage.get("key1").unwrap();
        assert_eq!(value, Some(42));

        let missing: Option<u64> = storage.get("missing").unwrap();
        assert_eq!(missing, None);
    }

    #[test]
    fn test_put_new_refuses_existing_key() {
        let storage = Storage::open_temporary().unwrap();

        assert!(storage.put_new("key", &1u64).unwrap());
        assert!(!storage.put_new("key", &2u64).unwrap());

        let value: Option<u64> = storage.get("key").unwrap();
        assert_eq!(value, Some(1));
    }

    #[test]
    fn test_delete() {
        let storage = Storage::open_temporary().unwrap();

        storage.put("key", &"value").unwrap();
        assert!(storage.contains("key").unwrap());

        assert!(storage.delete("key").unwrap());
        assert!(!storage.contains("key").unwrap());
        assert!(!storage.delete("key").unwrap());
    }

    #[test]
    fn test_scan_prefix() {
        let storage = Storage::open_temporary().unwrap();

        storage.put("a:1", &1u64).unwrap();
        storage.put("a:2", &2u64).unwrap();
        storage.put("b:1", &3u64).unwrap();

        let values: Vec<u64> = storage.scan_prefix("a:").unwrap();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn test_batch_operations() {
        let storage = Storage::open_temporary().unwrap();

        let ops = vec![
            BatchOp::Insert {
                key: b"a".to_vec(),
                value: bincode::serialize(&1u64).unwrap(),
            },
            BatchOp::Insert {
                key: b"b".to_vec(),
                value: bincode::serialize(&2u64).unwrap(),
            },
        ];
        storage.batch(ops).unwrap();

        let a: u64 = storage.get("a").unwrap().unwrap();
        let b: u64 = storage.get("b").unwrap().unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, 2);

        storage
            .batch(vec![BatchOp::Remove { key: b"a".to_vec() }])
            .unwrap();
        assert!(!storage.contains("a").unwrap());
    }

    #[test]
    fn test_key_construction() {
        assert_eq!(Storage::container_key("c1"), b"container:c1");
        assert_eq!(Storage::data_item_key("42"), b"data:42");
        assert_eq!(Storage::micro_network_key("c1"), b"micronet:c1");
        assert_eq!(Storage::node_key("n1"), b"node:n1");
    }
}
