//! Content-addressed chunk store.
//!
//! Wraps a [`ByteStorage`] backend with hash verification and keeps the
//! metadata repository in step with it. The repository record and the stored
//! bytes must both exist or both be absent; whenever a read finds them out of
//! step, or finds bytes that no longer match their hash, the item is purged.
//!
//! Operations that write or purge hold a lock on the `data_id` for their whole
//! check-then-write sequence, so concurrent callers sharing a store (or any of
//! its clones) never interleave on the same item.

use crate::backend::ByteStorage;
use crate::db::{Result, StorageError};
use crate::repository::MetadataRepository;
use std::io::{Cursor, Read, Seek};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};
use vaultnode_core::{hash, DataItemRecord, EncodedHash};

/// Number of lock stripes that `data_id`s are spread over.
const LOCK_STRIPES: usize = 64;

/// Hash-verified chunk storage scoped by container.
#[derive(Clone)]
pub struct ChunkStore {
    repository: Arc<dyn MetadataRepository>,
    backend: Arc<dyn ByteStorage>,
    locks: Arc<Vec<Mutex<()>>>,
}

impl ChunkStore {
    pub fn new(repository: Arc<dyn MetadataRepository>, backend: Arc<dyn ByteStorage>) -> Self {
        Self {
            repository,
            backend,
            locks: Arc::new((0..LOCK_STRIPES).map(|_| Mutex::new(())).collect()),
        }
    }

    // The guarded sections leave nothing half-updated in memory, so a
    // poisoned stripe is still usable.
    fn lock(&self, data_id: &str) -> MutexGuard<'_, ()> {
        let stripe = hash(data_id.as_bytes()).as_bytes()[0] as usize % LOCK_STRIPES;
        self.locks[stripe].lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Save an in-memory chunk. See [`ChunkStore::save_from`].
    pub fn save(
        &self,
        data_id: &str,
        container_id: &str,
        encoded_hash: &str,
        data: &[u8],
    ) -> Result<DataItemRecord> {
        self.save_from(data_id, container_id, encoded_hash, &mut Cursor::new(data))
    }

    /// Save a chunk read from a seekable source.
    ///
    /// The source is read twice: once to verify it against `encoded_hash`,
    /// then again from the same position to persist it. Nothing is written
    /// when the hash does not match.
    ///
    /// A `data_id` already stored for another container is linked to
    /// `container_id` as well, provided the content hash is the same.
    pub fn save_from<R: Read + Seek>(
        &self,
        data_id: &str,
        container_id: &str,
        encoded_hash: &str,
        reader: &mut R,
    ) -> Result<DataItemRecord> {
        let expected: EncodedHash = encoded_hash.parse()?;
        let _guard = self.lock(data_id);

        let existing = self.repository.get_data_item(data_id)?;
        if let Some(record) = &existing {
            if record.belongs_to(container_id) || record.content_hash != expected {
                return Err(StorageError::DataItemAlreadyExists(data_id.to_string()));
            }
        }

        if !expected.matches_reader(reader)? {
            warn!(data_id, container_id, "rejecting chunk whose content does not match its hash");
            return Err(StorageError::CorruptDataItem(data_id.to_string()));
        }

        let size = self.backend.save_from(data_id, reader)?;

        let is_new = existing.is_none();
        let result = match existing {
            Some(mut record) => {
                record.containers.insert(container_id.to_string());
                record.size = size;
                self.repository.update_data_item(&record).map(|_| record)
            }
            None => {
                let record =
                    DataItemRecord::new(data_id, size, expected).in_container(container_id);
                self.repository.create_data_item(&record).map(|_| record)
            }
        };

        match result {
            Ok(record) => {
                debug!(data_id, container_id, size, "saved chunk");
                Ok(record)
            }
            Err(e) => {
                if is_new && self.repository.get_data_item(data_id)?.is_none() {
                    self.discard_bytes(data_id);
                }
                Err(e)
            }
        }
    }

    /// Fetch a chunk and verify it.
    ///
    /// The bytes are checked against `encoded_hash` when given, otherwise
    /// against the hash on record. On mismatch the item is purged before
    /// [`StorageError::CorruptDataItem`] is returned.
    pub fn fetch(
        &self,
        data_id: &str,
        container_id: &str,
        encoded_hash: Option<&str>,
    ) -> Result<Vec<u8>> {
        let _guard = self.lock(data_id);
        let record = self
            .record_in(data_id, container_id)?
            .ok_or_else(|| StorageError::NoSuchDataItem(data_id.to_string()))?;

        let expected: EncodedHash = match encoded_hash {
            Some(encoded) => encoded.parse()?,
            None => record.content_hash.clone(),
        };

        let Some(data) = self.backend.fetch(data_id)? else {
            self.purge(data_id, "bytes missing from backend")?;
            return Err(StorageError::CorruptDataItem(data_id.to_string()));
        };

        if !expected.matches(&data) {
            self.purge(data_id, "content hash mismatch")?;
            return Err(StorageError::CorruptDataItem(data_id.to_string()));
        }

        Ok(data)
    }

    /// Read a byte range without verification.
    pub fn fetch_range(&self, data_id: &str, offset: u64, length: u64) -> Result<Vec<u8>> {
        if self.repository.get_data_item(data_id)?.is_none() {
            return Err(StorageError::NoSuchDataItem(data_id.to_string()));
        }
        self.backend
            .fetch_range(data_id, offset, length)?
            .ok_or_else(|| StorageError::NoSuchDataItem(data_id.to_string()))
    }

    /// Read a byte range of a chunk linked to `container_id`, without verification.
    ///
    /// A chunk stored only for other containers is [`StorageError::NoSuchDataItem`].
    pub fn fetch_range_in(
        &self,
        data_id: &str,
        container_id: &str,
        offset: u64,
        length: u64,
    ) -> Result<Vec<u8>> {
        if self.record_in(data_id, container_id)?.is_none() {
            return Err(StorageError::NoSuchDataItem(data_id.to_string()));
        }
        self.backend
            .fetch_range(data_id, offset, length)?
            .ok_or_else(|| StorageError::NoSuchDataItem(data_id.to_string()))
    }

    /// Unlink a chunk from a container; bytes and record go with the last link.
    ///
    /// Returns whether anything was removed.
    pub fn remove(&self, data_id: &str, container_id: &str) -> Result<bool> {
        let _guard = self.lock(data_id);
        let Some(mut record) = self.repository.get_data_item(data_id)? else {
            return Ok(false);
        };
        if !record.containers.remove(container_id) {
            return Ok(false);
        }

        if record.containers.is_empty() {
            self.backend.remove(data_id)?;
            match self.repository.remove_data_item(data_id) {
                Ok(()) | Err(StorageError::NoSuchDataItem(_)) => {}
                Err(e) => return Err(e),
            }
        } else {
            self.repository.update_data_item(&record)?;
        }

        debug!(data_id, container_id, "removed chunk");
        Ok(true)
    }

    /// Whether the chunk is stored for the container and still intact.
    ///
    /// A corrupted item is purged and reported as absent.
    pub fn has(&self, data_id: &str, container_id: &str) -> Result<bool> {
        let _guard = self.lock(data_id);
        let Some(record) = self.record_in(data_id, container_id)? else {
            return Ok(false);
        };

        match self.backend.fetch(data_id)? {
            Some(data) if record.content_hash.matches(&data) => Ok(true),
            Some(_) => {
                self.purge(data_id, "content hash mismatch")?;
                Ok(false)
            }
            None => {
                self.purge(data_id, "bytes missing from backend")?;
                Ok(false)
            }
        }
    }

    /// Records of every chunk linked to the container.
    pub fn list(&self, container_id: &str) -> Result<Vec<DataItemRecord>> {
        self.repository.list_data_items(container_id)
    }

    fn record_in(&self, data_id: &str, container_id: &str) -> Result<Option<DataItemRecord>> {
        Ok(self
            .repository
            .get_data_item(data_id)?
            .filter(|record| record.belongs_to(container_id)))
    }

    fn purge(&self, data_id: &str, reason: &str) -> Result<()> {
        warn!(data_id, reason, "purging corrupt chunk");
        self.backend.remove(data_id)?;
        match self.repository.remove_data_item(data_id) {
            Ok(()) | Err(StorageError::NoSuchDataItem(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn discard_bytes(&self, data_id: &str) {
        if let Err(e) = self.backend.remove(data_id) {
            warn!(data_id, error = %e, "failed to discard orphaned chunk bytes");
        }
    }
}
