//! Data item (chunk) bookkeeping records.

use crate::hash::EncodedHash;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Metadata for one stored chunk.
///
/// Bytes live in the byte storage backend under `data_id`; this record must
/// exist exactly when those bytes do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataItemRecord {
    /// Unique chunk identifier.
    pub data_id: String,
    /// Size in bytes.
    pub size: u64,
    /// Hash of the full content, in `ALGORITHM:base64` form.
    pub content_hash: EncodedHash,
    /// Containers this chunk belongs to.
    pub containers: BTreeSet<String>,
}

impl DataItemRecord {
    pub fn new(data_id: impl Into<String>, size: u64, content_hash: EncodedHash) -> Self {
        Self {
            data_id: data_id.into(),
            size,
            content_hash,
            containers: BTreeSet::new(),
        }
    }

    /// Builder-style helper linking the record to a container.
    pub fn in_container(mut self, container_id: impl Into<String>) -> Self {
        self.containers.insert(container_id.into());
        self
    }

    pub fn belongs_to(&self, container_id: &str) -> bool {
        self.containers.contains(container_id)
    }
}
