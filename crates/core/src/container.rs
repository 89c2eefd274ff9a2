//! Container records as assigned to this node by the storage contract.

use crate::challenge::Challenge;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A container this node has been asked to host.
///
/// The record only says the container exists; whether it is live is derived
/// from its micro-network (see [`crate::network::ContainerState`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRecord {
    /// Unique container identifier.
    pub container_id: String,
    /// When the hosting agreement ends.
    pub expiration_date: DateTime<Utc>,
    /// Last challenge issued against this container, kept for audit and resubmission.
    pub pending_challenge: Option<Challenge>,
}

impl ContainerRecord {
    pub fn new(container_id: impl Into<String>, expiration_date: DateTime<Utc>) -> Self {
        Self {
            container_id: container_id.into(),
            expiration_date,
            pending_challenge: None,
        }
    }

    /// Whether the hosting agreement has ended at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_is_expired() {
        let now = Utc::now();
        let live = ContainerRecord::new("c1", now + Duration::days(1));
        let ended = ContainerRecord::new("c2", now - Duration::seconds(1));

        assert!(!live.is_expired(now));
        assert!(ended.is_expired(now));
        assert!(live.pending_challenge.is_none());
    }
}
