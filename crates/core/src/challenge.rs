//! Proof-of-storage challenges and their solutions.

use serde::{Deserialize, Serialize};

/// One challenged byte range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeChunkInfo {
    pub chunk_id: String,
    pub offset: u64,
    pub length: u64,
}

impl ChallengeChunkInfo {
    pub fn new(chunk_id: impl Into<String>, offset: u64, length: u64) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            offset,
            length,
        }
    }
}

/// A request to prove possession of byte ranges within a container.
///
/// The order of `chunks` fixes the merkle leaf order, so the same ranges in a
/// different order form a different challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub container_id: String,
    pub chunks: Vec<ChallengeChunkInfo>,
}

impl Challenge {
    pub fn new(container_id: impl Into<String>, chunks: Vec<ChallengeChunkInfo>) -> Self {
        Self {
            container_id: container_id.into(),
            chunks,
        }
    }
}

/// Answer to a [`Challenge`].
///
/// `chunk_hash` is computed locally; the remaining fields are filled in by the
/// chain once the solution has been anchored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeSolution {
    /// Hex-encoded merkle root over the challenged ranges.
    pub chunk_hash: String,
    pub verification_value: Option<String>,
    pub transaction_id: Option<String>,
    pub block_number: Option<u64>,
}

impl ChallengeSolution {
    pub fn new(chunk_hash: impl Into<String>) -> Self {
        Self {
            chunk_hash: chunk_hash.into(),
            verification_value: None,
            transaction_id: None,
            block_number: None,
        }
    }

    /// Attach the anchoring data reported by the chain.
    pub fn anchored(
        mut self,
        verification_value: impl Into<String>,
        transaction_id: impl Into<String>,
        block_number: u64,
    ) -> Self {
        self.verification_value = Some(verification_value.into());
        self.transaction_id = Some(transaction_id.into());
        self.block_number = Some(block_number);
        self
    }

    pub fn is_anchored(&self) -> bool {
        self.transaction_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_distinguishes_challenges() {
        let a = ChallengeChunkInfo::new("a", 0, 10);
        let b = ChallengeChunkInfo::new("b", 0, 10);
        let forward = Challenge::new("c1", vec![a.clone(), b.clone()]);
        let backward = Challenge::new("c1", vec![b, a]);
        assert_ne!(forward, backward);
    }

    #[test]
    fn test_anchored_solution() {
        let solution = ChallengeSolution::new("abcd");
        assert!(!solution.is_anchored());

        let solution = solution.anchored("vv", "0xtx", 42);
        assert!(solution.is_anchored());
        assert_eq!(solution.block_number, Some(42));
        assert_eq!(solution.chunk_hash, "abcd");
    }

    #[test]
    fn test_challenge_json_shape() {
        let challenge = Challenge::new("c1", vec![ChallengeChunkInfo::new("0", 4, 16)]);
        let json = serde_json::to_value(&challenge).unwrap();
        assert_eq!(json["container_id"], "c1");
        assert_eq!(json["chunks"][0]["offset"], 4);
    }
}
