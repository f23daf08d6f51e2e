use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ContentHash;

/// Immutable record sealing one full batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rollup {
    pub batch_index: u64,
    pub rollup_id: ContentHash,
    pub count: usize,
    pub sealed_at: DateTime<Utc>, // informational only
    pub member_hashes: Vec<ContentHash>,
}

/// The small record handed to archival collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupSummary {
    pub batch_index: u64,
    pub rollup_id: ContentHash,
}

impl Rollup {
    pub fn compute_id(members: &[ContentHash]) -> ContentHash {
        ContentHash::chain(members)
    }

    pub fn seal(batch_index: u64, members: &[ContentHash], sealed_at: DateTime<Utc>) -> Self {
        Self {
            batch_index,
            rollup_id: Self::compute_id(members),
            count: members.len(),
            sealed_at,
            member_hashes: members.to_vec(),
        }
    }

    /// Recompute the id from the member list and check the count.
    pub fn verify(&self) -> bool {
        self.count == self.member_hashes.len()
            && self.rollup_id == Self::compute_id(&self.member_hashes)
    }

    pub fn summary(&self) -> RollupSummary {
        RollupSummary {
            batch_index: self.batch_index,
            rollup_id: self.rollup_id.clone(),
        }
    }
}
