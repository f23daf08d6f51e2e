use serde::{Deserialize, Serialize};

use crate::types::ContentHash;

/// The in-flight, not-yet-sealed hashes.
///
/// FIFO: sealing always consumes the oldest `threshold` entries and keeps
/// the rest for the next batch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchWindow {
    /// Number of batches sealed so far.
    pub batch_index: u64,
    /// Number of hashes sealed so far; sequence number of the first
    /// pending hash.
    #[serde(default)]
    pub sealed_count: u64,
    pub pending_hashes: Vec<ContentHash>,
}

impl BatchWindow {
    pub fn len(&self) -> usize {
        self.pending_hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending_hashes.is_empty()
    }

    /// Sequence number the next appended hash will receive.
    pub fn next_seq(&self) -> u64 {
        self.sealed_count + self.pending_hashes.len() as u64
    }

    pub fn next_batch_index(&self) -> u64 {
        self.batch_index + 1
    }

    pub fn push_all(&mut self, hashes: &[ContentHash]) {
        self.pending_hashes.extend_from_slice(hashes);
    }

    /// The oldest `threshold` hashes, if a full batch is waiting.
    pub fn sealable(&self, threshold: usize) -> Option<&[ContentHash]> {
        if threshold == 0 || self.pending_hashes.len() < threshold {
            return None;
        }
        Some(&self.pending_hashes[..threshold])
    }

    /// Drop the sealed prefix and count the batch. Call only after the
    /// rollup for that prefix is durable.
    pub fn advance(&mut self, threshold: usize) {
        let n = threshold.min(self.pending_hashes.len());
        self.pending_hashes.drain(..n);
        self.batch_index += 1;
        self.sealed_count += n as u64;
    }
}
