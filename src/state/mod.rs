pub mod replay;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ledger::BatchWindow;
pub use replay::{rebuild, ReplayReport};

/// The durable cursor.
///
/// A cache over the persisted records, never the source of truth: it can
/// always be rebuilt with [`rebuild`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProcessState {
    pub next_index: u64,
    #[serde(flatten)]
    pub window: BatchWindow,
    #[serde(default, with = "sorted_set")]
    pub processed_set: HashSet<String>,
}

impl ProcessState {
    pub fn batch_index(&self) -> u64 {
        self.window.batch_index
    }

    pub fn pending_hashes(&self) -> &[crate::types::ContentHash] {
        &self.window.pending_hashes
    }

    pub fn is_processed(&self, source_id: &str) -> bool {
        self.processed_set.contains(source_id)
    }
}

/// Serialize a `HashSet` in sorted order so the cursor file is
/// byte-stable across runs.
mod sorted_set {
    use std::collections::{BTreeSet, HashSet};

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(set: &HashSet<String>, serializer: S) -> Result<S::Ok, S::Error> {
        let sorted: BTreeSet<&String> = set.iter().collect();
        sorted.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<HashSet<String>, D::Error> {
        Vec::<String>::deserialize(deserializer).map(|v| v.into_iter().collect())
    }
}
