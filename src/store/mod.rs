pub mod fs;
pub mod memory;

use thiserror::Error;

use crate::aggregate::Composite;
use crate::item::Item;
use crate::ledger::{JournalEntry, Rollup};
use crate::state::ProcessState;
use crate::types::{CompositeId, ItemId};

pub use fs::{read_summary, FsStore};
pub use memory::{FailPoint, MemoryStore};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Corrupt record {location}: {reason}")]
    Corrupt { location: String, reason: String },
}

impl StorageError {
    pub fn corrupt(location: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        StorageError::Corrupt {
            location: location.into(),
            reason: reason.to_string(),
        }
    }
}

/// Durable record storage for the ledger.
///
/// Every `put_*`/`save_*` must be durable when it returns `Ok`, and must
/// never leave a partially written record behind on `Err`.
///
/// # Absence Semantics
///
/// `get_*` returns `Ok(None)` for missing records. Missing is not an
/// error; unreadable is.
pub trait LedgerStore {
    fn put_item(&mut self, item: &Item) -> Result<(), StorageError>;
    fn get_item(&self, id: &ItemId) -> Result<Option<Item>, StorageError>;
    fn list_items(&self) -> Result<Vec<Item>, StorageError>;

    fn put_composite(&mut self, composite: &Composite) -> Result<(), StorageError>;
    fn get_composite(&self, id: &CompositeId) -> Result<Option<Composite>, StorageError>;

    /// Write a sealed rollup. Writing the same rollup twice is a no-op;
    /// writing a different rollup under an existing `batch_index` is
    /// `Corrupt`.
    fn put_rollup(&mut self, rollup: &Rollup) -> Result<(), StorageError>;
    fn get_rollup(&self, batch_index: u64) -> Result<Option<Rollup>, StorageError>;
    /// All rollups, ascending by `batch_index`.
    fn list_rollups(&self) -> Result<Vec<Rollup>, StorageError>;

    /// Record an appended hash. A later entry with the same `seq`
    /// replaces the earlier one.
    fn put_journal_entry(&mut self, entry: &JournalEntry) -> Result<(), StorageError>;
    /// All journal entries, ascending by `seq`.
    fn list_journal(&self) -> Result<Vec<JournalEntry>, StorageError>;
    /// Drop entries with `seq >= from_seq`. Returns how many were removed.
    fn truncate_journal(&mut self, from_seq: u64) -> Result<usize, StorageError>;
    /// Drop entries with `seq < below_seq`, once a durable cursor covers
    /// them. Returns how many were removed.
    fn prune_journal(&mut self, below_seq: u64) -> Result<usize, StorageError>;

    fn load_state(&self) -> Result<Option<ProcessState>, StorageError>;
    fn save_state(&mut self, state: &ProcessState) -> Result<(), StorageError>;
}
