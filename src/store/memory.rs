use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::io;

use super::{LedgerStore, StorageError};
use crate::aggregate::Composite;
use crate::item::Item;
use crate::ledger::{JournalEntry, Rollup};
use crate::state::ProcessState;
use crate::types::{CompositeId, ItemId};

/// Operations that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    PutItem,
    PutComposite,
    PutRollup,
    PutJournal,
    SaveState,
}

/// In-memory store.
///
/// State is kept serialized, the same way the filesystem store keeps
/// it, so a corrupted cursor can be simulated with
/// [`corrupt_state`](MemoryStore::corrupt_state). Armed fail points fire
/// once and then disarm.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: HashMap<ItemId, Item>,
    composites: HashMap<CompositeId, Composite>,
    rollups: BTreeMap<u64, Rollup>,
    journal: BTreeMap<u64, JournalEntry>,
    state: Option<String>,
    fail_at: Cell<Option<(FailPoint, usize)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next call to `point`.
    pub fn fail_next(&self, point: FailPoint) {
        self.fail_at.set(Some((point, 0)));
    }

    /// Let `skip` calls to `point` succeed, then fail the one after.
    pub fn fail_after(&self, point: FailPoint, skip: usize) {
        self.fail_at.set(Some((point, skip)));
    }

    pub fn corrupt_state(&mut self) {
        self.state = Some("{ not json".to_string());
    }

    pub fn clear_state(&mut self) {
        self.state = None;
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn composite_count(&self) -> usize {
        self.composites.len()
    }

    pub fn rollup_count(&self) -> usize {
        self.rollups.len()
    }

    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    fn check(&self, point: FailPoint) -> Result<(), StorageError> {
        match self.fail_at.get() {
            Some((armed, 0)) if armed == point => {
                self.fail_at.set(None);
                Err(StorageError::Io(io::Error::new(
                    io::ErrorKind::Other,
                    format!("injected failure at {point:?}"),
                )))
            }
            Some((armed, n)) if armed == point => {
                self.fail_at.set(Some((armed, n - 1)));
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl LedgerStore for MemoryStore {
    fn put_item(&mut self, item: &Item) -> Result<(), StorageError> {
        self.check(FailPoint::PutItem)?;
        self.items.insert(item.id.clone(), item.clone());
        Ok(())
    }

    fn get_item(&self, id: &ItemId) -> Result<Option<Item>, StorageError> {
        Ok(self.items.get(id).cloned())
    }

    fn list_items(&self) -> Result<Vec<Item>, StorageError> {
        let mut items: Vec<Item> = self.items.values().cloned().collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    fn put_composite(&mut self, composite: &Composite) -> Result<(), StorageError> {
        self.check(FailPoint::PutComposite)?;
        self.composites
            .insert(composite.id.clone(), composite.clone());
        Ok(())
    }

    fn get_composite(&self, id: &CompositeId) -> Result<Option<Composite>, StorageError> {
        Ok(self.composites.get(id).cloned())
    }

    fn put_rollup(&mut self, rollup: &Rollup) -> Result<(), StorageError> {
        self.check(FailPoint::PutRollup)?;
        match self.rollups.get(&rollup.batch_index) {
            Some(existing) if existing.rollup_id == rollup.rollup_id => Ok(()),
            Some(existing) => Err(StorageError::corrupt(
                format!("rollup {}", rollup.batch_index),
                format!("already sealed as {}", existing.rollup_id),
            )),
            None => {
                self.rollups.insert(rollup.batch_index, rollup.clone());
                Ok(())
            }
        }
    }

    fn get_rollup(&self, batch_index: u64) -> Result<Option<Rollup>, StorageError> {
        Ok(self.rollups.get(&batch_index).cloned())
    }

    fn list_rollups(&self) -> Result<Vec<Rollup>, StorageError> {
        Ok(self.rollups.values().cloned().collect())
    }

    fn put_journal_entry(&mut self, entry: &JournalEntry) -> Result<(), StorageError> {
        self.check(FailPoint::PutJournal)?;
        self.journal.insert(entry.seq, entry.clone());
        Ok(())
    }

    fn list_journal(&self) -> Result<Vec<JournalEntry>, StorageError> {
        Ok(self.journal.values().cloned().collect())
    }

    fn truncate_journal(&mut self, from_seq: u64) -> Result<usize, StorageError> {
        let removed = self.journal.split_off(&from_seq);
        Ok(removed.len())
    }

    fn prune_journal(&mut self, below_seq: u64) -> Result<usize, StorageError> {
        let kept = self.journal.split_off(&below_seq);
        let removed = std::mem::replace(&mut self.journal, kept);
        Ok(removed.len())
    }

    fn load_state(&self) -> Result<Option<ProcessState>, StorageError> {
        match &self.state {
            None => Ok(None),
            Some(raw) => serde_json::from_str(raw)
                .map(Some)
                .map_err(|e| StorageError::corrupt("state", e)),
        }
    }

    fn save_state(&mut self, state: &ProcessState) -> Result<(), StorageError> {
        self.check(FailPoint::SaveState)?;
        self.state = Some(serde_json::to_string(state)?);
        Ok(())
    }
}
