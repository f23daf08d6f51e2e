use std::fs;
use std::path::Path;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::aggregate::{Aggregator, Composite};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, ValidationError};
use crate::item::{Item, ItemBuilder, Origin};
use crate::ledger::{BatchLedger, JournalEntry, Rollup};
use crate::scoring::{ContentScorer, Scorer};
use crate::state::{self, ProcessState, ReplayReport};
use crate::store::{LedgerStore, StorageError};
use crate::types::{CompositeId, ContentHash, ItemId};

/// A newly created Item and any batches its append sealed.
#[derive(Debug, Clone)]
pub struct ItemCreated {
    pub item: Item,
    pub sealed: Vec<Rollup>,
}

/// Outcome of scanning a source directory.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub created: Vec<ItemId>,
    pub skipped_processed: usize,
    pub skipped_empty: usize,
    pub sealed: Vec<Rollup>,
}

/// Single-writer owner of the batch window and its durable cursor.
///
/// Every mutation takes `&mut self`; append-and-seal is one critical
/// section. Share across threads behind a `Mutex`.
///
/// Commit order for an append: journal entries, then any rollups, then
/// the cursor. In-memory state changes only after all three are durable;
/// on error it is left as it was and the call may be retried. Once the
/// cursor covers a seal, the journal entries for the sealed positions are
/// pruned, so the journal holds roughly one window of hashes.
///
/// A rollup that reached disk commits the hashes it seals even if the
/// cursor save after it failed: a later append that would seal the same
/// batch differently is refused with `CorruptState` before anything is
/// written, and [`rebuild_state`](Self::rebuild_state) (or reopening)
/// adopts the sealed batch.
pub struct Ledger<S, C = ContentScorer> {
    store: S,
    config: LedgerConfig,
    builder: ItemBuilder<C>,
    batches: BatchLedger,
    aggregator: Aggregator,
    state: ProcessState,
}

impl<S: LedgerStore> Ledger<S, ContentScorer> {
    /// Open with the scorer built from `config.keywords`.
    pub fn open(store: S, config: LedgerConfig) -> Result<Self, LedgerError> {
        let scorer = ContentScorer::new(&config.keywords)?;
        Self::with_scorer(store, config, scorer)
    }
}

impl<S: LedgerStore, C: Scorer> Ledger<S, C> {
    /// Open with a caller-supplied scorer.
    ///
    /// Loads the cursor, falling back to a replay when it is missing,
    /// unreadable or disagrees with the sealed batches on record. Journal
    /// entries past the cursor belong to appends that never committed and
    /// are dropped. An interrupted seal is then finished.
    pub fn with_scorer(mut store: S, config: LedgerConfig, scorer: C) -> Result<Self, LedgerError> {
        config.validate()?;
        let batches = BatchLedger::new(config.threshold)?;

        let state = match store.load_state() {
            Ok(Some(state)) if Self::is_consistent(&store, &state, batches.threshold())? => {
                debug!(
                    batch_index = state.window.batch_index,
                    pending = state.window.len(),
                    "loaded ledger state"
                );
                state
            }
            Ok(Some(_)) => {
                warn!("ledger state disagrees with sealed batches; rebuilding");
                Self::replay_and_save(&mut store)?
            }
            Ok(None) => Self::replay_and_save(&mut store)?,
            Err(StorageError::Corrupt { location, reason }) => {
                warn!(%location, %reason, "ledger state unreadable; rebuilding");
                Self::replay_and_save(&mut store)?
            }
            Err(err) => return Err(err.into()),
        };

        let dropped = store.truncate_journal(state.window.next_seq())?;
        if dropped > 0 {
            warn!(dropped, "discarded uncommitted journal entries");
        }
        prune_sealed_journal(&mut store, &state);

        let mut ledger = Self {
            store,
            aggregator: Aggregator::new(config.missing_members),
            config,
            builder: ItemBuilder::new(scorer),
            batches,
            state,
        };
        ledger.resume_sealing()?;

        info!(
            batch_index = ledger.state.window.batch_index,
            pending = ledger.state.window.len(),
            next_index = ledger.state.next_index,
            "ledger open"
        );
        Ok(ledger)
    }

    /// A loaded cursor is trusted only if the rollup it claims last is on
    /// record and the next one is not yet sealed (or the window still
    /// holds the hashes for it, from an interrupted seal).
    fn is_consistent(store: &S, state: &ProcessState, threshold: usize) -> Result<bool, LedgerError> {
        let window = &state.window;
        if window.batch_index > 0 && store.get_rollup(window.batch_index)?.is_none() {
            return Ok(false);
        }
        let next_sealed = store.get_rollup(window.next_batch_index())?.is_some();
        Ok(!next_sealed || window.len() >= threshold)
    }

    fn replay_and_save(store: &mut S) -> Result<ProcessState, LedgerError> {
        let (state, _) = state::rebuild(&*store)?;
        store.save_state(&state)?;
        Ok(state)
    }

    /// Finish any seal a crash interrupted.
    fn resume_sealing(&mut self) -> Result<Vec<Rollup>, LedgerError> {
        if self.state.window.len() < self.batches.threshold() {
            return Ok(Vec::new());
        }
        info!(pending = self.state.window.len(), "resuming interrupted seal");
        self.commit(&[], 0, None)
    }

    fn commit(
        &mut self,
        hashes: &[ContentHash],
        consumed_indices: u64,
        processed: Option<String>,
    ) -> Result<Vec<Rollup>, LedgerError> {
        let mut next = ProcessState {
            next_index: self.state.next_index + consumed_indices,
            window: self.state.window.clone(),
            processed_set: Default::default(),
        };

        let base_seq = next.window.next_seq();
        next.window.push_all(hashes);
        let plan = self.batches.plan(&self.store, &next.window)?;

        for (offset, hash) in hashes.iter().enumerate() {
            self.store.put_journal_entry(&JournalEntry {
                seq: base_seq + offset as u64,
                hash: hash.clone(),
            })?;
        }
        let sealed = self.batches.apply(&mut self.store, plan, &mut next.window)?;

        // The processed set can be large; borrow it in place rather than
        // cloning it into the candidate.
        std::mem::swap(&mut next.processed_set, &mut self.state.processed_set);
        let inserted = match &processed {
            Some(id) => next.processed_set.insert(id.clone()),
            None => false,
        };
        let saved = self.store.save_state(&next);
        if let Err(err) = saved {
            if inserted {
                if let Some(id) = &processed {
                    next.processed_set.remove(id);
                }
            }
            std::mem::swap(&mut next.processed_set, &mut self.state.processed_set);
            return Err(err.into());
        }

        debug!(
            appended = hashes.len(),
            sealed = sealed.len(),
            pending = next.window.len(),
            "append committed"
        );
        self.state = next;
        if !sealed.is_empty() {
            prune_sealed_journal(&mut self.store, &self.state);
        }
        Ok(sealed)
    }

    /// Append hashes in arrival order, sealing every batch that fills.
    pub fn append(&mut self, hashes: &[ContentHash]) -> Result<Vec<Rollup>, LedgerError> {
        self.commit(hashes, 0, None)
    }

    /// Parse and append hex digests supplied by an external collaborator.
    pub fn append_hex(&mut self, hashes: &[&str]) -> Result<Vec<Rollup>, LedgerError> {
        let parsed = hashes
            .iter()
            .map(|h| ContentHash::parse(h).map_err(ValidationError::from))
            .collect::<Result<Vec<_>, _>>()?;
        self.append(&parsed)
    }

    /// Score, hash and persist a new Item, then append its id.
    ///
    /// The Item record is written before the append. If the append then
    /// fails, the record stays in the store (visible to [`item`](Self::item)
    /// and [`revalue_all`](Self::revalue_all)) but the cursor does not
    /// advance, and a replay ignores it.
    pub fn create_item(
        &mut self,
        raw_content: impl Into<String>,
        origin: Origin,
    ) -> Result<ItemCreated, LedgerError> {
        let item = self
            .builder
            .prepare(raw_content, origin, self.state.next_index, Utc::now());
        self.store.put_item(&item)?;

        let processed = item.origin.source_id().map(str::to_string);
        let sealed = self.commit(std::slice::from_ref(&item.id), 1, processed)?;

        debug!(item_id = %item.id, score = item.score, value = item.value, "item created");
        Ok(ItemCreated { item, sealed })
    }

    /// Aggregate stored Items into a persisted Composite.
    ///
    /// Composites are not appended to the window; pass the id to
    /// [`append`](Self::append) to batch it.
    pub fn combine(
        &mut self,
        item_ids: &[ItemId],
        description: impl Into<String>,
    ) -> Result<Composite, LedgerError> {
        let composite = self
            .aggregator
            .combine(&self.store, item_ids, description, Utc::now())?;
        self.store.put_composite(&composite)?;
        info!(
            composite_id = %composite.id,
            members = composite.member_ids.len(),
            missing = composite.missing_ids.len(),
            "composite created"
        );
        Ok(composite)
    }

    /// Recompute one Item's score and value and persist the result.
    pub fn revalue_item(&mut self, id: &ItemId) -> Result<Item, LedgerError> {
        let mut item = self
            .store
            .get_item(id)?
            .ok_or_else(|| ValidationError::UnknownItem(id.clone()))?;
        if self.builder.revalue(&mut item) {
            self.store.put_item(&item)?;
            debug!(item_id = %item.id, score = item.score, "item revalued");
        }
        Ok(item)
    }

    /// Revalue every stored Item. Returns how many changed.
    pub fn revalue_all(&mut self) -> Result<usize, LedgerError> {
        let mut changed = 0;
        for mut item in self.store.list_items()? {
            if self.builder.revalue(&mut item) {
                self.store.put_item(&item)?;
                changed += 1;
            }
        }
        info!(changed, "revaluation pass complete");
        Ok(changed)
    }

    /// Create a `file` Item for every new file directly under `dir`.
    ///
    /// Files are visited in name order. Names already in the processed
    /// set are skipped, as are files with only whitespace. Re-running on
    /// the same directory creates nothing new.
    pub fn ingest_dir(&mut self, dir: &Path) -> Result<IngestReport, LedgerError> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry);
            }
        }
        files.sort_by_key(|entry| entry.file_name());

        let mut report = IngestReport::default();
        for entry in files {
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.state.is_processed(&name) {
                report.skipped_processed += 1;
                continue;
            }

            let bytes = fs::read(entry.path())?;
            let text = String::from_utf8_lossy(&bytes).into_owned();
            if text.trim().is_empty() {
                warn!(file = %name, "empty source file; skipping");
                report.skipped_empty += 1;
                continue;
            }

            let created = self.create_item(text, Origin::file(name))?;
            report.created.push(created.item.id);
            report.sealed.extend(created.sealed);
        }

        info!(
            created = report.created.len(),
            skipped = report.skipped_processed,
            sealed = report.sealed.len(),
            "ingested source directory"
        );
        Ok(report)
    }

    /// Discard the cursor and rebuild it from the persisted records.
    pub fn rebuild_state(&mut self) -> Result<ReplayReport, LedgerError> {
        let (state, report) = state::rebuild(&self.store)?;
        self.store.truncate_journal(state.window.next_seq())?;
        self.store.save_state(&state)?;
        prune_sealed_journal(&mut self.store, &state);
        self.state = state;
        self.resume_sealing()?;
        Ok(report)
    }

    pub fn state(&self) -> &ProcessState {
        &self.state
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn threshold(&self) -> usize {
        self.batches.threshold()
    }

    pub fn scorer(&self) -> &C {
        self.builder.scorer()
    }

    pub fn item(&self, id: &ItemId) -> Result<Option<Item>, LedgerError> {
        Ok(self.store.get_item(id)?)
    }

    pub fn composite(&self, id: &CompositeId) -> Result<Option<Composite>, LedgerError> {
        Ok(self.store.get_composite(id)?)
    }

    pub fn rollup(&self, batch_index: u64) -> Result<Option<Rollup>, LedgerError> {
        Ok(self.store.get_rollup(batch_index)?)
    }

    pub fn rollups(&self) -> Result<Vec<Rollup>, LedgerError> {
        Ok(self.store.list_rollups()?)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

/// Drop journal entries the saved cursor has sealed. The cursor is already
/// durable, so a failure here only leaves redundant entries behind; replay
/// cross-checks any that remain.
fn prune_sealed_journal<S: LedgerStore>(store: &mut S, state: &ProcessState) {
    match store.prune_journal(state.window.sealed_count) {
        Ok(0) => {}
        Ok(pruned) => debug!(pruned, "pruned sealed journal entries"),
        Err(err) => warn!(error = %err, "failed to prune sealed journal entries"),
    }
}
