use std::collections::HashSet;

use tracing::{info, warn};

use super::ProcessState;
use crate::error::LedgerError;
use crate::ledger::BatchWindow;
use crate::store::LedgerStore;
use crate::types::ContentHash;

/// What a replay found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub items: usize,
    pub rollups: usize,
    pub journal_entries: usize,
    /// Journal entries past the first sequence gap; not replayed.
    pub orphaned_entries: usize,
}

/// Rebuild the cursor from persisted Items, Rollups and the append journal.
///
/// - `batch_index`/`sealed_count` come from the contiguous run of rollups
///   starting at batch 1; each rollup is re-verified against its members.
/// - `pending_hashes` are the journal entries after the last sealed hash,
///   up to the first sequence gap. Entries for sealed positions may have
///   been pruned; those still present are checked against the rollups.
/// - `next_index` is one past the highest ordinal among appended Items.
/// - `processed_set` is the source identifier of every appended Item.
///
/// An Item is appended when its id is sealed or pending. Items persisted
/// by an append that never committed are ignored, matching the live
/// cursor, which did not advance for them.
///
/// Read-only and idempotent.
pub fn rebuild<S: LedgerStore>(store: &S) -> Result<(ProcessState, ReplayReport), LedgerError> {
    let mut report = ReplayReport::default();
    let mut window = BatchWindow::default();
    let mut sealed_hashes = Vec::new();

    for rollup in store.list_rollups()? {
        if rollup.batch_index != window.next_batch_index() {
            warn!(
                expected = window.next_batch_index(),
                found = rollup.batch_index,
                "gap in rollup sequence; later batches ignored"
            );
            break;
        }
        if !rollup.verify() {
            return Err(LedgerError::CorruptState(format!(
                "rollup {} does not hash to its recorded id {}",
                rollup.batch_index, rollup.rollup_id
            )));
        }
        window.batch_index = rollup.batch_index;
        window.sealed_count += rollup.count as u64;
        sealed_hashes.extend(rollup.member_hashes);
        report.rollups += 1;
    }

    let journal = store.list_journal()?;
    report.journal_entries = journal.len();
    for entry in journal {
        if entry.seq < window.sealed_count {
            // A sealed position the journal still remembers must agree with
            // the rollup that sealed it.
            if sealed_hashes.get(entry.seq as usize) != Some(&entry.hash) {
                return Err(LedgerError::CorruptState(format!(
                    "journal entry {} ({}) disagrees with sealed batches",
                    entry.seq, entry.hash
                )));
            }
            continue;
        }
        if entry.seq != window.next_seq() {
            report.orphaned_entries += 1;
            continue;
        }
        window.pending_hashes.push(entry.hash);
    }
    if report.orphaned_entries > 0 {
        warn!(orphaned = report.orphaned_entries, "journal has a sequence gap");
    }

    let items = store.list_items()?;
    report.items = items.len();
    let appended: HashSet<&ContentHash> = sealed_hashes
        .iter()
        .chain(window.pending_hashes.iter())
        .collect();
    let appended_items: Vec<_> = items.iter().filter(|i| appended.contains(&i.id)).collect();
    if appended_items.len() < items.len() {
        warn!(
            orphaned = items.len() - appended_items.len(),
            "items never appended; excluded from cursor"
        );
    }
    let next_index = appended_items
        .iter()
        .map(|i| i.ordinal + 1)
        .max()
        .unwrap_or(0);
    let processed_set: HashSet<String> = appended_items
        .iter()
        .filter_map(|i| i.origin.source_id().map(str::to_string))
        .collect();

    info!(
        items = report.items,
        rollups = report.rollups,
        pending = window.len(),
        "rebuilt ledger state from records"
    );

    Ok((
        ProcessState {
            next_index,
            window,
            processed_set,
        },
        report,
    ))
}
