use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{LedgerStore, StorageError};
use crate::aggregate::Composite;
use crate::item::Item;
use crate::ledger::{JournalEntry, Rollup, RollupSummary};
use crate::state::ProcessState;
use crate::types::{CompositeId, ItemId};

const ITEMS_DIR: &str = "items";
const COMPOSITES_DIR: &str = "composites";
const ROLLUPS_DIR: &str = "rollups";
const JOURNAL_DIR: &str = "journal";
const STATE_FILE: &str = "state.json";
const LEDGER_FILE: &str = "batch_ledger.json";
const SUMMARY_FILE: &str = "summary.json";

/// Filesystem-backed store.
///
/// Layout under `root`:
/// - `items/<id>.json`
/// - `composites/<id>.json`
/// - `rollups/batch_<NNNN>/{batch_ledger.json,summary.json}`
/// - `journal/<seq>.json`
/// - `state.json`
///
/// Single files are written to a `.tmp` sibling, synced, then renamed.
/// Rollup directories are assembled under a temp name and renamed as a
/// whole, so a reader never sees half a batch.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        for dir in [ITEMS_DIR, COMPOSITES_DIR, ROLLUPS_DIR, JOURNAL_DIR] {
            fs::create_dir_all(root.join(dir))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn item_path(&self, id: &ItemId) -> PathBuf {
        self.root.join(ITEMS_DIR).join(format!("{}.json", id.as_str()))
    }

    pub fn composite_path(&self, id: &CompositeId) -> PathBuf {
        self.root
            .join(COMPOSITES_DIR)
            .join(format!("{}.json", id.as_str()))
    }

    pub fn rollup_dir(&self, batch_index: u64) -> PathBuf {
        self.root
            .join(ROLLUPS_DIR)
            .join(format!("batch_{batch_index:04}"))
    }

    pub fn journal_path(&self, seq: u64) -> PathBuf {
        self.root.join(JOURNAL_DIR).join(format!("{seq:012}.json"))
    }

    pub fn state_path(&self) -> PathBuf {
        self.root.join(STATE_FILE)
    }

    fn list_json<T: DeserializeOwned>(&self, dir: &str) -> Result<Vec<T>, StorageError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(self.root.join(dir))? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some(record) = read_json(&path)? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(StorageError::Io(err)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| StorageError::corrupt(path.display().to_string(), e))
}

fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let f = fs::File::create(path)?;
    serde_json::to_writer_pretty(&f, value)?;
    f.sync_all()?;
    Ok(())
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let tmp = path.with_extension("json.tmp");
    if let Err(err) = write_json_file(&tmp, value) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

impl LedgerStore for FsStore {
    fn put_item(&mut self, item: &Item) -> Result<(), StorageError> {
        write_json_atomic(&self.item_path(&item.id), item)
    }

    fn get_item(&self, id: &ItemId) -> Result<Option<Item>, StorageError> {
        read_json(&self.item_path(id))
    }

    fn list_items(&self) -> Result<Vec<Item>, StorageError> {
        self.list_json(ITEMS_DIR)
    }

    fn put_composite(&mut self, composite: &Composite) -> Result<(), StorageError> {
        write_json_atomic(&self.composite_path(&composite.id), composite)
    }

    fn get_composite(&self, id: &CompositeId) -> Result<Option<Composite>, StorageError> {
        read_json(&self.composite_path(id))
    }

    fn put_rollup(&mut self, rollup: &Rollup) -> Result<(), StorageError> {
        let output_dir = self.rollup_dir(rollup.batch_index);

        if output_dir.exists() {
            return match self.get_rollup(rollup.batch_index)? {
                Some(existing) if existing.rollup_id == rollup.rollup_id => Ok(()),
                Some(existing) => Err(StorageError::corrupt(
                    output_dir.display().to_string(),
                    format!(
                        "batch {} already sealed as {}, refusing {}",
                        rollup.batch_index, existing.rollup_id, rollup.rollup_id
                    ),
                )),
                None => Err(StorageError::corrupt(
                    output_dir.display().to_string(),
                    "rollup directory exists without a ledger record",
                )),
            };
        }

        // Temp name is unique per rollup id, so a crashed attempt at the same
        // batch is simply replaced.
        let temp_suffix = format!("tmp.{}", &rollup.rollup_id.as_str()[..12]);
        let temp_dir = output_dir.with_extension(temp_suffix);
        if temp_dir.exists() {
            fs::remove_dir_all(&temp_dir)?;
        }
        fs::create_dir_all(&temp_dir)?;

        let written = write_json_file(&temp_dir.join(LEDGER_FILE), rollup)
            .and_then(|()| write_json_file(&temp_dir.join(SUMMARY_FILE), &rollup.summary()));
        if let Err(err) = written {
            let _ = fs::remove_dir_all(&temp_dir);
            return Err(err);
        }

        fs::rename(&temp_dir, &output_dir)?;
        Ok(())
    }

    fn get_rollup(&self, batch_index: u64) -> Result<Option<Rollup>, StorageError> {
        let dir = self.rollup_dir(batch_index);
        let rollup: Option<Rollup> = read_json(&dir.join(LEDGER_FILE))?;
        if let Some(rollup) = &rollup {
            if rollup.batch_index != batch_index {
                return Err(StorageError::corrupt(
                    dir.display().to_string(),
                    format!("ledger record claims batch {}", rollup.batch_index),
                ));
            }
        }
        Ok(rollup)
    }

    fn list_rollups(&self) -> Result<Vec<Rollup>, StorageError> {
        let mut indices = Vec::new();
        for entry in fs::read_dir(self.root.join(ROLLUPS_DIR))? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            // Temp directories (`batch_NNNN.tmp.*`) fail to parse and are skipped.
            let index = entry
                .file_name()
                .to_str()
                .and_then(|name| name.strip_prefix("batch_"))
                .and_then(|n| n.parse::<u64>().ok());
            if let Some(index) = index {
                indices.push(index);
            }
        }
        indices.sort_unstable();

        let mut rollups = Vec::with_capacity(indices.len());
        for idx in indices {
            if let Some(rollup) = self.get_rollup(idx)? {
                rollups.push(rollup);
            }
        }
        Ok(rollups)
    }

    fn put_journal_entry(&mut self, entry: &JournalEntry) -> Result<(), StorageError> {
        write_json_atomic(&self.journal_path(entry.seq), entry)
    }

    fn list_journal(&self) -> Result<Vec<JournalEntry>, StorageError> {
        // Zero-padded names sort numerically.
        self.list_json(JOURNAL_DIR)
    }

    fn truncate_journal(&mut self, from_seq: u64) -> Result<usize, StorageError> {
        let mut removed = 0;
        for entry in fs::read_dir(self.root.join(JOURNAL_DIR))? {
            let path = entry?.path();
            let seq = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok());
            let is_tmp = path.extension().is_some_and(|ext| ext == "tmp");
            if is_tmp || seq.is_some_and(|seq| seq >= from_seq) {
                fs::remove_file(&path)?;
                if !is_tmp {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    fn prune_journal(&mut self, below_seq: u64) -> Result<usize, StorageError> {
        let mut removed = 0;
        for entry in fs::read_dir(self.root.join(JOURNAL_DIR))? {
            let path = entry?.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            let seq = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok());
            if seq.is_some_and(|seq| seq < below_seq) {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn load_state(&self) -> Result<Option<ProcessState>, StorageError> {
        read_json(&self.state_path())
    }

    fn save_state(&mut self, state: &ProcessState) -> Result<(), StorageError> {
        write_json_atomic(&self.state_path(), state)
    }
}

/// Read only the summary of a sealed batch.
pub fn read_summary(store: &FsStore, batch_index: u64) -> Result<Option<RollupSummary>, StorageError> {
    read_json(&store.rollup_dir(batch_index).join(SUMMARY_FILE))
}
