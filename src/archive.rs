//! Package sealed rollups for export.
//!
//! Each rollup becomes `major_master_<NNNN>.zip` holding
//! `batch_ledger.json` and `summary.json`, plus an optional
//! `major_master_<NNNN>.json` marker (the summary alone) in a separate
//! directory for whatever syncs the exports to a remote.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::ledger::Rollup;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Rollup {0} does not match its recorded id")]
    Unverified(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedRollup {
    pub archive_path: PathBuf,
    pub marker_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RollupArchiver {
    out_dir: PathBuf,
    marker_dir: Option<PathBuf>,
}

impl RollupArchiver {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            marker_dir: None,
        }
    }

    pub fn with_marker_dir(mut self, marker_dir: impl Into<PathBuf>) -> Self {
        self.marker_dir = Some(marker_dir.into());
        self
    }

    pub fn archive_name(batch_index: u64) -> String {
        format!("major_master_{batch_index:04}.zip")
    }

    pub fn marker_name(batch_index: u64) -> String {
        format!("major_master_{batch_index:04}.json")
    }

    /// Write the archive (and marker). Overwrites a previous export of
    /// the same batch.
    pub fn export(&self, rollup: &Rollup) -> Result<ArchivedRollup, ArchiveError> {
        if !rollup.verify() {
            return Err(ArchiveError::Unverified(rollup.batch_index));
        }

        fs::create_dir_all(&self.out_dir)?;
        let archive_path = self.out_dir.join(Self::archive_name(rollup.batch_index));
        write_archive(&archive_path, rollup)?;

        let marker_path = match &self.marker_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                let path = dir.join(Self::marker_name(rollup.batch_index));
                let tmp = path.with_extension("json.tmp");
                let f = fs::File::create(&tmp)?;
                serde_json::to_writer_pretty(&f, &rollup.summary())?;
                f.sync_all()?;
                fs::rename(&tmp, &path)?;
                Some(path)
            }
            None => None,
        };

        info!(
            batch_index = rollup.batch_index,
            archive = %archive_path.display(),
            "rollup archived"
        );
        Ok(ArchivedRollup {
            archive_path,
            marker_path,
        })
    }

    pub fn export_all<'a, I>(&self, rollups: I) -> Result<Vec<ArchivedRollup>, ArchiveError>
    where
        I: IntoIterator<Item = &'a Rollup>,
    {
        rollups.into_iter().map(|r| self.export(r)).collect()
    }
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

fn write_archive(path: &Path, rollup: &Rollup) -> Result<(), ArchiveError> {
    let tmp = path.with_extension("zip.tmp");
    let f = fs::File::create(&tmp)?;
    let mut zip = ZipWriter::new(f);
    zip.start_file("batch_ledger.json", entry_options())?;
    zip.write_all(&serde_json::to_vec_pretty(rollup)?)?;

    zip.start_file("summary.json", entry_options())?;
    zip.write_all(&serde_json::to_vec_pretty(&rollup.summary())?)?;

    let f = zip.finish()?;
    f.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}
