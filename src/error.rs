use thiserror::Error;

use crate::config::ConfigError;
use crate::scoring::ScoringError;
use crate::store::StorageError;
use crate::types::{ContentHashError, ItemId};

/// Rejected input. Nothing was written.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("NeedMoreItems: a composite needs at least 2 items, got {supplied}")]
    NeedMoreItems { supplied: usize },
    #[error("A composite needs at least 2 resolved items, got {resolved} ({missing} missing)")]
    TooFewResolved { resolved: usize, missing: usize },
    #[error("Composite member does not resolve to an item: {0}")]
    UnresolvedMember(ItemId),
    #[error("Unknown item: {0}")]
    UnknownItem(ItemId),
    #[error("Invalid hash: {0}")]
    InvalidHash(#[from] ContentHashError),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Corrupt ledger state: {0}")]
    CorruptState(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Storage(StorageError::Io(err))
    }
}
