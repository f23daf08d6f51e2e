//! Content-hash batch ledger with deterministic valuation.
//!
//! `content-ledger` scores and content-addresses discrete pieces of text,
//! persists each as an immutable Item, and accumulates Item hashes into
//! fixed-size batches that are sealed into Rollup records. Hashing and
//! valuation are deterministic; batch accounting is monotonic and
//! survives restarts without sealing anything twice.
//!
//! Start with [`Ledger`] over an [`store::FsStore`].

pub mod aggregate;
pub mod archive;
pub mod config;
pub mod engine;
pub mod error;
pub mod item;
pub mod ledger;
pub mod scoring;
pub mod state;
pub mod store;
pub mod types;

pub use config::LedgerConfig;
pub use engine::{IngestReport, ItemCreated, Ledger};
pub use error::{LedgerError, ValidationError};
