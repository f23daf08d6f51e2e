pub mod rollup;
pub mod window;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ConfigError;
use crate::error::LedgerError;
use crate::store::LedgerStore;
use crate::types::ContentHash;
pub use rollup::{Rollup, RollupSummary};
pub use window::BatchWindow;

/// One appended hash, keyed by its arrival sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub seq: u64,
    pub hash: ContentHash,
}

#[derive(Debug, Clone)]
pub struct SealStep {
    pub rollup: Rollup,
    pub already_sealed: bool,
}

/// Batches a window will seal, oldest first.
#[derive(Debug, Clone, Default)]
pub struct SealPlan {
    pub steps: Vec<SealStep>,
}

impl SealPlan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }
}

/// Seals full batches out of a window.
///
/// Holds no window of its own: the caller passes a candidate window,
/// and only adopts it once every rollup and the cursor are durable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLedger {
    threshold: usize,
}

impl BatchLedger {
    pub fn new(threshold: usize) -> Result<Self, ConfigError> {
        if threshold == 0 {
            return Err(ConfigError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Work out which batches `window` would seal, without writing.
    ///
    /// A rollup already on record with the same id is reused (keeping its
    /// original `sealed_at`); a different id under the same batch index is
    /// `CorruptState`. Checking every batch before anything is written
    /// means a conflicting append leaves no trace.
    pub fn plan<S: LedgerStore>(
        &self,
        store: &S,
        window: &BatchWindow,
    ) -> Result<SealPlan, LedgerError> {
        let mut scratch = window.clone();
        let mut plan = SealPlan::default();

        while let Some(members) = scratch.sealable(self.threshold) {
            let batch_index = scratch.next_batch_index();
            let candidate = Rollup::seal(batch_index, members, Utc::now());

            match store.get_rollup(batch_index)? {
                Some(existing) if existing.rollup_id == candidate.rollup_id => {
                    debug!(batch_index, rollup_id = %existing.rollup_id, "batch already sealed");
                    plan.steps.push(SealStep {
                        rollup: existing,
                        already_sealed: true,
                    });
                }
                Some(existing) => {
                    return Err(LedgerError::CorruptState(format!(
                        "batch {batch_index} is sealed as {} but the window hashes to {}",
                        existing.rollup_id, candidate.rollup_id
                    )));
                }
                None => plan.steps.push(SealStep {
                    rollup: candidate,
                    already_sealed: false,
                }),
            }
            scratch.advance(self.threshold);
        }
        Ok(plan)
    }

    /// Persist each planned rollup, advancing `window` past it only once
    /// it is durable.
    ///
    /// On error `window` may have advanced past the batches written before
    /// the failure; callers discard it.
    pub fn apply<S: LedgerStore>(
        &self,
        store: &mut S,
        plan: SealPlan,
        window: &mut BatchWindow,
    ) -> Result<Vec<Rollup>, LedgerError> {
        let mut sealed = Vec::with_capacity(plan.steps.len());
        for step in plan.steps {
            if !step.already_sealed {
                store.put_rollup(&step.rollup)?;
                info!(
                    batch_index = step.rollup.batch_index,
                    rollup_id = %step.rollup.rollup_id,
                    count = step.rollup.count,
                    "sealed rollup"
                );
            }
            window.advance(self.threshold);
            sealed.push(step.rollup);
        }

        debug_assert!(window.len() < self.threshold);
        Ok(sealed)
    }

    /// `plan` then `apply`.
    pub fn seal_ready<S: LedgerStore>(
        &self,
        store: &mut S,
        window: &mut BatchWindow,
    ) -> Result<Vec<Rollup>, LedgerError> {
        let plan = self.plan(&*store, window)?;
        self.apply(store, plan, window)
    }
}
