use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{LedgerError, ValidationError};
use crate::scoring::MAX_VALUE;
use crate::store::LedgerStore;
use crate::types::{CompositeId, ContentHash, ItemId};

/// Separator placed after each member's content in the hashed payload.
pub const COMPOSITE_DELIMITER: &str = "\n---\n";
/// Domain nonce keeping composite ids apart from item ids.
pub const COMPOSITE_NONCE: &str = "MEGA";

/// Linear reward per member.
pub const COMBINATION_UNIT: f64 = 1_000_000.0;
/// Cubic reward per member.
pub const SYNERGY_UNIT: f64 = 10_000_000.0;
/// Every composite is worth at least this much.
pub const AGGREGATION_FLOOR: f64 = 963_000_000_000.0;
/// Value added per 1000 points of combined score.
pub const AGGREGATION_SCALE: f64 = 1_000_000_000.0;

/// What to do with a member id that does not resolve to a stored Item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingMemberPolicy {
    /// Leave it out of the payload and score sum, and record it in
    /// `missing_ids`. At least two members must still resolve.
    #[default]
    Skip,
    /// Fail with `ValidationError::UnresolvedMember`.
    Reject,
}

/// An aggregation of two or more Items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composite {
    pub id: CompositeId,
    pub member_ids: Vec<ItemId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_ids: Vec<ItemId>,
    pub description: String,
    pub created_at: DateTime<Utc>, // informational only
    pub combined_score: f64,
    pub value: f64,
}

impl Composite {
    /// Order-dependent: the payload is hashed in member order.
    ///
    /// Unresolved members are chained in as well, so composites that
    /// differ only in which ids were missing never share an id.
    pub fn compute_id(payload: &str, missing_ids: &[ItemId]) -> CompositeId {
        if missing_ids.is_empty() {
            return ContentHash::chain_bytes(&[payload.as_bytes(), COMPOSITE_NONCE.as_bytes()]);
        }
        let missing = missing_ids
            .iter()
            .map(ItemId::as_str)
            .collect::<Vec<_>>()
            .join(",");
        ContentHash::chain_bytes(&[
            payload.as_bytes(),
            missing.as_bytes(),
            COMPOSITE_NONCE.as_bytes(),
        ])
    }

    pub fn combined_score(member_score_sum: f64, member_count: usize) -> f64 {
        let n = member_count as f64;
        member_score_sum + n * COMBINATION_UNIT + n.powi(3) * SYNERGY_UNIT
    }

    pub fn value_for(combined_score: f64) -> f64 {
        let scaled = AGGREGATION_FLOOR + (combined_score / 1000.0) * AGGREGATION_SCALE;
        if scaled.is_nan() {
            return AGGREGATION_FLOOR;
        }
        scaled.max(AGGREGATION_FLOOR).min(MAX_VALUE)
    }
}

/// Combines stored Items into Composites.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator {
    policy: MissingMemberPolicy,
}

impl Aggregator {
    pub fn new(policy: MissingMemberPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MissingMemberPolicy {
        self.policy
    }

    /// Build (but do not persist) a Composite over `item_ids`, in order.
    ///
    /// The member count used for the combination bonus is the number of
    /// ids requested, resolved or not. Fewer than two resolved members is
    /// `TooFewResolved`.
    pub fn combine<S: LedgerStore>(
        &self,
        store: &S,
        item_ids: &[ItemId],
        description: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Composite, LedgerError> {
        if item_ids.len() < 2 {
            return Err(ValidationError::NeedMoreItems {
                supplied: item_ids.len(),
            }
            .into());
        }

        let mut payload = String::new();
        let mut score_sum = 0.0;
        let mut missing_ids = Vec::new();

        for id in item_ids {
            match store.get_item(id)? {
                Some(item) => {
                    payload.push_str(&item.raw_content);
                    payload.push_str(COMPOSITE_DELIMITER);
                    score_sum += item.score;
                }
                None if self.policy == MissingMemberPolicy::Reject => {
                    return Err(ValidationError::UnresolvedMember(id.clone()).into());
                }
                None => {
                    warn!(item_id = %id, "composite member not found; skipping");
                    missing_ids.push(id.clone());
                }
            }
        }

        let resolved = item_ids.len() - missing_ids.len();
        if resolved < 2 {
            return Err(ValidationError::TooFewResolved {
                resolved,
                missing: missing_ids.len(),
            }
            .into());
        }

        let combined_score = Composite::combined_score(score_sum, item_ids.len());

        Ok(Composite {
            id: Composite::compute_id(&payload, &missing_ids),
            member_ids: item_ids.to_vec(),
            missing_ids,
            description: description.into(),
            created_at,
            combined_score,
            value: Composite::value_for(combined_score),
        })
    }
}
