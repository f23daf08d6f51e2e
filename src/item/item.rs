use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::origin::{Origin, VectorPosition};
use crate::scoring::Scorer;
use crate::types::{ContentHash, ItemId, ScoreBreakdown};

/// Hash chain linking an Item to its source and content.
///
/// Each link is individually auditable:
/// `combined = chain(source, content)`, `master = digest(combined)`,
/// `audit = chain(master, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub source_hash: ContentHash,
    pub content_hash: ContentHash,
    pub combined_hash: ContentHash,
    pub master_hash: ContentHash,
    pub audit_hash: ContentHash,
}

impl Provenance {
    pub fn compute(id: &ItemId, source: &str, content: &str) -> Self {
        let source_hash = ContentHash::digest(source.as_bytes());
        let content_hash = ContentHash::digest(content.as_bytes());
        let combined_hash = ContentHash::chain([&source_hash, &content_hash]);
        let master_hash = ContentHash::digest(combined_hash.as_str().as_bytes());
        let audit_hash = ContentHash::chain([&master_hash, id]);
        Self {
            source_hash,
            content_hash,
            combined_hash,
            master_hash,
            audit_hash,
        }
    }
}

/// The atomic, hashed, valued content record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub ordinal: u64,
    pub created_at: DateTime<Utc>,
    pub origin: Origin,
    pub raw_content: String,
    pub score: f64,
    pub value: f64,
    pub breakdown: ScoreBreakdown,
    pub vector: VectorPosition,
    pub provenance: Provenance,
}

impl Item {
    /// Event address: identical content at a different time or ordinal
    /// yields a different id.
    pub fn event_id(raw_content: &str, created_at: &DateTime<Utc>, ordinal: u64) -> ItemId {
        let stamp = created_at.to_rfc3339_opts(SecondsFormat::Nanos, true);
        let salted = format!("{raw_content}{stamp}#{ordinal}");
        ContentHash::digest(salted.as_bytes())
    }
}

/// Builds Items from raw content. Pure: persistence and ledger
/// registration happen in `Ledger::create_item`.
#[derive(Debug)]
pub struct ItemBuilder<S> {
    scorer: S,
}

impl<S: Scorer> ItemBuilder<S> {
    pub fn new(scorer: S) -> Self {
        Self { scorer }
    }

    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    pub fn prepare(
        &self,
        raw_content: impl Into<String>,
        origin: Origin,
        ordinal: u64,
        created_at: DateTime<Utc>,
    ) -> Item {
        let raw_content = raw_content.into();
        let id = Item::event_id(&raw_content, &created_at, ordinal);
        let breakdown = self.scorer.score(&raw_content);
        let score = breakdown.total();
        let value = self.scorer.value(&breakdown);
        let vector = VectorPosition::from_seed(id.prefix_value());
        let provenance =
            Provenance::compute(&id, origin.source_id().unwrap_or_default(), &raw_content);

        Item {
            id,
            ordinal,
            created_at,
            origin,
            raw_content,
            score,
            value,
            breakdown,
            vector,
            provenance,
        }
    }

    /// Recompute score, value and breakdown from `raw_content`.
    ///
    /// Returns `true` if anything changed. Running it twice is a no-op
    /// the second time.
    pub fn revalue(&self, item: &mut Item) -> bool {
        let breakdown = self.scorer.score(&item.raw_content);
        let score = breakdown.total();
        let value = self.scorer.value(&breakdown);

        let changed = item.breakdown != breakdown || item.score != score || item.value != value;
        item.breakdown = breakdown;
        item.score = score;
        item.value = value;
        changed
    }
}
