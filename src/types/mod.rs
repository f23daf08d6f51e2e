pub mod breakdown;
pub mod identifiers;

pub use breakdown::{KeywordMatch, ScoreBreakdown};
pub use identifiers::{CompositeId, ContentHash, ContentHashError, ItemId, HASH_HEX_LEN};
