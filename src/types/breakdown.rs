use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-keyword match detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordMatch {
    pub count: usize,
    pub bonus: f64,
}

/// Every additive scoring term, kept for auditing.
///
/// `total()` is the score; the individual terms are never re-derived
/// from it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub char_count: usize,
    pub word_count: usize,
    pub line_count: usize,
    pub unique_word_count: usize,

    pub base_score: f64,
    pub keyword_bonus: f64,
    pub depth_bonus: u64,
    pub complexity_bonus: u64,
    pub structure_bonus: u64,

    /// Keyed by keyword; BTreeMap keeps serialized order stable.
    pub keyword_matches: BTreeMap<String, KeywordMatch>,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.base_score
            + self.keyword_bonus
            + self.depth_bonus as f64
            + self.complexity_bonus as f64
            + self.structure_bonus as f64
    }
}
