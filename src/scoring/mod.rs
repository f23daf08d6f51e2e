pub mod keywords;
pub mod valuation;

use std::collections::HashSet;

use regex::Regex;
use thiserror::Error;

use crate::types::{KeywordMatch, ScoreBreakdown};
pub use keywords::KeywordTable;
pub use valuation::{band_index, format_value, value_for_score, MAX_VALUE, MIN_VALUE};

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Keyword table contains an empty keyword")]
    EmptyKeyword,
    #[error("Keyword {keyword:?} has invalid weight {weight}")]
    InvalidWeight { keyword: String, weight: f64 },
    #[error("Keyword {keyword:?} could not be compiled: {source}")]
    Pattern {
        keyword: String,
        #[source]
        source: regex::Error,
    },
}

pub trait Scorer {
    fn score(&self, text: &str) -> ScoreBreakdown;

    fn value(&self, breakdown: &ScoreBreakdown) -> f64 {
        let value = value_for_score(breakdown.total());
        debug_assert!((MIN_VALUE..=MAX_VALUE).contains(&value), "value {value} out of range");
        value
    }
}

struct CompiledKeyword {
    keyword: String,
    weight: f64,
    pattern: Regex,
}

/// Additive content scorer over an injected keyword table.
///
/// Terms, in order: base (chars and words), keyword bonus, depth bonus,
/// complexity bonus, structure bonus. Pure; safe to share across threads.
pub struct ContentScorer {
    keywords: Vec<CompiledKeyword>,
}

impl std::fmt::Debug for ContentScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentScorer")
            .field("keywords", &self.keywords.len())
            .finish()
    }
}

impl ContentScorer {
    pub fn new(table: &KeywordTable) -> Result<Self, ScoringError> {
        let mut keywords = Vec::with_capacity(table.len());
        for (keyword, &weight) in table.iter() {
            let keyword = keyword.trim().to_lowercase();
            if keyword.is_empty() {
                return Err(ScoringError::EmptyKeyword);
            }
            if !weight.is_finite() || weight < 0.0 {
                return Err(ScoringError::InvalidWeight { keyword, weight });
            }
            let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(&keyword)))
                .map_err(|source| ScoringError::Pattern {
                    keyword: keyword.clone(),
                    source,
                })?;
            keywords.push(CompiledKeyword {
                keyword,
                weight,
                pattern,
            });
        }
        Ok(Self { keywords })
    }

    pub fn research_defaults() -> Result<Self, ScoringError> {
        Self::new(&KeywordTable::research_defaults())
    }
}

impl Scorer for ContentScorer {
    fn score(&self, text: &str) -> ScoreBreakdown {
        let text_lower = text.to_lowercase();
        let words: Vec<&str> = text_lower.split_whitespace().collect();
        let char_count = text.chars().count();
        let word_count = words.len();
        let line_count = text.split('\n').count();

        let mut breakdown = ScoreBreakdown {
            char_count,
            word_count,
            line_count,
            base_score: char_count as f64 * 0.5 + word_count as f64 * 2.0,
            ..ScoreBreakdown::default()
        };

        for kw in &self.keywords {
            let count = kw.pattern.find_iter(&text_lower).count();
            if count > 0 {
                let bonus = count as f64 * kw.weight;
                breakdown.keyword_bonus += bonus;
                breakdown
                    .keyword_matches
                    .insert(kw.keyword.clone(), KeywordMatch { count, bonus });
            }
        }

        if char_count > 100 {
            breakdown.depth_bonus = ((char_count as f64).log2() * 100.0).floor() as u64;
        }

        if word_count > 0 {
            let unique: HashSet<&str> = words.iter().copied().collect();
            breakdown.unique_word_count = unique.len();
            let ratio = unique.len() as f64 / word_count as f64;
            breakdown.complexity_bonus = (ratio * 1000.0).floor() as u64;
        }

        if line_count > 5 {
            breakdown.structure_bonus = line_count as u64 * 10;
        }

        breakdown
    }
}
