use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Keyword → per-occurrence weight.
///
/// Keys are stored lowercase. Matching is case-insensitive on word
/// boundaries (see `ContentScorer`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct KeywordTable {
    weights: BTreeMap<String, f64>,
}

impl KeywordTable {
    pub fn new() -> Self {
        Self {
            weights: BTreeMap::new(),
        }
    }

    /// The research weighting used by the ingestion pipeline.
    pub fn research_defaults() -> Self {
        const TABLE: &[(&str, f64)] = &[
            // Tier 1
            ("quantum", 500.0),
            ("hydrogen", 500.0),
            ("fusion", 500.0),
            ("einstein", 500.0),
            ("relativity", 500.0),
            ("infinity", 500.0),
            ("neural", 450.0),
            ("photon", 450.0),
            ("plasma", 450.0),
            ("electron", 450.0),
            // Tier 2
            ("vector", 300.0),
            ("tensor", 300.0),
            ("gravity", 300.0),
            ("reactor", 300.0),
            ("lattice", 300.0),
            ("thermodynamics", 300.0),
            ("entropy", 300.0),
            // Tier 3
            ("ai", 150.0),
            ("algorithm", 150.0),
            ("compute", 150.0),
            ("research", 150.0),
            ("discovery", 150.0),
            ("patent", 150.0),
            ("proprietary", 150.0),
            // Tier 4
            ("data", 75.0),
            ("analysis", 75.0),
            ("model", 75.0),
            ("theory", 75.0),
            ("experiment", 75.0),
            // Special
            ("kris", 10_000.0),
            ("pewpi", 10_000.0),
            ("hydra", 8_000.0),
            ("osprey", 8_000.0),
            ("classified", 15_000.0),
            ("secret", 12_000.0),
        ];

        TABLE.iter().copied().collect()
    }

    pub fn insert(&mut self, keyword: impl Into<String>, weight: f64) {
        self.weights.insert(keyword.into().to_lowercase(), weight);
    }

    pub fn get(&self, keyword: &str) -> Option<f64> {
        self.weights.get(&keyword.to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.weights.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for KeywordTable {
    fn from_iter<T: IntoIterator<Item = (K, f64)>>(iter: T) -> Self {
        let mut table = KeywordTable::new();
        for (keyword, weight) in iter {
            table.insert(keyword, weight);
        }
        table
    }
}

impl From<BTreeMap<String, f64>> for KeywordTable {
    fn from(weights: BTreeMap<String, f64>) -> Self {
        weights.into_iter().collect()
    }
}

impl From<KeywordTable> for BTreeMap<String, f64> {
    fn from(table: KeywordTable) -> Self {
        table.weights
    }
}
