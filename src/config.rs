use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::MissingMemberPolicy;
use crate::scoring::KeywordTable;

pub const DEFAULT_THRESHOLD: usize = 1000;
pub const SUPPORTED_HASH_ALGORITHM: &str = "sha256";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Batch threshold must be at least 1, got {0}")]
    InvalidThreshold(usize),
    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedHashAlgorithm(String),
}

// Serializable, comparable, explicit defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_hash_algorithm")]
    pub hash_algorithm: String,
    /// Hashes per sealed batch.
    #[serde(default = "default_threshold")]
    pub threshold: usize,
    #[serde(default)]
    pub missing_members: MissingMemberPolicy,
    #[serde(default = "KeywordTable::research_defaults")]
    pub keywords: KeywordTable,
}

fn default_version() -> String {
    "1".to_string()
}

fn default_hash_algorithm() -> String {
    SUPPORTED_HASH_ALGORITHM.to_string()
}

fn default_threshold() -> usize {
    DEFAULT_THRESHOLD
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::v0()
    }
}

impl LedgerConfig {
    pub fn v0() -> Self {
        Self {
            version: default_version(),
            hash_algorithm: default_hash_algorithm(),
            threshold: DEFAULT_THRESHOLD,
            missing_members: MissingMemberPolicy::Skip,
            keywords: KeywordTable::research_defaults(),
        }
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_missing_members(mut self, policy: MissingMemberPolicy) -> Self {
        self.missing_members = policy;
        self
    }

    pub fn with_keywords(mut self, keywords: KeywordTable) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threshold == 0 {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        if self.hash_algorithm != SUPPORTED_HASH_ALGORITHM {
            return Err(ConfigError::UnsupportedHashAlgorithm(
                self.hash_algorithm.clone(),
            ));
        }
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: LedgerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}
