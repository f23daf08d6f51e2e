use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Length of a hex-encoded SHA-256 digest.
pub const HASH_HEX_LEN: usize = 64;

/// A content address: lowercase hex SHA-256, always 64 characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContentHashError {
    #[error("Hash must be {HASH_HEX_LEN} hex characters, got {0}")]
    InvalidLength(usize),
    #[error("Hash contains non-hex character: {0:?}")]
    InvalidCharacter(char),
}

impl ContentHash {
    /// Hash raw bytes.
    pub fn digest(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);

        let hash = hasher.finalize();
        ContentHash(hex::encode(hash))
    }

    /// Two-stage chaining: `digest(hex(h1) + hex(h2) + ...)`.
    ///
    /// Each part keeps its own auditable digest; the raw combined payload
    /// is never re-hashed.
    pub fn chain<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = &'a ContentHash>,
    {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.0.as_bytes());
        }
        ContentHash(hex::encode(hasher.finalize()))
    }

    /// `chain` over the digests of each byte slice.
    pub fn chain_bytes(parts: &[&[u8]]) -> Self {
        let digests: Vec<ContentHash> = parts.iter().map(|p| ContentHash::digest(p)).collect();
        ContentHash::chain(&digests)
    }

    /// Validate an externally supplied hex digest.
    pub fn parse(s: &str) -> Result<Self, ContentHashError> {
        if s.len() != HASH_HEX_LEN {
            return Err(ContentHashError::InvalidLength(s.len()));
        }
        if let Some(bad) = s.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(ContentHashError::InvalidCharacter(bad));
        }
        Ok(ContentHash(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading 48 bits as an integer, used for stable derived coordinates.
    pub fn prefix_value(&self) -> u64 {
        // Always valid: the inner string is 64 hex characters by construction.
        u64::from_str_radix(&self.0[..12], 16).unwrap_or_default()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ContentHash {
    type Err = ContentHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentHash::parse(s)
    }
}

impl TryFrom<String> for ContentHash {
    type Error = ContentHashError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        ContentHash::parse(&s)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

/// Identifier of an Item. Event-addressed: see `ItemBuilder`.
pub type ItemId = ContentHash;

/// Identifier of a Composite.
pub type CompositeId = ContentHash;
