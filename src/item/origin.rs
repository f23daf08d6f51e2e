use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// Where an Item's content came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Origin {
    Text,
    File {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
    },
    Fetched {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_url: Option<String>,
    },
}

impl Origin {
    pub fn file(filename: impl Into<String>) -> Self {
        Origin::File {
            filename: Some(filename.into()),
        }
    }

    pub fn fetched(source_url: impl Into<String>) -> Self {
        Origin::Fetched {
            source_url: Some(source_url.into()),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Origin::Text => "text",
            Origin::File { .. } => "file",
            Origin::Fetched { .. } => "fetched",
        }
    }

    /// Identifier recorded in the processed set for idempotent re-scans.
    pub fn source_id(&self) -> Option<&str> {
        match self {
            Origin::Text => None,
            Origin::File { filename } => filename.as_deref(),
            Origin::Fetched { source_url } => source_url.as_deref(),
        }
    }
}

/// Decode an uploaded file body.
///
/// Standard-alphabet base64 that decodes to UTF-8 is unwrapped; anything
/// else is taken verbatim.
pub fn decode_upload(content: &str) -> String {
    STANDARD
        .decode(content.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| content.to_string())
}

/// Stable coordinate derived from an id.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VectorPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl VectorPosition {
    pub fn from_seed(seed: u64) -> Self {
        let axis = |m: u64| round6((seed % m) as f64 / m as f64);
        Self {
            x: axis(997),
            y: axis(613),
            z: axis(409),
        }
    }
}

fn round6(v: f64) -> f64 {
    (v * 1_000_000.0).round() / 1_000_000.0
}
