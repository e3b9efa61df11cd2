//! Error types for the editor core, the document store and configuration.
//!
//! None of the `EditorError` kinds ever escape a session mutation: the session
//! logs them and leaves state unchanged (or, for fetch failures, records the
//! failure on the background asset). They are still returned as values by the
//! lower layers so each one can be tested directly.

use crate::doc::ItemId;

// =============================================================================
// EDITOR
// =============================================================================

/// Failures produced by document, transform and fetch operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditorError {
    /// A mutation referenced an item id that is not in the document.
    #[error("item {id} not found")]
    NotFound { id: ItemId },

    /// Background bytes were retrieved but are not a decodable image.
    #[error("background decode failed: {0}")]
    DecodeFailure(String),

    /// The transport collaborator could not retrieve the background.
    #[error("background transport failed: {0}")]
    TransportFailure(String),

    /// Zero, negative or non-finite dimensions or scale factors.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The document has handed out every representable item id.
    #[error("item ids exhausted")]
    IdsExhausted,
}

impl EditorError {
    /// Stable short code for structured logs.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "E_NOT_FOUND",
            Self::DecodeFailure(_) => "E_DECODE_FAILURE",
            Self::TransportFailure(_) => "E_TRANSPORT_FAILURE",
            Self::InvalidGeometry(_) => "E_INVALID_GEOMETRY",
            Self::IdsExhausted => "E_IDS_EXHAUSTED",
        }
    }

    /// Whether this error ends a background fetch attempt.
    #[must_use]
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::DecodeFailure(_) | Self::TransportFailure(_))
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Failures reading or writing document snapshots.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The snapshot file could not be read or written.
    #[error("snapshot io failed: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot contents are not valid JSON for a document.
    #[error("snapshot json invalid: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// CONFIG
// =============================================================================

/// Failures building [`crate::config::EditorConfig`] from the environment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A configuration value was present but could not be parsed.
    #[error("config parse failed: {0}")]
    Parse(String),

    /// The HTTP client for the background transport could not be built.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}
