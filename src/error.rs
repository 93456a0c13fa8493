//! Typed errors for the host boundary.
//!
//! Extraction itself never fails: malformed page content degrades to a
//! partial result (skipped scripts, sentinel values, empty strings). The
//! only fallible operations are the ones that talk to the embedding host.

use thiserror::Error;

/// Errors crossing the host boundary.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A mutation batch delivered as JSON could not be decoded.
    #[error("invalid mutation batch: {0}")]
    MutationBatch(#[source] serde_json::Error),

    /// The published entity set could not be serialized.
    #[error("entity serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Result type alias for host-boundary operations.
pub type Result<T> = std::result::Result<T, ExtractError>;
