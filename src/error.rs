//! Typed failures of the ingestion and retrieval pipeline.
//!
//! Pipeline functions return [`anyhow::Result`]; the variants below travel
//! inside the `anyhow::Error` and can be recovered with
//! [`anyhow::Error::downcast_ref`] when a caller needs to tell a
//! configuration problem apart from a caller mistake or an upstream failure.
//!
//! An empty search result is not an error and has no variant here.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RagError {
    /// The sliding window would never advance.
    #[error(
        "invalid chunk window: overlap_tokens ({overlap_tokens}) must be smaller than max_tokens ({max_tokens}), and max_tokens must be > 0"
    )]
    InvalidChunkWindow {
        max_tokens: usize,
        overlap_tokens: usize,
    },

    /// Queried a collection that ingestion never created.
    #[error("collection '{0}' does not exist; run `ng12 ingest` first")]
    CollectionNotFound(String),

    /// The parallel sequences handed to `add_batch` disagree in length.
    #[error(
        "batch length mismatch: documents={documents}, embeddings={embeddings}, metadatas={metadatas}, ids={ids}"
    )]
    BatchLengthMismatch {
        documents: usize,
        embeddings: usize,
        metadatas: usize,
        ids: usize,
    },

    #[error("embedding dimensionality mismatch in collection '{collection}': expected {expected}, got {actual}")]
    DimensionMismatch {
        collection: String,
        expected: usize,
        actual: usize,
    },

    /// A vector with a NaN or infinite component cannot be ranked.
    #[error("embedding for {0} contains NaN or infinite values")]
    NonFiniteEmbedding(String),

    /// The embedding service answered with the wrong number of vectors.
    #[error("embedding service returned {actual} vectors for {expected} inputs")]
    EmbeddingCountMismatch { expected: usize, actual: usize },
}

impl RagError {
    /// Fatal setup problems that no retry will fix.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RagError::InvalidChunkWindow { .. } | RagError::CollectionNotFound(_)
        )
    }
}
