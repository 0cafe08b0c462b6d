//! Core data models that flow through ingestion and retrieval.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Provenance attached to every stored chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    /// 1-based position of the page in the source document.
    pub page: u32,
    /// `{doc_prefix}_{page:04}_{seq:02}`.
    pub chunk_id: String,
}

/// A token window of one page, ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Flat ingestion-order id, `chunk-{n}`.
    pub id: String,
    pub text: String,
    /// `[start, end)` token offsets within the page's token stream.
    pub token_span: Range<usize>,
    pub metadata: ChunkMetadata,
}

/// A chunk as stored in a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    pub id: String,
    pub document: String,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// One ranked hit from a nearest-neighbour query.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub id: String,
    pub distance: f32,
    pub document: Option<String>,
    pub metadata: Option<ChunkMetadata>,
}

/// Which payload fields a query should return alongside ids and distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Include {
    pub documents: bool,
    pub metadatas: bool,
}

impl Default for Include {
    fn default() -> Self {
        Self {
            documents: true,
            metadatas: true,
        }
    }
}
