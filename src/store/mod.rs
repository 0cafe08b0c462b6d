//! Storage abstraction for embedded chunk collections.
//!
//! The [`VectorStore`] trait is the boundary between the index wrapper and
//! the embedded database that persists chunks and ranks them. Its query
//! answer keeps the store-native batched shape ([`RawQueryResponse`], one
//! inner list per query embedding); flattening it is the job of
//! [`crate::index::normalize_query_response`].
//!
//! Implementations must be `Send + Sync`. They do not serialize concurrent
//! writers to the same collection; overlapping ids resolve as
//! last-writer-wins.

pub mod memory;
pub mod sqlite;

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

use crate::embedding::{cosine_distance, l2_distance};
use crate::error::RagError;
use crate::models::{ChunkMetadata, Include, StoredEntry};

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

/// Distance used to rank a collection. Fixed when the collection is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
    #[default]
    Cosine,
    L2,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::L2 => "l2",
        }
    }

    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => cosine_distance(a, b),
            DistanceMetric::L2 => l2_distance(a, b),
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cosine" => Ok(DistanceMetric::Cosine),
            "l2" => Ok(DistanceMetric::L2),
            other => bail!("Unknown index metric: '{}'. Must be cosine or l2.", other),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptor of a named collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInfo {
    pub name: String,
    pub metric: DistanceMetric,
    /// `None` until the first entry is added.
    pub dims: Option<usize>,
}

/// Store-native query answer: the outer lists have one element per query
/// embedding, the inner lists are ranked nearest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawQueryResponse {
    pub ids: Vec<Vec<String>>,
    pub distances: Vec<Vec<f32>>,
    pub documents: Option<Vec<Vec<String>>>,
    pub metadatas: Option<Vec<Vec<ChunkMetadata>>>,
}

/// Abstract persistent store of chunk collections.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get_or_create_collection`](VectorStore::get_or_create_collection) | Ingestion-time create-if-absent |
/// | [`get_collection`](VectorStore::get_collection) | Lookup without creating |
/// | [`list_collections`](VectorStore::list_collections) | Enumerate collections |
/// | [`delete_collection`](VectorStore::delete_collection) | Drop a collection and its entries |
/// | [`add`](VectorStore::add) | All-or-nothing upsert of entries |
/// | [`count`](VectorStore::count) | Number of entries |
/// | [`query`](VectorStore::query) | Exact nearest-neighbour ranking |
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn get_or_create_collection(
        &self,
        name: &str,
        metric: DistanceMetric,
    ) -> Result<CollectionInfo>;

    async fn get_collection(&self, name: &str) -> Result<Option<CollectionInfo>>;

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>>;

    /// Returns `false` if there was nothing to delete.
    async fn delete_collection(&self, name: &str) -> Result<bool>;

    /// Insert or replace entries by id. Either every entry is written or
    /// none is. Fails with [`RagError::CollectionNotFound`] for an unknown
    /// collection and [`RagError::DimensionMismatch`] for foreign vectors.
    async fn add(&self, collection: &str, entries: &[StoredEntry]) -> Result<()>;

    async fn count(&self, collection: &str) -> Result<usize>;

    async fn query(
        &self,
        collection: &str,
        query_embeddings: &[Vec<f32>],
        n_results: usize,
        include: Include,
    ) -> Result<RawQueryResponse>;
}

/// Check a batch against a collection's dimensionality.
///
/// Returns the dimensionality the collection has after the batch, or
/// `None` if it is still empty.
pub(crate) fn check_batch_dims(
    collection: &CollectionInfo,
    entries: &[StoredEntry],
) -> Result<Option<usize>> {
    let mut dims = collection.dims;
    for entry in entries {
        let actual = entry.embedding.len();
        if actual == 0 {
            bail!("entry '{}' has an empty embedding", entry.id);
        }
        if !is_finite(&entry.embedding) {
            return Err(RagError::NonFiniteEmbedding(format!("entry '{}'", entry.id)).into());
        }
        match dims {
            Some(expected) if expected != actual => {
                return Err(RagError::DimensionMismatch {
                    collection: collection.name.clone(),
                    expected,
                    actual,
                }
                .into());
            }
            Some(_) => {}
            None => dims = Some(actual),
        }
    }
    Ok(dims)
}

fn is_finite(v: &[f32]) -> bool {
    v.iter().all(|x| x.is_finite())
}

/// Exact ranking of `entries` (in ingestion order) for every query.
///
/// Ties keep ingestion order, so results are deterministic.
pub(crate) fn brute_force_query(
    collection: &CollectionInfo,
    entries: &[StoredEntry],
    query_embeddings: &[Vec<f32>],
    n_results: usize,
    include: Include,
) -> Result<RawQueryResponse> {
    let mut response = RawQueryResponse {
        documents: include.documents.then(Vec::new),
        metadatas: include.metadatas.then(Vec::new),
        ..RawQueryResponse::default()
    };

    for query in query_embeddings {
        if !is_finite(query) {
            return Err(RagError::NonFiniteEmbedding("the query".to_string()).into());
        }
        if let Some(expected) = collection.dims {
            if query.len() != expected {
                return Err(RagError::DimensionMismatch {
                    collection: collection.name.clone(),
                    expected,
                    actual: query.len(),
                }
                .into());
            }
        }

        let mut ranked: Vec<(usize, f32)> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, collection.metric.distance(query, &e.embedding)))
            .map(|(i, d)| (i, if d.is_nan() { f32::INFINITY } else { d }))
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        ranked.truncate(n_results);

        response
            .ids
            .push(ranked.iter().map(|(i, _)| entries[*i].id.clone()).collect());
        response
            .distances
            .push(ranked.iter().map(|(_, d)| *d).collect());
        if let Some(documents) = response.documents.as_mut() {
            documents.push(
                ranked
                    .iter()
                    .map(|(i, _)| entries[*i].document.clone())
                    .collect(),
            );
        }
        if let Some(metadatas) = response.metadatas.as_mut() {
            metadatas.push(
                ranked
                    .iter()
                    .map(|(i, _)| entries[*i].metadata.clone())
                    .collect(),
            );
        }
    }

    Ok(response)
}
