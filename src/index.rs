//! Vector index wrapper.
//!
//! [`VectorIndex`] sits between the pipeline and a [`VectorStore`]. It owns
//! three rules the store does not:
//!
//! - A batch whose four columns differ in length, or whose vectors are
//!   ragged or non-finite, is rejected before the store is touched, so a
//!   failed add is never partially visible.
//! - Only ingestion creates collections. A query against a missing
//!   collection is a [`RagError::CollectionNotFound`] configuration error.
//! - The store's nested per-query answer is flattened in exactly one place,
//!   [`normalize_query_response`].
//!
//! An empty collection is a normal state and queries against it return an
//! empty list.

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::error::RagError;
use crate::models::{ChunkMetadata, Include, RetrievedChunk, StoredEntry};
use crate::store::{
    check_batch_dims, CollectionInfo, DistanceMetric, RawQueryResponse, VectorStore,
};

/// Column-oriented batch for [`VectorIndex::add_batch`].
#[derive(Debug, Clone, Default)]
pub struct AddBatch {
    pub documents: Vec<String>,
    pub embeddings: Vec<Vec<f32>>,
    pub metadatas: Vec<ChunkMetadata>,
    pub ids: Vec<String>,
}

impl AddBatch {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn validate(&self) -> Result<(), RagError> {
        let n = self.documents.len();
        if self.embeddings.len() != n || self.metadatas.len() != n || self.ids.len() != n {
            return Err(RagError::BatchLengthMismatch {
                documents: self.documents.len(),
                embeddings: self.embeddings.len(),
                metadatas: self.metadatas.len(),
                ids: self.ids.len(),
            });
        }
        Ok(())
    }

    fn into_entries(self) -> Vec<StoredEntry> {
        self.ids
            .into_iter()
            .zip(self.documents)
            .zip(self.embeddings)
            .zip(self.metadatas)
            .map(|(((id, document), embedding), metadata)| StoredEntry {
                id,
                document,
                embedding,
                metadata,
            })
            .collect()
    }
}

#[derive(Clone)]
pub struct VectorIndex {
    store: Arc<dyn VectorStore>,
}

impl VectorIndex {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Add one batch, creating the collection with `metric` if absent.
    pub async fn add_batch(
        &self,
        collection: &str,
        batch: AddBatch,
        metric: DistanceMetric,
    ) -> Result<()> {
        batch.validate()?;
        let entries = batch.into_entries();

        // A rejected first batch must not leave an empty collection behind
        let existing = self.store.get_collection(collection).await?;
        let target = existing.clone().unwrap_or_else(|| CollectionInfo {
            name: collection.to_string(),
            metric,
            dims: None,
        });
        check_batch_dims(&target, &entries)?;

        if existing.is_none() {
            self.store
                .get_or_create_collection(collection, metric)
                .await?;
        }
        debug!(collection, entries = entries.len(), "adding batch");
        self.store.add(collection, &entries).await
    }

    /// Nearest `top_n` entries to `query_embedding`, ascending by distance.
    pub async fn query(
        &self,
        collection: &str,
        query_embedding: &[f32],
        top_n: usize,
        include: Include,
    ) -> Result<Vec<RetrievedChunk>> {
        if self.store.get_collection(collection).await?.is_none() {
            return Err(RagError::CollectionNotFound(collection.to_string()).into());
        }
        if top_n == 0 {
            return Ok(Vec::new());
        }
        let raw = self
            .store
            .query(collection, &[query_embedding.to_vec()], top_n, include)
            .await?;
        Ok(normalize_query_response(raw))
    }

    pub async fn count(&self, collection: &str) -> Result<usize> {
        self.store.count(collection).await
    }
}

/// Flatten a single-query store response into ranked hits.
///
/// Only the first inner list is read. Optional columns that are absent or
/// short yield `None` for the affected hits.
pub fn normalize_query_response(raw: RawQueryResponse) -> Vec<RetrievedChunk> {
    let RawQueryResponse {
        ids,
        distances,
        documents,
        metadatas,
    } = raw;

    let ids = ids.into_iter().next().unwrap_or_default();
    let distances = distances.into_iter().next().unwrap_or_default();
    let mut documents = documents
        .and_then(|d| d.into_iter().next())
        .unwrap_or_default()
        .into_iter();
    let mut metadatas = metadatas
        .and_then(|m| m.into_iter().next())
        .unwrap_or_default()
        .into_iter();

    ids.into_iter()
        .zip(distances)
        .map(|(id, distance)| RetrievedChunk {
            id,
            distance,
            document: documents.next(),
            metadata: metadatas.next(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn meta(page: u32, seq: u32) -> ChunkMetadata {
        ChunkMetadata {
            source: "NG12 PDF".to_string(),
            page,
            chunk_id: format!("ng12_{:04}_{:02}", page, seq),
        }
    }

    fn batch(vectors: &[[f32; 2]]) -> AddBatch {
        let mut b = AddBatch::default();
        for (i, v) in vectors.iter().enumerate() {
            b.documents.push(format!("document {}", i));
            b.embeddings.push(v.to_vec());
            b.metadatas.push(meta(1, i as u32));
            b.ids.push(format!("chunk-{}", i));
        }
        b
    }

    fn index() -> VectorIndex {
        VectorIndex::new(Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn test_add_then_query_nearest_first() {
        let index = index();
        index
            .add_batch(
                "ng12",
                batch(&[[1.0, 0.0], [0.0, 1.0], [0.7, 0.7]]),
                DistanceMetric::Cosine,
            )
            .await
            .unwrap();

        let hits = index
            .query("ng12", &[0.0, 1.0], 2, Include::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "chunk-1");
        assert_eq!(hits[1].id, "chunk-2");
        assert!(hits[0].distance <= hits[1].distance);
        assert_eq!(hits[0].document.as_deref(), Some("document 1"));
        assert_eq!(hits[0].metadata.as_ref().unwrap().chunk_id, "ng12_0001_01");
    }

    #[tokio::test]
    async fn test_length_mismatch_writes_nothing() {
        let index = index();
        index
            .add_batch("ng12", batch(&[[1.0, 0.0]]), DistanceMetric::Cosine)
            .await
            .unwrap();

        let mut bad = batch(&[[0.0, 1.0], [1.0, 1.0]]);
        bad.embeddings.pop();
        let err = index
            .add_batch("ng12", bad, DistanceMetric::Cosine)
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<RagError>(),
            Some(&RagError::BatchLengthMismatch {
                documents: 2,
                embeddings: 1,
                metadatas: 2,
                ids: 2,
            })
        );
        assert_eq!(index.count("ng12").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mismatch_does_not_create_collection() {
        let index = index();
        let mut bad = batch(&[[0.0, 1.0]]);
        bad.ids.clear();
        assert!(index
            .add_batch("fresh", bad, DistanceMetric::Cosine)
            .await
            .is_err());
        assert!(index.store().get_collection("fresh").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ragged_first_batch_leaves_no_collection() {
        let index = index();
        let mut ragged = batch(&[[1.0, 0.0], [1.0, 0.0]]);
        ragged.embeddings[1] = vec![1.0, 0.0, 0.0];
        let err = index
            .add_batch("fresh", ragged, DistanceMetric::Cosine)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RagError>(),
            Some(RagError::DimensionMismatch { expected: 2, actual: 3, .. })
        ));
        assert!(index.store().get_collection("fresh").await.unwrap().is_none());

        let err = index
            .query("fresh", &[1.0, 0.0], 3, Include::default())
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<RagError>(),
            Some(&RagError::CollectionNotFound("fresh".to_string()))
        );
    }

    #[tokio::test]
    async fn test_non_finite_batch_rejected() {
        let index = index();
        index
            .add_batch("ng12", batch(&[[5.0, 0.0], [0.1, 0.0]]), DistanceMetric::L2)
            .await
            .unwrap();

        let nan = batch(&[[f32::NAN, 0.0]]);
        let err = index
            .add_batch("ng12", nan, DistanceMetric::L2)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RagError>(),
            Some(RagError::NonFiniteEmbedding(_))
        ));
        assert_eq!(index.count("ng12").await.unwrap(), 2);

        let hits = index
            .query("ng12", &[0.0, 0.0], 2, Include::default())
            .await
            .unwrap();
        assert_eq!(hits[0].id, "chunk-1");
        assert_eq!(hits[1].id, "chunk-0");
    }

    #[tokio::test]
    async fn test_query_missing_collection_is_config_error() {
        let index = index();
        let err = index
            .query("ng12", &[1.0, 0.0], 3, Include::default())
            .await
            .unwrap_err();
        let rag = err.downcast_ref::<RagError>().unwrap();
        assert!(rag.is_configuration());
        // Query must not create the collection
        assert!(index.store().get_collection("ng12").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_empty_collection_is_empty() {
        let index = index();
        index
            .add_batch("ng12", AddBatch::default(), DistanceMetric::Cosine)
            .await
            .unwrap();
        let hits = index
            .query("ng12", &[1.0, 0.0], 3, Include::default())
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_top_n_zero_and_oversized() {
        let index = index();
        index
            .add_batch("ng12", batch(&[[1.0, 0.0], [0.0, 1.0]]), DistanceMetric::L2)
            .await
            .unwrap();
        assert!(index
            .query("ng12", &[1.0, 0.0], 0, Include::default())
            .await
            .unwrap()
            .is_empty());
        let hits = index
            .query("ng12", &[1.0, 0.0], 10, Include::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_normalize_flattens_first_query() {
        let raw = RawQueryResponse {
            ids: vec![vec!["a".into(), "b".into()], vec!["z".into()]],
            distances: vec![vec![0.1, 0.4], vec![0.0]],
            documents: Some(vec![vec!["doc a".into(), "doc b".into()]]),
            metadatas: None,
        };
        let hits = normalize_query_response(raw);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[1].document.as_deref(), Some("doc b"));
        assert!(hits[1].metadata.is_none());
    }

    #[test]
    fn test_normalize_empty_shapes() {
        assert!(normalize_query_response(RawQueryResponse::default()).is_empty());
        let raw = RawQueryResponse {
            ids: vec![vec![]],
            distances: vec![vec![]],
            documents: Some(vec![vec![]]),
            metadatas: Some(vec![vec![]]),
        };
        assert!(normalize_query_response(raw).is_empty());
    }
}
