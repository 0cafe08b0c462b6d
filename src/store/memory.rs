//! In-memory [`VectorStore`] for tests and ephemeral use.
//!
//! Collections live behind a `std::sync::RwLock`. Ranking is the same
//! brute-force scan the SQLite store performs.

use std::collections::BTreeMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::RagError;
use crate::models::{Include, StoredEntry};

use super::{
    brute_force_query, check_batch_dims, CollectionInfo, DistanceMetric, RawQueryResponse,
    VectorStore,
};

struct MemCollection {
    info: CollectionInfo,
    /// Ingestion order; replacing an id keeps its original slot.
    entries: Vec<StoredEntry>,
}

#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<BTreeMap<String, MemCollection>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> anyhow::Error {
    anyhow::anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn get_or_create_collection(
        &self,
        name: &str,
        metric: DistanceMetric,
    ) -> Result<CollectionInfo> {
        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        let entry = collections
            .entry(name.to_string())
            .or_insert_with(|| MemCollection {
                info: CollectionInfo {
                    name: name.to_string(),
                    metric,
                    dims: None,
                },
                entries: Vec::new(),
            });
        Ok(entry.info.clone())
    }

    async fn get_collection(&self, name: &str) -> Result<Option<CollectionInfo>> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        Ok(collections.get(name).map(|c| c.info.clone()))
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        Ok(collections.values().map(|c| c.info.clone()).collect())
    }

    async fn delete_collection(&self, name: &str) -> Result<bool> {
        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        Ok(collections.remove(name).is_some())
    }

    async fn add(&self, collection: &str, entries: &[StoredEntry]) -> Result<()> {
        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| RagError::CollectionNotFound(collection.to_string()))?;

        // Validate everything before mutating anything
        let dims = check_batch_dims(&target.info, entries)?;

        for entry in entries {
            match target.entries.iter_mut().find(|e| e.id == entry.id) {
                Some(existing) => *existing = entry.clone(),
                None => target.entries.push(entry.clone()),
            }
        }
        target.info.dims = dims;
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        let target = collections
            .get(collection)
            .ok_or_else(|| RagError::CollectionNotFound(collection.to_string()))?;
        Ok(target.entries.len())
    }

    async fn query(
        &self,
        collection: &str,
        query_embeddings: &[Vec<f32>],
        n_results: usize,
        include: Include,
    ) -> Result<RawQueryResponse> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        let target = collections
            .get(collection)
            .ok_or_else(|| RagError::CollectionNotFound(collection.to_string()))?;
        brute_force_query(
            &target.info,
            &target.entries,
            query_embeddings,
            n_results,
            include,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMetadata;

    fn entry(id: &str, document: &str, embedding: Vec<f32>) -> StoredEntry {
        StoredEntry {
            id: id.to_string(),
            document: document.to_string(),
            embedding,
            metadata: ChunkMetadata {
                source: "NG12 PDF".to_string(),
                page: 1,
                chunk_id: format!("ng12_0001_{}", id),
            },
        }
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let store = InMemoryStore::new();
        store
            .get_or_create_collection("ng12", DistanceMetric::Cosine)
            .await
            .unwrap();
        let info = store
            .get_or_create_collection("ng12", DistanceMetric::L2)
            .await
            .unwrap();
        // Metric is fixed at creation
        assert_eq!(info.metric, DistanceMetric::Cosine);
        assert_eq!(store.list_collections().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_upserts_by_id() {
        let store = InMemoryStore::new();
        store
            .get_or_create_collection("ng12", DistanceMetric::Cosine)
            .await
            .unwrap();
        store
            .add("ng12", &[entry("a", "old", vec![1.0, 0.0]), entry("b", "b", vec![0.0, 1.0])])
            .await
            .unwrap();
        store
            .add("ng12", &[entry("a", "new", vec![1.0, 0.0])])
            .await
            .unwrap();

        assert_eq!(store.count("ng12").await.unwrap(), 2);
        let resp = store
            .query("ng12", &[vec![1.0, 0.0]], 1, Include::default())
            .await
            .unwrap();
        assert_eq!(resp.documents.unwrap()[0][0], "new");
    }

    #[tokio::test]
    async fn test_rejected_batch_writes_nothing() {
        let store = InMemoryStore::new();
        store
            .get_or_create_collection("ng12", DistanceMetric::Cosine)
            .await
            .unwrap();
        store
            .add("ng12", &[entry("a", "a", vec![1.0, 0.0])])
            .await
            .unwrap();

        let bad = [entry("b", "b", vec![0.0, 1.0]), entry("c", "c", vec![1.0, 1.0, 1.0])];
        assert!(store.add("ng12", &bad).await.is_err());
        assert_eq!(store.count("ng12").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_collection() {
        let store = InMemoryStore::new();
        let err = store
            .query("missing", &[vec![1.0]], 3, Include::default())
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<RagError>(),
            Some(&RagError::CollectionNotFound("missing".to_string()))
        );
        assert!(store.get_collection("missing").await.unwrap().is_none());
        assert!(!store.delete_collection("missing").await.unwrap());
    }
}
