//! SQLite-backed [`VectorStore`].
//!
//! Embeddings are stored as little-endian `f32` BLOBs next to the chunk
//! text and metadata. Queries load the collection's vectors and rank them
//! in Rust with an exact scan, which is fast enough for a single guideline
//! document of a few hundred chunks.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::db;
use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::error::RagError;
use crate::migrate;
use crate::models::{ChunkMetadata, Include, StoredEntry};

use super::{
    brute_force_query, check_batch_dims, CollectionInfo, DistanceMetric, RawQueryResponse,
    VectorStore,
};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Wrap a pool whose schema has already been applied.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the store file at `path` and apply the schema.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::connect_path(path).await?;
        migrate::apply_schema(&pool)
            .await
            .with_context(|| format!("Failed to initialize store: {}", path.display()))?;
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn load_entries(&self, collection: &str) -> Result<Vec<StoredEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, document, embedding, source, page, chunk_id
            FROM entries
            WHERE collection = ?
            ORDER BY seq
            "#,
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let page: i64 = row.get("page");
                StoredEntry {
                    id: row.get("id"),
                    document: row.get("document"),
                    embedding: blob_to_vec(&blob),
                    metadata: ChunkMetadata {
                        source: row.get("source"),
                        page: page as u32,
                        chunk_id: row.get("chunk_id"),
                    },
                }
            })
            .collect())
    }
}

fn collection_from_row(row: &SqliteRow) -> Result<CollectionInfo> {
    let metric: String = row.get("metric");
    let dims: Option<i64> = row.get("dims");
    Ok(CollectionInfo {
        name: row.get("name"),
        metric: metric.parse()?,
        dims: dims.map(|d| d as usize),
    })
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn get_or_create_collection(
        &self,
        name: &str,
        metric: DistanceMetric,
    ) -> Result<CollectionInfo> {
        sqlx::query(
            "INSERT OR IGNORE INTO collections (name, metric, dims, created_at) VALUES (?, ?, NULL, ?)",
        )
        .bind(name)
        .bind(metric.as_str())
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        self.get_collection(name)
            .await?
            .ok_or_else(|| RagError::CollectionNotFound(name.to_string()).into())
    }

    async fn get_collection(&self, name: &str) -> Result<Option<CollectionInfo>> {
        let row = sqlx::query("SELECT name, metric, dims FROM collections WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(collection_from_row).transpose()
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let rows = sqlx::query("SELECT name, metric, dims FROM collections ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(collection_from_row).collect()
    }

    async fn delete_collection(&self, name: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM entries WHERE collection = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM collections WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(deleted > 0)
    }

    async fn add(&self, collection: &str, entries: &[StoredEntry]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT name, metric, dims FROM collections WHERE name = ?")
            .bind(collection)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RagError::CollectionNotFound(collection.to_string()))?;
        let info = collection_from_row(&row)?;
        let dims = check_batch_dims(&info, entries)?;

        // Upsert keeps the original seq, so a replaced entry keeps its slot
        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO entries (collection, id, document, embedding, source, page, chunk_id)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(collection, id) DO UPDATE SET
                    document = excluded.document,
                    embedding = excluded.embedding,
                    source = excluded.source,
                    page = excluded.page,
                    chunk_id = excluded.chunk_id
                "#,
            )
            .bind(collection)
            .bind(&entry.id)
            .bind(&entry.document)
            .bind(vec_to_blob(&entry.embedding))
            .bind(&entry.metadata.source)
            .bind(entry.metadata.page as i64)
            .bind(&entry.metadata.chunk_id)
            .execute(&mut *tx)
            .await?;
        }

        if info.dims.is_none() {
            if let Some(d) = dims {
                sqlx::query("UPDATE collections SET dims = ? WHERE name = ?")
                    .bind(d as i64)
                    .bind(collection)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        if self.get_collection(collection).await?.is_none() {
            return Err(RagError::CollectionNotFound(collection.to_string()).into());
        }
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn query(
        &self,
        collection: &str,
        query_embeddings: &[Vec<f32>],
        n_results: usize,
        include: Include,
    ) -> Result<RawQueryResponse> {
        let info = self
            .get_collection(collection)
            .await?
            .ok_or_else(|| RagError::CollectionNotFound(collection.to_string()))?;
        let entries = self.load_entries(collection).await?;
        brute_force_query(&info, &entries, query_embeddings, n_results, include)
    }
}
