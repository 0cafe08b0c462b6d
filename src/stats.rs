//! Collection overview.
//!
//! `ng12 collections` prints every collection in the store with its metric,
//! dimensionality and entry count. Used after ingestion to confirm the
//! guideline was indexed with the expected embedding model.

use anyhow::Result;

use crate::config::Config;
use crate::store::{SqliteStore, VectorStore};

/// One row of the overview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionStats {
    pub name: String,
    pub metric: String,
    pub dims: Option<usize>,
    pub count: usize,
}

pub async fn collect_stats(store: &dyn VectorStore) -> Result<Vec<CollectionStats>> {
    let mut stats = Vec::new();
    for info in store.list_collections().await? {
        let count = store.count(&info.name).await?;
        stats.push(CollectionStats {
            name: info.name,
            metric: info.metric.to_string(),
            dims: info.dims,
            count,
        });
    }
    Ok(stats)
}

/// Run the collections command: open the store and print a summary.
pub async fn run_collections(config: &Config) -> Result<()> {
    let store = SqliteStore::open(&config.db.path).await?;
    let stats = collect_stats(&store).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("  Store:       {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();

    if stats.is_empty() {
        println!("  No collections. Run `ng12 ingest` first.");
    } else {
        println!("  {:<24} {:<8} {:>6} {:>8}", "COLLECTION", "METRIC", "DIMS", "ENTRIES");
        println!("  {}", "-".repeat(50));
        for s in &stats {
            let dims = s
                .dims
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("  {:<24} {:<8} {:>6} {:>8}", s.name, s.metric, dims, s.count);
        }
    }
    println!();

    store.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChunkMetadata, StoredEntry};
    use crate::store::{DistanceMetric, InMemoryStore};

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[tokio::test]
    async fn test_collect_stats() {
        let store = InMemoryStore::new();
        store
            .get_or_create_collection("ng12", DistanceMetric::Cosine)
            .await
            .unwrap();
        store
            .get_or_create_collection("scratch", DistanceMetric::L2)
            .await
            .unwrap();
        store
            .add(
                "ng12",
                &[StoredEntry {
                    id: "chunk-0".to_string(),
                    document: "text".to_string(),
                    embedding: vec![0.6, 0.8],
                    metadata: ChunkMetadata {
                        source: "NG12 PDF".to_string(),
                        page: 1,
                        chunk_id: "ng12_0001_00".to_string(),
                    },
                }],
            )
            .await
            .unwrap();

        let stats = collect_stats(&store).await.unwrap();
        assert_eq!(
            stats,
            vec![
                CollectionStats {
                    name: "ng12".to_string(),
                    metric: "cosine".to_string(),
                    dims: Some(2),
                    count: 1,
                },
                CollectionStats {
                    name: "scratch".to_string(),
                    metric: "l2".to_string(),
                    dims: None,
                    count: 0,
                },
            ]
        );
    }
}
