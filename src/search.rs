//! Retrieval over an ingested guideline collection.
//!
//! [`Retriever`] is the explicitly constructed query-time component: it owns
//! an embedder handle and an index and is passed to whoever needs it (CLI,
//! HTTP server, tests). Errors propagate out of [`Retriever::search`];
//! [`search_guidelines_tool`] is the boundary that turns them into a safe,
//! user-facing payload.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};

use crate::config::Config;
use crate::embedding::{self, Embedder};
use crate::index::VectorIndex;
use crate::models::{ChunkMetadata, Include};
use crate::store::SqliteStore;

/// Shown when a query matched nothing.
pub const NO_RESULTS_MESSAGE: &str = "No relevant guideline sections found.";

/// Shown in place of any internal error at the tool boundary.
pub const TOOL_ERROR_MESSAGE: &str = "An error occurred while searching the guidelines.";

const EXCERPT_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidelineExcerpt {
    pub document: String,
    pub metadata: ChunkMetadata,
}

/// Ranked excerpts, nearest first. Empty is a normal answer, not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub results: Vec<GuidelineExcerpt>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Flat text form for prompts and terminals.
    pub fn render_excerpts(&self) -> String {
        if self.results.is_empty() {
            return NO_RESULTS_MESSAGE.to_string();
        }
        self.results
            .iter()
            .map(|r| r.document.as_str())
            .collect::<Vec<_>>()
            .join(EXCERPT_SEPARATOR)
    }
}

#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: VectorIndex,
    collection: String,
    default_top_n: usize,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: VectorIndex,
        collection: impl Into<String>,
        default_top_n: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            collection: collection.into(),
            default_top_n,
        }
    }

    /// Build from config over an already-open store.
    pub fn from_config(config: &Config, store: Arc<SqliteStore>) -> Result<Self> {
        let embedder = embedding::create_embedder(&config.embedding)?;
        Ok(Self::new(
            embedder,
            VectorIndex::new(store),
            config.index.collection.clone(),
            config.retrieval.top_n,
        ))
    }

    /// Embed `query` and return the `top_n` nearest guideline excerpts.
    ///
    /// A blank query returns no results without calling the embedder.
    pub async fn search(&self, query: &str, top_n: Option<usize>) -> Result<SearchResults> {
        if query.trim().is_empty() {
            return Ok(SearchResults::default());
        }
        let top_n = top_n.unwrap_or(self.default_top_n);

        let query_vec = embedding::embed_query(self.embedder.as_ref(), query).await?;
        let hits = self
            .index
            .query(&self.collection, &query_vec, top_n, Include::default())
            .await?;
        debug!(hits = hits.len(), top_n, "retrieved guideline chunks");

        let results = hits
            .into_iter()
            .filter_map(|hit| {
                Some(GuidelineExcerpt {
                    document: hit.document?,
                    metadata: hit.metadata?,
                })
            })
            .collect();
        Ok(SearchResults { results })
    }
}

/// Guideline search as exposed to an agent or HTTP caller. Never fails.
///
/// Returns the serialized [`SearchResults`], or an empty result list with
/// a generic `error` message if anything went wrong. The underlying error
/// is logged, never returned.
pub async fn search_guidelines_tool(
    retriever: &Retriever,
    query: &str,
    top_n: Option<usize>,
) -> serde_json::Value {
    match retriever.search(query, top_n).await {
        Ok(results) => json!(results),
        Err(e) => {
            error!(error = %format!("{:#}", e), "guideline search failed");
            json!({ "results": [], "error": TOOL_ERROR_MESSAGE })
        }
    }
}

/// `ng12 search`: query the collection and print the excerpts.
pub async fn run_search(config: &Config, query: &str, top_n: Option<usize>, json: bool) -> Result<()> {
    let store = Arc::new(SqliteStore::open(&config.db.path).await?);
    let retriever = Retriever::from_config(config, store.clone())?;
    let results = retriever.search(query, top_n).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else if results.is_empty() {
        println!("{}", NO_RESULTS_MESSAGE);
    } else {
        for (i, r) in results.results.iter().enumerate() {
            println!(
                "{}. [page {}] {} ({})",
                i + 1,
                r.metadata.page,
                r.metadata.chunk_id,
                r.metadata.source
            );
            println!("{}", r.document.trim());
            println!();
        }
    }

    store.close().await;
    Ok(())
}
