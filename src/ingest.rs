//! Ingestion pipeline orchestration.
//!
//! Coordinates the offline flow: PDF pages → chunking → batched embedding →
//! one `add_batch` into the collection. Re-ingestion is wipe-and-rebuild:
//! `--rebuild` drops the collection before anything is written. A failed
//! run leaves whatever the store already held and must be retried against
//! a cleared collection.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::chunk::{chunk_document, ChunkWindow, DocumentSource};
use crate::config::Config;
use crate::embedding::{self, Embedder};
use crate::extract;
use crate::index::{AddBatch, VectorIndex};
use crate::store::{DistanceMetric, SqliteStore};
use crate::tokenize::{Tokenizer, WhitespaceTokenizer};

/// Everything that shapes one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub window: ChunkWindow,
    pub source: DocumentSource,
    pub collection: String,
    pub metric: DistanceMetric,
    pub batch_size: usize,
}

impl IngestSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            window: config.chunking.window()?,
            source: DocumentSource::new(&config.ingest.source, &config.ingest.doc_prefix),
            collection: config.index.collection.clone(),
            metric: config.index.distance_metric()?,
            batch_size: config.embedding.batch_size,
        })
    }
}

/// Summary of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub pages: usize,
    pub pages_with_text: usize,
    pub chunks: usize,
    /// Longest chunk measured in whitespace-separated words.
    pub max_chunk_words: usize,
}

/// Chunk, embed and store an already-extracted document.
pub async fn ingest_pages(
    pages: &[Option<String>],
    settings: &IngestSettings,
    tokenizer: &dyn Tokenizer,
    embedder: &dyn Embedder,
    index: &VectorIndex,
) -> Result<IngestReport> {
    let chunks = chunk_document(tokenizer, settings.window, &settings.source, pages);
    let report = report_for(pages, &chunks);
    info!(
        pages = report.pages,
        chunks = report.chunks,
        collection = %settings.collection,
        "chunked document"
    );

    let mut batch = AddBatch::default();
    for chunk in chunks {
        batch.ids.push(chunk.id);
        batch.documents.push(chunk.text);
        batch.metadatas.push(chunk.metadata);
    }
    batch.embeddings =
        embedding::embed_in_batches(embedder, &batch.documents, settings.batch_size).await?;

    index
        .add_batch(&settings.collection, batch, settings.metric)
        .await?;

    Ok(report)
}

fn report_for(pages: &[Option<String>], chunks: &[crate::models::Chunk]) -> IngestReport {
    IngestReport {
        pages: pages.len(),
        pages_with_text: pages
            .iter()
            .filter(|p| p.as_deref().is_some_and(|t| !t.trim().is_empty()))
            .count(),
        chunks: chunks.len(),
        max_chunk_words: chunks
            .iter()
            .map(|c| c.text.split_whitespace().count())
            .max()
            .unwrap_or(0),
    }
}

/// Where the document's pages come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSource {
    Pdf(PathBuf),
    /// Pre-extracted text, pages separated by form feeds.
    Text(PathBuf),
}

impl PageSource {
    pub fn path(&self) -> &Path {
        match self {
            PageSource::Pdf(p) | PageSource::Text(p) => p,
        }
    }

    pub fn load(&self) -> Result<Vec<Option<String>>> {
        let pages = match self {
            PageSource::Pdf(p) => extract::extract_pages_from_path(p),
            PageSource::Text(p) => extract::extract_pages_from_text_file(p),
        };
        pages.with_context(|| format!("Failed to extract {}", self.path().display()))
    }
}

/// `ng12 ingest`: extract the document and populate the collection.
///
/// `input` defaults to the PDF at `[ingest].pdf_path`.
pub async fn run_ingest(
    config: &Config,
    input: Option<PageSource>,
    rebuild: bool,
    dry_run: bool,
) -> Result<()> {
    let input = input.unwrap_or_else(|| PageSource::Pdf(config.ingest.pdf_path.clone()));
    let path = input.path();
    let settings = IngestSettings::from_config(config)?;
    let tokenizer = WhitespaceTokenizer;

    let pages = input.load()?;

    if dry_run {
        let chunks = chunk_document(&tokenizer, settings.window, &settings.source, &pages);
        let report = report_for(&pages, &chunks);
        println!("ingest {} (dry-run)", path.display());
        println!("  pages: {}", report.pages);
        println!("  pages with text: {}", report.pages_with_text);
        println!("  total chunks: {}", report.chunks);
        println!("  max chunk length (words): {}", report.max_chunk_words);
        return Ok(());
    }

    if !config.embedding.is_enabled() {
        bail!("Ingestion needs an embedding provider. Set [embedding] provider in config.");
    }
    let embedder: Arc<dyn Embedder> = embedding::create_embedder(&config.embedding)?;

    let store = SqliteStore::open(&config.db.path).await?;
    let store = Arc::new(store);
    let index = VectorIndex::new(store.clone());

    if rebuild {
        if index.store().delete_collection(&settings.collection).await? {
            warn!(collection = %settings.collection, "dropped existing collection");
        }
    }

    let report = ingest_pages(&pages, &settings, &tokenizer, embedder.as_ref(), &index).await?;
    let stored = index.count(&settings.collection).await?;

    println!("ingest {}", path.display());
    println!("  pages: {}", report.pages);
    println!("  pages with text: {}", report.pages_with_text);
    println!("  total chunks: {}", report.chunks);
    println!("  max chunk length (words): {}", report.max_chunk_words);
    println!("  collection: {} ({} entries)", settings.collection, stored);
    println!("  model: {}", embedder.model_name());
    println!("ok");

    store.close().await;
    Ok(())
}
