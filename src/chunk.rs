//! Sliding-window token chunker.
//!
//! Splits each page of a document into overlapping windows of at most
//! `max_tokens` tokens, advancing by `max_tokens - overlap_tokens`. Every
//! window becomes one [`Chunk`] carrying its page number, its token span
//! and two identifiers derived from a single document-wide counter.
//!
//! # Algorithm
//!
//! 1. Skip pages whose text is absent, empty or whitespace-only. Page
//!    numbers stay positional (1-based over all pages), so a skipped page
//!    leaves a gap rather than renumbering later pages.
//! 2. Tokenize the page.
//! 3. Emit windows `[0, M)`, `[S, S+M)`, `[2S, 2S+M)`, … clipped to the
//!    token count `L`, stopping after the first window that reaches `L`.
//!    The last window may be shorter than `M`; nothing is padded.
//! 4. Decode each window back to text.
//!
//! For `L > 0` this yields `ceil(max(L - O, 1) / (M - O))` chunks.
//!
//! # Numbering
//!
//! The counter behind `chunk-{n}` and the `seq` part of
//! `{prefix}_{page:04}_{seq:02}` is never reset between pages. The `seq`
//! name reads as page-scoped but the value is global; downstream uniqueness
//! of `chunk_id` relies on that.
//!
//! # Example
//!
//! ```rust
//! use ng12_rag::chunk::{chunk_document, ChunkWindow, DocumentSource};
//! use ng12_rag::tokenize::WhitespaceTokenizer;
//!
//! let source = DocumentSource::new("NG12 PDF", "ng12");
//! let window = ChunkWindow::new(1000, 100).unwrap();
//! let pages = vec![Some("one two three".to_string())];
//! let chunks = chunk_document(&WhitespaceTokenizer, window, &source, &pages);
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].text, "one two three");
//! assert_eq!(chunks[0].metadata.chunk_id, "ng12_0001_00");
//! ```

use std::ops::Range;

use crate::error::RagError;
use crate::models::{Chunk, ChunkMetadata};
use crate::tokenize::Tokenizer;

/// Window size and overlap, validated so the window always advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkWindow {
    max_tokens: usize,
    overlap_tokens: usize,
}

impl ChunkWindow {
    pub fn new(max_tokens: usize, overlap_tokens: usize) -> Result<Self, RagError> {
        if max_tokens == 0 || overlap_tokens >= max_tokens {
            return Err(RagError::InvalidChunkWindow {
                max_tokens,
                overlap_tokens,
            });
        }
        Ok(Self {
            max_tokens,
            overlap_tokens,
        })
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn overlap_tokens(&self) -> usize {
        self.overlap_tokens
    }

    /// Distance between consecutive window starts. Always >= 1.
    pub fn step(&self) -> usize {
        self.max_tokens - self.overlap_tokens
    }
}

impl Default for ChunkWindow {
    fn default() -> Self {
        Self {
            max_tokens: 1000,
            overlap_tokens: 100,
        }
    }
}

/// Labels stamped on every chunk of one document.
#[derive(Debug, Clone)]
pub struct DocumentSource {
    pub source: String,
    pub doc_prefix: String,
}

impl DocumentSource {
    pub fn new(source: impl Into<String>, doc_prefix: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            doc_prefix: doc_prefix.into(),
        }
    }
}

/// Running chunk counter threaded through [`chunk_page`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkCounter {
    pub next: usize,
}

/// Token ranges of every window over a sequence of `len` tokens.
pub fn window_spans(len: usize, window: ChunkWindow) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;
    while start < len {
        let end = (start + window.max_tokens).min(len);
        spans.push(start..end);
        if end == len {
            break;
        }
        start += window.step();
    }
    spans
}

/// Chunk one page. Returns the page's chunks and the advanced counter.
///
/// `page_number` is the 1-based position of the page in its document.
pub fn chunk_page(
    tokenizer: &dyn Tokenizer,
    window: ChunkWindow,
    source: &DocumentSource,
    page_number: u32,
    text: &str,
    counter: ChunkCounter,
) -> (Vec<Chunk>, ChunkCounter) {
    let tokens = tokenizer.encode(text);
    let mut next = counter.next;

    let chunks = window_spans(tokens.len(), window)
        .into_iter()
        .map(|span| {
            let seq = next;
            next += 1;
            Chunk {
                id: format!("chunk-{}", seq),
                text: tokenizer.decode(&tokens[span.clone()]),
                token_span: span,
                metadata: ChunkMetadata {
                    source: source.source.clone(),
                    page: page_number,
                    chunk_id: format!("{}_{:04}_{:02}", source.doc_prefix, page_number, seq),
                },
            }
        })
        .collect();

    (chunks, ChunkCounter { next })
}

/// Chunk every page of a document, in page order.
///
/// `None` marks a page from which no text could be extracted.
pub fn chunk_document(
    tokenizer: &dyn Tokenizer,
    window: ChunkWindow,
    source: &DocumentSource,
    pages: &[Option<String>],
) -> Vec<Chunk> {
    let mut counter = ChunkCounter::default();
    let mut chunks = Vec::new();

    for (idx, page) in pages.iter().enumerate() {
        let text = match page.as_deref() {
            Some(t) if !t.trim().is_empty() => t,
            _ => continue,
        };
        let (page_chunks, advanced) =
            chunk_page(tokenizer, window, source, idx as u32 + 1, text, counter);
        counter = advanced;
        chunks.extend(page_chunks);
    }

    chunks
}
