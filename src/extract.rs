//! Page-level text extraction from PDF guideline documents.
//!
//! Extraction returns one entry per page, in page order. A page with no
//! extractable text is `None` so the chunker can skip it while keeping the
//! positional page numbers of the pages after it.
//!
//! Pre-extracted text (for example `pdftotext` output) is accepted too:
//! pages are separated by form feeds (`\x0c`).

use std::path::Path;

/// Extraction error. Never panics; ingestion aborts with this error.
#[derive(Debug)]
pub enum ExtractError {
    Io(String),
    Pdf(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Io(e) => write!(f, "could not read document: {}", e),
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extract the text of every page of an in-memory PDF.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<Option<String>>, ExtractError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    Ok(pages.into_iter().map(non_blank).collect())
}

/// Read a PDF from disk and extract the text of every page.
pub fn extract_pages_from_path(path: &Path) -> Result<Vec<Option<String>>, ExtractError> {
    let bytes = std::fs::read(path)
        .map_err(|e| ExtractError::Io(format!("{}: {}", path.display(), e)))?;
    extract_pages(&bytes)
}

/// Split pre-extracted text into pages on form feeds.
pub fn pages_from_text(text: &str) -> Vec<Option<String>> {
    text.split('\x0c').map(|p| non_blank(p.to_string())).collect()
}

/// Read a form-feed separated text file.
pub fn extract_pages_from_text_file(path: &Path) -> Result<Vec<Option<String>>, ExtractError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ExtractError::Io(format!("{}: {}", path.display(), e)))?;
    Ok(pages_from_text(&text))
}

fn non_blank(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
