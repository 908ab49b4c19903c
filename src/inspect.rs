//! Inspect a generated PDF without rendering it.
//!
//! Used by the CLI's `--json` summary and by tests to check that a snapshot
//! produced a document a PDF reader will open.

use lopdf::Document;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InspectError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a readable PDF: {0}")]
    Parse(String),
}

/// Structural facts about a PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PdfSummary {
    /// Header version, e.g. `"1.7"`.
    pub version: String,
    pub pages: usize,
    pub encrypted: bool,
    pub bytes: u64,
}

/// Parse `bytes` as a PDF and summarise it.
pub fn summarize_pdf(bytes: &[u8]) -> Result<PdfSummary, InspectError> {
    let doc = Document::load_mem(bytes).map_err(|e| InspectError::Parse(e.to_string()))?;
    Ok(PdfSummary {
        version: doc.version.clone(),
        pages: doc.get_pages().len(),
        encrypted: doc.is_encrypted(),
        bytes: bytes.len() as u64,
    })
}

/// Read and summarise the PDF at `path`. Parsing runs on the blocking pool.
pub async fn inspect_pdf(path: &Path) -> Result<PdfSummary, InspectError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| InspectError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tokio::task::spawn_blocking(move || summarize_pdf(&bytes))
        .await
        .map_err(|e| InspectError::Parse(format!("Inspect task panicked: {}", e)))?
}
