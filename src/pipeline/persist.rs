//! Persist: write PDF bytes so the final path never shows a partial file.
//!
//! Bytes go to an anonymous temp file in the destination directory, are
//! flushed to disk, then renamed over the final name. A rename within one
//! directory is atomic, so a reader either sees the previous file (or none)
//! or the complete new one. An interrupted write leaves only a dot-prefixed
//! temp file, which [`tempfile`] removes on drop.

use crate::error::ConversionError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name for the PDF generated from a document with base name `stem`.
pub fn output_file_name(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "document.pdf".to_string()
    } else {
        format!("{cleaned}.pdf")
    }
}

/// Atomically write `bytes` to `<dir>/<stem>.pdf` and return that path.
pub async fn write_pdf_atomic(
    dir: &Path,
    stem: &str,
    bytes: Vec<u8>,
) -> Result<PathBuf, ConversionError> {
    let dir = dir.to_path_buf();
    let final_path = dir.join(output_file_name(stem));
    let target = final_path.clone();

    tokio::task::spawn_blocking(move || write_blocking(&dir, &target, &bytes))
        .await
        .map_err(|e| ConversionError::Internal(format!("Persist task panicked: {}", e)))?
        .map_err(|source| ConversionError::PersistError {
            path: final_path.clone(),
            source,
        })?;

    debug!("Wrote {}", final_path.display());
    Ok(final_path)
}

fn write_blocking(dir: &Path, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}
