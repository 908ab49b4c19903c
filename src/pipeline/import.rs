//! Import: copy a picked document into the private working area.
//!
//! The copy gets a fresh unique name that keeps the original extension, so
//! renderers that sniff by extension still recognise the format, and two
//! picks of files with the same name never collide. Size is measured on the
//! copy: scoped access to the original may already be revoked by the time a
//! caller asks.

use crate::error::ImportError;
use crate::state::SourceDocument;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Scoped read access to files outside the process's normal sandbox.
///
/// `start` returns `false` when no grant is available or needed; the import
/// then falls back to a plain copy.
pub trait ScopedAccess: Send + Sync {
    fn start(&self, path: &Path) -> bool;
    fn stop(&self, path: &Path);
}

/// Releases a scoped-access grant when dropped.
struct AccessGuard<'a> {
    access: &'a dyn ScopedAccess,
    path: &'a Path,
}

impl Drop for AccessGuard<'_> {
    fn drop(&mut self) {
        self.access.stop(self.path);
    }
}

/// Turn a path or `file://` URI into a local path.
pub fn resolve_source(input: &Path) -> Result<PathBuf, ImportError> {
    let Some(s) = input.to_str() else {
        return Ok(input.to_path_buf());
    };
    if s.starts_with("file:") {
        let url = url::Url::parse(s).map_err(|_| ImportError::InvalidUri {
            input: s.to_string(),
        })?;
        return url.to_file_path().map_err(|_| ImportError::InvalidUri {
            input: s.to_string(),
        });
    }
    if s.contains("://") {
        return Err(ImportError::InvalidUri {
            input: s.to_string(),
        });
    }
    Ok(input.to_path_buf())
}

/// Copy `source` into `imports_dir` and describe the copy.
pub async fn import_document(
    source: &Path,
    imports_dir: &Path,
    access: Option<&dyn ScopedAccess>,
) -> Result<SourceDocument, ImportError> {
    tokio::fs::create_dir_all(imports_dir)
        .await
        .map_err(|e| ImportError::Workspace {
            path: imports_dir.to_path_buf(),
            source: e,
        })?;

    let _guard = match access {
        Some(access) if access.start(source) => Some(AccessGuard {
            access,
            path: source,
        }),
        Some(_) => {
            debug!("No scoped access for {}; trying plain copy", source.display());
            None
        }
        None => None,
    };

    let meta = tokio::fs::metadata(source)
        .await
        .map_err(|e| classify(source, e))?;
    if !meta.is_file() {
        return Err(ImportError::NotAFile {
            path: source.to_path_buf(),
        });
    }

    let suffix = source
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let reserved = tempfile::Builder::new()
        .prefix("doc-")
        .suffix(&suffix)
        .rand_bytes(12)
        .tempfile_in(imports_dir)
        .map_err(|e| ImportError::Workspace {
            path: imports_dir.to_path_buf(),
            source: e,
        })?
        .into_temp_path();

    // `reserved` deletes itself if the copy fails, so no partial file remains.
    tokio::fs::copy(source, &*reserved)
        .await
        .map_err(|e| classify(source, e))?;
    let working_path = reserved.keep().map_err(|e| ImportError::CopyFailed {
        path: source.to_path_buf(),
        source: e.error,
    })?;

    let size_bytes = tokio::fs::metadata(&working_path).await.ok().map(|m| m.len());
    let display_name = source
        .file_name()
        .or_else(|| working_path.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    info!(
        "Imported '{}' → {} ({} bytes)",
        display_name,
        working_path.display(),
        size_bytes.unwrap_or(0)
    );

    Ok(SourceDocument {
        working_path,
        display_name,
        size_bytes,
        original_path: source.to_path_buf(),
    })
}

fn classify(path: &Path, e: io::Error) -> ImportError {
    match e.kind() {
        io::ErrorKind::NotFound => ImportError::NotFound {
            path: path.to_path_buf(),
        },
        io::ErrorKind::PermissionDenied => ImportError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ImportError::CopyFailed {
            path: path.to_path_buf(),
            source: e,
        },
    }
}
