//! Error types for the doc2pdf library.
//!
//! Three error types map to the three places a conversion can go wrong:
//!
//! * [`ImportError`]: the source document could not be copied into the
//!   private working area (missing file, permission denied, bad URI). The
//!   previously selected document, if any, stays selected.
//!
//! * [`ConversionError`]: a single `convert` attempt failed. Every variant
//!   is terminal for that attempt; nothing is retried automatically.
//!
//! * [`RenderError`]: what a [`crate::renderer::DocumentRenderer`]
//!   reports. The orchestrator wraps it into
//!   [`ConversionError::RenderFailed`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Failure while importing a source document.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Source file does not exist.
    #[error("Couldn't import file: '{path}' does not exist")]
    NotFound { path: PathBuf },

    /// Process is not allowed to read the source.
    #[error("Couldn't import file: permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// Source exists but is a directory or other non-regular file.
    #[error("Couldn't import file: '{path}' is not a regular file")]
    NotAFile { path: PathBuf },

    /// The input looked like a URI but is not a local `file://` URI.
    #[error("Couldn't import file: '{input}' is not a local file path or file:// URI")]
    InvalidUri { input: String },

    /// Copying into the working area failed.
    #[error("Couldn't import file ({source})")]
    CopyFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The private working area could not be prepared.
    #[error("Couldn't prepare working directory '{path}': {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A conversion is in flight; the selection cannot change under it.
    #[error("Couldn't import file: a conversion is in progress")]
    Busy,
}

/// Failure of a single conversion attempt.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// `convert` was called before any successful import.
    #[error("Please choose a file first.")]
    NoFileSelected,

    /// Another import or conversion is already in flight.
    #[error("A conversion is already in progress")]
    Busy,

    /// The renderer never signalled that loading finished.
    #[error("Document did not finish loading within {millis}ms")]
    LoadTimeout { millis: u64 },

    /// The renderer reported an error while loading or snapshotting.
    #[error("Rendering failed: {0}")]
    RenderFailed(#[source] RenderError),

    /// Writing the PDF to its final location failed.
    #[error("Failed to write PDF '{path}': {source}")]
    PersistError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The attempt was cancelled before it completed.
    #[error("Conversion cancelled")]
    Cancelled,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error (blocking task panicked, etc.).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConversionError {
    /// Stable classification used in the published state and JSON output.
    pub fn kind(&self) -> FailureKind {
        match self {
            ConversionError::NoFileSelected => FailureKind::NoFileSelected,
            ConversionError::Busy => FailureKind::Busy,
            ConversionError::LoadTimeout { .. } => FailureKind::LoadTimeout,
            ConversionError::RenderFailed(_) => FailureKind::RenderFailed,
            ConversionError::PersistError { .. } => FailureKind::PersistError,
            ConversionError::Cancelled => FailureKind::Cancelled,
            ConversionError::InvalidConfig(_) | ConversionError::Internal(_) => {
                FailureKind::Internal
            }
        }
    }
}

impl From<RenderError> for ConversionError {
    fn from(e: RenderError) -> Self {
        ConversionError::RenderFailed(e)
    }
}

/// Machine-readable failure category, mirrored from [`ConversionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NoFileSelected,
    Busy,
    LoadTimeout,
    RenderFailed,
    PersistError,
    Cancelled,
    Internal,
}

/// Errors reported by a renderer backend.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum RenderError {
    /// A session could not be created.
    #[error("could not start renderer '{renderer}': {detail}")]
    Unavailable { renderer: String, detail: String },

    /// The session options ask for something this backend cannot honour.
    #[error("unsupported renderer option: {0}")]
    Unsupported(String),

    /// The document lies outside the read-access root granted to the session.
    #[error("'{path}' is outside the read-access root '{root}'")]
    AccessDenied { path: PathBuf, root: PathBuf },

    /// Loading the document failed.
    #[error("load failed: {0}")]
    LoadFailed(String),

    /// The renderer dropped its load notification without firing it.
    #[error("renderer abandoned the load without signalling completion")]
    LoadAbandoned,

    /// Snapshotting the current view to PDF failed.
    #[error("snapshot failed: {0}")]
    SnapshotFailed(String),

    /// Snapshot produced no bytes.
    #[error("renderer returned an empty PDF")]
    EmptyOutput,

    /// Snapshot did not complete in time.
    #[error("snapshot did not complete within {millis}ms")]
    SnapshotTimeout { millis: u64 },
}
