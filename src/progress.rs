//! Progress-callback trait for import and conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConverterConfigBuilder::progress_callback`] to receive
//! events as the orchestrator moves through a conversion. The published
//! [`crate::state::ConverterState`] tells a UI *where* the orchestrator is;
//! callbacks add the finer-grained stage within a conversion (loading,
//! settling, snapshotting, persisting).
//!
//! # Example
//!
//! ```rust
//! use doc2pdf::{ConversionProgressCallback, ConversionStage, ConverterConfig};
//! use std::sync::{Arc, Mutex};
//!
//! struct StageLog(Mutex<Vec<ConversionStage>>);
//!
//! impl ConversionProgressCallback for StageLog {
//!     fn on_stage(&self, stage: ConversionStage) {
//!         self.0.lock().unwrap().push(stage);
//!     }
//! }
//!
//! let config = ConverterConfig::builder()
//!     .progress_callback(Arc::new(StageLog(Mutex::new(Vec::new()))))
//!     .build()
//!     .unwrap();
//! ```

use crate::state::SourceDocument;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// The step a conversion is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStage {
    /// Waiting for the renderer's load-finished event.
    Loading,
    /// Waiting out the settle delay.
    Settling,
    /// Waiting for the renderer's PDF snapshot.
    Snapshotting,
    /// Writing the PDF to its final location.
    Persisting,
}

impl fmt::Display for ConversionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConversionStage::Loading => "Loading document…",
            ConversionStage::Settling => "Laying out…",
            ConversionStage::Snapshotting => "Rendering PDF…",
            ConversionStage::Persisting => "Saving…",
        };
        f.write_str(s)
    }
}

/// Called by the orchestrator as it imports and converts.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Callbacks run inline on the converting task; keep
/// them cheap.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called after a document was copied into the working area.
    fn on_import_complete(&self, document: &SourceDocument) {
        let _ = document;
    }

    /// Called once a conversion attempt has claimed the orchestrator.
    fn on_conversion_start(&self, document: &SourceDocument) {
        let _ = document;
    }

    /// Called when the attempt enters a new stage.
    fn on_stage(&self, stage: ConversionStage) {
        let _ = stage;
    }

    /// Called when the PDF has been written.
    fn on_conversion_complete(&self, output_path: &Path) {
        let _ = output_path;
    }

    /// Called when the attempt failed or was cancelled.
    fn on_conversion_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConverterConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
