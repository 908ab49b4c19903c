//! Published orchestrator state.
//!
//! [`ConverterState`] is the single snapshot a presentation layer reads. It is
//! replaced atomically on every transition, so a reader never sees a torn
//! combination such as "converting with no document".

use crate::error::FailureKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A document imported into the private working area.
///
/// Immutable: re-importing produces a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// The private copy the renderer loads.
    pub working_path: PathBuf,
    /// Name shown to the user (the picked file's name).
    pub display_name: String,
    /// Size of the private copy, when it could be read.
    pub size_bytes: Option<u64>,
    /// Path the caller originally supplied.
    pub original_path: PathBuf,
}

impl SourceDocument {
    /// Human-readable size of the imported copy, e.g. `"10 KB"`.
    pub fn human_size(&self) -> Option<String> {
        self.size_bytes.map(format_file_size)
    }

    /// Base name used for the generated PDF.
    pub fn stem(&self) -> String {
        let stem = Path::new(&self.display_name)
            .file_stem()
            .map(|s| s.to_string_lossy().trim().to_string())
            .unwrap_or_default();
        if stem.is_empty() {
            "document".to_string()
        } else {
            stem
        }
    }
}

/// Whether an asynchronous operation is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionPhase {
    #[default]
    Idle,
    Importing,
    Converting,
}

/// Result of the most recent conversion attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionOutcome {
    Succeeded { output_path: PathBuf },
    Failed { kind: FailureKind, message: String },
}

/// Snapshot of everything the presentation layer displays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterState {
    pub phase: ConversionPhase,
    pub document: Option<SourceDocument>,
    pub outcome: Option<ConversionOutcome>,
    /// Message from the last failed import, cleared by the next successful
    /// import or conversion start.
    pub import_error: Option<String>,
    /// Number of conversion attempts started so far.
    pub attempt: u64,
}

impl ConverterState {
    pub fn selected_file_name(&self) -> Option<&str> {
        self.document.as_ref().map(|d| d.display_name.as_str())
    }

    pub fn selected_file_size(&self) -> Option<String> {
        self.document.as_ref().and_then(SourceDocument::human_size)
    }

    pub fn is_converting(&self) -> bool {
        self.phase == ConversionPhase::Converting
    }

    /// Path of the last generated PDF.
    pub fn generated_pdf(&self) -> Option<&Path> {
        match &self.outcome {
            Some(ConversionOutcome::Succeeded { output_path }) => Some(output_path.as_path()),
            _ => None,
        }
    }

    /// Message to display. A pending import error is newer than any outcome,
    /// so it wins; otherwise the failed conversion's message.
    pub fn error_message(&self) -> Option<&str> {
        if let Some(ref e) = self.import_error {
            return Some(e.as_str());
        }
        match &self.outcome {
            Some(ConversionOutcome::Failed { message, .. }) => Some(message.as_str()),
            _ => None,
        }
    }
}

/// Format a byte count the way file browsers do (decimal units).
pub fn format_file_size(bytes: u64) -> String {
    const KB: f64 = 1_000.0;
    const MB: f64 = KB * 1_000.0;
    const GB: f64 = MB * 1_000.0;

    let b = bytes as f64;
    match bytes {
        0 => "Zero KB".to_string(),
        1 => "1 byte".to_string(),
        n if n < 1_000 => format!("{n} bytes"),
        n if (n as f64) < MB => format!("{:.0} KB", b / KB),
        n if (n as f64) < GB => format!("{:.1} MB", b / MB),
        _ => format!("{:.2} GB", b / GB),
    }
}
