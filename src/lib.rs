//! # doc2pdf
//!
//! Convert word-processing documents (Word `.doc`/`.docx`, Apple Pages and
//! anything else a renderer backend can open) to PDF.
//!
//! ## Why this crate?
//!
//! Rendering a document is the renderer's job; getting a document *into* a
//! renderer and a PDF *out of* it reliably is not. A renderer signals "loaded"
//! asynchronously, sometimes twice, sometimes never. Its layout may not be
//! ready at that moment, and a headless one may report empty content bounds.
//! [`Converter`] wraps all of that in a small state machine with one
//! published [`ConverterState`], so callers only ever see "converting",
//! "here is your PDF" or "here is why not".
//!
//! ## Pipeline Overview
//!
//! ```text
//! document (path or file:// URI)
//!  │
//!  ├─ 1. Import    copy into the private working area under a unique name
//!  ├─ 2. Load      fresh renderer session, read access limited to the copy
//!  ├─ 3. Await     load-finished signal, bounded by load_timeout
//!  ├─ 4. Settle    short delay so layout can finish
//!  ├─ 5. Viewport  force a page-shaped viewport if bounds are degenerate
//!  ├─ 6. Snapshot  whole content as PDF bytes, bounded by snapshot_timeout
//!  └─ 7. Persist   atomic write to outputs/<name>.pdf
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc2pdf::{Converter, ConverterConfig, OfficeRendererFactory};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConverterConfig::default();
//!     let converter = Converter::open(config, Arc::new(OfficeRendererFactory::from_env())).await;
//!
//!     let doc = converter.import_file("Quarterly Report.docx").await?;
//!     eprintln!("selected {} ({})", doc.display_name, doc.human_size().unwrap_or_default());
//!
//!     let pdf = converter.convert().await?;
//!     println!("{}", pdf.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! doc2pdf = { version = "0.1", default-features = false }
//! ```
//!
//! ## Renderer Backends
//!
//! | Backend | Needs | Notes |
//! |---------|-------|-------|
//! | [`OfficeRendererFactory`] | LibreOffice `soffice` on `PATH` or `DOC2PDF_SOFFICE` | Headless, one private profile per session |
//! | your own [`RendererFactory`] | n/a | Implement [`DocumentRenderer`] for an embedded engine |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod cancel;
pub mod config;
pub mod converter;
pub mod error;
pub mod inspect;
pub mod pipeline;
pub mod progress;
pub mod renderer;
pub mod share;
pub mod state;
pub mod workspace;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use cancel::CancelToken;
pub use config::{ConverterConfig, ConverterConfigBuilder};
pub use converter::Converter;
pub use error::{ConversionError, FailureKind, ImportError, RenderError};
pub use inspect::{inspect_pdf, summarize_pdf, InspectError, PdfSummary};
pub use pipeline::import::ScopedAccess;
pub use progress::{ConversionProgressCallback, ConversionStage, NoopProgressCallback, ProgressCallback};
pub use renderer::{
    DocumentRenderer, LoadRequest, LoadSignal, OfficeRendererFactory, Rect, RendererFactory,
    SessionOptions,
};
pub use share::{export_to, ShareError, ShareTarget, SystemShare};
pub use state::{format_file_size, ConversionOutcome, ConversionPhase, ConverterState, SourceDocument};
pub use workspace::{PurgeReport, RetentionPolicy, Workspace};
