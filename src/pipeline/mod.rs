//! Pipeline stages for document-to-PDF conversion.
//!
//! Each submodule implements exactly one step. The orchestrator in
//! [`crate::converter`] owns the state machine; the stages here are plain
//! async functions that know nothing about published state.
//!
//! ## Data Flow
//!
//! ```text
//! import ──▶ render ──────────────────────────────────────────▶ persist
//! (copy)     (load → await → settle → viewport → snapshot)      (atomic write)
//! ```
//!
//! 1. [`import`]: copy the picked file into the private working area
//! 2. [`render`]: drive one single-use renderer session to PDF bytes; the
//!    only stage with suspension points, all of them cancellable
//! 3. [`persist`]: write the bytes so the final path never shows a partial
//!    file; runs in `spawn_blocking`

pub mod import;
pub mod persist;
pub mod render;
