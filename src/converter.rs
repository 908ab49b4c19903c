//! The conversion orchestrator.
//!
//! [`Converter`] owns the selected document, drives one renderer session per
//! conversion attempt, and publishes a [`ConverterState`] snapshot after every
//! transition.
//!
//! ```text
//!            import_file                    convert
//!   Idle ───────────────▶ Importing ──▶ Idle ───────▶ Converting ──▶ Idle
//!                                            (success | failure | cancelled)
//! ```
//!
//! All state lives in one `watch` channel and every transition is a single
//! read-modify-write on it. That makes the re-entrancy guard race-free: two
//! concurrent `convert` calls cannot both observe `Idle`.

use crate::cancel::CancelToken;
use crate::config::ConverterConfig;
use crate::error::{ConversionError, ImportError};
use crate::pipeline::{import, persist, render};
use crate::progress::ConversionStage;
use crate::renderer::RendererFactory;
use crate::state::{ConversionOutcome, ConversionPhase, ConverterState, SourceDocument};
use crate::workspace::{PurgeReport, Workspace};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

/// Imports documents and converts them to PDF. Cheap to clone; clones share
/// the same state.
#[derive(Clone)]
pub struct Converter {
    inner: Arc<Inner>,
}

struct Inner {
    config: ConverterConfig,
    workspace: Workspace,
    factory: Arc<dyn RendererFactory>,
    state: watch::Sender<ConverterState>,
    active: Mutex<Option<(u64, CancelToken)>>,
    /// Held by an import or conversion from claim to publish, and by a purge,
    /// so a purge never sees working files that are not yet published.
    files: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("renderer", &self.inner.factory.name())
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}

impl Converter {
    /// Create an orchestrator. Working directories are created lazily.
    pub fn new(config: ConverterConfig, factory: Arc<dyn RendererFactory>) -> Self {
        let workspace = Workspace::new(config.imports_dir(), config.outputs_dir());
        let (state, _rx) = watch::channel(ConverterState::default());
        Self {
            inner: Arc::new(Inner {
                config,
                workspace,
                factory,
                state,
                active: Mutex::new(None),
                files: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Create an orchestrator and, if configured, purge stale working files.
    ///
    /// A failed purge is logged and otherwise ignored.
    pub async fn open(config: ConverterConfig, factory: Arc<dyn RendererFactory>) -> Self {
        let converter = Self::new(config, factory);
        if converter.inner.config.purge_on_start {
            if let Err(e) = converter.purge_workspace().await {
                warn!("Working-area purge failed: {}", e);
            }
        }
        converter
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.inner.config
    }

    pub fn workspace(&self) -> &Workspace {
        &self.inner.workspace
    }

    /// Current published state.
    pub fn state(&self) -> ConverterState {
        self.inner.state.borrow().clone()
    }

    /// Stream of state snapshots, starting with the current one.
    pub fn subscribe(&self) -> WatchStream<ConverterState> {
        WatchStream::new(self.inner.state.subscribe())
    }

    // ── Import ───────────────────────────────────────────────────────────

    /// Copy `source` (a path or `file://` URI) into the working area and make
    /// it the selected document.
    ///
    /// On failure the previous selection and conversion outcome are left as
    /// they were; the message is published as the import error.
    pub async fn import_file(&self, source: impl AsRef<Path>) -> Result<SourceDocument, ImportError> {
        let claimed = self.inner.state.send_if_modified(|s| {
            if s.phase == ConversionPhase::Idle {
                s.phase = ConversionPhase::Importing;
                true
            } else {
                false
            }
        });
        if !claimed {
            return Err(ImportError::Busy);
        }
        let mut guard = ImportGuard {
            inner: &self.inner,
            armed: true,
            _files: None,
        };
        guard._files = Some(self.inner.files.lock().await);

        let result = match import::resolve_source(source.as_ref()) {
            Ok(path) => {
                import::import_document(
                    &path,
                    self.inner.workspace.imports(),
                    self.inner.config.scoped_access.as_deref(),
                )
                .await
            }
            Err(e) => Err(e),
        };

        guard.armed = false;
        match result {
            Ok(document) => {
                let published = document.clone();
                self.inner.state.send_modify(|s| {
                    s.phase = ConversionPhase::Idle;
                    s.document = Some(published);
                    s.outcome = None;
                    s.import_error = None;
                });
                if let Some(ref cb) = self.inner.config.progress_callback {
                    cb.on_import_complete(&document);
                }
                Ok(document)
            }
            Err(e) => {
                warn!("Import failed: {}", e);
                let message = e.to_string();
                self.inner.state.send_modify(|s| {
                    s.phase = ConversionPhase::Idle;
                    s.import_error = Some(message);
                });
                Err(e)
            }
        }
    }

    /// Forget the selected document and any outcome. Ignored (returns
    /// `false`) while an import or conversion is in flight.
    pub fn clear_selection(&self) -> bool {
        let mut cleared = false;
        self.inner.state.send_if_modified(|s| {
            if s.phase != ConversionPhase::Idle {
                return false;
            }
            cleared = true;
            let changed = s.document.is_some() || s.outcome.is_some() || s.import_error.is_some();
            s.document = None;
            s.outcome = None;
            s.import_error = None;
            changed
        });
        cleared
    }

    // ── Convert ──────────────────────────────────────────────────────────

    /// Convert the selected document to PDF.
    ///
    /// # Errors
    /// - [`ConversionError::NoFileSelected`] without a prior import; the
    ///   renderer is never touched.
    /// - [`ConversionError::Busy`] while another import or conversion is in
    ///   flight; the published state is not modified.
    /// - Any failure of the attempt itself, which is also published.
    pub async fn convert(&self) -> Result<PathBuf, ConversionError> {
        let mut claim: Result<(SourceDocument, u64), ConversionError> = Err(ConversionError::Busy);
        self.inner.state.send_if_modified(|s| {
            if s.phase != ConversionPhase::Idle {
                return false;
            }
            match s.document.clone() {
                Some(document) => {
                    s.phase = ConversionPhase::Converting;
                    s.outcome = None;
                    s.import_error = None;
                    s.attempt += 1;
                    claim = Ok((document, s.attempt));
                }
                None => {
                    let e = ConversionError::NoFileSelected;
                    s.import_error = None;
                    s.outcome = Some(ConversionOutcome::Failed {
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                    claim = Err(e);
                }
            }
            true
        });
        let (document, attempt) = match claim {
            Ok(c) => c,
            Err(e) => {
                debug!("convert rejected: {}", e);
                return Err(e);
            }
        };

        let token = CancelToken::new();
        *lock(&self.inner.active) = Some((attempt, token.clone()));
        let mut guard = AttemptGuard {
            inner: &self.inner,
            attempt,
            armed: true,
            _files: None,
        };
        guard._files = Some(self.inner.files.lock().await);

        info!(attempt, "Starting conversion of '{}'", document.display_name);
        if let Some(ref cb) = self.inner.config.progress_callback {
            cb.on_conversion_start(&document);
        }

        let start = Instant::now();
        let result = self.run_attempt(&document, attempt, &token).await;

        guard.armed = false;
        self.inner.finish(attempt, &result);
        match &result {
            Ok(path) => info!(
                attempt,
                "Conversion complete: {} in {}ms",
                path.display(),
                start.elapsed().as_millis()
            ),
            Err(e) => warn!(attempt, "Conversion failed: {}", e),
        }
        result
    }

    /// Cancel the in-flight conversion. Returns `true` if there was one.
    pub fn cancel(&self) -> bool {
        match lock(&self.inner.active).as_ref() {
            Some((attempt, token)) => {
                info!(attempt = *attempt, "Cancelling conversion");
                token.cancel();
                true
            }
            None => false,
        }
    }

    async fn run_attempt(
        &self,
        document: &SourceDocument,
        attempt: u64,
        cancel: &CancelToken,
    ) -> Result<PathBuf, ConversionError> {
        let bytes = render::render_document(
            self.inner.factory.as_ref(),
            document,
            &self.inner.config,
            attempt,
            cancel,
        )
        .await?;

        if let Some(ref cb) = self.inner.config.progress_callback {
            cb.on_stage(ConversionStage::Persisting);
        }
        persist::write_pdf_atomic(self.inner.workspace.outputs(), &document.stem(), bytes).await
    }

    // ── Retention ────────────────────────────────────────────────────────

    /// Apply the retention policy, keeping the selected document and the last
    /// generated PDF.
    ///
    /// Waits for an in-flight import or conversion to publish first.
    pub async fn purge_workspace(&self) -> std::io::Result<PurgeReport> {
        let _files = self.inner.files.lock().await;
        let keep: Vec<PathBuf> = {
            let s = self.inner.state.borrow();
            s.document
                .iter()
                .map(|d| d.working_path.clone())
                .chain(s.generated_pdf().map(Path::to_path_buf))
                .collect()
        };
        self.inner
            .workspace
            .purge(&self.inner.config.retention, keep)
            .await
    }
}

impl Inner {
    /// Publish the outcome of `attempt` and return to Idle. Ignored if a newer
    /// attempt has since taken over.
    fn finish(&self, attempt: u64, result: &Result<PathBuf, ConversionError>) {
        {
            let mut active = lock(&self.active);
            if matches!(active.as_ref(), Some((a, _)) if *a == attempt) {
                *active = None;
            }
        }

        let outcome = match result {
            Ok(path) => ConversionOutcome::Succeeded {
                output_path: path.clone(),
            },
            Err(e) => ConversionOutcome::Failed {
                kind: e.kind(),
                message: e.to_string(),
            },
        };
        let applied = self.state.send_if_modified(|s| {
            if s.attempt != attempt || s.phase != ConversionPhase::Converting {
                return false;
            }
            s.phase = ConversionPhase::Idle;
            s.outcome = Some(outcome);
            true
        });
        if !applied {
            debug!(attempt, "stale conversion outcome ignored");
            return;
        }

        if let Some(ref cb) = self.config.progress_callback {
            match result {
                Ok(path) => cb.on_conversion_complete(path),
                Err(e) => cb.on_conversion_error(&e.to_string()),
            }
        }
    }
}

/// Returns the phase to Idle if an import future is dropped mid-flight.
struct ImportGuard<'a> {
    inner: &'a Inner,
    armed: bool,
    // Released after `drop` has published, so a purge sees the final state.
    _files: Option<tokio::sync::MutexGuard<'a, ()>>,
}

impl Drop for ImportGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.inner.state.send_if_modified(|s| {
                if s.phase == ConversionPhase::Importing {
                    s.phase = ConversionPhase::Idle;
                    true
                } else {
                    false
                }
            });
        }
    }
}

/// Records a dropped `convert` future as a cancelled attempt.
struct AttemptGuard<'a> {
    inner: &'a Inner,
    attempt: u64,
    armed: bool,
    _files: Option<tokio::sync::MutexGuard<'a, ()>>,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!(attempt = self.attempt, "conversion future dropped");
            self.inner
                .finish(self.attempt, &Err(ConversionError::Cancelled));
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
