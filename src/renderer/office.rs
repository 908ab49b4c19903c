//! Headless office-suite backend.
//!
//! Each session runs one `soffice --headless --convert-to pdf` process in a
//! private scratch directory with its own throwaway user profile, so
//! concurrent sessions never fight over the suite's profile lock. Loading
//! finishes when the process exits; the snapshot reads the PDF it produced.
//!
//! The suite paginates documents itself and has no on-screen view, so its
//! content bounds stay empty until the orchestrator assigns a viewport. The
//! rectangle passed to `snapshot_to_pdf` is recorded in the logs only.
//!
//! Macros are never executed by a headless `--convert-to` run; a session that
//! asks for scripting is rejected rather than silently downgraded.

use super::{DocumentRenderer, LoadRequest, LoadSignal, Rect, RendererFactory, SessionOptions};
use crate::error::RenderError;
use futures::future::{BoxFuture, FutureExt};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Environment variable naming the office executable.
pub const SOFFICE_ENV: &str = "DOC2PDF_SOFFICE";

const DEFAULT_PROGRAM: &str = "soffice";

/// Factory for [`OfficeRenderer`] sessions.
#[derive(Debug, Clone)]
pub struct OfficeRendererFactory {
    program: PathBuf,
}

impl Default for OfficeRendererFactory {
    fn default() -> Self {
        Self::from_env()
    }
}

impl OfficeRendererFactory {
    /// Use a specific office executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Honour `DOC2PDF_SOFFICE`, falling back to `soffice` on `PATH`.
    pub fn from_env() -> Self {
        match std::env::var(SOFFICE_ENV) {
            Ok(p) if !p.is_empty() => Self::new(p),
            _ => Self::new(DEFAULT_PROGRAM),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl RendererFactory for OfficeRendererFactory {
    fn name(&self) -> &str {
        "office"
    }

    fn create_session(
        &self,
        options: &SessionOptions,
    ) -> Result<Box<dyn DocumentRenderer>, RenderError> {
        if options.allow_scripting {
            return Err(RenderError::Unsupported(
                "the office backend never runs document macros".into(),
            ));
        }
        let scratch = tempfile::Builder::new()
            .prefix("doc2pdf-office-")
            .tempdir()
            .map_err(|e| RenderError::Unavailable {
                renderer: self.name().to_string(),
                detail: format!("scratch directory: {e}"),
            })?;
        debug!("office session scratch: {}", scratch.path().display());
        Ok(Box::new(OfficeRenderer {
            program: self.program.clone(),
            scratch,
            viewport: Rect::ZERO,
            produced: None,
            job: None,
        }))
    }
}

/// One headless conversion process.
pub struct OfficeRenderer {
    program: PathBuf,
    scratch: TempDir,
    viewport: Rect,
    produced: Option<oneshot::Receiver<Result<PathBuf, String>>>,
    job: Option<JoinHandle<()>>,
}

impl OfficeRenderer {
    fn command(&self, document: &Path) -> Command {
        let out_dir = self.scratch.path().join("out");
        let profile = self.scratch.path().join("profile");
        let mut cmd = Command::new(&self.program);
        cmd.arg(format!("-env:UserInstallation={}", file_uri(&profile)))
            .args(["--headless", "--norestore", "--nolockcheck", "--nodefault"])
            .args(["--convert-to", "pdf", "--outdir"])
            .arg(&out_dir)
            .arg(document)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl DocumentRenderer for OfficeRenderer {
    fn load(&mut self, request: &LoadRequest, on_finished: LoadSignal) -> Result<(), RenderError> {
        request.check_access()?;
        if self.produced.is_some() {
            return Err(RenderError::LoadFailed(
                "office session already loaded a document".into(),
            ));
        }

        let mut cmd = self.command(&request.path);
        let expected = self
            .scratch
            .path()
            .join("out")
            .join(pdf_name_for(&request.path));
        let child = cmd.spawn().map_err(|e| {
            RenderError::LoadFailed(format!("failed to start '{}': {e}", self.program.display()))
        })?;
        info!(
            session = on_finished.session(),
            "office load started: {}",
            request.path.display()
        );

        let (tx, rx) = oneshot::channel();
        self.produced = Some(rx);

        self.job = Some(tokio::spawn(async move {
            let outcome = match child.wait_with_output().await {
                Ok(out) if out.status.success() && expected.exists() => Ok(expected),
                Ok(out) => Err(format!(
                    "office exited with {}: {}",
                    out.status,
                    String::from_utf8_lossy(&out.stderr).trim()
                )),
                Err(e) => Err(format!("office process failed: {e}")),
            };
            if let Err(ref e) = outcome {
                warn!("office load failed: {e}");
            }
            // The receiver is gone when the session was torn down first.
            let _ = tx.send(outcome);
            on_finished.fire();
        }));

        Ok(())
    }

    fn content_bounds(&self) -> Rect {
        self.viewport
    }

    fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    fn snapshot_to_pdf(&mut self, rect: Rect) -> BoxFuture<'static, Result<Vec<u8>, RenderError>> {
        let produced = self.produced.take();
        debug!(
            "office snapshot over {}x{} (advisory)",
            rect.width, rect.height
        );
        async move {
            let rx = produced.ok_or_else(|| {
                RenderError::SnapshotFailed("snapshot requested before load".into())
            })?;
            let path = rx
                .await
                .map_err(|_| RenderError::SnapshotFailed("office process vanished".into()))?
                .map_err(RenderError::SnapshotFailed)?;
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| RenderError::SnapshotFailed(format!("reading output: {e}")))?;
            if !bytes.starts_with(b"%PDF-") {
                return Err(RenderError::SnapshotFailed(
                    "office output is not a PDF".into(),
                ));
            }
            Ok(bytes)
        }
        .boxed()
    }
}

impl Drop for OfficeRenderer {
    fn drop(&mut self) {
        // Aborting the task drops the child, which kills the process.
        if let Some(job) = self.job.take() {
            if !job.is_finished() {
                debug!("office session torn down with process still running");
            }
            job.abort();
        }
    }
}

/// Name the suite gives its output: the input stem with a `.pdf` extension.
fn pdf_name_for(document: &Path) -> String {
    let stem = document
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    format!("{stem}.pdf")
}

fn file_uri(path: &Path) -> String {
    url::Url::from_directory_path(path)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| format!("file://{}", path.display()))
}
