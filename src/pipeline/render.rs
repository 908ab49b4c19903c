//! Render: drive one renderer session from load to PDF bytes.
//!
//! ## Suspension points
//!
//! A session suspends in three places, and each one races against the
//! attempt's [`CancelToken`]:
//!
//! 1. the load-finished wait, bounded by `load_timeout`
//! 2. the settle delay
//! 3. the snapshot, bounded by `snapshot_timeout`
//!
//! ## Why force a viewport?
//!
//! A renderer with no on-screen view (or a view that was never laid out)
//! reports empty or very short content bounds. Snapshotting such a rectangle
//! yields an empty PDF or an outright failure, so degenerate bounds are
//! replaced by a fixed page-shaped viewport first.

use crate::cancel::CancelToken;
use crate::config::ConverterConfig;
use crate::error::{ConversionError, RenderError};
use crate::progress::ConversionStage;
use crate::renderer::{load_channel, DocumentRenderer, LoadRequest, Rect, RendererFactory};
use crate::state::SourceDocument;
use std::future::Future;
use std::time::Instant;
use tracing::{debug, info};

/// A single-use renderer instance. Dropping it tears the backend down.
struct RendererSession {
    id: u64,
    renderer: Box<dyn DocumentRenderer>,
}

impl Drop for RendererSession {
    fn drop(&mut self) {
        debug!(session = self.id, "renderer session torn down");
    }
}

/// Pick the rectangle to snapshot: the content bounds, unless they are empty
/// or shorter than `min_height`, in which case `fallback`.
pub fn choose_viewport(bounds: Rect, min_height: f64, fallback: Rect) -> Rect {
    if bounds.is_empty() || bounds.height < min_height {
        fallback
    } else {
        bounds
    }
}

/// Load `document` into a fresh session and snapshot it to PDF bytes.
///
/// The session never outlives this call, whatever the outcome.
pub async fn render_document(
    factory: &dyn RendererFactory,
    document: &SourceDocument,
    config: &ConverterConfig,
    session_id: u64,
    cancel: &CancelToken,
) -> Result<Vec<u8>, ConversionError> {
    let start = Instant::now();
    let stage = |s: ConversionStage| {
        if let Some(ref cb) = config.progress_callback {
            cb.on_stage(s);
        }
    };

    // ── Step 1: Load ─────────────────────────────────────────────────────
    let mut session = RendererSession {
        id: session_id,
        renderer: factory.create_session(&config.session)?,
    };
    let request = LoadRequest::for_document(&document.working_path);
    let (signal, waiter) = load_channel(session_id);
    stage(ConversionStage::Loading);
    session.renderer.load(&request, signal)?;
    debug!(
        session = session_id,
        "loading {} via '{}'",
        request.path.display(),
        factory.name()
    );

    // ── Step 2: Await readiness ──────────────────────────────────────────
    match until_cancelled(cancel, tokio::time::timeout(config.load_timeout, waiter.wait())).await? {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ConversionError::LoadTimeout {
                millis: config.load_timeout.as_millis() as u64,
            })
        }
    }
    debug!(session = session_id, "load finished after {:?}", start.elapsed());

    // ── Step 3: Settle ───────────────────────────────────────────────────
    stage(ConversionStage::Settling);
    until_cancelled(cancel, tokio::time::sleep(config.settle_delay)).await?;

    // ── Step 4: Viewport ─────────────────────────────────────────────────
    let bounds = session.renderer.content_bounds();
    let rect = choose_viewport(bounds, config.min_viewport_height, config.fallback_viewport);
    if rect != bounds {
        debug!(
            session = session_id,
            "degenerate bounds {}x{}; forcing {}x{}",
            bounds.width,
            bounds.height,
            rect.width,
            rect.height
        );
        session.renderer.set_viewport(rect);
    }

    // ── Step 5: Snapshot ─────────────────────────────────────────────────
    stage(ConversionStage::Snapshotting);
    let snapshot = session.renderer.snapshot_to_pdf(rect);
    let bytes = match until_cancelled(
        cancel,
        tokio::time::timeout(config.snapshot_timeout, snapshot),
    )
    .await?
    {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(RenderError::SnapshotTimeout {
                millis: config.snapshot_timeout.as_millis() as u64,
            }
            .into())
        }
    };
    if bytes.is_empty() {
        return Err(RenderError::EmptyOutput.into());
    }

    info!(
        session = session_id,
        "Rendered {} bytes of PDF in {}ms",
        bytes.len(),
        start.elapsed().as_millis()
    );
    Ok(bytes)
}

/// Run `fut` unless the attempt is cancelled first.
async fn until_cancelled<F: Future>(
    cancel: &CancelToken,
    fut: F,
) -> Result<F::Output, ConversionError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ConversionError::Cancelled),
        out = fut => Ok(out),
    }
}
