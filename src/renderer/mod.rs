//! Renderer contract: the opaque engine that turns a document into PDF bytes.
//!
//! The orchestrator never interprets document formats. It only needs four
//! things from a backend, captured by [`DocumentRenderer`]:
//!
//! 1. `load` a local file, granted read access to one directory only
//! 2. fire the [`LoadSignal`] exactly once when loading has finished
//! 3. report its current `content_bounds` and accept a forced viewport
//! 4. `snapshot_to_pdf` the current view over a rectangle (async)
//!
//! A [`RendererFactory`] produces one fresh session per conversion attempt.
//! Sessions are never reused: a backend's internal document state is not
//! guaranteed to be resettable.
//!
//! ```text
//! factory ──create_session──▶ session ──load──▶ … fire(LoadSignal)
//!                                    ──content_bounds / set_viewport
//!                                    ──snapshot_to_pdf(rect)──▶ PDF bytes
//! ```

pub mod office;

use crate::error::RenderError;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing::debug;

pub use office::OfficeRendererFactory;

/// A rectangle in renderer logical units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rectangle anchored at the origin.
    pub const fn sized(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// True when the rectangle covers no area.
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Options applied when a session is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Allow scripts / macros / active content in the loaded document.
    /// Documents are untrusted input; this stays `false` unless a caller
    /// explicitly opts in.
    pub allow_scripting: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            allow_scripting: false,
        }
    }
}

/// What to load and how much of the filesystem the session may read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    /// The document to load.
    pub path: PathBuf,
    /// The only directory the renderer may read from.
    pub read_access_root: PathBuf,
}

impl LoadRequest {
    /// Build a request granting read access to the document's directory only.
    pub fn for_document(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let read_access_root = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            path,
            read_access_root,
        }
    }

    /// Check that `path` lies under `read_access_root`.
    ///
    /// Backends call this before touching the file.
    pub fn check_access(&self) -> Result<(), RenderError> {
        if self.path.starts_with(&self.read_access_root) {
            Ok(())
        } else {
            Err(RenderError::AccessDenied {
                path: self.path.clone(),
                root: self.read_access_root.clone(),
            })
        }
    }
}

/// One bound instance of a rendering engine, used for exactly one
/// load + snapshot cycle.
///
/// Dropping the session tears it down: backends release processes, views
/// and scratch files in their `Drop` impls.
pub trait DocumentRenderer: Send {
    /// Start loading `request.path`. Returns once loading has *started*;
    /// completion is reported by firing `on_finished`.
    fn load(&mut self, request: &LoadRequest, on_finished: LoadSignal) -> Result<(), RenderError>;

    /// Current extent of the rendered content.
    fn content_bounds(&self) -> Rect;

    /// Force the view to a concrete size before snapshotting.
    fn set_viewport(&mut self, viewport: Rect);

    /// Render the current view's `rect` to PDF bytes.
    ///
    /// The returned future owns everything it needs; the orchestrator may drop
    /// it unpolled when an attempt is cancelled.
    fn snapshot_to_pdf(&mut self, rect: Rect) -> BoxFuture<'static, Result<Vec<u8>, RenderError>>;
}

/// Creates renderer sessions. Shared across attempts, so `Send + Sync`.
pub trait RendererFactory: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Create a fresh, unloaded session.
    fn create_session(
        &self,
        options: &SessionOptions,
    ) -> Result<Box<dyn DocumentRenderer>, RenderError>;
}

/// The load-finished notifier handed to a renderer.
///
/// Cloneable so backends can move it into callbacks. Only the first
/// [`fire`](LoadSignal::fire) is delivered; later calls, and calls after the
/// waiting attempt has ended, are ignored.
#[derive(Clone)]
pub struct LoadSignal {
    session: u64,
    tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl LoadSignal {
    /// Report that loading has finished. Returns `true` if the event was
    /// delivered to a live waiter.
    pub fn fire(&self) -> bool {
        let sender = match self.tx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match sender {
            Some(tx) => {
                let delivered = tx.send(()).is_ok();
                if !delivered {
                    debug!(session = self.session, "load-finished after session ended; ignored");
                }
                delivered
            }
            None => {
                debug!(session = self.session, "duplicate load-finished; ignored");
                false
            }
        }
    }

    /// The session this signal belongs to.
    pub fn session(&self) -> u64 {
        self.session
    }
}

impl std::fmt::Debug for LoadSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadSignal")
            .field("session", &self.session)
            .finish()
    }
}

/// The orchestrator's side of a [`LoadSignal`].
pub(crate) struct LoadWaiter {
    rx: oneshot::Receiver<()>,
}

impl LoadWaiter {
    /// Resolve when the signal fires. A signal fired before this is awaited is
    /// not lost. Errors if every clone of the signal was dropped unfired.
    pub(crate) async fn wait(self) -> Result<(), RenderError> {
        self.rx.await.map_err(|_| RenderError::LoadAbandoned)
    }
}

/// Create a connected signal/waiter pair for one session.
pub(crate) fn load_channel(session: u64) -> (LoadSignal, LoadWaiter) {
    let (tx, rx) = oneshot::channel();
    (
        LoadSignal {
            session,
            tx: Arc::new(Mutex::new(Some(tx))),
        },
        LoadWaiter { rx },
    )
}
