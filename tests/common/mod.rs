//! Scripted renderer backend and helpers shared by the integration tests.

#![allow(dead_code)]

use doc2pdf::{
    ConversionProgressCallback, ConversionStage, ConverterConfig, DocumentRenderer, LoadRequest,
    LoadSignal, Rect, RenderError, RendererFactory, RetentionPolicy, SessionOptions,
    SourceDocument,
};
use futures::future::{BoxFuture, FutureExt};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How a stub session reports load completion.
#[derive(Debug, Clone)]
pub enum LoadBehavior {
    /// Fire from inside `load`.
    Immediate,
    /// Fire twice from inside `load`.
    Twice,
    /// Fire from a task after the delay.
    After(Duration),
    /// Keep the signal but never fire it.
    Never,
    /// Drop the signal without firing.
    DropSignal,
    /// Fail `load` itself.
    Fail(String),
}

/// What a stub snapshot returns.
#[derive(Debug, Clone)]
pub enum SnapshotBehavior {
    /// A valid one-page PDF.
    Pdf,
    Empty,
    Fail(String),
    /// Never resolves.
    Hang,
}

/// Counters and recordings shared between a factory and its sessions.
#[derive(Debug, Default)]
pub struct StubLog {
    pub created: AtomicUsize,
    pub dropped: AtomicUsize,
    pub loads: Mutex<Vec<LoadRequest>>,
    pub viewports: Mutex<Vec<Rect>>,
    pub snapshots: Mutex<Vec<Rect>>,
    /// Every signal handed to a session, so tests can fire late events.
    pub signals: Mutex<Vec<LoadSignal>>,
}

impl StubLog {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    pub fn snapshots(&self) -> Vec<Rect> {
        self.snapshots.lock().unwrap().clone()
    }

    pub fn viewports(&self) -> Vec<Rect> {
        self.viewports.lock().unwrap().clone()
    }

    pub fn last_signal(&self) -> Option<LoadSignal> {
        self.signals.lock().unwrap().last().cloned()
    }
}

pub struct StubRendererFactory {
    load: LoadBehavior,
    snapshot: SnapshotBehavior,
    bounds: Rect,
    pub log: Arc<StubLog>,
}

impl StubRendererFactory {
    /// Loads immediately, reports page-sized bounds, and snapshots a real PDF.
    pub fn new() -> Self {
        Self {
            load: LoadBehavior::Immediate,
            snapshot: SnapshotBehavior::Pdf,
            bounds: Rect::sized(800.0, 1200.0),
            log: Arc::new(StubLog::default()),
        }
    }

    pub fn load(mut self, behavior: LoadBehavior) -> Self {
        self.load = behavior;
        self
    }

    pub fn snapshot(mut self, behavior: SnapshotBehavior) -> Self {
        self.snapshot = behavior;
        self
    }

    pub fn bounds(mut self, bounds: Rect) -> Self {
        self.bounds = bounds;
        self
    }
}

impl RendererFactory for StubRendererFactory {
    fn name(&self) -> &str {
        "stub"
    }

    fn create_session(
        &self,
        _options: &SessionOptions,
    ) -> Result<Box<dyn DocumentRenderer>, RenderError> {
        self.log.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubRenderer {
            load: self.load.clone(),
            snapshot: self.snapshot.clone(),
            bounds: self.bounds,
            held: None,
            log: Arc::clone(&self.log),
        }))
    }
}

struct StubRenderer {
    load: LoadBehavior,
    snapshot: SnapshotBehavior,
    bounds: Rect,
    held: Option<LoadSignal>,
    log: Arc<StubLog>,
}

impl DocumentRenderer for StubRenderer {
    fn load(&mut self, request: &LoadRequest, on_finished: LoadSignal) -> Result<(), RenderError> {
        request.check_access()?;
        self.log.loads.lock().unwrap().push(request.clone());
        self.log.signals.lock().unwrap().push(on_finished.clone());
        match &self.load {
            LoadBehavior::Immediate => {
                on_finished.fire();
            }
            LoadBehavior::Twice => {
                on_finished.fire();
                on_finished.fire();
            }
            LoadBehavior::After(delay) => {
                let delay = *delay;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    on_finished.fire();
                });
            }
            LoadBehavior::Never => {
                self.held = Some(on_finished);
            }
            LoadBehavior::DropSignal => {
                // Only the copy in the log survives; drop that too.
                self.log.signals.lock().unwrap().pop();
                drop(on_finished);
            }
            LoadBehavior::Fail(msg) => return Err(RenderError::LoadFailed(msg.clone())),
        }
        Ok(())
    }

    fn content_bounds(&self) -> Rect {
        self.bounds
    }

    fn set_viewport(&mut self, viewport: Rect) {
        self.log.viewports.lock().unwrap().push(viewport);
        self.bounds = viewport;
    }

    fn snapshot_to_pdf(&mut self, rect: Rect) -> BoxFuture<'static, Result<Vec<u8>, RenderError>> {
        self.log.snapshots.lock().unwrap().push(rect);
        match self.snapshot.clone() {
            SnapshotBehavior::Pdf => async { Ok(one_page_pdf()) }.boxed(),
            SnapshotBehavior::Empty => async { Ok(Vec::new()) }.boxed(),
            SnapshotBehavior::Fail(msg) => async move { Err(RenderError::SnapshotFailed(msg)) }.boxed(),
            SnapshotBehavior::Hang => futures::future::pending().boxed(),
        }
    }
}

impl Drop for StubRenderer {
    fn drop(&mut self) {
        self.log.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

/// A minimal valid single-page PDF.
pub fn one_page_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(dictionary! {}, b"BT ET".to_vec()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// Records every progress event in order.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    pub events: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, e: String) {
        self.events.lock().unwrap().push(e);
    }
}

impl ConversionProgressCallback for RecordingProgress {
    fn on_import_complete(&self, document: &SourceDocument) {
        self.push(format!("imported:{}", document.display_name));
    }

    fn on_conversion_start(&self, document: &SourceDocument) {
        self.push(format!("start:{}", document.display_name));
    }

    fn on_stage(&self, stage: ConversionStage) {
        self.push(format!("stage:{stage:?}"));
    }

    fn on_conversion_complete(&self, _output: &Path) {
        self.push("complete".into());
    }

    fn on_conversion_error(&self, _error: &str) {
        self.push("error".into());
    }
}

/// Fast timings, no purge on start, everything under `work_dir`.
pub fn test_config(work_dir: &Path) -> ConverterConfig {
    ConverterConfig::builder()
        .work_dir(work_dir)
        .settle_delay(Duration::from_millis(10))
        .load_timeout(Duration::from_secs(2))
        .snapshot_timeout(Duration::from_secs(2))
        .purge_on_start(false)
        .retention(RetentionPolicy::keep_all())
        .build()
        .unwrap()
}

/// Write a document of `size` bytes named `name` into `dir`.
pub fn write_document(dir: &Path, name: &str, size: usize) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, vec![b'w'; size]).unwrap();
    path
}
