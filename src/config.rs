//! Configuration types for document-to-PDF conversion.
//!
//! All orchestrator behaviour is controlled through [`ConverterConfig`], built
//! via its [`ConverterConfigBuilder`]. The timing values here are the knobs
//! most likely to need tuning per renderer backend, so none of them are
//! hard-coded in the pipeline.

use crate::error::ConversionError;
use crate::pipeline::import::ScopedAccess;
use crate::progress::{ConversionProgressCallback, ProgressCallback};
use crate::renderer::{Rect, SessionOptions};
use crate::workspace::RetentionPolicy;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Directory name used under the system temp dir when no `work_dir` is set.
pub const DEFAULT_WORK_DIR_NAME: &str = "doc2pdf";

/// Configuration for the conversion orchestrator.
///
/// # Example
/// ```rust
/// use doc2pdf::ConverterConfig;
/// use std::time::Duration;
///
/// let config = ConverterConfig::builder()
///     .settle_delay(Duration::from_millis(300))
///     .load_timeout(Duration::from_secs(30))
///     .build()
///     .unwrap();
/// assert_eq!(config.settle_delay, Duration::from_millis(300));
/// ```
#[derive(Clone)]
pub struct ConverterConfig {
    /// Private working area. Imports land in `imports/`, PDFs in `outputs/`.
    /// Default: `$TMPDIR/doc2pdf`.
    pub work_dir: PathBuf,

    /// Wait after load-finished before snapshotting. Default: 200 ms.
    ///
    /// Renderers may keep reflowing complex documents after they report that
    /// loading finished; snapshotting immediately can produce blank or partial
    /// pages. This is a heuristic, not a guarantee: very large documents may
    /// need more.
    pub settle_delay: Duration,

    /// Upper bound on waiting for the load-finished event. Default: 20 s.
    pub load_timeout: Duration,

    /// Upper bound on the snapshot call. Default: 60 s.
    pub snapshot_timeout: Duration,

    /// Content bounds shorter than this are treated as degenerate. Default: 100.
    pub min_viewport_height: f64,

    /// Viewport forced when the content bounds are degenerate.
    /// Default: 1024 × 1365 (US Letter aspect at 96 dpi).
    pub fallback_viewport: Rect,

    /// Options for every renderer session. Scripting is off by default.
    pub session: SessionOptions,

    /// Which old imports and outputs to purge.
    pub retention: RetentionPolicy,

    /// Apply `retention` when the orchestrator is opened. Default: true.
    pub purge_on_start: bool,

    /// Receives stage events during import and conversion.
    pub progress_callback: Option<ProgressCallback>,

    /// Acquires and releases scoped read access around the import copy.
    pub scoped_access: Option<Arc<dyn ScopedAccess>>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join(DEFAULT_WORK_DIR_NAME),
            settle_delay: Duration::from_millis(200),
            load_timeout: Duration::from_secs(20),
            snapshot_timeout: Duration::from_secs(60),
            min_viewport_height: 100.0,
            fallback_viewport: Rect::sized(1024.0, 1365.0),
            session: SessionOptions::default(),
            retention: RetentionPolicy::default(),
            purge_on_start: true,
            progress_callback: None,
            scoped_access: None,
        }
    }
}

impl fmt::Debug for ConverterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterConfig")
            .field("work_dir", &self.work_dir)
            .field("settle_delay", &self.settle_delay)
            .field("load_timeout", &self.load_timeout)
            .field("snapshot_timeout", &self.snapshot_timeout)
            .field("min_viewport_height", &self.min_viewport_height)
            .field("fallback_viewport", &self.fallback_viewport)
            .field("session", &self.session)
            .field("retention", &self.retention)
            .field("purge_on_start", &self.purge_on_start)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .field(
                "scoped_access",
                &self.scoped_access.as_ref().map(|_| "<dyn ScopedAccess>"),
            )
            .finish()
    }
}

impl ConverterConfig {
    /// Create a new builder for `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }

    /// Directory imported copies are written to.
    pub fn imports_dir(&self) -> PathBuf {
        self.work_dir.join("imports")
    }

    /// Directory generated PDFs are written to.
    pub fn outputs_dir(&self) -> PathBuf {
        self.work_dir.join("outputs")
    }
}

/// Builder for [`ConverterConfig`].
#[derive(Debug)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = dir.into();
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.config.settle_delay = delay;
        self
    }

    pub fn load_timeout(mut self, timeout: Duration) -> Self {
        self.config.load_timeout = timeout;
        self
    }

    pub fn snapshot_timeout(mut self, timeout: Duration) -> Self {
        self.config.snapshot_timeout = timeout;
        self
    }

    pub fn min_viewport_height(mut self, height: f64) -> Self {
        self.config.min_viewport_height = height.max(1.0);
        self
    }

    pub fn fallback_viewport(mut self, viewport: Rect) -> Self {
        self.config.fallback_viewport = viewport;
        self
    }

    pub fn allow_scripting(mut self, allow: bool) -> Self {
        self.config.session.allow_scripting = allow;
        self
    }

    pub fn retention(mut self, policy: RetentionPolicy) -> Self {
        self.config.retention = policy;
        self
    }

    pub fn purge_on_start(mut self, v: bool) -> Self {
        self.config.purge_on_start = v;
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn ConversionProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn scoped_access(mut self, access: Arc<dyn ScopedAccess>) -> Self {
        self.config.scoped_access = Some(access);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, ConversionError> {
        let c = &self.config;
        if c.load_timeout.is_zero() {
            return Err(ConversionError::InvalidConfig(
                "load timeout must be greater than zero".into(),
            ));
        }
        if c.snapshot_timeout.is_zero() {
            return Err(ConversionError::InvalidConfig(
                "snapshot timeout must be greater than zero".into(),
            ));
        }
        if c.fallback_viewport.is_empty() {
            return Err(ConversionError::InvalidConfig(format!(
                "fallback viewport must be non-empty, got {}x{}",
                c.fallback_viewport.width, c.fallback_viewport.height
            )));
        }
        if c.fallback_viewport.height < c.min_viewport_height {
            return Err(ConversionError::InvalidConfig(format!(
                "fallback viewport height {} is below the minimum {}",
                c.fallback_viewport.height, c.min_viewport_height
            )));
        }
        Ok(self.config)
    }
}
