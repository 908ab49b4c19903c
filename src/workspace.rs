//! Private working area and its retention policy.
//!
//! Layout under `work_dir`:
//!
//! ```text
//! work_dir/
//!  ├─ imports/   unique-named copies of picked documents
//!  └─ outputs/   generated PDFs, named after the source document
//! ```
//!
//! Neither import nor conversion deletes earlier files. [`Workspace::purge`]
//! bounds the growth: files older than `max_age`, and files beyond the newest
//! `max_files` in each directory, are removed. Dotfiles (in-flight atomic
//! writes) and explicitly kept paths are never touched.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Which working files to keep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Remove files last modified longer ago than this. Default: 7 days.
    pub max_age: Option<Duration>,
    /// Keep at most this many files per directory. Default: 50.
    pub max_files: Option<usize>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age: Some(Duration::from_secs(7 * 24 * 60 * 60)),
            max_files: Some(50),
        }
    }
}

impl RetentionPolicy {
    /// Keep everything.
    pub fn keep_all() -> Self {
        Self {
            max_age: None,
            max_files: None,
        }
    }
}

/// Counts from one purge pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeReport {
    pub removed: usize,
    pub kept: usize,
}

/// The orchestrator's private directories.
#[derive(Debug, Clone)]
pub struct Workspace {
    imports: PathBuf,
    outputs: PathBuf,
}

impl Workspace {
    pub fn new(imports: impl Into<PathBuf>, outputs: impl Into<PathBuf>) -> Self {
        Self {
            imports: imports.into(),
            outputs: outputs.into(),
        }
    }

    pub fn imports(&self) -> &Path {
        &self.imports
    }

    pub fn outputs(&self) -> &Path {
        &self.outputs
    }

    /// Create both directories if missing.
    pub async fn ensure(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.imports).await?;
        tokio::fs::create_dir_all(&self.outputs).await?;
        Ok(())
    }

    /// Apply `policy` to both directories, never removing anything in `keep`.
    pub async fn purge(&self, policy: &RetentionPolicy, keep: Vec<PathBuf>) -> io::Result<PurgeReport> {
        let dirs = [self.imports.clone(), self.outputs.clone()];
        let policy = policy.clone();
        tokio::task::spawn_blocking(move || {
            let now = SystemTime::now();
            let mut total = PurgeReport::default();
            for dir in &dirs {
                let r = purge_dir(dir, &policy, &keep, now)?;
                total.removed += r.removed;
                total.kept += r.kept;
            }
            if total.removed > 0 {
                info!("Purged {} working files ({} kept)", total.removed, total.kept);
            }
            Ok(total)
        })
        .await
        .map_err(|e| io::Error::other(format!("purge task panicked: {e}")))?
    }
}

fn purge_dir(
    dir: &Path,
    policy: &RetentionPolicy,
    keep: &[PathBuf],
    now: SystemTime,
) -> io::Result<PurgeReport> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(PurgeReport::default()),
        Err(e) => return Err(e),
    };

    let mut files: Vec<(PathBuf, SystemTime)> = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified().unwrap_or(now);
        files.push((entry.path(), modified));
    }

    // Newest first, so the count cap keeps the most recent files.
    files.sort_by(|a, b| b.1.cmp(&a.1));

    let mut report = PurgeReport::default();
    let mut retained = 0usize;
    for (path, modified) in files {
        if keep.iter().any(|k| k == &path) {
            report.kept += 1;
            retained += 1;
            continue;
        }
        let too_old = policy
            .max_age
            .is_some_and(|age| now.duration_since(modified).unwrap_or_default() > age);
        let over_cap = policy.max_files.is_some_and(|cap| retained >= cap);
        if too_old || over_cap {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Purged {}", path.display());
                    report.removed += 1;
                }
                Err(e) => {
                    warn!("Could not purge {}: {}", path.display(), e);
                    report.kept += 1;
                    retained += 1;
                }
            }
        } else {
            report.kept += 1;
            retained += 1;
        }
    }
    Ok(report)
}
