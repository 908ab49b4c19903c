//! Share / export boundary for generated PDFs.
//!
//! These are pass-throughs: the orchestrator hands over a finished file path
//! and the platform does the rest. No format negotiation happens here.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ShareError {
    /// The file to share no longer exists.
    #[error("'{path}' does not exist")]
    Missing { path: PathBuf },

    /// The platform helper could not be started.
    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Copying to the export destination failed.
    #[error("Failed to export to '{path}': {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Hands a file to the OS share mechanism or file browser.
pub trait ShareTarget: Send + Sync {
    /// Open the file with the platform's default handler.
    fn share(&self, path: &Path) -> Result<(), ShareError>;

    /// Show the file in the platform's file browser.
    fn reveal(&self, path: &Path) -> Result<(), ShareError>;
}

/// Uses `open` (macOS), `explorer` (Windows) or `xdg-open` elsewhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShare;

impl ShareTarget for SystemShare {
    fn share(&self, path: &Path) -> Result<(), ShareError> {
        ensure_exists(path)?;
        #[cfg(target_os = "macos")]
        let (program, args) = ("open", vec![path.as_os_str().to_owned()]);
        #[cfg(target_os = "windows")]
        let (program, args) = ("explorer", vec![path.as_os_str().to_owned()]);
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        let (program, args) = ("xdg-open", vec![path.as_os_str().to_owned()]);
        launch(program, &args)
    }

    fn reveal(&self, path: &Path) -> Result<(), ShareError> {
        ensure_exists(path)?;
        #[cfg(target_os = "macos")]
        let (program, args) = ("open", vec!["-R".into(), path.as_os_str().to_owned()]);
        #[cfg(target_os = "windows")]
        let (program, args) = ("explorer", {
            let mut arg = std::ffi::OsString::from("/select,");
            arg.push(path.as_os_str());
            vec![arg]
        });
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        let (program, args) = (
            "xdg-open",
            vec![path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .as_os_str()
                .to_owned()],
        );
        launch(program, &args)
    }
}

fn ensure_exists(path: &Path) -> Result<(), ShareError> {
    if path.exists() {
        Ok(())
    } else {
        Err(ShareError::Missing {
            path: path.to_path_buf(),
        })
    }
}

fn launch(program: &str, args: &[std::ffi::OsString]) -> Result<(), ShareError> {
    debug!("launching {} {:?}", program, args);
    Command::new(program)
        .args(args)
        .spawn()
        .map(|_| ())
        .map_err(|source| ShareError::Launch {
            program: program.to_string(),
            source,
        })
}

/// Copy `pdf` to `destination` atomically and return the written path.
///
/// If `destination` is an existing directory, the file keeps its name.
pub async fn export_to(pdf: &Path, destination: &Path) -> Result<PathBuf, ShareError> {
    ensure_exists(pdf)?;
    let target = if destination.is_dir() {
        destination.join(pdf.file_name().unwrap_or_else(|| "document.pdf".as_ref()))
    } else {
        destination.to_path_buf()
    };

    let bytes = tokio::fs::read(pdf).await.map_err(|source| ShareError::Export {
        path: pdf.to_path_buf(),
        source,
    })?;
    let path = target.clone();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| ShareError::Export {
        path: target.clone(),
        source: std::io::Error::other(e.to_string()),
    })?
    .map_err(|source| ShareError::Export {
        path: target.clone(),
        source,
    })?;

    Ok(target)
}
