//! Print surfaces and the hosts that open them.
//!
//! A [`PrintHost`] opens one fresh [`PrintSurface`] per print action. The
//! surface receives the document (possibly several times as content
//! arrives), reports when embedded content is ready, and finally hands the
//! document to the platform print facility.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};

use super::document::PrintDocument;

/// Whether a surface can tell when embedded content has finished loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The embedded content reported that it finished loading.
    Signalled,
    /// The surface has no way to observe embedded content.
    Unsupported,
}

/// A single output target created for one print action.
#[async_trait]
pub trait PrintSurface: Send {
    /// Where the document lives, for reporting.
    fn location(&self) -> String;

    /// Write (or rewrite) the whole document.
    async fn write(&mut self, document: &PrintDocument) -> Result<()>;

    /// Wait for embedded content (image, PDF viewer) to finish loading.
    async fn embedded_ready(&mut self) -> Readiness;

    /// Send the current document to the print facility.
    async fn print(&mut self) -> Result<()>;
}

/// Opens print surfaces.
#[async_trait]
pub trait PrintHost: Send + Sync {
    /// Surface type produced by this host.
    type Surface: PrintSurface;

    /// Open a fresh surface.
    async fn open(&self) -> Result<Self::Surface>;
}

/// Host writing each surface to an HTML file and optionally running a
/// print command on it.
#[derive(Debug)]
pub struct FilePrintHost {
    output_dir: PathBuf,
    command: Option<Vec<String>>,
    next: AtomicU64,
}

impl FilePrintHost {
    /// Create a host writing into `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            command: None,
            next: AtomicU64::new(1),
        }
    }

    /// Run `command` (already split into words) on every finished document.
    #[must_use]
    pub fn with_command(mut self, command: Vec<String>) -> Self {
        self.command = (!command.is_empty()).then_some(command);
        self
    }

    /// Build a host from the `[print]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured command cannot be split.
    pub fn from_config(config: &Config) -> Result<Self> {
        let host = Self::new(config.print_output_dir());
        match config.print.command.as_deref() {
            Some(command) => {
                let words = shlex::split(command).ok_or_else(|| Error::ConfigValidation {
                    message: format!("print.command has unbalanced quoting: {command}"),
                })?;
                Ok(host.with_command(words))
            }
            None => Ok(host),
        }
    }

    /// Directory receiving print documents.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[async_trait]
impl PrintHost for FilePrintHost {
    type Surface = FileSurface;

    async fn open(&self) -> Result<FileSurface> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| Error::DirectoryCreate {
                path: self.output_dir.clone(),
                source,
            })?;

        // Names left by earlier or concurrent sessions are skipped.
        let path = loop {
            let n = self.next.fetch_add(1, Ordering::Relaxed);
            let path = self.output_dir.join(format!("print-{n}.html"));
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(_) => break path,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "Print document name taken");
                }
                Err(e) => return Err(e.into()),
            }
        };
        debug!(path = %path.display(), "Opened print surface");

        Ok(FileSurface {
            path,
            command: self.command.clone(),
        })
    }
}

/// One print document on disk.
#[derive(Debug)]
pub struct FileSurface {
    path: PathBuf,
    command: Option<Vec<String>>,
}

impl FileSurface {
    /// Path of the document file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PrintSurface for FileSurface {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn write(&mut self, document: &PrintDocument) -> Result<()> {
        tokio::fs::write(&self.path, document.render()).await?;
        Ok(())
    }

    async fn embedded_ready(&mut self) -> Readiness {
        Readiness::Unsupported
    }

    async fn print(&mut self) -> Result<()> {
        let Some((program, args)) = self.command.as_ref().and_then(|c| c.split_first()) else {
            info!(path = %self.path.display(), "Print document ready");
            return Ok(());
        };

        debug!(program, path = %self.path.display(), "Running print command");
        let status = tokio::process::Command::new(program)
            .args(args)
            .arg(&self.path)
            .status()
            .await
            .map_err(|e| Error::print(format!("failed to run {program}: {e}")))?;

        if status.success() {
            info!(path = %self.path.display(), "Sent to printer");
            Ok(())
        } else {
            Err(Error::print(format!("{program} exited with {status}")))
        }
    }
}

/// What a [`MemoryPrintHost`] saw on one surface.
#[derive(Debug, Clone, Default)]
pub struct SurfaceLog {
    /// Every document written, in order.
    pub revisions: Vec<PrintDocument>,
    /// When `print` was called, if it was.
    pub printed_at: Option<Instant>,
    /// When the surface was opened.
    pub opened_at: Option<Instant>,
}

impl SurfaceLog {
    /// The last document written.
    #[must_use]
    pub fn latest(&self) -> Option<&PrintDocument> {
        self.revisions.last()
    }
}

/// In-memory host for tests and dry runs.
#[derive(Debug, Clone)]
pub struct MemoryPrintHost {
    surfaces: Arc<Mutex<Vec<SurfaceLog>>>,
    readiness: Readiness,
    ready_after: Duration,
}

impl Default for MemoryPrintHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPrintHost {
    /// Host whose surfaces cannot observe embedded content.
    #[must_use]
    pub fn new() -> Self {
        Self {
            surfaces: Arc::default(),
            readiness: Readiness::Unsupported,
            ready_after: Duration::ZERO,
        }
    }

    /// Host whose surfaces signal readiness `after` the wait starts.
    #[must_use]
    pub fn signalling(after: Duration) -> Self {
        Self {
            readiness: Readiness::Signalled,
            ready_after: after,
            ..Self::new()
        }
    }

    /// Snapshot of every surface opened so far.
    #[must_use]
    pub fn surfaces(&self) -> Vec<SurfaceLog> {
        lock(&self.surfaces).clone()
    }

    /// Snapshot of one surface.
    #[must_use]
    pub fn surface(&self, index: usize) -> Option<SurfaceLog> {
        lock(&self.surfaces).get(index).cloned()
    }

    /// Number of surfaces that were printed.
    #[must_use]
    pub fn printed_count(&self) -> usize {
        lock(&self.surfaces)
            .iter()
            .filter(|s| s.printed_at.is_some())
            .count()
    }
}

#[async_trait]
impl PrintHost for MemoryPrintHost {
    type Surface = MemorySurface;

    async fn open(&self) -> Result<MemorySurface> {
        let mut surfaces = lock(&self.surfaces);
        surfaces.push(SurfaceLog {
            opened_at: Some(Instant::now()),
            ..SurfaceLog::default()
        });
        Ok(MemorySurface {
            index: surfaces.len() - 1,
            surfaces: Arc::clone(&self.surfaces),
            readiness: self.readiness,
            ready_after: self.ready_after,
        })
    }
}

/// Surface handed out by [`MemoryPrintHost`].
#[derive(Debug)]
pub struct MemorySurface {
    index: usize,
    surfaces: Arc<Mutex<Vec<SurfaceLog>>>,
    readiness: Readiness,
    ready_after: Duration,
}

#[async_trait]
impl PrintSurface for MemorySurface {
    fn location(&self) -> String {
        format!("memory:{}", self.index)
    }

    async fn write(&mut self, document: &PrintDocument) -> Result<()> {
        if let Some(log) = lock(&self.surfaces).get_mut(self.index) {
            log.revisions.push(document.clone());
        }
        Ok(())
    }

    async fn embedded_ready(&mut self) -> Readiness {
        if self.readiness == Readiness::Signalled && !self.ready_after.is_zero() {
            tokio::time::sleep(self.ready_after).await;
        }
        self.readiness
    }

    async fn print(&mut self) -> Result<()> {
        if let Some(log) = lock(&self.surfaces).get_mut(self.index) {
            log.printed_at = Some(Instant::now());
        }
        Ok(())
    }
}

// A poisoned log still holds everything recorded before the panic.
fn lock(surfaces: &Mutex<Vec<SurfaceLog>>) -> MutexGuard<'_, Vec<SurfaceLog>> {
    surfaces
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}
