//! File-backed display handles.
//!
//! Each handle is a file in a spool directory, exposed as a `file://` URL so
//! that printed HTML documents can reference attachments directly.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::attachment::DisplayHandle;
use crate::error::{Error, Result};
use crate::resolver::{HandleProvider, HandleRequest};

/// Handle provider that spools attachment bytes to disk.
#[derive(Debug)]
pub struct SpoolHandleProvider {
    dir: PathBuf,
    next_serial: AtomicU64,
    live: Mutex<HashMap<u64, PathBuf>>,
}

impl SpoolHandleProvider {
    /// Create a provider rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|source| Error::DirectoryCreate {
                path: dir.clone(),
                source,
            })?;
        }
        debug!("Spooling attachments under {}", dir.display());
        Ok(Self {
            dir,
            next_serial: AtomicU64::new(0),
            live: Mutex::new(HashMap::new()),
        })
    }

    /// The spool directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of spooled files currently live.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    /// Remove every live spool file. Returns how many were released.
    pub fn revoke_all(&self) -> usize {
        let drained: Vec<PathBuf> = self.lock().drain().map(|(_, path)| path).collect();
        for path in &drained {
            remove_quietly(path);
        }
        if !drained.is_empty() {
            info!("Released {} spooled attachments", drained.len());
        }
        drained.len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, PathBuf>> {
        self.live
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl HandleProvider for SpoolHandleProvider {
    fn create(&self, request: HandleRequest<'_>) -> Result<DisplayHandle> {
        let digest = request.blob.digest();
        let extension = request.file_name.and_then(safe_extension);
        let pid = std::process::id();

        // The spool directory may be shared with other sessions, so names
        // carry the pid and are claimed with `create_new`.
        let (serial, path, mut file) = loop {
            let serial = self.next_serial.fetch_add(1, Ordering::SeqCst) + 1;
            let mut file_name = format!("{pid}-{serial}-{}", &digest[..12]);
            if let Some(extension) = &extension {
                file_name.push('.');
                file_name.push_str(extension);
            }
            let path = self.dir.join(file_name);
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(file) => break (serial, path, file),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "Spool name taken");
                }
                Err(e) => {
                    return Err(Error::handle_create(format!("{}: {e}", path.display())));
                }
            }
        };

        if let Err(e) = file.write_all(request.blob.as_bytes()) {
            remove_quietly(&path);
            return Err(Error::handle_create(format!("{}: {e}", path.display())));
        }

        let absolute = path.canonicalize().unwrap_or_else(|_| path.clone());
        let url = file_url(&absolute);
        self.lock().insert(serial, path);
        Ok(DisplayHandle::new(serial, url))
    }

    fn revoke(&self, handle: &DisplayHandle) {
        let removed = self.lock().remove(&handle.serial());
        if let Some(path) = removed {
            remove_quietly(&path);
        }
    }
}

fn remove_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove spooled attachment"),
    }
}

/// `file://` URL for an absolute path, percent-encoding everything except
/// unreserved characters and separators.
fn file_url(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    let mut out = String::from("file://");
    if !path.starts_with('/') {
        out.push('/');
    }
    for b in path.as_bytes() {
        match *b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'~' | b'.' | b'/' | b':' => {
                out.push(*b as char);
            }
            _ => {
                let _ = write!(out, "%{b:02X}");
            }
        }
    }
    out
}

/// Extension of a user-supplied file name, restricted to ASCII alphanumerics.
fn safe_extension(name: &str) -> Option<String> {
    let extension = Path::new(name).extension()?.to_str()?;
    if extension.is_empty() || extension.len() > 8 {
        return None;
    }
    extension
        .chars()
        .all(|c| c.is_ascii_alphanumeric())
        .then(|| extension.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::Blob;

    fn request<'a>(blob: &'a Blob, name: Option<&'a str>) -> HandleRequest<'a> {
        HandleRequest {
            blob,
            mime_type: None,
            file_name: name,
        }
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let spool_dir = dir.path().join("nested").join("spool");
        let provider = SpoolHandleProvider::open(&spool_dir).unwrap();
        assert!(spool_dir.is_dir());
        assert_eq!(provider.dir(), spool_dir.as_path());
    }

    #[test]
    fn test_create_writes_file_and_returns_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let provider = SpoolHandleProvider::open(dir.path()).unwrap();
        let blob = Blob::from(b"%PDF-1.7".to_vec());

        let handle = provider.create(request(&blob, Some("Contract.PDF"))).unwrap();
        assert!(handle.url().starts_with("file://"));
        assert!(handle.url().ends_with(".pdf"));

        let path = handle.url().trim_start_matches("file://");
        assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.7");
        assert_eq!(provider.live_count(), 1);
    }

    #[test]
    fn test_revoke_removes_file_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let provider = SpoolHandleProvider::open(dir.path()).unwrap();
        let blob = Blob::from(b"x".to_vec());
        let handle = provider.create(request(&blob, Some("a.txt"))).unwrap();
        let path = PathBuf::from(handle.url().trim_start_matches("file://"));

        provider.revoke(&handle);
        assert!(!path.exists());
        provider.revoke(&handle);
        assert_eq!(provider.live_count(), 0);
    }

    #[test]
    fn test_revoke_all() {
        let dir = tempfile::tempdir().unwrap();
        let provider = SpoolHandleProvider::open(dir.path()).unwrap();
        let blob = Blob::from(b"x".to_vec());
        provider.create(request(&blob, None)).unwrap();
        provider.create(request(&blob, None)).unwrap();

        assert_eq!(provider.revoke_all(), 2);
        assert_eq!(provider.live_count(), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_create_fails_when_directory_vanishes() {
        let dir = tempfile::tempdir().unwrap();
        let spool_dir = dir.path().join("spool");
        let provider = SpoolHandleProvider::open(&spool_dir).unwrap();
        std::fs::remove_dir(&spool_dir).unwrap();

        let blob = Blob::from(b"x".to_vec());
        let err = provider.create(request(&blob, None)).unwrap_err();
        assert!(matches!(err, Error::HandleCreate { .. }));
    }

    #[test]
    fn test_providers_sharing_a_directory_keep_their_own_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = SpoolHandleProvider::open(dir.path()).unwrap();
        let second = SpoolHandleProvider::open(dir.path()).unwrap();
        let blob = Blob::from(b"same bytes".to_vec());

        let kept = first.create(request(&blob, Some("a.txt"))).unwrap();
        let revoked = second.create(request(&blob, Some("a.txt"))).unwrap();
        assert_ne!(kept.url(), revoked.url());

        second.revoke(&revoked);
        let path = kept.url().trim_start_matches("file://");
        assert_eq!(std::fs::read(path).unwrap(), b"same bytes");
        assert_eq!(first.live_count(), 1);
    }

    #[test]
    fn test_file_url_encodes_reserved_characters() {
        assert_eq!(
            file_url(Path::new("/tmp/my spool #1/100%.pdf")),
            "file:///tmp/my%20spool%20%231/100%25.pdf"
        );
        assert_eq!(file_url(Path::new("/tmp/plain-name_1.txt")), "file:///tmp/plain-name_1.txt");
    }

    #[cfg(unix)]
    #[test]
    fn test_create_in_directory_with_spaces_returns_encoded_url() {
        let dir = tempfile::tempdir().unwrap();
        let spool_dir = dir.path().join("my spool #1");
        let provider = SpoolHandleProvider::open(&spool_dir).unwrap();
        let blob = Blob::from(b"x".to_vec());

        let handle = provider.create(request(&blob, Some("a.txt"))).unwrap();
        assert!(handle.url().contains("my%20spool%20%231/"));
        assert!(!handle.url().contains(' '));
        assert!(!handle.url().contains('#'));
    }

    #[test]
    fn test_safe_extension() {
        assert_eq!(safe_extension("photo.JPG"), Some("jpg".to_string()));
        assert_eq!(safe_extension("weird.p$f"), None);
        assert_eq!(safe_extension("noext"), None);
        assert_eq!(safe_extension("a.verylongextension"), None);
    }
}
