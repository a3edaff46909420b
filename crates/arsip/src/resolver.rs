//! Attachment resolution and transient handle lifecycle.
//!
//! A [`HandleProvider`] hands out revocable references to attachment bytes.
//! The [`AttachmentResolver`] wraps a provider and owns the rules around it:
//! handle creation fails soft, and revocation is idempotent and silent.
//! Handles are never released implicitly; every revoke happens at an
//! explicit call site (replace, delete, shutdown).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::attachment::{Attachment, Blob, DisplayHandle, SelectedFile};
use crate::error::{Error, Result};

/// Metadata passed along when a handle is created.
#[derive(Debug, Clone, Copy)]
pub struct HandleRequest<'a> {
    /// Bytes the handle should expose.
    pub blob: &'a Blob,
    /// MIME type, if known.
    pub mime_type: Option<&'a str>,
    /// Original file name, if known.
    pub file_name: Option<&'a str>,
}

impl<'a> HandleRequest<'a> {
    /// Build a request for an existing attachment's bytes.
    #[must_use]
    pub fn for_attachment(attachment: &'a Attachment, blob: &'a Blob) -> Self {
        Self {
            blob,
            mime_type: attachment.mime_type.as_deref(),
            file_name: attachment.file_name.as_deref(),
        }
    }
}

/// Trait for platform-specific transient handle providers.
pub trait HandleProvider: Send + Sync {
    /// Create a new handle for the requested bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform cannot produce a handle.
    fn create(&self, request: HandleRequest<'_>) -> Result<DisplayHandle>;

    /// Release a handle. Must be silent for unknown or already revoked handles.
    fn revoke(&self, handle: &DisplayHandle);
}

impl<P: HandleProvider + ?Sized> HandleProvider for Arc<P> {
    fn create(&self, request: HandleRequest<'_>) -> Result<DisplayHandle> {
        (**self).create(request)
    }

    fn revoke(&self, handle: &DisplayHandle) {
        (**self).revoke(handle);
    }
}

/// Turns selected files into attachments and manages their handles.
#[derive(Debug)]
pub struct AttachmentResolver<P> {
    provider: P,
}

impl<P: HandleProvider> AttachmentResolver<P> {
    /// Create a resolver on top of a handle provider.
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The underlying provider.
    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Build an attachment from a selected file.
    ///
    /// The handle is absent when the provider fails; callers treat that as
    /// "present but not previewable by URL" and derive one at display time.
    #[must_use]
    pub fn resolve(&self, file: SelectedFile) -> Attachment {
        let digest = file.digest();
        debug!(
            name = %file.name,
            size = file.bytes.len(),
            digest = %&digest[..16],
            "Resolving attachment"
        );
        let display_handle = self.create_soft(HandleRequest {
            blob: &file.bytes,
            mime_type: file.mime_type.as_deref(),
            file_name: Some(&file.name),
        });

        Attachment {
            blob: Some(file.bytes),
            display_handle,
            mime_type: file.mime_type,
            file_name: Some(file.name),
        }
    }

    /// Produce a handle for an attachment that has bytes but no handle.
    ///
    /// Returns `None` if the attachment already has a handle, has no bytes,
    /// or the provider fails again.
    #[must_use]
    pub fn derive_handle(&self, attachment: &Attachment) -> Option<DisplayHandle> {
        if attachment.display_handle.is_some() {
            return None;
        }
        let blob = attachment.blob.as_ref()?;
        self.create_soft(HandleRequest::for_attachment(attachment, blob))
    }

    /// Release a handle. Safe to call more than once.
    pub fn revoke(&self, handle: &DisplayHandle) {
        debug!(handle = %handle, "Revoking display handle");
        self.provider.revoke(handle);
    }

    fn create_soft(&self, request: HandleRequest<'_>) -> Option<DisplayHandle> {
        match self.provider.create(request) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(
                    file = request.file_name.unwrap_or("<unnamed>"),
                    error = %e,
                    "Display handle unavailable, attachment kept without one"
                );
                None
            }
        }
    }
}

/// In-memory handle provider issuing `blob:arsip/<n>` URLs.
///
/// Tracks live handles and how many times each was revoked, which makes
/// leak and double-revoke checks straightforward.
#[derive(Debug, Default)]
pub struct MemoryHandleProvider {
    next_serial: AtomicU64,
    fail_next: AtomicBool,
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    live: HashMap<u64, Blob>,
    revocations: HashMap<u64, usize>,
}

impl MemoryHandleProvider {
    /// Create an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `create` call fail.
    pub fn fail_next_create(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Number of handles created and not yet revoked.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.lock().live.len()
    }

    /// Whether the handle is still live.
    #[must_use]
    pub fn is_live(&self, handle: &DisplayHandle) -> bool {
        self.lock().live.contains_key(&handle.serial())
    }

    /// How many times `revoke` was called for the handle.
    #[must_use]
    pub fn revoke_count(&self, handle: &DisplayHandle) -> usize {
        self.lock()
            .revocations
            .get(&handle.serial())
            .copied()
            .unwrap_or(0)
    }

    /// Bytes behind a live handle.
    #[must_use]
    pub fn bytes(&self, handle: &DisplayHandle) -> Option<Blob> {
        self.lock().live.get(&handle.serial()).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // Poisoning only happens if a test panicked mid-update.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl HandleProvider for MemoryHandleProvider {
    fn create(&self, request: HandleRequest<'_>) -> Result<DisplayHandle> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(Error::handle_create("provider refused the request"));
        }
        let serial = self.next_serial.fetch_add(1, Ordering::SeqCst) + 1;
        self.lock().live.insert(serial, request.blob.clone());
        Ok(DisplayHandle::new(serial, format!("blob:arsip/{serial}")))
    }

    fn revoke(&self, handle: &DisplayHandle) {
        let mut state = self.lock();
        state.live.remove(&handle.serial());
        *state.revocations.entry(handle.serial()).or_default() += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png() -> SelectedFile {
        SelectedFile::new("scan.png", Some("image/png"), b"\x89PNG".to_vec())
    }

    #[test]
    fn test_resolve_populates_all_fields() {
        let resolver = AttachmentResolver::new(MemoryHandleProvider::new());
        let attachment = resolver.resolve(png());

        assert_eq!(attachment.file_name.as_deref(), Some("scan.png"));
        assert_eq!(attachment.mime_type.as_deref(), Some("image/png"));
        assert_eq!(attachment.blob.as_ref().unwrap().as_bytes(), b"\x89PNG");
        let handle = attachment.display_handle.unwrap();
        assert!(handle.url().starts_with("blob:arsip/"));
        assert!(resolver.provider().is_live(&handle));
    }

    #[test]
    fn test_resolve_fails_soft() {
        let resolver = AttachmentResolver::new(MemoryHandleProvider::new());
        resolver.provider().fail_next_create();

        let attachment = resolver.resolve(png());
        assert!(attachment.display_handle.is_none());
        assert!(attachment.blob.is_some());
        assert!(attachment.is_present());
    }

    #[test]
    fn test_derive_handle_after_failure() {
        let resolver = AttachmentResolver::new(MemoryHandleProvider::new());
        resolver.provider().fail_next_create();
        let attachment = resolver.resolve(png());

        let derived = resolver.derive_handle(&attachment).unwrap();
        assert_eq!(resolver.provider().bytes(&derived).unwrap().as_bytes(), b"\x89PNG");
    }

    #[test]
    fn test_derive_handle_skips_when_handle_exists() {
        let resolver = AttachmentResolver::new(MemoryHandleProvider::new());
        let attachment = resolver.resolve(png());
        assert!(resolver.derive_handle(&attachment).is_none());
        assert_eq!(resolver.provider().live_count(), 1);
    }

    #[test]
    fn test_derive_handle_without_blob() {
        let resolver = AttachmentResolver::new(MemoryHandleProvider::new());
        assert!(resolver.derive_handle(&Attachment::default()).is_none());
    }

    #[test]
    fn test_revoke_is_idempotent() {
        let resolver = AttachmentResolver::new(MemoryHandleProvider::new());
        let handle = resolver.resolve(png()).display_handle.unwrap();

        resolver.revoke(&handle);
        resolver.revoke(&handle);
        assert!(!resolver.provider().is_live(&handle));
        assert_eq!(resolver.provider().live_count(), 0);
    }

    #[test]
    fn test_revoke_unknown_handle_is_silent() {
        let resolver = AttachmentResolver::new(MemoryHandleProvider::new());
        resolver.revoke(&DisplayHandle::new(999, "blob:arsip/999"));
        assert_eq!(resolver.provider().live_count(), 0);
    }

    #[test]
    fn test_handles_are_unique() {
        let provider = MemoryHandleProvider::new();
        let blob = Blob::from(b"x".to_vec());
        let request = HandleRequest {
            blob: &blob,
            mime_type: None,
            file_name: None,
        };
        let a = provider.create(request).unwrap();
        let b = provider.create(request).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_arc_provider_delegates() {
        let provider = Arc::new(MemoryHandleProvider::new());
        let resolver = AttachmentResolver::new(Arc::clone(&provider));
        let handle = resolver.resolve(png()).display_handle.unwrap();
        resolver.revoke(&handle);
        assert_eq!(provider.revoke_count(&handle), 1);
    }
}
