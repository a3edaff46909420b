//! Attachment types and file-type classification.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;

/// MIME type of OOXML word-processing documents.
pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// MIME type of PDF documents.
pub const PDF_MIME: &str = "application/pdf";

/// Immutable attachment bytes.
///
/// Cloning shares the underlying buffer, so a print job can take a snapshot
/// of a record without copying its file.
#[derive(Clone, PartialEq, Eq)]
pub struct Blob(Arc<[u8]>);

impl Blob {
    /// The raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the blob holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// BLAKE3 hex digest of the content.
    #[must_use]
    pub fn digest(&self) -> String {
        blake3::hash(&self.0).to_hex().to_string()
    }
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }
}

impl From<&[u8]> for Blob {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.into())
    }
}

impl std::fmt::Debug for Blob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Blob({} bytes)", self.0.len())
    }
}

/// A revocable reference to attachment bytes, usable as an `src`/`href`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayHandle {
    serial: u64,
    url: String,
}

impl DisplayHandle {
    /// Create a handle. Only handle providers should call this.
    #[must_use]
    pub fn new(serial: u64, url: impl Into<String>) -> Self {
        Self {
            serial,
            url: url.into(),
        }
    }

    /// Provider-assigned serial number.
    #[must_use]
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// The URL to embed in markup.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Display for DisplayHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

/// A file chosen by the user, before it becomes an attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// File name including extension.
    pub name: String,
    /// MIME type, absent when it could not be determined.
    pub mime_type: Option<String>,
    /// File contents.
    pub bytes: Blob,
}

impl SelectedFile {
    /// Build a selection from in-memory bytes.
    #[must_use]
    pub fn new(name: impl Into<String>, mime_type: Option<&str>, bytes: impl Into<Blob>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.filter(|m| !m.is_empty()).map(str::to_string),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, inferring the MIME type from its extension
    /// unless `mime_override` is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn from_path(path: impl AsRef<Path>, mime_override: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = mime_override.or_else(|| infer_mime_type(&name));
        Ok(Self::new(name, mime_type, bytes))
    }

    /// BLAKE3 hex digest of the file contents.
    #[must_use]
    pub fn digest(&self) -> String {
        self.bytes.digest()
    }
}

/// Guess a MIME type from a file name's extension.
#[must_use]
pub fn infer_mime_type(name: &str) -> Option<&'static str> {
    let extension = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    let mime = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "pdf" => PDF_MIME,
        "docx" => DOCX_MIME,
        "doc" => "application/msword",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "json" => "application/json",
        _ => return None,
    };
    Some(mime)
}

/// Optional binary payload of a record plus its metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attachment {
    /// File contents, present while the bytes live in this session.
    pub blob: Option<Blob>,
    /// Live display handle for the contents.
    pub display_handle: Option<DisplayHandle>,
    /// MIME type as reported at selection time.
    pub mime_type: Option<String>,
    /// Original file name.
    pub file_name: Option<String>,
}

impl Attachment {
    /// Whether there is anything to show: bytes or a handle.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.blob.is_some() || self.display_handle.is_some()
    }

    fn name_ends_with(&self, suffix: &str) -> bool {
        self.file_name
            .as_deref()
            .is_some_and(|n| n.to_ascii_lowercase().ends_with(suffix))
    }

    fn mime_is(&self, mime: &str) -> bool {
        self.mime_type.as_deref() == Some(mime)
    }
}

/// How an attachment is rendered for printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    /// No attachment, or one with neither bytes nor handle.
    None,
    /// Word document, converted to HTML.
    Docx,
    /// Image, embedded directly.
    Image,
    /// PDF, shown in an embedded viewer.
    Pdf,
    /// Anything else, offered as a link.
    Other,
}

impl AttachmentKind {
    /// Classify an attachment. Checks run in order and the first match wins,
    /// so a `.docx` file mislabelled as an image is still treated as DOCX.
    #[must_use]
    pub fn classify(attachment: Option<&Attachment>) -> Self {
        let Some(attachment) = attachment.filter(|a| a.is_present()) else {
            return Self::None;
        };

        if attachment.name_ends_with(".docx") || attachment.mime_is(DOCX_MIME) {
            Self::Docx
        } else if attachment
            .mime_type
            .as_deref()
            .is_some_and(|m| m.starts_with("image/"))
        {
            Self::Image
        } else if attachment.mime_is(PDF_MIME) || attachment.name_ends_with(".pdf") {
            Self::Pdf
        } else {
            Self::Other
        }
    }
}

impl std::fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Docx => write!(f, "docx"),
            Self::Image => write!(f, "image"),
            Self::Pdf => write!(f, "pdf"),
            Self::Other => write!(f, "other"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(name: Option<&str>, mime: Option<&str>) -> Attachment {
        Attachment {
            blob: Some(Blob::from(b"data".to_vec())),
            display_handle: None,
            mime_type: mime.map(str::to_string),
            file_name: name.map(str::to_string),
        }
    }

    #[test]
    fn test_classify_absent() {
        assert_eq!(AttachmentKind::classify(None), AttachmentKind::None);
        let empty = Attachment {
            file_name: Some("ghost.pdf".to_string()),
            ..Attachment::default()
        };
        assert_eq!(AttachmentKind::classify(Some(&empty)), AttachmentKind::None);
    }

    #[test]
    fn test_classify_docx_by_name_case_insensitive() {
        let a = attachment(Some("Report.DOCX"), None);
        assert_eq!(AttachmentKind::classify(Some(&a)), AttachmentKind::Docx);
    }

    #[test]
    fn test_classify_docx_by_mime() {
        let a = attachment(Some("upload"), Some(DOCX_MIME));
        assert_eq!(AttachmentKind::classify(Some(&a)), AttachmentKind::Docx);
    }

    #[test]
    fn test_classify_docx_wins_over_image_mime() {
        let a = attachment(Some("letter.docx"), Some("image/png"));
        assert_eq!(AttachmentKind::classify(Some(&a)), AttachmentKind::Docx);
    }

    #[test]
    fn test_classify_image() {
        let a = attachment(Some("scan.png"), Some("image/png"));
        assert_eq!(AttachmentKind::classify(Some(&a)), AttachmentKind::Image);
    }

    #[test]
    fn test_classify_pdf_by_mime_or_name() {
        let by_mime = attachment(Some("file"), Some(PDF_MIME));
        let by_name = attachment(Some("contract.Pdf"), None);
        assert_eq!(AttachmentKind::classify(Some(&by_mime)), AttachmentKind::Pdf);
        assert_eq!(AttachmentKind::classify(Some(&by_name)), AttachmentKind::Pdf);
    }

    #[test]
    fn test_classify_other() {
        let a = attachment(Some("data.csv"), Some("text/csv"));
        assert_eq!(AttachmentKind::classify(Some(&a)), AttachmentKind::Other);
    }

    #[test]
    fn test_classify_handle_only() {
        let a = Attachment {
            display_handle: Some(DisplayHandle::new(1, "blob:arsip/1")),
            mime_type: Some("image/jpeg".to_string()),
            ..Attachment::default()
        };
        assert_eq!(AttachmentKind::classify(Some(&a)), AttachmentKind::Image);
    }

    #[test]
    fn test_infer_mime_type() {
        assert_eq!(infer_mime_type("photo.JPG"), Some("image/jpeg"));
        assert_eq!(infer_mime_type("a.pdf"), Some(PDF_MIME));
        assert_eq!(infer_mime_type("b.docx"), Some(DOCX_MIME));
        assert_eq!(infer_mime_type("archive.xyz"), None);
        assert_eq!(infer_mime_type("README"), None);
    }

    #[test]
    fn test_selected_file_empty_mime_is_absent() {
        let file = SelectedFile::new("x.bin", Some(""), b"1".to_vec());
        assert!(file.mime_type.is_none());
    }

    #[test]
    fn test_selected_file_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let file = SelectedFile::from_path(&path, None).unwrap();
        assert_eq!(file.name, "scan.png");
        assert_eq!(file.mime_type.as_deref(), Some("image/png"));
        assert_eq!(file.bytes.len(), 4);

        let overridden = SelectedFile::from_path(&path, Some("application/octet-stream")).unwrap();
        assert_eq!(
            overridden.mime_type.as_deref(),
            Some("application/octet-stream")
        );
    }

    #[test]
    fn test_selected_file_from_missing_path() {
        assert!(SelectedFile::from_path("/nonexistent/file.pdf", None).is_err());
    }

    #[test]
    fn test_blob_digest_is_stable() {
        let a = Blob::from(b"same".to_vec());
        let b = Blob::from(&b"same"[..]);
        assert_eq!(a.digest(), b.digest());
        assert_ne!(a.digest(), Blob::from(b"other".to_vec()).digest());
    }

    #[test]
    fn test_blob_debug_hides_bytes() {
        let blob = Blob::from(vec![0u8; 3]);
        assert_eq!(format!("{blob:?}"), "Blob(3 bytes)");
    }
}
