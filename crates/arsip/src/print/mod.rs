//! Print preview generation.
//!
//! Printing a record opens a fresh surface, writes the record header with a
//! loading placeholder, fills the content region according to the
//! attachment kind, waits for that content to be complete and only then
//! triggers the print. Every path reaches [`PrintState::Printed`]; failures
//! in the attachment path degrade to a visible message instead.
//!
//! ```text
//! Opened -> NoAttachment                -> Printed
//!        -> DocxPending -> DocxRendered -> Printed
//!                       -> DocxFailed   -> Printed
//!        -> ImageReady                  -> Printed
//!        -> PdfPending  -> PdfReady     -> Printed
//!        -> OtherReady                  -> Printed
//! ```

pub mod document;
pub mod docx;
pub mod host;

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::attachment::{Attachment, AttachmentKind};
use crate::error::Result;
use crate::html::escape;
use crate::record::{Record, RecordId};

pub use document::{PrintDocument, LOADING_TEXT};
pub use docx::{ConversionError, DocxConverter, DocxHtmlConverter};
pub use host::{
    FilePrintHost, FileSurface, MemoryPrintHost, MemorySurface, PrintHost, PrintSurface,
    Readiness, SurfaceLog,
};

/// Heading placed above converted document contents.
pub const DOCX_HEADING: &str = "<h3>Document contents</h3>";

/// Shown when conversion fails.
pub const DOCX_FAILED_TEXT: &str = "Failed to convert DOCX file.";

/// Shown when a DOCX attachment has no bytes to convert.
pub const DOCX_UNREADABLE_TEXT: &str = "Cannot read DOCX file.";

/// Link label for attachments without a file name.
pub const DOWNLOAD_LABEL: &str = "Download file";

/// Note under the link for attachments that cannot be previewed.
pub const NO_PREVIEW_NOTE: &str =
    "(This file type cannot be previewed; open the link to view or download it.)";

/// Content region for records without an attachment.
pub const NO_ATTACHMENT_HTML: &str = "<p><b>Attachment:</b> No attachment</p>";

/// Steps a single print goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintState {
    /// Surface opened and header written.
    Opened,
    /// Record has no attachment.
    NoAttachment,
    /// DOCX conversion in flight.
    DocxPending,
    /// DOCX converted and injected.
    DocxRendered,
    /// DOCX could not be converted or read.
    DocxFailed,
    /// Image embedded and loaded.
    ImageReady,
    /// PDF viewer embedded, waiting for it to render.
    PdfPending,
    /// PDF viewer rendered.
    PdfReady,
    /// Download link injected.
    OtherReady,
    /// Handed to the print facility.
    Printed,
}

/// Owned snapshot of a record to print.
///
/// Taking a snapshot lets the print run while the record store keeps
/// changing underneath it.
#[derive(Debug, Clone)]
pub struct PrintJob {
    record: Record,
}

impl PrintJob {
    /// Snapshot a record.
    #[must_use]
    pub fn new(record: Record) -> Self {
        Self { record }
    }

    /// The record being printed.
    #[must_use]
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// How the attachment will be rendered.
    #[must_use]
    pub fn kind(&self) -> AttachmentKind {
        AttachmentKind::classify(self.record.attachment.as_ref())
    }
}

/// Outcome of one print.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrintReport {
    /// Record that was printed.
    pub record: RecordId,
    /// Where the surface lives.
    pub location: String,
    /// Attachment kind that selected the rendering path.
    pub kind: AttachmentKind,
    /// States visited, in order.
    pub states: Vec<PrintState>,
}

/// Fills print surfaces and triggers printing.
pub struct PrintDispatcher<H> {
    host: H,
    converter: Arc<dyn DocxConverter>,
    pdf_settle: Duration,
}

impl<H: std::fmt::Debug> std::fmt::Debug for PrintDispatcher<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrintDispatcher")
            .field("host", &self.host)
            .field("pdf_settle", &self.pdf_settle)
            .finish_non_exhaustive()
    }
}

impl<H: PrintHost> PrintDispatcher<H> {
    /// Create a dispatcher.
    ///
    /// `pdf_settle` is how long an embedded PDF viewer gets to render when
    /// the surface cannot report readiness itself.
    #[must_use]
    pub fn new(host: H, converter: Arc<dyn DocxConverter>, pdf_settle: Duration) -> Self {
        Self {
            host,
            converter,
            pdf_settle,
        }
    }

    /// The host surfaces are opened on.
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Print one record.
    ///
    /// # Errors
    ///
    /// Returns an error only when the surface itself fails (cannot be
    /// opened, written or printed). Attachment problems are rendered into
    /// the document instead.
    pub async fn print_record(&self, job: PrintJob) -> Result<PrintReport> {
        let kind = job.kind();
        let record = job.record;

        let mut surface = self.host.open().await?;
        let location = surface.location();
        let mut states = vec![PrintState::Opened];
        info!(record = %record.id, %kind, %location, "Printing record");

        let mut document = PrintDocument::shell(&record);
        surface.write(&document).await?;

        match record.attachment.as_ref().filter(|_| kind != AttachmentKind::None) {
            None => {
                document.set_content(NO_ATTACHMENT_HTML);
                surface.write(&document).await?;
                states.push(PrintState::NoAttachment);
            }
            Some(attachment) => match kind {
                AttachmentKind::Docx => {
                    states.push(PrintState::DocxPending);
                    let (content, state) = self.render_docx(&record, attachment).await;
                    document.set_content(content);
                    surface.write(&document).await?;
                    states.push(state);
                }
                AttachmentKind::Image => {
                    document.set_content(image_html(&source_url(attachment)));
                    surface.write(&document).await?;
                    let readiness = surface.embedded_ready().await;
                    debug!(record = %record.id, ?readiness, "Image embedded");
                    states.push(PrintState::ImageReady);
                }
                AttachmentKind::Pdf => {
                    document.set_content(pdf_html(&source_url(attachment)));
                    surface.write(&document).await?;
                    states.push(PrintState::PdfPending);
                    if surface.embedded_ready().await == Readiness::Unsupported {
                        debug!(
                            record = %record.id,
                            settle = ?self.pdf_settle,
                            "Viewer cannot signal readiness, waiting"
                        );
                        tokio::time::sleep(self.pdf_settle).await;
                    }
                    states.push(PrintState::PdfReady);
                }
                AttachmentKind::Other | AttachmentKind::None => {
                    document.set_content(other_html(attachment));
                    surface.write(&document).await?;
                    states.push(PrintState::OtherReady);
                }
            },
        }

        surface.print().await?;
        states.push(PrintState::Printed);
        info!(record = %record.id, %location, "Record printed");

        Ok(PrintReport {
            record: record.id,
            location,
            kind,
            states,
        })
    }

    async fn render_docx(&self, record: &Record, attachment: &Attachment) -> (String, PrintState) {
        let Some(blob) = attachment.blob.clone() else {
            error!(record = %record.id, "DOCX attachment has no bytes to convert");
            return (
                format!("<p>{DOCX_UNREADABLE_TEXT}</p>"),
                PrintState::DocxFailed,
            );
        };

        match self.converter.convert(blob).await {
            Ok(html) => (format!("{DOCX_HEADING}{html}"), PrintState::DocxRendered),
            Err(e) => {
                error!(record = %record.id, error = %e, "DOCX conversion failed");
                (format!("<p>{DOCX_FAILED_TEXT}</p>"), PrintState::DocxFailed)
            }
        }
    }
}

/// URL to embed: the display handle, or the bytes inlined as a data URI.
fn source_url(attachment: &Attachment) -> String {
    if let Some(handle) = &attachment.display_handle {
        return handle.url().to_string();
    }
    match &attachment.blob {
        Some(blob) => format!(
            "data:{};base64,{}",
            attachment
                .mime_type
                .as_deref()
                .unwrap_or("application/octet-stream"),
            STANDARD.encode(blob.as_bytes())
        ),
        None => String::new(),
    }
}

fn image_html(url: &str) -> String {
    format!(
        r#"<p><b>Attachment (Image):</b></p><img src="{}" alt="attachment">"#,
        escape(url)
    )
}

fn pdf_html(url: &str) -> String {
    format!(
        r#"<p><b>Attachment (PDF):</b></p><iframe src="{}" width="100%" height="600px"></iframe>"#,
        escape(url)
    )
}

fn other_html(attachment: &Attachment) -> String {
    let label = attachment.file_name.as_deref().unwrap_or(DOWNLOAD_LABEL);
    format!(
        r#"<p><b>Attachment:</b> <a href="{}" target="_blank" rel="noopener noreferrer">{}</a></p><p>{NO_PREVIEW_NOTE}</p>"#,
        escape(&source_url(attachment)),
        escape(label)
    )
}
