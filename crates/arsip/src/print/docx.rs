//! DOCX to HTML conversion.
//!
//! Covers the subset of WordprocessingML that matters for a printed preview:
//! paragraphs, headings, bold/italic/underline runs, line breaks, tabs and
//! simple tables. Everything else is dropped. All document text is escaped,
//! so the output is safe to inject into a print surface.

use std::io::{Cursor, Read};

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::attachment::Blob;
use crate::html::escape;

/// Path of the main document part inside a DOCX archive.
const DOCUMENT_PART: &str = "word/document.xml";

/// Errors that can occur while converting a document.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The bytes are not a readable zip archive.
    #[error("not a valid DOCX archive: {0}")]
    Archive(#[from] ZipError),

    /// The archive has no main document part.
    #[error("archive has no word/document.xml part")]
    MissingDocument,

    /// The document part is not well-formed XML.
    #[error("malformed document XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The document part could not be read.
    #[error("failed to read document part: {0}")]
    Io(#[from] std::io::Error),

    /// The background conversion task did not complete.
    #[error("conversion task failed: {0}")]
    Task(String),
}

/// External capability that turns DOCX bytes into HTML.
#[async_trait]
pub trait DocxConverter: Send + Sync {
    /// Convert a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a readable DOCX document.
    async fn convert(&self, bytes: Blob) -> Result<String, ConversionError>;
}

/// Built-in converter reading the OOXML package directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxHtmlConverter;

impl DocxHtmlConverter {
    /// Create a converter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocxConverter for DocxHtmlConverter {
    async fn convert(&self, bytes: Blob) -> Result<String, ConversionError> {
        tokio::task::spawn_blocking(move || convert_docx(bytes.as_bytes()))
            .await
            .map_err(|e| ConversionError::Task(e.to_string()))?
    }
}

/// Convert DOCX bytes to HTML synchronously.
///
/// # Errors
///
/// Returns an error if the archive or its main document part is unreadable.
pub fn convert_docx(bytes: &[u8]) -> Result<String, ConversionError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    match archive.by_name(DOCUMENT_PART) {
        Ok(mut part) => {
            part.read_to_string(&mut xml)?;
        }
        Err(ZipError::FileNotFound) => return Err(ConversionError::MissingDocument),
        Err(e) => return Err(e.into()),
    }
    document_to_html(&xml)
}

#[derive(Debug, Default)]
struct Paragraph {
    style: Option<String>,
    html: String,
}

impl Paragraph {
    fn tag(&self) -> &'static str {
        match self.style.as_deref() {
            Some("Title" | "Heading1") => "h1",
            Some("Heading2") => "h2",
            Some("Heading3") => "h3",
            Some("Heading4") => "h4",
            Some("Heading5") => "h5",
            Some("Heading6") => "h6",
            _ => "p",
        }
    }

    fn render_into(self, out: &mut String) {
        if self.html.trim().is_empty() {
            return;
        }
        let tag = self.tag();
        out.push('<');
        out.push_str(tag);
        out.push('>');
        out.push_str(&self.html);
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }
}

#[derive(Debug, Default)]
struct Run {
    bold: bool,
    italic: bool,
    underline: bool,
    html: String,
}

impl Run {
    fn render(self) -> String {
        let mut html = self.html;
        if html.is_empty() {
            return html;
        }
        if self.underline {
            html = format!("<u>{html}</u>");
        }
        if self.italic {
            html = format!("<em>{html}</em>");
        }
        if self.bold {
            html = format!("<strong>{html}</strong>");
        }
        html
    }
}

#[derive(Debug, Default)]
struct Converter {
    out: String,
    paragraph: Option<Paragraph>,
    run: Option<Run>,
    in_text: bool,
    in_run_properties: bool,
}

impl Converter {
    fn push_inline(&mut self, html: &str) {
        if let Some(run) = self.run.as_mut() {
            run.html.push_str(html);
        } else if let Some(paragraph) = self.paragraph.as_mut() {
            paragraph.html.push_str(html);
        }
    }

    fn property(&mut self, name: &[u8], element: &BytesStart<'_>) -> Result<(), ConversionError> {
        match name {
            b"pStyle" => {
                if let Some(paragraph) = self.paragraph.as_mut() {
                    paragraph.style = attribute(element, b"val")?;
                }
            }
            b"b" | b"i" | b"u" if self.in_run_properties => {
                let value = attribute(element, b"val")?;
                let on = !matches!(value.as_deref(), Some("0" | "false" | "none"));
                if let Some(run) = self.run.as_mut() {
                    match name {
                        b"b" => run.bold = on,
                        b"i" => run.italic = on,
                        _ => run.underline = on,
                    }
                }
            }
            b"br" => self.push_inline("<br>"),
            // Outside a run, `tab` is a tab-stop definition.
            b"tab" if self.run.is_some() => self.push_inline(" "),
            _ => {}
        }
        Ok(())
    }

    fn start(&mut self, element: &BytesStart<'_>) -> Result<(), ConversionError> {
        let name = element.local_name();
        match name.as_ref() {
            b"p" => self.paragraph = Some(Paragraph::default()),
            b"r" => self.run = Some(Run::default()),
            b"rPr" => self.in_run_properties = true,
            b"t" => self.in_text = true,
            b"tbl" => self.out.push_str("<table>"),
            b"tr" => self.out.push_str("<tr>"),
            b"tc" => self.out.push_str("<td>"),
            other => self.property(other, element)?,
        }
        Ok(())
    }

    fn end(&mut self, name: &[u8]) {
        match name {
            b"t" => self.in_text = false,
            b"rPr" => self.in_run_properties = false,
            b"r" => {
                if let Some(run) = self.run.take() {
                    let html = run.render();
                    if let Some(paragraph) = self.paragraph.as_mut() {
                        paragraph.html.push_str(&html);
                    }
                }
            }
            b"p" => {
                if let Some(paragraph) = self.paragraph.take() {
                    paragraph.render_into(&mut self.out);
                }
            }
            b"tc" => self.out.push_str("</td>"),
            b"tr" => self.out.push_str("</tr>"),
            b"tbl" => self.out.push_str("</table>"),
            _ => {}
        }
    }
}

fn document_to_html(xml: &str) -> Result<String, ConversionError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut converter = Converter::default();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => converter.start(e)?,
            Event::Empty(ref e) => {
                let name = e.local_name();
                // A self-closing paragraph is empty and produces nothing.
                if name.as_ref() != b"p" {
                    converter.property(name.as_ref(), e)?;
                }
            }
            Event::Text(ref t) if converter.in_text => {
                let text = t.unescape()?;
                converter.push_inline(&escape(&text));
            }
            Event::End(ref e) => converter.end(e.local_name().as_ref()),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(converter.out)
}

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, ConversionError> {
    for attr in element.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.local_name().as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}


#[cfg(test)]
mod tests {
    use super::test_support::{docx_bytes, document_xml};
    use super::*;

    #[test]
    fn test_paragraphs() {
        let html = document_to_html(&document_xml(
            "<w:p><w:r><w:t>First</w:t></w:r></w:p><w:p><w:r><w:t>Second</w:t></w:r></w:p>",
        ))
        .unwrap();
        assert_eq!(html, "<p>First</p><p>Second</p>");
    }

    #[test]
    fn test_headings() {
        let html = document_to_html(&document_xml(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading2"/></w:pPr><w:r><w:t>Scope</w:t></w:r></w:p>"#,
        ))
        .unwrap();
        assert_eq!(html, "<h2>Scope</h2>");
    }

    #[test]
    fn test_run_formatting() {
        let html = document_to_html(&document_xml(
            r#"<w:p><w:r><w:rPr><w:b/><w:i/></w:rPr><w:t>loud</w:t></w:r><w:r><w:rPr><w:b w:val="0"/></w:rPr><w:t xml:space="preserve"> quiet</w:t></w:r></w:p>"#,
        ))
        .unwrap();
        assert_eq!(html, "<p><strong><em>loud</em></strong> quiet</p>");
    }

    #[test]
    fn test_breaks_and_tabs() {
        let html = document_to_html(&document_xml(
            "<w:p><w:r><w:t>a</w:t><w:br/><w:t>b</w:t><w:tab/><w:t>c</w:t></w:r></w:p>",
        ))
        .unwrap();
        assert_eq!(html, "<p>a<br>b c</p>");
    }

    #[test]
    fn test_tab_stop_definitions_add_no_text() {
        let html = document_to_html(&document_xml(
            r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>x</w:t></w:r></w:p>"#,
        ))
        .unwrap();
        assert_eq!(html, "<p>x</p>");
    }

    #[test]
    fn test_empty_paragraphs_are_skipped() {
        let html = document_to_html(&document_xml(
            "<w:p/><w:p><w:pPr/></w:p><w:p><w:r><w:t>x</w:t></w:r></w:p>",
        ))
        .unwrap();
        assert_eq!(html, "<p>x</p>");
    }

    #[test]
    fn test_tables() {
        let html = document_to_html(&document_xml(
            "<w:tbl><w:tr><w:tc><w:p><w:r><w:t>A1</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>B1</w:t></w:r></w:p></w:tc></w:tr></w:tbl>",
        ))
        .unwrap();
        assert_eq!(html, "<table><tr><td><p>A1</p></td><td><p>B1</p></td></tr></table>");
    }

    #[test]
    fn test_document_text_is_escaped() {
        let html = document_to_html(&document_xml(
            "<w:p><w:r><w:t>&lt;script&gt;alert(1)&lt;/script&gt;</w:t></w:r></w:p>",
        ))
        .unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_convert_docx_package() {
        let bytes = docx_bytes("<w:p><w:r><w:t>Minutes</w:t></w:r></w:p>");
        assert_eq!(convert_docx(&bytes).unwrap(), "<p>Minutes</p>");
    }

    #[test]
    fn test_convert_rejects_non_zip() {
        let err = convert_docx(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, ConversionError::Archive(_)));
    }

    #[test]
    fn test_convert_rejects_zip_without_document() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("other.txt", zip::write::SimpleFileOptions::default())
            .unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = convert_docx(&bytes).unwrap_err();
        assert!(matches!(err, ConversionError::MissingDocument));
    }

    #[test]
    fn test_convert_rejects_malformed_xml() {
        let err = document_to_html("<w:document><w:body></w:document>").unwrap_err();
        assert!(matches!(err, ConversionError::Xml(_)));
    }

    #[tokio::test]
    async fn test_async_converter() {
        let bytes = docx_bytes("<w:p><w:r><w:t>async</w:t></w:r></w:p>");
        let html = DocxHtmlConverter::new()
            .convert(Blob::from(bytes))
            .await
            .unwrap();
        assert_eq!(html, "<p>async</p>");
    }
}
