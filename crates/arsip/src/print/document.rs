//! The HTML document written to a print surface.

use crate::html::escape;
use crate::record::Record;

/// Placeholder shown while the attachment is being prepared.
pub const LOADING_TEXT: &str = "Loading attachment...";

/// HTML document for one record: a fixed header plus a content region that
/// is filled in once the attachment has been rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintDocument {
    title: String,
    category: String,
    date: String,
    content: String,
}

impl PrintDocument {
    /// Header shell for a record with the loading placeholder.
    #[must_use]
    pub fn shell(record: &Record) -> Self {
        Self {
            title: record.title.clone(),
            category: record.category.clone(),
            date: record.date.clone(),
            content: format!("<p>{LOADING_TEXT}</p>"),
        }
    }

    /// Replace the content region. `html` must already be safe markup.
    pub fn set_content(&mut self, html: impl Into<String>) {
        self.content = html.into();
    }

    /// Current content region markup.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Full HTML document.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Print Archive</title>\n\
             <style>body{{font-family:Arial;padding:20px}} img{{max-width:100%;}}</style>\n\
             </head>\n<body>\n<h2>Archive Details</h2>\n\
             <p><b>Title:</b> {}</p>\n<p><b>Category:</b> {}</p>\n<p><b>Date:</b> {}</p>\n\
             <hr>\n<div id=\"content-area\">{}</div>\n</body>\n</html>\n",
            escape(&self.title),
            escape(&self.category),
            escape(&self.date),
            self.content,
        )
    }
}
