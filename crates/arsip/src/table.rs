//! Table projection of the record store.
//!
//! A [`TableView`] is a pure function of the records it is built from and is
//! rebuilt after every mutation. It renders to an HTML document or to an
//! aligned plain-text table for the terminal.

use std::fmt::Write as _;

use serde::Serialize;

use crate::attachment::Attachment;
use crate::html::escape;
use crate::record::{Record, RecordId};
use crate::theme::Theme;

/// Text shown when the store is empty.
pub const EMPTY_TEXT: &str = "No data";

/// Fallback label for attachment links without a file name.
pub const VIEW_FILE_LABEL: &str = "View file";

/// What the file column shows for a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileCell {
    /// No previewable attachment.
    None,
    /// Image thumbnail.
    Image {
        /// Handle URL.
        src: String,
    },
    /// Link to the file.
    Link {
        /// Handle URL.
        href: String,
        /// File name or [`VIEW_FILE_LABEL`].
        label: String,
    },
}

impl FileCell {
    fn from_attachment(attachment: Option<&Attachment>) -> Self {
        let Some(attachment) = attachment else {
            return Self::None;
        };
        let Some(handle) = &attachment.display_handle else {
            return Self::None;
        };

        let is_image = attachment
            .mime_type
            .as_deref()
            .is_some_and(|m| m.starts_with("image/"));
        if is_image {
            Self::Image {
                src: handle.url().to_string(),
            }
        } else {
            Self::Link {
                href: handle.url().to_string(),
                label: attachment
                    .file_name
                    .clone()
                    .unwrap_or_else(|| VIEW_FILE_LABEL.to_string()),
            }
        }
    }
}

/// One projected row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    /// 1-based row number; shifts when earlier rows are deleted.
    pub number: usize,
    /// Stable record id used by row actions.
    pub id: RecordId,
    /// Title.
    pub title: String,
    /// Category.
    pub category: String,
    /// Date.
    pub date: String,
    /// File column.
    pub file: FileCell,
}

/// Projection of the store into display rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableView {
    /// Rows in store order.
    pub rows: Vec<TableRow>,
}

impl TableView {
    /// Project records into rows.
    pub fn project<'a>(records: impl IntoIterator<Item = &'a Record>) -> Self {
        let rows = records
            .into_iter()
            .enumerate()
            .map(|(i, record)| TableRow {
                number: i + 1,
                id: record.id,
                title: record.title.clone(),
                category: record.category.clone(),
                date: record.date.clone(),
                file: FileCell::from_attachment(record.attachment.as_ref()),
            })
            .collect();
        Self { rows }
    }

    /// Whether there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render a standalone HTML document containing the table.
    #[must_use]
    pub fn render_html(&self, theme: Theme) -> String {
        let mut body = String::new();
        if self.rows.is_empty() {
            let _ = write!(
                body,
                r#"<tr><td colspan="6" class="empty">{EMPTY_TEXT}</td></tr>"#
            );
        }
        for row in &self.rows {
            let file = match &row.file {
                FileCell::None => "-".to_string(),
                FileCell::Image { src } => {
                    format!(r#"<img src="{}" width="60" alt="img">"#, escape(src))
                }
                FileCell::Link { href, label } => format!(
                    r#"<a href="{}" target="_blank" rel="noopener noreferrer">{}</a>"#,
                    escape(href),
                    escape(label)
                ),
            };
            let id = row.id.get();
            let _ = write!(
                body,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{file}</td>\
                 <td><button data-action=\"edit\" data-id=\"{id}\">Edit</button>\
                 <button data-action=\"delete\" data-id=\"{id}\">Delete</button>\
                 <button data-action=\"print\" data-id=\"{id}\">Print</button></td></tr>\n",
                row.number,
                escape(&row.title),
                escape(&row.category),
                escape(&row.date),
            );
        }

        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Archive</title>\n\
             <style>{STYLE}</style>\n</head>\n<body class=\"{}\">\n<table id=\"tableData\">\n\
             <thead><tr><th>No</th><th>Title</th><th>Category</th><th>Date</th><th>File</th><th>Actions</th></tr></thead>\n\
             <tbody>\n{body}</tbody>\n</table>\n</body>\n</html>\n",
            theme.as_str()
        )
    }

    /// Render an aligned plain-text table.
    #[must_use]
    pub fn render_text(&self) -> String {
        if self.rows.is_empty() {
            return format!("{EMPTY_TEXT}\n");
        }

        let header = ["No", "Id", "Title", "Category", "Date", "File"];
        let cells: Vec<[String; 6]> = self
            .rows
            .iter()
            .map(|row| {
                [
                    row.number.to_string(),
                    row.id.to_string(),
                    single_line(&row.title),
                    single_line(&row.category),
                    single_line(&row.date),
                    match &row.file {
                        FileCell::None => "-".to_string(),
                        FileCell::Image { .. } => "[image]".to_string(),
                        FileCell::Link { label, .. } => single_line(label),
                    },
                ]
            })
            .collect();

        let mut widths = header.map(|h| h.chars().count());
        for row in &cells {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        push_line(&mut out, header.iter().map(|h| (*h).to_string()), &widths);
        push_line(&mut out, widths.iter().map(|w| "-".repeat(*w)), &widths);
        for row in cells {
            push_line(&mut out, row.into_iter(), &widths);
        }
        out
    }
}

const STYLE: &str = "body{font-family:Arial;padding:20px} body.dark{background:#1e1e1e;color:#eee} \
table{border-collapse:collapse;width:100%} th,td{border:1px solid #999;padding:6px} \
td.empty{text-align:center;color:#666;padding:12px}";

fn single_line(text: &str) -> String {
    text.replace(['\n', '\r', '\t'], " ")
}

fn push_line(out: &mut String, cells: impl Iterator<Item = String>, widths: &[usize; 6]) {
    let line = cells
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}
