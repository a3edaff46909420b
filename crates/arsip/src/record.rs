//! Archive record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attachment::Attachment;

/// Stable identifier of a record.
///
/// Allocated by the store when a record is created. Unlike the row number
/// shown in the table, it does not shift when earlier records are deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl std::str::FromStr for RecordId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim_start_matches('#').parse().map(Self)
    }
}

/// One archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Stable identifier.
    pub id: RecordId,
    /// Title, non-empty after trimming.
    pub title: String,
    /// Category, non-empty after trimming.
    pub category: String,
    /// Calendar date as entered; only presence is checked.
    pub date: String,
    /// Optional file attachment.
    pub attachment: Option<Attachment>,
    /// When the record was first saved. Edits keep the original value.
    pub created_at: DateTime<Utc>,
}

impl Record {
    /// Create a new record stamped with the current time.
    #[must_use]
    pub fn new(
        id: RecordId,
        title: impl Into<String>,
        category: impl Into<String>,
        date: impl Into<String>,
        attachment: Option<Attachment>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            category: category.into(),
            date: date.into(),
            attachment,
            created_at: Utc::now(),
        }
    }

    /// Whether the record carries an attachment with any content reference.
    #[must_use]
    pub fn has_attachment(&self) -> bool {
        self.attachment.as_ref().is_some_and(Attachment::is_present)
    }
}

/// Serializable summary of a record, used for JSON listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSummary {
    /// Stable identifier.
    pub id: RecordId,
    /// Title.
    pub title: String,
    /// Category.
    pub category: String,
    /// Date as entered.
    pub date: String,
    /// Attachment file name, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Attachment MIME type, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// When the record was first saved.
    pub created_at: DateTime<Utc>,
}

impl From<&Record> for RecordSummary {
    fn from(record: &Record) -> Self {
        let attachment = record.attachment.as_ref();
        Self {
            id: record.id,
            title: record.title.clone(),
            category: record.category.clone(),
            date: record.date.clone(),
            file_name: attachment.and_then(|a| a.file_name.clone()),
            mime_type: attachment.and_then(|a| a.mime_type.clone()),
            created_at: record.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::Blob;

    #[test]
    fn test_record_id_display() {
        assert_eq!(RecordId::new(7).to_string(), "#7");
    }

    #[test]
    fn test_record_id_parse_with_and_without_hash() {
        assert_eq!("3".parse::<RecordId>().unwrap(), RecordId::new(3));
        assert_eq!("#3".parse::<RecordId>().unwrap(), RecordId::new(3));
        assert!("three".parse::<RecordId>().is_err());
    }

    #[test]
    fn test_record_new() {
        let record = Record::new(RecordId::new(1), "Invoice", "Finance", "2024-03-01", None);
        assert_eq!(record.title, "Invoice");
        assert_eq!(record.category, "Finance");
        assert_eq!(record.date, "2024-03-01");
        assert!(record.attachment.is_none());
        assert!(!record.has_attachment());
    }

    #[test]
    fn test_has_attachment_requires_content() {
        let mut record = Record::new(RecordId::new(1), "a", "b", "c", Some(Attachment::default()));
        assert!(!record.has_attachment());

        record.attachment = Some(Attachment {
            blob: Some(Blob::from(b"x".to_vec())),
            ..Attachment::default()
        });
        assert!(record.has_attachment());
    }

    #[test]
    fn test_summary_serialization_skips_missing_attachment() {
        let record = Record::new(RecordId::new(2), "Memo", "Internal", "2024-01-01", None);
        let json = serde_json::to_string(&RecordSummary::from(&record)).unwrap();
        assert!(json.contains("\"id\":2"));
        assert!(!json.contains("file_name"));
    }
}
