//! Form state and validation.

use crate::attachment::SelectedFile;
use crate::error::{Error, Result};
use crate::record::{Record, RecordId};

/// Label of the submit action in create mode.
pub const SAVE_LABEL: &str = "Save";

/// Label of the submit action while editing.
pub const SAVE_CHANGES_LABEL: &str = "Save changes";

/// Values submitted from the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    /// Title field.
    pub title: String,
    /// Category field.
    pub category: String,
    /// Date field.
    pub date: String,
    /// Newly selected file, if any.
    pub file: Option<SelectedFile>,
}

/// Required fields after trimming and presence checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidFields {
    /// Trimmed title.
    pub title: String,
    /// Trimmed category.
    pub category: String,
    /// Trimmed date.
    pub date: String,
}

impl FormValues {
    /// Form values without a file.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        category: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            category: category.into(),
            date: date.into(),
            file: None,
        }
    }

    /// Attach a selected file.
    #[must_use]
    pub fn with_file(mut self, file: SelectedFile) -> Self {
        self.file = Some(file);
        self
    }

    /// Check that title, category and date are non-empty after trimming.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first empty field.
    pub fn validate(&self) -> Result<ValidFields> {
        let required = |field: &'static str, value: &str| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Err(Error::Validation { field })
            } else {
                Ok(trimmed.to_string())
            }
        };

        Ok(ValidFields {
            title: required("title", &self.title)?,
            category: required("category", &self.category)?,
            date: required("date", &self.date)?,
        })
    }
}

/// Whether a submit creates a record or updates one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormMode {
    /// Submitting appends a new record.
    #[default]
    Create,
    /// Submitting overwrites the given record.
    Edit(RecordId),
}

/// Current form contents and mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    mode: FormMode,
    title: String,
    category: String,
    date: String,
}

impl FormState {
    /// An empty form in create mode.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> FormMode {
        self.mode
    }

    /// Id of the record being edited, if any.
    #[must_use]
    pub fn editing(&self) -> Option<RecordId> {
        match self.mode {
            FormMode::Create => None,
            FormMode::Edit(id) => Some(id),
        }
    }

    /// Label for the submit action.
    #[must_use]
    pub fn submit_label(&self) -> &'static str {
        match self.mode {
            FormMode::Create => SAVE_LABEL,
            FormMode::Edit(_) => SAVE_CHANGES_LABEL,
        }
    }

    /// Prefill the fields from a record and switch to edit mode.
    /// The file field cannot be prefilled, so it stays empty.
    pub fn begin_edit(&mut self, record: &Record) {
        self.title.clone_from(&record.title);
        self.category.clone_from(&record.category);
        self.date.clone_from(&record.date);
        self.mode = FormMode::Edit(record.id);
    }

    /// Clear all fields and return to create mode.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Current field values, without a file.
    #[must_use]
    pub fn values(&self) -> FormValues {
        FormValues::new(&self.title, &self.category, &self.date)
    }

    /// Title field.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Category field.
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Date field.
    #[must_use]
    pub fn date(&self) -> &str {
        &self.date
    }
}
