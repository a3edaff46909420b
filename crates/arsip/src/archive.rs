//! The archive controller.
//!
//! [`Archive`] owns the record store, the attachment resolver and the form
//! state. Every user action is a method on it and runs to completion before
//! the next one starts; the only work that outlives a call is a print, which
//! receives an owned [`PrintJob`] snapshot.

use tracing::{debug, info};

use crate::attachment::DisplayHandle;
use crate::error::Result;
use crate::form::{FormMode, FormState, FormValues};
use crate::print::PrintJob;
use crate::record::{Record, RecordId};
use crate::resolver::{AttachmentResolver, HandleProvider};
use crate::store::RecordStore;
use crate::table::TableView;

/// Outcome of a successful submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitted {
    /// A new record was appended.
    Created(RecordId),
    /// An existing record was overwritten.
    Updated(RecordId),
}

impl Submitted {
    /// Id of the affected record.
    #[must_use]
    pub fn id(self) -> RecordId {
        match self {
            Self::Created(id) | Self::Updated(id) => id,
        }
    }
}

/// Application state for one session.
#[derive(Debug)]
pub struct Archive<P> {
    store: RecordStore,
    resolver: AttachmentResolver<P>,
    form: FormState,
}

impl<P: HandleProvider> Archive<P> {
    /// Empty archive using `provider` for display handles.
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self {
            store: RecordStore::new(),
            resolver: AttachmentResolver::new(provider),
            form: FormState::new(),
        }
    }

    /// The records.
    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// The attachment resolver.
    #[must_use]
    pub fn resolver(&self) -> &AttachmentResolver<P> {
        &self.resolver
    }

    /// The form.
    #[must_use]
    pub fn form(&self) -> &FormState {
        &self.form
    }

    /// Save the form.
    ///
    /// In create mode a new record is appended. In edit mode the record
    /// being edited is overwritten; it keeps its attachment unless `values`
    /// carries a new file, in which case the old display handle is revoked.
    /// The form returns to create mode afterwards.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a required field is empty, or a lookup
    /// failure if the record being edited no longer exists. Nothing is
    /// changed in either case.
    pub fn submit(&mut self, values: FormValues) -> Result<Submitted> {
        let fields = values.validate()?;

        let outcome = match self.form.mode() {
            FormMode::Create => {
                let attachment = values.file.map(|file| self.resolver.resolve(file));
                let id = self.store.allocate_id();
                let record = Record::new(id, fields.title, fields.category, fields.date, attachment);
                self.store.add(record)?;
                info!(id = %id, "Record created");
                Submitted::Created(id)
            }
            FormMode::Edit(id) => {
                // Look up first so a missing record never leaks a new handle.
                let previous = self.store.get(id)?;
                let created_at = previous.created_at;
                let mut attachment = previous.attachment.clone();
                let mut stale: Option<DisplayHandle> = None;

                if let Some(file) = values.file {
                    let replacement = self.resolver.resolve(file);
                    let old_handle = attachment.and_then(|a| a.display_handle);
                    stale = old_handle.filter(|old| replacement.display_handle.as_ref() != Some(old));
                    attachment = Some(replacement);
                }

                self.store.replace(
                    id,
                    Record {
                        id,
                        title: fields.title,
                        category: fields.category,
                        date: fields.date,
                        attachment,
                        created_at,
                    },
                )?;
                if let Some(handle) = stale {
                    self.resolver.revoke(&handle);
                }
                info!(id = %id, "Record updated");
                Submitted::Updated(id)
            }
        };

        self.form.reset();
        Ok(outcome)
    }

    /// Load a record into the form for editing.
    ///
    /// # Errors
    ///
    /// Returns a lookup failure if the record does not exist.
    pub fn begin_edit(&mut self, id: RecordId) -> Result<&FormState> {
        let record = self.store.get(id)?;
        self.form.begin_edit(record);
        debug!(id = %id, "Editing record");
        Ok(&self.form)
    }

    /// Abandon the form without touching the store.
    pub fn cancel(&mut self) {
        self.form.reset();
    }

    /// Delete a record and revoke its display handle.
    ///
    /// Deleting the record currently being edited also cancels the edit.
    ///
    /// # Errors
    ///
    /// Returns a lookup failure if the record does not exist.
    pub fn delete(&mut self, id: RecordId) -> Result<Record> {
        let removed = self.store.remove(id)?;
        if let Some(handle) = removed
            .attachment
            .as_ref()
            .and_then(|a| a.display_handle.as_ref())
        {
            self.resolver.revoke(handle);
        }
        if self.form.editing() == Some(id) {
            self.form.reset();
            debug!(id = %id, "Deleted record was being edited, form reset");
        }
        info!(id = %id, "Record deleted");
        Ok(removed)
    }

    /// Snapshot a record for printing.
    ///
    /// An attachment that has bytes but no display handle gets one derived
    /// here and stored on the record, so it is revoked like any other.
    ///
    /// # Errors
    ///
    /// Returns a lookup failure if the record does not exist.
    pub fn print_job(&mut self, id: RecordId) -> Result<PrintJob> {
        let record = self.store.get_mut(id)?;
        if let Some(attachment) = record.attachment.as_mut() {
            if attachment.display_handle.is_none() {
                attachment.display_handle = self.resolver.derive_handle(attachment);
            }
        }
        Ok(PrintJob::new(record.clone()))
    }

    /// Project the store into a table.
    #[must_use]
    pub fn table(&self) -> TableView {
        TableView::project(&self.store)
    }

    /// Revoke every live display handle. Records stay in place without
    /// handles. Returns the number revoked.
    pub fn shutdown(&mut self) -> usize {
        let mut revoked = 0;
        for record in self.store.iter_mut() {
            let handle = record
                .attachment
                .as_mut()
                .and_then(|a| a.display_handle.take());
            if let Some(handle) = handle {
                self.resolver.revoke(&handle);
                revoked += 1;
            }
        }
        info!(revoked, "Archive shut down");
        revoked
    }
}
