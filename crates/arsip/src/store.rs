//! In-memory record store.
//!
//! Records are kept in insertion order. Each record also has a stable id,
//! and the store maintains an id-to-position index alongside the sequence so
//! that callers can address records without relying on row numbers.

use std::collections::HashMap;

use tracing::trace;

use crate::error::{Error, Result};
use crate::record::{Record, RecordId};

/// Ordered, in-memory collection of records.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: Vec<Record>,
    positions: HashMap<RecordId, usize>,
    last_id: u64,
}

impl RecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh id. Ids are never reused.
    pub fn allocate_id(&mut self) -> RecordId {
        self.last_id += 1;
        RecordId::new(self.last_id)
    }

    /// Append a record.
    ///
    /// # Errors
    ///
    /// Returns an internal error if a record with the same id already exists.
    pub fn add(&mut self, record: Record) -> Result<()> {
        if self.positions.contains_key(&record.id) {
            return Err(Error::internal(format!("duplicate record id {}", record.id)));
        }
        self.last_id = self.last_id.max(record.id.get());
        self.positions.insert(record.id, self.records.len());
        trace!(id = %record.id, position = self.records.len(), "Appended record");
        self.records.push(record);
        Ok(())
    }

    /// Overwrite the record at `index`, returning the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RowOutOfRange`] if `index` is out of bounds, or an
    /// internal error if the new record's id belongs to another row. The
    /// store is left unchanged in both cases.
    pub fn replace_at(&mut self, index: usize, record: Record) -> Result<Record> {
        let len = self.records.len();
        let slot = self
            .records
            .get_mut(index)
            .ok_or(Error::RowOutOfRange { index, len })?;

        if slot.id != record.id && self.positions.contains_key(&record.id) {
            return Err(Error::internal(format!("duplicate record id {}", record.id)));
        }

        let previous = std::mem::replace(slot, record);
        if previous.id != slot.id {
            self.last_id = self.last_id.max(slot.id.get());
            self.positions.remove(&previous.id);
            self.positions.insert(slot.id, index);
        }
        Ok(previous)
    }

    /// Remove the record at `index`, shifting later records down by one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RowOutOfRange`] if `index` is out of bounds.
    pub fn remove_at(&mut self, index: usize) -> Result<Record> {
        let len = self.records.len();
        if index >= len {
            return Err(Error::RowOutOfRange { index, len });
        }
        let removed = self.records.remove(index);
        self.positions.remove(&removed.id);
        for (position, record) in self.records.iter().enumerate().skip(index) {
            self.positions.insert(record.id, position);
        }
        Ok(removed)
    }

    /// Current position of a record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordNotFound`] if no record has this id.
    pub fn position(&self, id: RecordId) -> Result<usize> {
        self.positions
            .get(&id)
            .copied()
            .ok_or(Error::RecordNotFound { id })
    }

    /// Look up a record by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordNotFound`] if no record has this id.
    pub fn get(&self, id: RecordId) -> Result<&Record> {
        let position = self.position(id)?;
        Ok(&self.records[position])
    }

    /// Mutable lookup by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordNotFound`] if no record has this id.
    pub fn get_mut(&mut self, id: RecordId) -> Result<&mut Record> {
        let position = self.position(id)?;
        Ok(&mut self.records[position])
    }

    /// Replace the record with the given id, keeping its position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordNotFound`] if no record has this id.
    pub fn replace(&mut self, id: RecordId, record: Record) -> Result<Record> {
        let position = self.position(id)?;
        self.replace_at(position, record)
    }

    /// Remove the record with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordNotFound`] if no record has this id.
    pub fn remove(&mut self, id: RecordId) -> Result<Record> {
        let position = self.position(id)?;
        self.remove_at(position)
    }

    /// Record at a zero-based position.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    /// Iterate over records in store order. The iterator is cheap to clone,
    /// so a consumer can restart it without touching the store.
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Mutable iteration, used to release handles at shutdown.
    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Record> {
        self.records.iter_mut()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a RecordStore {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(store: &mut RecordStore, title: &str) -> RecordId {
        let id = store.allocate_id();
        store
            .add(Record::new(id, title, "General", "2024-01-01", None))
            .unwrap();
        id
    }

    fn titles(store: &RecordStore) -> Vec<&str> {
        store.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let mut store = RecordStore::new();
        push(&mut store, "a");
        push(&mut store, "b");
        push(&mut store, "c");
        assert_eq!(titles(&store), vec!["a", "b", "c"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut store = RecordStore::new();
        let a = push(&mut store, "a");
        store.remove(a).unwrap();
        let b = push(&mut store, "b");
        assert_ne!(a, b);
    }

    #[test]
    fn test_add_rejects_duplicate_id() {
        let mut store = RecordStore::new();
        let id = push(&mut store, "a");
        let dup = Record::new(id, "b", "c", "d", None);
        assert!(store.add(dup).is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_replace_at_out_of_bounds_is_noop() {
        let mut store = RecordStore::new();
        push(&mut store, "a");
        let id = store.allocate_id();
        let err = store
            .replace_at(5, Record::new(id, "x", "y", "z", None))
            .unwrap_err();
        assert!(matches!(err, Error::RowOutOfRange { index: 5, len: 1 }));
        assert_eq!(titles(&store), vec!["a"]);
    }

    #[test]
    fn test_replace_at_rejects_id_of_another_row() {
        let mut store = RecordStore::new();
        let a = push(&mut store, "a");
        let b = push(&mut store, "b");

        let err = store
            .replace_at(0, Record::new(b, "x", "y", "z", None))
            .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));

        let ids: Vec<RecordId> = store.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(titles(&store), vec!["a", "b"]);
        assert_eq!(store.position(a).unwrap(), 0);
        assert_eq!(store.position(b).unwrap(), 1);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut store = RecordStore::new();
        push(&mut store, "a");
        let b = push(&mut store, "b");
        push(&mut store, "c");

        let previous = store
            .replace(b, Record::new(b, "B", "General", "2024-01-01", None))
            .unwrap();
        assert_eq!(previous.title, "b");
        assert_eq!(titles(&store), vec!["a", "B", "c"]);
        assert_eq!(store.position(b).unwrap(), 1);
    }

    #[test]
    fn test_remove_at_shifts_positions() {
        let mut store = RecordStore::new();
        push(&mut store, "a");
        let b = push(&mut store, "b");
        let c = push(&mut store, "c");

        let removed = store.remove_at(0).unwrap();
        assert_eq!(removed.title, "a");
        assert_eq!(store.position(b).unwrap(), 0);
        assert_eq!(store.position(c).unwrap(), 1);
        assert_eq!(store.at(0).unwrap().id, b);
    }

    #[test]
    fn test_remove_at_out_of_bounds() {
        let mut store = RecordStore::new();
        assert!(matches!(
            store.remove_at(0),
            Err(Error::RowOutOfRange { index: 0, len: 0 })
        ));
    }

    #[test]
    fn test_remove_by_id_keeps_other_ids_addressable() {
        let mut store = RecordStore::new();
        let a = push(&mut store, "a");
        let b = push(&mut store, "b");
        let c = push(&mut store, "c");

        store.remove(b).unwrap();
        assert_eq!(store.get(a).unwrap().title, "a");
        assert_eq!(store.get(c).unwrap().title, "c");
        assert!(store.get(b).unwrap_err().is_lookup_failure());
    }

    #[test]
    fn test_iter_is_restartable() {
        let mut store = RecordStore::new();
        push(&mut store, "a");
        push(&mut store, "b");

        let iter = store.iter();
        let first: Vec<_> = iter.clone().map(|r| r.id).collect();
        let second: Vec<_> = iter.map(|r| r.id).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_get_mut() {
        let mut store = RecordStore::new();
        let a = push(&mut store, "a");
        store.get_mut(a).unwrap().title = "changed".to_string();
        assert_eq!(store.get(a).unwrap().title, "changed");
    }

    #[test]
    fn test_empty_store() {
        let store = RecordStore::new();
        assert!(store.is_empty());
        assert!(store.at(0).is_none());
        assert_eq!((&store).into_iter().count(), 0);
    }
}
