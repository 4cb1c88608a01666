//! Document store interface used by the unit of work.

use crate::error::CoreResult;
use crate::snapshot::ObjectId;
use crate::update::UpdateStatement;
use docmap_codec::Document;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// The database driver as seen by the unit of work.
///
/// Stores are **opaque**: they receive whole records for inserts and
/// update statements for changes, and never see mapped objects.
///
/// # Invariants
///
/// - `update` returns `true` only if the statement was applied
/// - `find` after a successful write returns the written state
/// - Stores must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`InMemoryStore`] - For testing
pub trait DocumentStore: Send + Sync {
    /// Inserts a new record, replacing any record with the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn insert(&self, collection: &str, id: ObjectId, record: &Document) -> CoreResult<()>;

    /// Applies a partial update.
    ///
    /// Returns whether the store acknowledged the write.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement cannot be applied.
    fn update(&self, collection: &str, id: ObjectId, update: &UpdateStatement)
        -> CoreResult<bool>;

    /// Deletes a record. Returns true if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn delete(&self, collection: &str, id: ObjectId) -> CoreResult<bool>;

    /// Reads a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn find(&self, collection: &str, id: ObjectId) -> CoreResult<Option<Document>>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    fn insert(&self, collection: &str, id: ObjectId, record: &Document) -> CoreResult<()> {
        (**self).insert(collection, id, record)
    }

    fn update(
        &self,
        collection: &str,
        id: ObjectId,
        update: &UpdateStatement,
    ) -> CoreResult<bool> {
        (**self).update(collection, id, update)
    }

    fn delete(&self, collection: &str, id: ObjectId) -> CoreResult<bool> {
        (**self).delete(collection, id)
    }

    fn find(&self, collection: &str, id: ObjectId) -> CoreResult<Option<Document>> {
        (**self).find(collection, id)
    }
}

/// An in-memory document store.
///
/// Updates are applied with [`UpdateStatement::apply`]; an update of a
/// missing record is not acknowledged.
///
/// # Example
///
/// ```rust
/// use docmap_codec::{Document, Value};
/// use docmap_core::{DocumentStore, InMemoryStore, ObjectId, UpdateStatement};
///
/// let store = InMemoryStore::new();
/// let id = ObjectId::new();
/// store.insert("users", id, &Document::new()).unwrap();
///
/// let mut update = UpdateStatement::new();
/// update.add_set("name", Value::from("Ada"));
/// assert!(store.update("users", id, &update).unwrap());
/// assert_eq!(
///     store.find("users", id).unwrap().unwrap()["name"],
///     Value::from("Ada")
/// );
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<ObjectId, Document>>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Returns a copy of every record in a collection, ordered by id.
    pub fn records(&self, collection: &str) -> Vec<(ObjectId, Document)> {
        self.collections
            .read()
            .get(collection)
            .map(|records| records.iter().map(|(id, doc)| (*id, doc.clone())).collect())
            .unwrap_or_default()
    }

    /// Removes every record.
    pub fn clear(&self) {
        self.collections.write().clear();
    }
}

impl DocumentStore for InMemoryStore {
    fn insert(&self, collection: &str, id: ObjectId, record: &Document) -> CoreResult<()> {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(id, record.clone());
        Ok(())
    }

    fn update(
        &self,
        collection: &str,
        id: ObjectId,
        update: &UpdateStatement,
    ) -> CoreResult<bool> {
        let mut collections = self.collections.write();
        let Some(record) = collections
            .get_mut(collection)
            .and_then(|records| records.get_mut(&id))
        else {
            return Ok(false);
        };
        update.apply(record)?;
        Ok(true)
    }

    fn delete(&self, collection: &str, id: ObjectId) -> CoreResult<bool> {
        Ok(self
            .collections
            .write()
            .get_mut(collection)
            .is_some_and(|records| records.remove(&id).is_some()))
    }

    fn find(&self, collection: &str, id: ObjectId) -> CoreResult<Option<Document>> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .and_then(|records| records.get(&id).cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmap_codec::Value;

    #[test]
    fn insert_find_delete() {
        let store = InMemoryStore::new();
        let id = ObjectId::new();
        let mut doc = Document::new();
        doc.insert("a".into(), Value::Integer(1));

        store.insert("things", id, &doc).unwrap();
        assert_eq!(store.find("things", id).unwrap(), Some(doc));
        assert_eq!(store.count("things"), 1);

        assert!(store.delete("things", id).unwrap());
        assert!(!store.delete("things", id).unwrap());
        assert!(store.find("things", id).unwrap().is_none());
    }

    #[test]
    fn update_missing_is_not_acknowledged() {
        let store = InMemoryStore::new();
        let mut update = UpdateStatement::new();
        update.add_set("a", Value::Integer(1));

        assert!(!store.update("things", ObjectId::new(), &update).unwrap());
    }

    #[test]
    fn update_errors_leave_record() {
        let store = InMemoryStore::new();
        let id = ObjectId::new();
        let mut doc = Document::new();
        doc.insert("name".into(), Value::from("x"));
        store.insert("things", id, &doc).unwrap();

        let mut update = UpdateStatement::new();
        update.add_inc("name", 1);
        assert!(store.update("things", id, &update).is_err());
        assert_eq!(store.find("things", id).unwrap(), Some(doc));
    }

    #[test]
    fn shared_through_arc() {
        let store = Arc::new(InMemoryStore::new());
        let id = ObjectId::new();
        DocumentStore::insert(&store, "things", id, &Document::new()).unwrap();
        assert_eq!(store.records("things").len(), 1);
    }
}
