//! Identity map and flush orchestration.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::mapping::{CollectionMetadata, DocumentMapper, MetadataRegistry};
use crate::snapshot::{ObjectId, SnapshotStore};
use crate::store::DocumentStore;
use crate::update::{DiffEngine, TargetDocument, UpdateStatement};
use docmap_codec::{Document, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of a [`UnitOfWork::flush`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Records inserted.
    pub inserted: usize,
    /// Records partially updated.
    pub updated: usize,
    /// Records deleted.
    pub deleted: usize,
    /// Managed objects with nothing to write.
    pub unchanged: usize,
}

impl FlushReport {
    /// Number of writes sent to the store.
    pub fn writes(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }
}

#[derive(Debug)]
enum EntryState {
    /// Not yet in the store.
    New(TargetDocument),
    /// Matches its snapshot.
    Clean,
    /// Persisted with a state that may differ from the snapshot.
    Dirty(TargetDocument),
    /// Scheduled for deletion.
    Removed,
}

#[derive(Debug)]
struct ManagedEntry {
    collection: &'static str,
    state: EntryState,
}

/// Tracks managed objects and writes their changes.
///
/// Objects become managed through [`UnitOfWork::load`] or
/// [`UnitOfWork::persist`]. `persist` records the object's state at the time
/// of the call; [`UnitOfWork::flush`] then inserts new objects, sends the diff
/// against the snapshot for changed ones and deletes removed ones.
///
/// After every successful write the snapshot is replaced by the written
/// record. A write the store does not acknowledge keeps the old snapshot and
/// the pending state, so the next flush retries it.
///
/// # Example
///
/// ```rust,ignore
/// let mut uow = UnitOfWork::new(store, registry, &Config::default());
/// let mut user: User = uow.load(id)?;
/// user.name = "Ada".into();
/// uow.persist(&user)?;
/// let report = uow.flush()?;
/// assert_eq!(report.updated, 1);
/// ```
pub struct UnitOfWork<S: DocumentStore> {
    store: Arc<S>,
    registry: Arc<MetadataRegistry>,
    snapshots: Arc<SnapshotStore>,
    engine: DiffEngine,
    managed: BTreeMap<ObjectId, ManagedEntry>,
}

impl<S: DocumentStore> UnitOfWork<S> {
    /// Creates a unit of work with its own snapshot store.
    pub fn new(store: Arc<S>, registry: Arc<MetadataRegistry>, config: &Config) -> Self {
        Self::with_snapshots(store, registry, Arc::new(SnapshotStore::new(config)), config)
    }

    /// Creates a unit of work sharing an existing snapshot store.
    pub fn with_snapshots(
        store: Arc<S>,
        registry: Arc<MetadataRegistry>,
        snapshots: Arc<SnapshotStore>,
        config: &Config,
    ) -> Self {
        Self {
            store,
            registry,
            snapshots,
            engine: DiffEngine::new(config),
            managed: BTreeMap::new(),
        }
    }

    /// Returns the snapshot store.
    pub fn snapshots(&self) -> &Arc<SnapshotStore> {
        &self.snapshots
    }

    /// Returns the document store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns true if the object is tracked.
    pub fn is_managed(&self, id: &ObjectId) -> bool {
        self.managed.contains_key(id)
    }

    /// Number of tracked objects.
    pub fn managed_count(&self) -> usize {
        self.managed.len()
    }

    /// Records the current state of an object for the next flush.
    ///
    /// Untracked objects are scheduled for insertion. Calling `persist` on
    /// an object scheduled for removal cancels the removal.
    pub fn persist<M: DocumentMapper>(&mut self, entity: &M) -> CoreResult<ObjectId> {
        self.registry.get(M::collection())?;
        let id = entity.object_id();
        let target = entity.to_target()?;

        match self.managed.get_mut(&id) {
            Some(entry) => {
                entry.state = match entry.state {
                    EntryState::New(_) => EntryState::New(target),
                    _ => EntryState::Dirty(target),
                };
            }
            None => {
                self.managed.insert(
                    id,
                    ManagedEntry {
                        collection: M::collection(),
                        state: EntryState::New(target),
                    },
                );
            }
        }
        Ok(id)
    }

    /// Reads an object from the store and starts tracking it.
    ///
    /// An object that is already tracked with unflushed changes keeps them:
    /// its pending state and snapshot are left alone.
    pub fn load<M: DocumentMapper>(&mut self, id: ObjectId) -> CoreResult<M> {
        let collection = M::collection();
        self.registry.get(collection)?;
        let record = self
            .store
            .find(collection, id)?
            .ok_or_else(|| CoreError::ObjectNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        let entity = M::from_document(id, &record)?;
        let pending = self
            .managed
            .get(&id)
            .is_some_and(|entry| !matches!(entry.state, EntryState::Clean));
        if pending {
            warn!(collection, id = %id, "loaded object has unflushed changes, keeping them");
        } else {
            self.snapshots.save(id, record);
            self.managed.insert(
                id,
                ManagedEntry {
                    collection,
                    state: EntryState::Clean,
                },
            );
            debug!(collection, id = %id, "loaded object");
        }
        Ok(entity)
    }

    /// Schedules a tracked object for deletion.
    ///
    /// An object that was never written is simply forgotten.
    pub fn remove<M: DocumentMapper>(&mut self, entity: &M) -> CoreResult<()> {
        let id = entity.object_id();
        let entry = self.managed.get_mut(&id).ok_or_else(|| CoreError::NotManaged {
            id: id.to_string(),
        })?;

        if matches!(entry.state, EntryState::New(_)) {
            self.managed.remove(&id);
        } else {
            entry.state = EntryState::Removed;
        }
        Ok(())
    }

    /// Stops tracking an object and drops its snapshot. Returns true if it
    /// was tracked.
    pub fn detach(&mut self, id: &ObjectId) -> bool {
        self.snapshots.delete(id);
        self.managed.remove(id).is_some()
    }

    /// Computes the update a flush would send for the object's current state.
    ///
    /// Untracked objects and objects without a snapshot diff against nothing.
    pub fn pending_update<M: DocumentMapper>(&self, entity: &M) -> CoreResult<UpdateStatement> {
        let metadata = self.registry.get(M::collection())?;
        let (statement, _) = self.diff_snapshot(entity.object_id(), metadata, entity.to_target()?)?;
        Ok(statement)
    }

    /// Writes every pending change.
    ///
    /// Objects are flushed in id order. On error the flush stops; objects
    /// flushed before the failure stay written and clean.
    pub fn flush(&mut self) -> CoreResult<FlushReport> {
        let mut report = FlushReport::default();
        let registry = Arc::clone(&self.registry);
        let ids: Vec<ObjectId> = self.managed.keys().copied().collect();

        for id in ids {
            let Some(entry) = self.managed.get(&id) else {
                continue;
            };
            let collection = entry.collection;
            let metadata = registry.get(collection)?;

            match &entry.state {
                EntryState::Clean => report.unchanged += 1,
                EntryState::New(target) => {
                    let mut record = target.to_document();
                    record
                        .entry(metadata.id_field.clone())
                        .or_insert_with(|| Value::Text(id.to_string()));
                    self.store.insert(collection, id, &record)?;
                    debug!(collection, id = %id, "inserted");
                    self.snapshots.save(id, record);
                    self.mark_clean(&id);
                    report.inserted += 1;
                }
                EntryState::Dirty(target) => {
                    let (statement, snapshot) = self.diff_snapshot(id, metadata, target.clone())?;
                    if statement.is_empty() {
                        report.unchanged += 1;
                    } else {
                        self.write_update(collection, metadata, id, snapshot, &statement)?;
                        report.updated += 1;
                    }
                    self.mark_clean(&id);
                }
                EntryState::Removed => {
                    self.store.delete(collection, id)?;
                    debug!(collection, id = %id, "deleted");
                    self.snapshots.delete(&id);
                    self.managed.remove(&id);
                    report.deleted += 1;
                }
            }
        }

        debug!(
            inserted = report.inserted,
            updated = report.updated,
            deleted = report.deleted,
            unchanged = report.unchanged,
            "flush complete"
        );
        Ok(report)
    }

    fn write_update(
        &self,
        collection: &str,
        metadata: &CollectionMetadata,
        id: ObjectId,
        snapshot: Option<Document>,
        statement: &UpdateStatement,
    ) -> CoreResult<()> {
        if !self.store.update(collection, id, statement)? {
            return Err(CoreError::WriteNotAcknowledged {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        debug!(collection, id = %id, operations = statement.len(), "updated");

        // apply to the record the diff was computed against
        let mut record = snapshot.unwrap_or_default();
        statement.apply(&mut record)?;
        record
            .entry(metadata.id_field.clone())
            .or_insert_with(|| Value::Text(id.to_string()));
        self.snapshots.save(id, record);
        Ok(())
    }

    /// Diffs the target against the current snapshot.
    ///
    /// Returns the statement together with the snapshot it was computed
    /// against.
    fn diff_snapshot(
        &self,
        id: ObjectId,
        metadata: &CollectionMetadata,
        mut target: TargetDocument,
    ) -> CoreResult<(UpdateStatement, Option<Document>)> {
        target.remove(&metadata.id_field);
        let snapshot = self.snapshots.get(&id);
        let base: Option<Document> = snapshot.as_ref().map(|record| {
            let mut record = record.clone();
            record.remove(&metadata.id_field);
            record
        });
        if base.is_none() && self.is_managed(&id) {
            debug!(id = %id, "no snapshot, diffing against an empty record");
        }
        let statement = self.engine.compute_update(base.as_ref(), &target)?;
        Ok((statement, snapshot))
    }

    fn mark_clean(&mut self, id: &ObjectId) {
        if let Some(entry) = self.managed.get_mut(id) {
            entry.state = EntryState::Clean;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: ObjectId,
        text: String,
        tags: Vec<String>,
    }

    impl Note {
        fn new(text: &str) -> Self {
            Self {
                id: ObjectId::new(),
                text: text.to_string(),
                tags: Vec::new(),
            }
        }
    }

    impl DocumentMapper for Note {
        fn collection() -> &'static str {
            "notes"
        }

        fn object_id(&self) -> ObjectId {
            self.id
        }

        fn to_document(&self) -> CoreResult<Document> {
            let mut doc = Document::new();
            doc.insert("text".into(), Value::from(self.text.as_str()));
            doc.insert(
                "tags".into(),
                Value::Array(self.tags.iter().map(|t| Value::from(t.as_str())).collect()),
            );
            Ok(doc)
        }

        fn from_document(id: ObjectId, doc: &Document) -> CoreResult<Self> {
            let text = doc
                .get("text")
                .and_then(Value::as_text)
                .ok_or_else(|| CoreError::mapping("missing text"))?
                .to_string();
            let tags = doc
                .get("tags")
                .and_then(Value::as_array)
                .unwrap_or_default()
                .iter()
                .filter_map(|t| t.as_text().map(str::to_string))
                .collect();
            Ok(Note { id, text, tags })
        }
    }

    fn unit_of_work() -> UnitOfWork<InMemoryStore> {
        let registry = MetadataRegistry::new().with(CollectionMetadata::new("notes"));
        UnitOfWork::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(registry),
            &Config::default(),
        )
    }

    #[test]
    fn persist_new_inserts_with_id_field() {
        let mut uow = unit_of_work();
        let note = Note::new("hello");

        uow.persist(&note).unwrap();
        let report = uow.flush().unwrap();
        assert_eq!(report.inserted, 1);

        let stored = uow.store().find("notes", note.id).unwrap().unwrap();
        assert_eq!(stored["_id"], Value::Text(note.id.to_string()));
        assert_eq!(uow.snapshots().get(&note.id), Some(stored));

        // nothing left to do
        let report = uow.flush().unwrap();
        assert_eq!(report.writes(), 0);
        assert_eq!(report.unchanged, 1);
    }

    #[test]
    fn changes_are_sent_as_partial_updates() {
        let mut uow = unit_of_work();
        let mut note = Note::new("hello");
        uow.persist(&note).unwrap();
        uow.flush().unwrap();

        note.text = "hello world".into();
        note.tags.push("greeting".into());

        let pending = uow.pending_update(&note).unwrap();
        assert_eq!(pending.set().unwrap()["text"], Value::from("hello world"));
        assert!(pending.set().unwrap().get("_id").is_none());

        uow.persist(&note).unwrap();
        let report = uow.flush().unwrap();
        assert_eq!(report.updated, 1);

        let stored = uow.store().find("notes", note.id).unwrap().unwrap();
        assert_eq!(stored["text"], Value::from("hello world"));
        assert_eq!(stored["tags"], Value::Array(vec![Value::from("greeting")]));
        assert_eq!(uow.snapshots().get(&note.id), Some(stored));
        assert!(uow.pending_update(&note).unwrap().is_empty());
    }

    #[test]
    fn load_tracks_and_hydrates() {
        let mut uow = unit_of_work();
        let note = Note::new("stored");
        uow.persist(&note).unwrap();
        uow.flush().unwrap();
        uow.detach(&note.id);
        assert!(!uow.is_managed(&note.id));
        assert!(uow.snapshots().get(&note.id).is_none());

        let loaded: Note = uow.load(note.id).unwrap();
        assert_eq!(loaded, note);
        assert!(uow.is_managed(&note.id));
        assert!(uow.snapshots().contains(&note.id));
    }

    #[test]
    fn load_missing_is_not_found() {
        let mut uow = unit_of_work();
        assert!(matches!(
            uow.load::<Note>(ObjectId::new()),
            Err(CoreError::ObjectNotFound { .. })
        ));
    }

    #[test]
    fn remove_deletes_on_flush() {
        let mut uow = unit_of_work();
        let note = Note::new("bye");
        uow.persist(&note).unwrap();
        uow.flush().unwrap();

        uow.remove(&note).unwrap();
        let report = uow.flush().unwrap();
        assert_eq!(report.deleted, 1);
        assert!(!uow.is_managed(&note.id));
        assert!(uow.snapshots().get(&note.id).is_none());
        assert!(uow.store().find("notes", note.id).unwrap().is_none());
    }

    #[test]
    fn remove_of_unwritten_object_forgets_it() {
        let mut uow = unit_of_work();
        let note = Note::new("draft");
        uow.persist(&note).unwrap();
        uow.remove(&note).unwrap();

        assert_eq!(uow.flush().unwrap(), FlushReport::default());
        assert_eq!(uow.store().count("notes"), 0);
    }

    #[test]
    fn remove_unmanaged_fails() {
        let mut uow = unit_of_work();
        assert!(matches!(
            uow.remove(&Note::new("x")),
            Err(CoreError::NotManaged { .. })
        ));
    }

    #[test]
    fn unknown_collection_is_rejected() {
        let mut uow = UnitOfWork::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(MetadataRegistry::new()),
            &Config::default(),
        );
        assert!(matches!(
            uow.persist(&Note::new("x")),
            Err(CoreError::UnknownCollection { .. })
        ));
    }

    #[test]
    fn unacknowledged_update_keeps_snapshot() {
        let mut uow = unit_of_work();
        let mut note = Note::new("before");
        uow.persist(&note).unwrap();
        uow.flush().unwrap();
        let snapshot = uow.snapshots().get(&note.id);

        // the record disappears behind our back
        uow.store().delete("notes", note.id).unwrap();

        note.text = "after".into();
        uow.persist(&note).unwrap();
        assert!(matches!(
            uow.flush(),
            Err(CoreError::WriteNotAcknowledged { .. })
        ));
        assert_eq!(uow.snapshots().get(&note.id), snapshot);
        assert!(!uow.pending_update(&note).unwrap().is_empty());
    }

    /// Store that drops every snapshot while an update is in flight, as an
    /// expiry or another unit of work sharing the snapshots would.
    struct ExpiringStore {
        inner: InMemoryStore,
        snapshots: Arc<SnapshotStore>,
    }

    impl DocumentStore for ExpiringStore {
        fn insert(&self, collection: &str, id: ObjectId, record: &Document) -> CoreResult<()> {
            self.inner.insert(collection, id, record)
        }

        fn update(
            &self,
            collection: &str,
            id: ObjectId,
            update: &UpdateStatement,
        ) -> CoreResult<bool> {
            self.snapshots.clear();
            self.inner.update(collection, id, update)
        }

        fn delete(&self, collection: &str, id: ObjectId) -> CoreResult<bool> {
            self.inner.delete(collection, id)
        }

        fn find(&self, collection: &str, id: ObjectId) -> CoreResult<Option<Document>> {
            self.inner.find(collection, id)
        }
    }

    #[test]
    fn snapshot_after_update_is_the_full_record() {
        let config = Config::default();
        let snapshots = Arc::new(SnapshotStore::new(&config));
        let store = ExpiringStore {
            inner: InMemoryStore::new(),
            snapshots: Arc::clone(&snapshots),
        };
        let registry = MetadataRegistry::new().with(CollectionMetadata::new("notes"));
        let mut uow =
            UnitOfWork::with_snapshots(Arc::new(store), Arc::new(registry), snapshots, &config);

        let mut note = Note::new("before");
        note.tags.push("keep".into());
        uow.persist(&note).unwrap();
        uow.flush().unwrap();

        note.text = "changed".into();
        uow.persist(&note).unwrap();
        assert_eq!(uow.flush().unwrap().updated, 1);

        let stored = uow.store().inner.find("notes", note.id).unwrap().unwrap();
        assert_eq!(stored["tags"], Value::Array(vec![Value::from("keep")]));
        assert_eq!(uow.snapshots().get(&note.id), Some(stored));

        // later removals still diff against the untouched fields
        note.tags.clear();
        let pending = uow.pending_update(&note).unwrap();
        assert!(pending.unset().unwrap().contains("tags.0"));
    }

    #[test]
    fn load_keeps_unflushed_changes() {
        let mut uow = unit_of_work();
        let mut note = Note::new("stored");
        uow.persist(&note).unwrap();
        uow.flush().unwrap();

        note.text = "edited".into();
        uow.persist(&note).unwrap();
        let loaded: Note = uow.load(note.id).unwrap();
        assert_eq!(loaded.text, "stored");

        assert_eq!(uow.flush().unwrap().updated, 1);
        let stored = uow.store().find("notes", note.id).unwrap().unwrap();
        assert_eq!(stored["text"], Value::from("edited"));
    }
}
