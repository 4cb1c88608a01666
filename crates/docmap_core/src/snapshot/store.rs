//! Last persisted state of managed objects.

use crate::config::Config;
use crate::snapshot::id::ObjectId;
use docmap_codec::Document;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::trace;

#[derive(Debug, Clone)]
struct SnapshotEntry {
    record: Document,
    saved_at: Instant,
}

/// Snapshots of managed objects, keyed by [`ObjectId`].
///
/// A snapshot is the record as it was last read from or written to the
/// store. `get` distinguishes "never seen" (`None`) from "seen with no
/// fields" (`Some` of an empty document).
///
/// When a lifetime is configured, expired snapshots are dropped lazily on
/// read or in bulk by [`SnapshotStore::purge_expired`].
///
/// # Thread Safety
///
/// The store is `Send + Sync`. Operations on different objects do not
/// block each other beyond the short critical section of the map.
#[derive(Debug)]
pub struct SnapshotStore {
    ttl: Option<Duration>,
    entries: RwLock<HashMap<ObjectId, SnapshotEntry>>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl SnapshotStore {
    /// Creates a store using the configured snapshot lifetime.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self::with_ttl(config.snapshot_ttl)
    }

    /// Creates a store with an explicit lifetime (`None` keeps snapshots forever).
    #[must_use]
    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the snapshot lifetime.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Stores the snapshot for an object, replacing any previous one.
    pub fn save(&self, id: ObjectId, record: Document) {
        trace!(id = %id, fields = record.len(), "saving snapshot");
        self.entries.write().insert(
            id,
            SnapshotEntry {
                record,
                saved_at: Instant::now(),
            },
        );
    }

    /// Returns a copy of the snapshot, or `None` if there is no live one.
    pub fn get(&self, id: &ObjectId) -> Option<Document> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            let entry = entries.get(id)?;
            if !self.is_expired(entry, now) {
                return Some(entry.record.clone());
            }
        }

        let mut entries = self.entries.write();
        // a save may have raced in between the two locks
        match entries.get(id) {
            Some(entry) if !self.is_expired(entry, now) => Some(entry.record.clone()),
            Some(_) => {
                entries.remove(id);
                trace!(id = %id, "evicted expired snapshot");
                None
            }
            None => None,
        }
    }

    /// Returns true if the object has a live snapshot.
    pub fn contains(&self, id: &ObjectId) -> bool {
        let now = Instant::now();
        self.entries
            .read()
            .get(id)
            .is_some_and(|entry| !self.is_expired(entry, now))
    }

    /// Drops the snapshot of an object. Returns true if one was stored.
    pub fn delete(&self, id: &ObjectId) -> bool {
        let removed = self.entries.write().remove(id).is_some();
        if removed {
            trace!(id = %id, "deleted snapshot");
        }
        removed
    }

    /// Drops every expired snapshot and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        if self.ttl.is_none() {
            return 0;
        }
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !self.is_expired(entry, now));
        let purged = before - entries.len();
        if purged > 0 {
            trace!(purged, "purged expired snapshots");
        }
        purged
    }

    /// Number of stored snapshots, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if no snapshot is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drops all snapshots.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    fn is_expired(&self, entry: &SnapshotEntry, now: Instant) -> bool {
        self.ttl
            .is_some_and(|ttl| now.saturating_duration_since(entry.saved_at) >= ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmap_codec::Value;
    use std::sync::Arc;
    use std::thread;

    fn record(n: i64) -> Document {
        let mut doc = Document::new();
        doc.insert("n".to_string(), Value::Integer(n));
        doc
    }

    #[test]
    fn save_and_get() {
        let store = SnapshotStore::default();
        let id = ObjectId::new();

        assert!(store.get(&id).is_none());
        store.save(id, record(1));
        assert_eq!(store.get(&id), Some(record(1)));

        store.save(id, record(2));
        assert_eq!(store.get(&id), Some(record(2)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn empty_snapshot_is_not_absent() {
        let store = SnapshotStore::default();
        let id = ObjectId::new();
        store.save(id, Document::new());

        assert_eq!(store.get(&id), Some(Document::new()));
        assert!(store.contains(&id));
    }

    #[test]
    fn delete_is_idempotent() {
        let store = SnapshotStore::default();
        let id = ObjectId::new();
        store.save(id, record(1));

        assert!(store.delete(&id));
        assert!(!store.delete(&id));
        assert!(store.get(&id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn expired_snapshot_is_evicted_on_read() {
        let store = SnapshotStore::with_ttl(Some(Duration::from_millis(20)));
        let id = ObjectId::new();
        store.save(id, record(1));
        assert!(store.contains(&id));

        thread::sleep(Duration::from_millis(40));
        assert!(!store.contains(&id));
        assert_eq!(store.len(), 1);
        assert!(store.get(&id).is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn purge_drops_only_expired() {
        let store = SnapshotStore::with_ttl(Some(Duration::from_millis(30)));
        let old = ObjectId::new();
        store.save(old, record(1));
        thread::sleep(Duration::from_millis(50));

        let fresh = ObjectId::new();
        store.save(fresh, record(2));

        assert_eq!(store.purge_expired(), 1);
        assert!(store.get(&old).is_none());
        assert_eq!(store.get(&fresh), Some(record(2)));
    }

    #[test]
    fn no_ttl_keeps_snapshots() {
        let store = SnapshotStore::new(&Config::new().without_snapshot_ttl());
        let id = ObjectId::new();
        store.save(id, record(1));

        assert_eq!(store.purge_expired(), 0);
        assert!(store.contains(&id));
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn concurrent_access() {
        let store = Arc::new(SnapshotStore::default());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..50 {
                        let id = ObjectId::from_key("things", &format!("{t}-{i}"));
                        store.save(id, record(i));
                        assert_eq!(store.get(&id), Some(record(i)));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 400);
    }
}
