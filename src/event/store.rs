//! Bounded, persisted event store
//!
//! Keeps the ordered event records of one logger, enforces the capacity bound
//! and mirrors the full sequence into durable storage after every change.

use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::{json, Value};

use super::{advance_event_ids_past, EventRecord, Severity};
use crate::config::{Capacity, DEFAULT_STORAGE_KEY};
use crate::sinks::{ConsoleSink, StorageError, StorageSink};

/// Ordered, size-bounded sequence of event records
///
/// Storage failures never surface to the caller: they are reported on the
/// console at ERROR and the in-memory state carries on as if they succeeded.
///
/// While nothing has been recorded in memory, reads fall back to the snapshot
/// left by a previous session. The first append of a session replaces that
/// snapshot with the new session's records.
pub struct EventStore {
    records: VecDeque<EventRecord>,
    capacity: Capacity,
    storage: Option<Arc<dyn StorageSink>>,
    key: String,
    console: Arc<dyn ConsoleSink>,
}

impl EventStore {
    /// Create an unbounded store
    ///
    /// Without `storage` the store is memory-only.
    pub fn new(console: Arc<dyn ConsoleSink>, storage: Option<Arc<dyn StorageSink>>) -> Self {
        Self {
            records: VecDeque::new(),
            capacity: Capacity::Unbounded,
            storage,
            key: DEFAULT_STORAGE_KEY.to_string(),
            console,
        }
    }

    /// Use a different storage key for the snapshot
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Start with the given capacity bound
    pub fn with_capacity(mut self, capacity: Capacity) -> Self {
        self.capacity = capacity;
        self
    }

    /// Current capacity bound
    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// Storage key of the snapshot
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether a durable storage sink is attached
    pub fn has_storage(&self) -> bool {
        self.storage.is_some()
    }

    /// Number of records held in memory
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if no records are held in memory
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record a log call
    ///
    /// Returns `None` without creating a record when the capacity is zero.
    pub fn append(&mut self, severity: Severity, message: Value) -> Option<EventRecord> {
        if self.capacity == Capacity::Bounded(0) {
            return None;
        }

        let record = EventRecord::new(severity, message);
        self.records.push_back(record.clone());
        self.enforce_capacity();
        self.mirror();

        Some(record)
    }

    /// Change the capacity bound
    ///
    /// Shrinking below the current length evicts the oldest records at once
    /// and re-mirrors the snapshot.
    pub fn set_capacity(&mut self, capacity: Capacity) {
        self.capacity = capacity;
        if self.enforce_capacity() > 0 {
            self.mirror();
        }
    }

    /// All records, oldest first
    ///
    /// Falls back to the persisted snapshot while nothing is held in memory,
    /// without adopting it. An absent or malformed snapshot yields an empty
    /// sequence.
    pub fn all(&self) -> Vec<EventRecord> {
        if self.records.is_empty() {
            return self.snapshot();
        }
        self.records.iter().cloned().collect()
    }

    /// Remove every record from memory and storage
    pub fn clear(&mut self) {
        self.records.clear();

        if let Some(storage) = &self.storage {
            if let Err(e) = storage.remove(&self.key) {
                self.report("Failed to remove event log from storage:", &e);
            }
        }
    }

    /// Read the persisted snapshot, bounded by the current capacity
    ///
    /// A snapshot over the bound is trimmed and written back.
    fn snapshot(&self) -> Vec<EventRecord> {
        let Some(storage) = &self.storage else {
            return Vec::new();
        };
        let raw = match storage.read(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                self.report("Failed to read event log from storage:", &e);
                return Vec::new();
            }
        };

        let mut loaded: Vec<EventRecord> = match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                tracing::debug!(key = %self.key, error = %e, "Ignoring malformed event log snapshot");
                return Vec::new();
            }
        };

        if let Some(max_id) = loaded.iter().map(|r| r.id).max() {
            advance_event_ids_past(max_id);
        }

        if let Some(limit) = self.capacity.limit() {
            let excess = loaded.len().saturating_sub(limit);
            if excess > 0 {
                loaded.drain(..excess);
                tracing::debug!(key = %self.key, evicted = excess, "Trimmed event log snapshot");
                self.write_snapshot(&loaded);
            }
        }
        loaded
    }

    /// Evict from the head until the bound holds, returning the eviction count
    fn enforce_capacity(&mut self) -> usize {
        let Some(limit) = self.capacity.limit() else {
            return 0;
        };
        let excess = self.records.len().saturating_sub(limit);
        self.records.drain(..excess);
        excess
    }

    /// Best-effort write of the full sequence to storage
    fn mirror(&self) {
        self.write_snapshot(&self.records);
    }

    fn write_snapshot(&self, records: &impl serde::Serialize) {
        let Some(storage) = &self.storage else {
            return;
        };
        let result = serde_json::to_string(records)
            .map_err(StorageError::from)
            .and_then(|snapshot| storage.write(&self.key, &snapshot));

        if let Err(e) = result {
            self.report("Failed to save event log to storage:", &e);
        }
    }

    fn report(&self, context: &str, error: &StorageError) {
        tracing::error!(key = %self.key, error = %error, "{}", context);
        self.console.error(context, &[json!(error.to_string())]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::{BufferedConsole, MemoryStorage};
    use serde_json::json;

    fn memory_store() -> (EventStore, Arc<MemoryStorage>, Arc<BufferedConsole>) {
        let storage = Arc::new(MemoryStorage::new());
        let console = Arc::new(BufferedConsole::default());
        let store = EventStore::new(console.clone(), Some(storage.clone()));
        (store, storage, console)
    }

    fn messages(records: &[EventRecord]) -> Vec<String> {
        records.iter().map(|r| r.message_text()).collect()
    }

    #[test]
    fn test_append_keeps_order_and_mirrors() {
        let (mut store, storage, _) = memory_store();

        store.append(Severity::Log, json!("one"));
        store.append(Severity::Warn, json!("two"));

        assert_eq!(messages(&store.all()), vec!["one", "two"]);

        let raw = storage.read("eventLog").unwrap().unwrap();
        let persisted: Vec<EventRecord> = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted.len(), 2);
        assert_eq!(persisted[1].severity, Severity::Warn);
    }

    #[test]
    fn test_bounded_store_keeps_latest() {
        let (store, _, _) = memory_store();
        let mut store = store.with_capacity(Capacity::Bounded(5));

        for i in 1..=10 {
            store.append(Severity::Log, json!(format!("Event {}", i)));
        }

        assert_eq!(
            messages(&store.all()),
            vec!["Event 6", "Event 7", "Event 8", "Event 9", "Event 10"]
        );
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let (store, storage, _) = memory_store();
        let mut store = store.with_capacity(Capacity::Bounded(0));

        assert!(store.append(Severity::Log, json!("dropped")).is_none());
        assert!(store.all().is_empty());
        assert!(storage.read("eventLog").unwrap().is_none());
    }

    #[test]
    fn test_shrinking_capacity_trims_and_mirrors() {
        let (mut store, storage, _) = memory_store();
        for i in 1..=20 {
            store.append(Severity::Info, json!(i));
        }

        store.set_capacity(Capacity::Bounded(3));

        assert_eq!(messages(&store.all()), vec!["18", "19", "20"]);
        let raw = storage.read("eventLog").unwrap().unwrap();
        let persisted: Vec<EventRecord> = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted.len(), 3);
    }

    #[test]
    fn test_read_through_fallback() {
        let storage = Arc::new(MemoryStorage::new());
        let console = Arc::new(BufferedConsole::default());

        let mut first = EventStore::new(console.clone(), Some(storage.clone()));
        first.append(Severity::Log, json!("from last session"));
        drop(first);

        let mut second = EventStore::new(console, Some(storage));
        assert!(second.is_empty());
        assert_eq!(messages(&second.all()), vec!["from last session"]);
    }

    #[test]
    fn test_new_session_replaces_previous_snapshot() {
        let storage = Arc::new(MemoryStorage::new());
        let console = Arc::new(BufferedConsole::default());

        let mut first = EventStore::new(console.clone(), Some(storage.clone()));
        first.append(Severity::Log, json!("old"));

        let mut second = EventStore::new(console, Some(storage.clone()));
        let record = second.append(Severity::Log, json!("new")).unwrap();

        assert_eq!(messages(&second.all()), vec!["new"]);
        let raw = storage.read("eventLog").unwrap().unwrap();
        let persisted: Vec<EventRecord> = serde_json::from_str(&raw).unwrap();
        assert_eq!(messages(&persisted), vec!["new"]);
        assert!(record.id > first.all()[0].id);
    }

    #[test]
    fn test_fallback_rereads_storage_until_first_append() {
        let storage = Arc::new(MemoryStorage::new());
        let console = Arc::new(BufferedConsole::default());
        let store = EventStore::new(console.clone(), Some(storage.clone()));
        assert!(store.all().is_empty());

        let mut other = EventStore::new(console, Some(storage));
        other.append(Severity::Info, json!("written elsewhere"));

        assert_eq!(messages(&store.all()), vec!["written elsewhere"]);
        assert!(store.is_empty());
    }

    #[test]
    fn test_oversized_snapshot_is_trimmed_and_written_back() {
        let (mut store, storage, _) = memory_store();
        for i in 1..=6 {
            store.append(Severity::Log, json!(format!("Event {}", i)));
        }

        let bounded = EventStore::new(Arc::new(BufferedConsole::default()), Some(storage.clone()))
            .with_capacity(Capacity::Bounded(2));

        assert_eq!(messages(&bounded.all()), vec!["Event 5", "Event 6"]);
        let raw = storage.read("eventLog").unwrap().unwrap();
        let persisted: Vec<EventRecord> = serde_json::from_str(&raw).unwrap();
        assert_eq!(messages(&persisted), vec!["Event 5", "Event 6"]);
    }

    struct UnreadableStorage {
        inner: MemoryStorage,
    }

    impl StorageSink for UnreadableStorage {
        fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Io {
                key: key.to_string(),
                kind: crate::sinks::DiskErrorKind::PermissionDenied,
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        }

        fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.inner.write(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_read_failure_is_reported_and_empty() {
        let console = Arc::new(BufferedConsole::default());
        let storage = Arc::new(UnreadableStorage {
            inner: MemoryStorage::new(),
        });
        let mut store = EventStore::new(console.clone(), Some(storage));

        assert!(store.all().is_empty());
        assert!(console
            .lines_at(Severity::Error)
            .iter()
            .any(|l| l.line == "Failed to read event log from storage:"));

        assert!(store.append(Severity::Log, json!("still works")).is_some());
        assert_eq!(messages(&store.all()), vec!["still works"]);
    }

    #[test]
    fn test_malformed_snapshot_is_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.write("eventLog", "{not json").unwrap();
        let console = Arc::new(BufferedConsole::default());

        let mut store = EventStore::new(console.clone(), Some(storage));
        assert!(store.all().is_empty());
        assert!(console.pending_alerts().is_empty());
    }

    #[test]
    fn test_memory_only_store() {
        let console = Arc::new(BufferedConsole::default());
        let mut store = EventStore::new(console, None);

        assert!(!store.has_storage());
        store.append(Severity::Error, json!("kept in memory"));
        assert_eq!(store.all().len(), 1);
    }

    #[test]
    fn test_storage_failure_is_reported_not_propagated() {
        let storage = Arc::new(MemoryStorage::with_quota(8));
        let console = Arc::new(BufferedConsole::default());
        let mut store = EventStore::new(console.clone(), Some(storage));

        let record = store.append(Severity::Log, json!("too big for the quota"));

        assert!(record.is_some());
        assert_eq!(store.len(), 1);
        let errors = console.lines_at(Severity::Error);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, "Failed to save event log to storage:");
    }

    #[test]
    fn test_clear_is_idempotent_and_removes_snapshot() {
        let (mut store, storage, _) = memory_store();
        store.append(Severity::Log, json!("x"));

        store.clear();
        store.clear();

        assert!(store.all().is_empty());
        assert!(storage.read("eventLog").unwrap().is_none());
    }

    #[test]
    fn test_custom_key() {
        let (store, storage, _) = memory_store();
        let mut store = store.with_key("audit");
        store.append(Severity::Log, json!("x"));

        assert_eq!(store.key(), "audit");
        assert!(storage.read("audit").unwrap().is_some());
        assert!(storage.read("eventLog").unwrap().is_none());
    }
}
