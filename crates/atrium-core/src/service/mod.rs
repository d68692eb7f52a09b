//! Domain layer over the synchronized collections
//!
//! One in-memory authoritative copy of each collection, loaded lazily from
//! storage, plus the business rules that must hold after any local mutation
//! or remote apply. All writes funnel through here: validate, mutate a
//! working copy, persist, install, publish. The state lock is held across
//! the storage await, so every operation is atomic from the caller's point
//! of view.

mod alerts;
mod hierarchy;
mod rooms;

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::sync::{broadcast, Mutex};

use crate::error::{Error, Result};
use crate::events::{ChangeEvent, EventBus};
use crate::models::{CollectionKey, Record, RecordId, SystemId};
use crate::storage::{Snapshot, SnapshotMeta, StorageAdapter};
use crate::sync::{content_hash, detect, Detection, SyncTracker};

#[derive(Debug, Default)]
struct ServiceState {
    collections: HashMap<CollectionKey, Vec<Record>>,
}

/// Thread-safe domain service shared by the engine, subscriptions, and the
/// operator CLI.
#[derive(Clone)]
pub struct DataService {
    storage: Arc<dyn StorageAdapter>,
    bus: Arc<EventBus>,
    tracker: Arc<SyncTracker>,
    system_id: SystemId,
    state: Arc<Mutex<ServiceState>>,
}

impl DataService {
    /// Create a service over the given storage medium.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageAdapter>, system_id: SystemId) -> Self {
        Self {
            storage,
            bus: Arc::new(EventBus::new()),
            tracker: Arc::new(SyncTracker::new()),
            system_id,
            state: Arc::new(Mutex::new(ServiceState::default())),
        }
    }

    /// The storage medium this service persists to
    #[must_use]
    pub fn storage(&self) -> Arc<dyn StorageAdapter> {
        Arc::clone(&self.storage)
    }

    /// The sync bookkeeping shared with the engine
    #[must_use]
    pub fn tracker(&self) -> Arc<SyncTracker> {
        Arc::clone(&self.tracker)
    }

    /// This instance's identity
    #[must_use]
    pub const fn system_id(&self) -> SystemId {
        self.system_id
    }

    /// Open a subscription to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.bus.subscribe()
    }

    /// Current records of a collection, in stored order.
    ///
    /// Meeting rooms are swept for expired bookings on every read.
    pub async fn records(&self, key: CollectionKey) -> Result<Vec<Record>> {
        let mut state = self.state.lock().await;
        let records = self.loaded(&mut state, key).await?;
        if key == CollectionKey::MeetingRooms {
            rooms::sweep_rooms(records, Utc::now());
        }
        Ok(records.clone())
    }

    /// Fetch a single record by id.
    pub async fn record(&self, key: CollectionKey, id: RecordId) -> Result<Record> {
        let records = self.records(key).await?;
        records
            .into_iter()
            .find(|record| record.id == id)
            .ok_or_else(|| Error::NotFound(format!("no record '{id}' in '{key}'")))
    }

    /// Append a record to a collection.
    pub async fn create(&self, key: CollectionKey, record: Record) -> Result<Record> {
        let mut state = self.state.lock().await;
        let records = self.loaded(&mut state, key).await?;
        if records.iter().any(|existing| existing.id == record.id) {
            return Err(Error::InvalidInput(format!(
                "record '{}' already exists in '{key}'",
                record.id
            )));
        }

        let mut next = records.clone();
        next.push(record.clone());

        let meta = self.persist(key, &next).await?;
        state.collections.insert(key, next);
        self.publish(key, meta.timestamp);
        Ok(record)
    }

    /// Merge payload fields into an existing record.
    pub async fn update(
        &self,
        key: CollectionKey,
        id: RecordId,
        fields: Map<String, Value>,
    ) -> Result<Record> {
        let mut state = self.state.lock().await;
        let records = self.loaded(&mut state, key).await?;
        let position = records
            .iter()
            .position(|record| record.id == id)
            .ok_or_else(|| Error::NotFound(format!("no record '{id}' in '{key}'")))?;

        let mut next = records.clone();
        next[position].merge_fields(fields);
        let updated = next[position].clone();

        let meta = self.persist(key, &next).await?;
        state.collections.insert(key, next);
        self.publish(key, meta.timestamp);
        Ok(updated)
    }

    /// Remove a record from a collection.
    pub async fn delete(&self, key: CollectionKey, id: RecordId) -> Result<()> {
        let mut state = self.state.lock().await;
        let records = self.loaded(&mut state, key).await?;
        if !records.iter().any(|record| record.id == id) {
            return Err(Error::NotFound(format!("no record '{id}' in '{key}'")));
        }

        let mut next = records.clone();
        next.retain(|record| record.id != id);

        let meta = self.persist(key, &next).await?;
        state.collections.insert(key, next);
        self.publish(key, meta.timestamp);
        Ok(())
    }

    /// Install a remote snapshot into memory and announce it.
    ///
    /// Trusts the snapshot to have passed validation at its origin, but
    /// re-derives computed state (the booking expiry sweep) before
    /// publishing. Re-checks the snapshot against current sync state under
    /// the lock, so a racing local write or a second apply of the same
    /// snapshot degrades to a no-op. Returns whether anything was applied.
    pub async fn apply_remote(&self, snapshot: Snapshot) -> Result<bool> {
        let mut state = self.state.lock().await;

        let current = self.tracker.state(snapshot.collection).unwrap_or_default();
        let Detection::Changed(snapshot) = detect(&current, snapshot, self.system_id) else {
            return Ok(false);
        };

        let Snapshot {
            collection: key,
            mut records,
            timestamp,
            version,
            ..
        } = snapshot;

        // Fingerprint the stored records before the sweep: the committed
        // hash identifies the snapshot as written, not the derived state.
        let hash = content_hash(&records);
        if key == CollectionKey::MeetingRooms {
            rooms::sweep_rooms(&mut records, Utc::now());
        }

        state.collections.insert(key, records);
        self.tracker.commit(key, timestamp, version, hash);
        self.publish(key, timestamp);
        Ok(true)
    }

    /// Write a record list through to storage and commit the sync state.
    ///
    /// Callers install the list into memory and publish only after this
    /// succeeds, so a failed write leaves memory at the pre-mutation state.
    async fn persist(&self, key: CollectionKey, records: &[Record]) -> Result<SnapshotMeta> {
        let base = self.tracker.base_version(key);
        let meta = self.storage.write(key, records, base).await?;
        self.tracker
            .commit(key, meta.timestamp, meta.version, content_hash(records));
        Ok(meta)
    }

    fn publish(&self, key: CollectionKey, timestamp: DateTime<Utc>) {
        self.bus.publish(ChangeEvent {
            collection: key,
            timestamp,
        });
    }

    /// Ensure a collection's records are loaded into memory, reading the
    /// stored snapshot on first touch.
    async fn loaded<'state>(
        &self,
        state: &'state mut ServiceState,
        key: CollectionKey,
    ) -> Result<&'state mut Vec<Record>> {
        match state.collections.entry(key) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let records = match self.storage.read(key).await? {
                    Some(snapshot) => {
                        self.tracker.commit(
                            key,
                            snapshot.timestamp,
                            snapshot.version,
                            content_hash(&snapshot.records),
                        );
                        snapshot.records
                    }
                    None => Vec::new(),
                };
                Ok(entry.insert(records))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn service() -> DataService {
        let store = Arc::new(MemoryStore::new(SystemId::generate()));
        DataService::new(store, SystemId::generate())
    }

    fn task(title: &str) -> Record {
        let mut fields = Map::new();
        fields.insert("title".into(), json!(title));
        Record::new(fields)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_persists_and_lists() {
        let service = service();

        let created = service
            .create(CollectionKey::Tasks, task("order monitors"))
            .await
            .unwrap();

        let records = service.records(CollectionKey::Tasks).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, created.id);
        assert_eq!(records[0].field("title"), Some(&json!("order monitors")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_rejects_duplicate_ids() {
        let service = service();
        let record = task("once");

        service
            .create(CollectionKey::Tasks, record.clone())
            .await
            .unwrap();
        assert!(matches!(
            service.create(CollectionKey::Tasks, record).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_merges_fields_and_bumps_updated_at() {
        let service = service();
        let created = service
            .create(CollectionKey::Tasks, task("draft budget"))
            .await
            .unwrap();

        let mut fields = Map::new();
        fields.insert("done".into(), json!(true));
        let updated = service
            .update(CollectionKey::Tasks, created.id, fields)
            .await
            .unwrap();

        assert_eq!(updated.field("title"), Some(&json!("draft budget")));
        assert_eq!(updated.field("done"), Some(&json!(true)));
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_unknown_id_is_not_found() {
        let service = service();
        let result = service
            .update(CollectionKey::Tasks, RecordId::new(), Map::new())
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_removes_the_record() {
        let service = service();
        let created = service
            .create(CollectionKey::Tasks, task("shred old files"))
            .await
            .unwrap();

        service
            .delete(CollectionKey::Tasks, created.id)
            .await
            .unwrap();
        assert!(service.records(CollectionKey::Tasks).await.unwrap().is_empty());

        assert!(matches!(
            service.delete(CollectionKey::Tasks, created.id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn writes_publish_change_events() {
        let service = service();
        let mut events = service.subscribe();

        service
            .create(CollectionKey::News, task("new coffee machine"))
            .await
            .unwrap();

        let event = events.try_recv().unwrap();
        assert_eq!(event.collection, CollectionKey::News);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn records_survive_a_service_restart() {
        let store = Arc::new(MemoryStore::new(SystemId::generate()));
        let system_id = SystemId::generate();

        let first = DataService::new(store.clone(), system_id);
        first
            .create(CollectionKey::Knowledge, task("wifi password rotation"))
            .await
            .unwrap();

        let second = DataService::new(store, system_id);
        let records = second.records(CollectionKey::Knowledge).await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn applying_the_same_snapshot_twice_publishes_once() {
        let shared = Arc::new(MemoryStore::new(SystemId::generate()));
        let writer = DataService::new(shared.clone(), SystemId::generate());
        let reader = DataService::new(shared.clone(), SystemId::generate());
        let mut events = reader.subscribe();

        writer
            .create(CollectionKey::Tasks, task("submit timesheets"))
            .await
            .unwrap();

        let snapshot = shared.read(CollectionKey::Tasks).await.unwrap().unwrap();
        assert!(reader.apply_remote(snapshot.clone()).await.unwrap());
        assert!(!reader.apply_remote(snapshot).await.unwrap());

        assert!(events.try_recv().is_ok());
        assert!(events.try_recv().is_err());
        assert_eq!(reader.records(CollectionKey::Tasks).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn apply_remote_publishes_after_state_is_installed() {
        let shared = Arc::new(MemoryStore::new(SystemId::generate()));
        let writer = DataService::new(shared.clone(), SystemId::generate());
        let reader = DataService::new(shared.clone(), SystemId::generate());
        let mut events = reader.subscribe();

        writer
            .create(CollectionKey::Alerts, task("server room too warm"))
            .await
            .unwrap();
        let snapshot = shared.read(CollectionKey::Alerts).await.unwrap().unwrap();
        reader.apply_remote(snapshot).await.unwrap();

        // By the time the event is observable the records already are.
        let event = events.try_recv().unwrap();
        assert_eq!(event.collection, CollectionKey::Alerts);
        assert_eq!(reader.records(CollectionKey::Alerts).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_instance_write_surfaces_as_stale() {
        let shared = Arc::new(MemoryStore::new(SystemId::generate()));
        let left = DataService::new(shared.clone(), SystemId::generate());
        let right = DataService::new(shared, SystemId::generate());

        // Both instances load the empty collection, then both write without
        // seeing each other's update.
        left.records(CollectionKey::Tasks).await.unwrap();
        right.records(CollectionKey::Tasks).await.unwrap();

        left.create(CollectionKey::Tasks, task("first")).await.unwrap();
        let result = right.create(CollectionKey::Tasks, task("second")).await;
        assert!(matches!(result, Err(Error::StaleSnapshot { .. })));
    }
}
