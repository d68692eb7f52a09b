//! Polling synchronization engine
//!
//! Each instance converges on the shared medium by polling: a fixed-interval
//! task reads every registered collection's snapshot, runs it through the
//! change detector, and hands real changes to the data service to apply and
//! announce. There is no distributed lock; concurrent writers converge
//! last-writer-wins on the next poll.

mod detector;

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::{CollectionKey, SystemId};
use crate::service::DataService;

pub use detector::Detection;
pub(crate) use detector::{content_hash, detect};

/// Default time between poll passes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Most recent poll failures retained for the status object
const ERROR_LOG_CAPACITY: usize = 32;

/// Per-collection bookkeeping for change detection.
///
/// Lives for the running instance only; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncState {
    /// Timestamp of the last snapshot applied to memory (local or remote)
    pub last_applied_timestamp: Option<DateTime<Utc>>,
    /// Fingerprint of the records applied under that timestamp
    pub last_applied_hash: Option<String>,
    /// Stored version the in-memory copy corresponds to
    pub last_version: u64,
}

#[derive(Debug, Default)]
struct TrackerInner {
    /// Polling order is registration order
    order: Vec<CollectionKey>,
    states: HashMap<CollectionKey, SyncState>,
}

/// Shared registry of per-collection [`SyncState`]s.
///
/// Both the data service (on local writes) and the engine (on remote
/// applies) commit here, so echo suppression and stale-write detection see
/// one consistent view. Lock scope is always a few field reads; never held
/// across await points.
#[derive(Debug, Default)]
pub struct SyncTracker {
    inner: Mutex<TrackerInner>,
}

impl SyncTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collection to the poll rotation. Returns `false` when it was
    /// already registered.
    pub fn register(&self, key: CollectionKey) -> bool {
        let mut inner = self.lock();
        if inner.order.contains(&key) {
            return false;
        }
        inner.order.push(key);
        inner.states.entry(key).or_default();
        true
    }

    /// Collections in the poll rotation, in registration order
    #[must_use]
    pub fn registered(&self) -> Vec<CollectionKey> {
        self.lock().order.clone()
    }

    /// Current state for a collection, if any snapshot has been applied or
    /// the collection has been registered.
    #[must_use]
    pub fn state(&self, key: CollectionKey) -> Option<SyncState> {
        self.lock().states.get(&key).cloned()
    }

    /// Version the next write to a collection should be based on
    #[must_use]
    pub fn base_version(&self, key: CollectionKey) -> u64 {
        self.lock()
            .states
            .get(&key)
            .map_or(0, |state| state.last_version)
    }

    /// Record that a snapshot now reflects memory, after a local persist or
    /// a remote apply.
    pub fn commit(&self, key: CollectionKey, timestamp: DateTime<Utc>, version: u64, hash: String) {
        let mut inner = self.lock();
        let state = inner.states.entry(key).or_default();
        state.last_applied_timestamp = Some(timestamp);
        state.last_applied_hash = Some(hash);
        state.last_version = version;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TrackerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// How an instance polls the shared medium
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Shared folder to rendezvous in; `None` degrades to app-data storage
    pub shared_root: Option<std::path::PathBuf>,
    /// Time between poll passes
    pub poll_interval: Duration,
    /// This instance's identity, stamped on every write it makes
    pub system_id: SystemId,
}

impl PollConfig {
    /// Create a configuration with a fresh instance identity and the
    /// default poll interval.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared_root: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            system_id: SystemId::generate(),
        }
    }

    /// Set the shared folder used as the rendezvous point
    #[must_use]
    pub fn with_shared_root(mut self, root: impl Into<std::path::PathBuf>) -> Self {
        self.shared_root = Some(root.into());
        self
    }

    /// Set the time between poll passes
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Pin the instance identity (the default is freshly generated)
    #[must_use]
    pub const fn with_system_id(mut self, system_id: SystemId) -> Self {
        self.system_id = system_id;
        self
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Status surfaced to operators
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    /// Where the storage medium lives
    pub shared_path: String,
    /// Whether the poll task is running
    pub polling: bool,
    /// Configured poll interval in milliseconds
    pub poll_interval_ms: u64,
    /// This instance's identity
    pub system_id: SystemId,
    /// `true` when the medium is genuinely shared across instances
    pub has_native_storage: bool,
    /// Collections in the poll rotation
    pub registered: Vec<CollectionKey>,
    /// Most recent poll failures, oldest first
    pub errors: Vec<String>,
}

/// The polling synchronization engine.
///
/// Owns the poll pass over registered collections; delegates applying and
/// announcing changes to [`DataService`] so subscribers never observe a
/// notification before the in-memory state reflects it.
pub struct SyncEngine {
    service: DataService,
    tracker: Arc<SyncTracker>,
    poll_interval: Duration,
    polling: AtomicBool,
    errors: Mutex<VecDeque<String>>,
}

impl SyncEngine {
    #[must_use]
    pub fn new(service: DataService, poll_interval: Duration) -> Self {
        let tracker = service.tracker();
        Self {
            service,
            tracker,
            poll_interval,
            polling: AtomicBool::new(false),
            errors: Mutex::new(VecDeque::new()),
        }
    }

    /// The data service this engine feeds
    #[must_use]
    pub const fn service(&self) -> &DataService {
        &self.service
    }

    /// Add a collection to the poll rotation
    pub fn register(&self, key: CollectionKey) {
        if self.tracker.register(key) {
            debug!("Registered '{key}' for polling");
        }
    }

    /// Register every known collection
    pub fn register_all(&self) {
        for key in CollectionKey::ALL {
            self.register(key);
        }
    }

    /// Run one poll pass, stopping at the first failure.
    ///
    /// Returns the collections that changed, in poll order. Used for
    /// manual refresh; the scheduled poller uses [`Self::poll_tick`]
    /// instead so one bad collection cannot starve the rest.
    pub async fn sync_now(&self) -> Result<Vec<CollectionKey>> {
        let mut changed = Vec::new();
        for key in self.tracker.registered() {
            match self.poll_collection(key).await {
                Ok(true) => changed.push(key),
                Ok(false) => {}
                Err(error) => {
                    self.record_error(key, &error);
                    return Err(error);
                }
            }
        }
        Ok(changed)
    }

    /// Run one scheduled poll pass. Failures are logged and recorded but
    /// never abort the pass; the collection is retried next tick.
    pub async fn poll_tick(&self) -> Vec<CollectionKey> {
        let mut changed = Vec::new();
        for key in self.tracker.registered() {
            match self.poll_collection(key).await {
                Ok(true) => changed.push(key),
                Ok(false) => {}
                Err(error) => {
                    warn!("Poll failed for '{key}': {error}");
                    self.record_error(key, &error);
                }
            }
        }
        if !changed.is_empty() {
            debug!("Applied remote changes: {changed:?}");
        }
        changed
    }

    /// Poll one collection and apply its snapshot when it is a real change.
    /// Returns whether anything was applied.
    async fn poll_collection(&self, key: CollectionKey) -> Result<bool> {
        let Some(snapshot) = self.service.storage().read(key).await? else {
            return Ok(false);
        };

        let state = self.tracker.state(key).unwrap_or_default();
        match detect(&state, snapshot, self.service.system_id()) {
            Detection::Unchanged => Ok(false),
            Detection::Changed(snapshot) => self.service.apply_remote(snapshot).await,
        }
    }

    /// Start the fixed-interval poll task.
    ///
    /// The first pass runs immediately. The returned handle stops the task
    /// when explicitly asked or when dropped; an in-flight read is
    /// discarded at its next suspension point, never applied.
    #[must_use]
    pub fn start(self: &Arc<Self>) -> PollerHandle {
        self.polling.store(true, Ordering::SeqCst);

        let engine = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(engine.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                engine.poll_tick().await;
            }
        });

        PollerHandle {
            task,
            engine: Arc::clone(self),
        }
    }

    /// Snapshot of the engine for operators
    #[must_use]
    pub fn status(&self) -> EngineStatus {
        let storage = self.service.storage();
        let capabilities = storage.capabilities();
        EngineStatus {
            shared_path: storage.root_label(),
            polling: self.polling.load(Ordering::SeqCst),
            poll_interval_ms: u64::try_from(self.poll_interval.as_millis()).unwrap_or(u64::MAX),
            system_id: self.service.system_id(),
            has_native_storage: capabilities.is_shared,
            registered: self.tracker.registered(),
            errors: self.errors(),
        }
    }

    /// Recent poll failures, oldest first
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.error_log().iter().cloned().collect()
    }

    fn record_error(&self, key: CollectionKey, error: &crate::Error) {
        let mut log = self.error_log();
        if log.len() == ERROR_LOG_CAPACITY {
            log.pop_front();
        }
        log.push_back(format!("{key}: {error}"));
    }

    fn error_log(&self) -> std::sync::MutexGuard<'_, VecDeque<String>> {
        self.errors.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to the running poll task
pub struct PollerHandle {
    task: tokio::task::JoinHandle<()>,
    engine: Arc<SyncEngine>,
}

impl PollerHandle {
    /// Stop polling. No further ticks run; an in-flight read is discarded.
    /// Safe to call more than once.
    pub fn stop(&self) {
        self.engine.polling.store(false, Ordering::SeqCst);
        self.task.abort();
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use crate::storage::{MemoryStore, Snapshot, SnapshotMeta, StorageAdapter};
    use async_trait::async_trait;
    use serde_json::{json, Map};
    use std::sync::Arc;

    fn record(label: &str) -> Record {
        let mut fields = Map::new();
        fields.insert("label".into(), json!(label));
        Record::new(fields)
    }

    /// Two services over one in-memory store model two instances sharing a
    /// folder.
    fn instance_pair() -> (DataService, Arc<SyncEngine>) {
        let shared = Arc::new(MemoryStore::new(SystemId::generate()));

        let writer = DataService::new(shared.clone(), SystemId::generate());
        let reader = DataService::new(shared, SystemId::generate());
        let engine = Arc::new(SyncEngine::new(reader, Duration::from_millis(25)));
        (writer, engine)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sync_now_applies_a_remote_write() {
        let (writer, engine) = instance_pair();
        engine.register(CollectionKey::Tasks);

        writer
            .create(CollectionKey::Tasks, record("file expenses"))
            .await
            .unwrap();

        let changed = engine.sync_now().await.unwrap();
        assert_eq!(changed, vec![CollectionKey::Tasks]);

        let records = engine.service().records(CollectionKey::Tasks).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].field("label"), Some(&json!("file expenses")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn own_writes_are_not_reapplied() {
        let store = Arc::new(MemoryStore::new(SystemId::generate()));
        let service = DataService::new(store, SystemId::generate());
        let engine = Arc::new(SyncEngine::new(service, Duration::from_millis(25)));
        engine.register(CollectionKey::News);

        engine
            .service()
            .create(CollectionKey::News, record("town hall moved"))
            .await
            .unwrap();

        let changed = engine.sync_now().await.unwrap();
        assert!(changed.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn second_pass_is_a_no_op() {
        let (writer, engine) = instance_pair();
        engine.register(CollectionKey::Tasks);

        writer
            .create(CollectionKey::Tasks, record("book flights"))
            .await
            .unwrap();

        assert_eq!(engine.sync_now().await.unwrap().len(), 1);
        assert!(engine.sync_now().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn poller_applies_changes_in_the_background() {
        let (writer, engine) = instance_pair();
        engine.register(CollectionKey::Alerts);

        let mut events = engine.service().subscribe();
        let poller = engine.start();

        writer
            .create(CollectionKey::Alerts, record("fire drill"))
            .await
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("poller should pick up the remote write")
            .unwrap();
        assert_eq!(event.collection, CollectionKey::Alerts);

        poller.stop();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stopped_poller_applies_nothing() {
        let (writer, engine) = instance_pair();
        engine.register(CollectionKey::Tasks);

        let mut events = engine.service().subscribe();
        let poller = engine.start();
        poller.stop();
        assert!(!engine.status().polling);

        writer
            .create(CollectionKey::Tasks, record("late arrival"))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(events.try_recv().is_err());
    }

    struct BrokenStore;

    #[async_trait]
    impl StorageAdapter for BrokenStore {
        async fn read(&self, _key: CollectionKey) -> crate::Result<Option<Snapshot>> {
            Err(crate::Error::StorageUnavailable("medium offline".into()))
        }

        async fn write(
            &self,
            _key: CollectionKey,
            _records: &[Record],
            _base_version: u64,
        ) -> crate::Result<SnapshotMeta> {
            Err(crate::Error::StorageUnavailable("medium offline".into()))
        }

        fn capabilities(&self) -> crate::storage::Capabilities {
            crate::storage::Capabilities {
                is_durable: false,
                is_shared: false,
            }
        }

        fn root_label(&self) -> String {
            "broken".to_string()
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn poll_tick_records_failures_and_continues() {
        let service = DataService::new(Arc::new(BrokenStore), SystemId::generate());
        let engine = Arc::new(SyncEngine::new(service, Duration::from_millis(25)));
        engine.register(CollectionKey::Tasks);
        engine.register(CollectionKey::News);

        let changed = engine.poll_tick().await;
        assert!(changed.is_empty());

        // One entry per collection, both retried on the same pass.
        let errors = engine.errors();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("tasks:"));
        assert!(errors[1].starts_with("news:"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sync_now_stops_at_the_first_failure() {
        let service = DataService::new(Arc::new(BrokenStore), SystemId::generate());
        let engine = Arc::new(SyncEngine::new(service, Duration::from_millis(25)));
        engine.register_all();

        assert!(engine.sync_now().await.is_err());
        assert_eq!(engine.errors().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn status_reflects_configuration() {
        let store = Arc::new(MemoryStore::new(SystemId::generate()));
        let system_id = SystemId::generate();
        let service = DataService::new(store, system_id);
        let engine = Arc::new(SyncEngine::new(service, Duration::from_millis(750)));
        engine.register_all();

        let status = engine.status();
        assert_eq!(status.shared_path, "memory");
        assert!(!status.polling);
        assert_eq!(status.poll_interval_ms, 750);
        assert_eq!(status.system_id, system_id);
        assert!(!status.has_native_storage);
        assert_eq!(status.registered.len(), CollectionKey::ALL.len());
        assert!(status.errors.is_empty());
    }

    #[test]
    fn tracker_keeps_registration_order() {
        let tracker = SyncTracker::new();
        assert!(tracker.register(CollectionKey::News));
        assert!(tracker.register(CollectionKey::Alerts));
        assert!(!tracker.register(CollectionKey::News));

        assert_eq!(
            tracker.registered(),
            vec![CollectionKey::News, CollectionKey::Alerts]
        );
    }

    #[test]
    fn tracker_base_version_follows_commits() {
        let tracker = SyncTracker::new();
        assert_eq!(tracker.base_version(CollectionKey::Tasks), 0);

        tracker.commit(CollectionKey::Tasks, Utc::now(), 3, "hash".to_string());
        assert_eq!(tracker.base_version(CollectionKey::Tasks), 3);
    }
}
