//! In-memory storage variant

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{Error, Result};
use crate::models::{CollectionKey, Record, SystemId};
use crate::storage::blob::StoredSnapshot;
use crate::storage::{Capabilities, Snapshot, SnapshotMeta, StorageAdapter};
use crate::util::monotonic_after;

/// In-process variant with the same version and timestamp discipline as the
/// directory stores. Used by tests, and as the degraded fallback when no
/// durable medium can be initialized.
pub struct MemoryStore {
    origin: SystemId,
    inner: Mutex<HashMap<CollectionKey, StoredSnapshot>>,
}

impl MemoryStore {
    /// Create an empty in-memory store
    #[must_use]
    pub fn new(origin: SystemId) -> Self {
        Self {
            origin,
            inner: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl StorageAdapter for MemoryStore {
    async fn read(&self, key: CollectionKey) -> Result<Option<Snapshot>> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.get(&key).map(|stored| Snapshot {
            collection: key,
            records: stored.records.clone(),
            timestamp: stored.timestamp,
            version: stored.version,
            origin: stored.origin,
        }))
    }

    async fn write(
        &self,
        key: CollectionKey,
        records: &[Record],
        base_version: u64,
    ) -> Result<SnapshotMeta> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        let stored = inner.get(&key);
        let stored_version = stored.map_or(0, |snapshot| snapshot.version);
        if stored_version != base_version {
            return Err(Error::StaleSnapshot {
                collection: key.as_str().to_string(),
                base: base_version,
                stored: stored_version,
            });
        }

        let meta = SnapshotMeta {
            timestamp: monotonic_after(Utc::now(), stored.map(|snapshot| snapshot.timestamp)),
            version: base_version + 1,
        };
        inner.insert(
            key,
            StoredSnapshot {
                timestamp: meta.timestamp,
                version: meta.version,
                origin: self.origin,
                records: records.to_vec(),
            },
        );
        Ok(meta)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            is_durable: false,
            is_shared: false,
        }
    }

    fn root_label(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn write_then_read_round_trips() {
        let store = MemoryStore::new(SystemId::generate());
        let records = vec![Record::new(serde_json::Map::new())];

        let meta = store.write(CollectionKey::Help, &records, 0).await.unwrap();
        assert_eq!(meta.version, 1);

        let snapshot = store.read(CollectionKey::Help).await.unwrap().unwrap();
        assert_eq!(snapshot.records, records);
        assert_eq!(snapshot.timestamp, meta.timestamp);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stale_write_is_rejected() {
        let store = MemoryStore::new(SystemId::generate());
        store.write(CollectionKey::Help, &[], 0).await.unwrap();

        let error = store.write(CollectionKey::Help, &[], 0).await.unwrap_err();
        assert!(matches!(error, Error::StaleSnapshot { .. }));
    }
}
