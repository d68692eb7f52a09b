//! Storage adapters over the shared medium
//!
//! One serialized snapshot blob per collection under the storage root. Two
//! durable variants share the blob codec: the shared-folder store (visible
//! across instances) and the per-user app-data store (single machine).
//! `probe` picks whichever can be initialized at startup; the in-memory
//! store backs tests and the degraded no-storage mode.

mod app_data;
mod blob;
mod memory;
mod shared_dir;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::models::{CollectionKey, Record, SystemId};

pub use app_data::AppDataStore;
pub use memory::MemoryStore;
pub use shared_dir::SharedFolderStore;

/// What a storage variant can promise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Survives process restart
    pub is_durable: bool,
    /// Visible to other console instances
    pub is_shared: bool,
}

/// A collection's persisted state as read from the medium
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Collection the snapshot belongs to
    pub collection: CollectionKey,
    /// Full record list, in stored order
    pub records: Vec<Record>,
    /// When the snapshot was written
    pub timestamp: DateTime<Utc>,
    /// Monotonic write counter for this collection
    pub version: u64,
    /// Instance that produced the write
    pub origin: SystemId,
}

/// Timestamp and version a successful write assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotMeta {
    /// Assigned write timestamp, strictly after the previous one
    pub timestamp: DateTime<Utc>,
    /// Assigned version, previous stored version plus one
    pub version: u64,
}

/// Contract every storage variant implements
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Read the current snapshot for a collection, `None` when nothing has
    /// been written yet.
    async fn read(&self, key: CollectionKey) -> Result<Option<Snapshot>>;

    /// Persist a full record list for a collection.
    ///
    /// `base_version` is the version the caller's mutation was based on
    /// (0 for a collection it has never seen); a mismatch with the stored
    /// version fails with `StaleSnapshot` instead of silently overwriting.
    async fn write(
        &self,
        key: CollectionKey,
        records: &[Record],
        base_version: u64,
    ) -> Result<SnapshotMeta>;

    /// What this variant can promise
    fn capabilities(&self) -> Capabilities;

    /// Human-readable location of the medium, for status output
    fn root_label(&self) -> String;
}

/// Select a storage variant at startup.
///
/// Tries the shared folder when one is configured, then falls back to the
/// per-user app-data directory. `StorageUnavailable` when neither can be
/// initialized; callers then degrade to an in-memory store with collection
/// defaults and no cross-instance sync.
pub async fn probe(
    shared_root: Option<&Path>,
    origin: SystemId,
) -> Result<Arc<dyn StorageAdapter>> {
    if let Some(root) = shared_root {
        match SharedFolderStore::open(root, origin).await {
            Ok(store) => {
                tracing::info!("Using shared folder storage at {}", root.display());
                return Ok(Arc::new(store));
            }
            Err(error) => {
                tracing::warn!(
                    "Shared folder {} unavailable ({error}); falling back to app-data storage",
                    root.display()
                );
            }
        }
    }

    match AppDataStore::open(origin).await {
        Ok(store) => {
            tracing::info!(
                "Running single-instance with app-data storage at {}",
                store.root_label()
            );
            Ok(Arc::new(store))
        }
        Err(error @ Error::StorageUnavailable(_)) => Err(error),
        Err(error) => Err(Error::StorageUnavailable(error.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn probe_prefers_shared_folder() {
        let dir = tempdir().unwrap();
        let store = probe(Some(dir.path()), SystemId::generate())
            .await
            .unwrap();
        assert!(store.capabilities().is_shared);
        assert_eq!(store.root_label(), dir.path().display().to_string());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn probe_falls_back_when_shared_root_is_not_a_directory() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("not-a-dir");
        std::fs::write(&file_path, b"x").unwrap();

        // create_dir_all under a regular file fails, so probing falls through
        // to the app-data variant.
        let store = probe(Some(&file_path), SystemId::generate()).await;
        if let Ok(store) = store {
            assert!(!store.capabilities().is_shared);
        }
    }
}
