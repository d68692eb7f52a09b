//! Per-user app-data storage variant

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{CollectionKey, Record, SystemId};
use crate::storage::{blob, Capabilities, Snapshot, SnapshotMeta, StorageAdapter};

/// Emulated variant: per-user app-data directory, used when no shared folder
/// handle is grantable. Durable, but single-machine — synchronization
/// degrades to local persistence.
pub struct AppDataStore {
    root: PathBuf,
    collections_dir: PathBuf,
    origin: SystemId,
}

impl AppDataStore {
    /// Open the store under the platform's per-user data directory.
    pub async fn open(origin: SystemId) -> Result<Self> {
        let base = dirs::data_dir().ok_or_else(|| {
            Error::StorageUnavailable("no per-user data directory on this platform".to_string())
        })?;
        Self::open_at(base.join("atrium"), origin).await
    }

    /// Open the store at an explicit root (primarily for tests).
    pub async fn open_at(root: PathBuf, origin: SystemId) -> Result<Self> {
        let collections_dir = root.join("collections");
        tokio::fs::create_dir_all(&collections_dir).await?;
        Ok(Self {
            root,
            collections_dir,
            origin,
        })
    }
}

#[async_trait]
impl StorageAdapter for AppDataStore {
    async fn read(&self, key: CollectionKey) -> Result<Option<Snapshot>> {
        blob::read_snapshot(&self.collections_dir, key).await
    }

    async fn write(
        &self,
        key: CollectionKey,
        records: &[Record],
        base_version: u64,
    ) -> Result<SnapshotMeta> {
        blob::write_snapshot(&self.collections_dir, key, records, base_version, self.origin).await
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            is_durable: true,
            is_shared: false,
        }
    }

    fn root_label(&self) -> String {
        self.root.display().to_string()
    }
}
