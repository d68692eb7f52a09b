//! Shared-folder storage variant

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CollectionKey, Record, SystemId};
use crate::storage::{blob, Capabilities, Snapshot, SnapshotMeta, StorageAdapter};

/// Native-handle variant: a real shared directory every console instance can
/// reach, so writes here are visible across machines.
pub struct SharedFolderStore {
    root: PathBuf,
    collections_dir: PathBuf,
    origin: SystemId,
}

impl SharedFolderStore {
    /// Open the store, creating the collections sub-path and probing that the
    /// handle is actually writable.
    pub async fn open(root: impl AsRef<Path>, origin: SystemId) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let collections_dir = root.join("collections");
        tokio::fs::create_dir_all(&collections_dir).await?;

        // The directory may exist but be mounted read-only.
        let marker = collections_dir.join(format!(".probe-{origin}"));
        tokio::fs::write(&marker, b"atrium").await?;
        tokio::fs::remove_file(&marker).await?;

        Ok(Self {
            root,
            collections_dir,
            origin,
        })
    }
}

#[async_trait]
impl StorageAdapter for SharedFolderStore {
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
            is_shared: true,
        }
    }

    fn root_label(&self) -> String {
        self.root.display().to_string()
    }
}
