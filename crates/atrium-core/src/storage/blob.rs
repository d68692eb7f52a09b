//! Snapshot blob codec shared by the directory-backed stores

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{CollectionKey, Record, SystemId};
use crate::storage::{Snapshot, SnapshotMeta};
use crate::util::monotonic_after;

/// On-disk form of a snapshot. The collection key is carried by the
/// filename, everything else lives in the blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredSnapshot {
    pub timestamp: DateTime<Utc>,
    pub version: u64,
    pub origin: SystemId,
    pub records: Vec<Record>,
}

pub(crate) fn snapshot_path(dir: &Path, key: CollectionKey) -> PathBuf {
    dir.join(format!("{}.json", key.as_str()))
}

/// Read a collection's snapshot blob, `None` when nothing has been written.
pub(crate) async fn read_snapshot(dir: &Path, key: CollectionKey) -> Result<Option<Snapshot>> {
    let path = snapshot_path(dir, key);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(error.into()),
    };

    let stored: StoredSnapshot = serde_json::from_slice(&bytes)
        .map_err(|error| Error::parse(key.as_str(), error.to_string()))?;

    Ok(Some(Snapshot {
        collection: key,
        records: stored.records,
        timestamp: stored.timestamp,
        version: stored.version,
        origin: stored.origin,
    }))
}

/// Persist a full record list for a collection.
///
/// Compare-and-swap against the stored version: the write is rejected with
/// `StaleSnapshot` when `base_version` no longer matches what is on disk.
/// The assigned timestamp is strictly after the previous stored timestamp.
pub(crate) async fn write_snapshot(
    dir: &Path,
    key: CollectionKey,
    records: &[Record],
    base_version: u64,
    origin: SystemId,
) -> Result<SnapshotMeta> {
    let (stored_version, stored_timestamp) = match read_snapshot(dir, key).await {
        Ok(Some(stored)) => (stored.version, Some(stored.timestamp)),
        Ok(None) => (0, None),
        Err(error) => {
            // Unreadable blob: let the write repair it in place.
            tracing::warn!("Overwriting unreadable snapshot blob for '{key}': {error}");
            (base_version, None)
        }
    };

    if stored_version != base_version {
        return Err(Error::StaleSnapshot {
            collection: key.as_str().to_string(),
            base: base_version,
            stored: stored_version,
        });
    }

    let meta = SnapshotMeta {
        timestamp: monotonic_after(Utc::now(), stored_timestamp),
        version: base_version + 1,
    };
    let blob = StoredSnapshot {
        timestamp: meta.timestamp,
        version: meta.version,
        origin,
        records: records.to_vec(),
    };

    let path = snapshot_path(dir, key);
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, serde_json::to_vec_pretty(&blob)?).await?;
    tokio::fs::rename(&tmp, &path).await?;

    Ok(meta)
}
