//! Change detection between stored snapshots and applied state

use crate::models::{Record, SystemId};
use crate::storage::Snapshot;
use crate::sync::SyncState;

/// Outcome of comparing a freshly read snapshot against applied state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    /// Nothing newer than what was last applied
    Unchanged,
    /// The snapshot supersedes local state and should be applied
    Changed(Snapshot),
}

/// Fingerprint of a record list, for timestamp tie-breaking.
///
/// Two snapshots with the same records in the same order hash equal; a
/// remote writer re-saving identical data does not count as a change.
#[must_use]
pub(crate) fn content_hash(records: &[Record]) -> String {
    let bytes = serde_json::to_vec(records).unwrap_or_default();
    blake3::hash(&bytes).to_hex().to_string()
}

/// Decide whether `snapshot` is a new remote change.
///
/// A strictly newer timestamp is a change; a strictly older one is not.
/// On an equal timestamp the snapshot is an echo when this instance wrote
/// it (`origin` matches `own_id`), otherwise the record fingerprints break
/// the tie.
#[must_use]
pub(crate) fn detect(state: &SyncState, snapshot: Snapshot, own_id: SystemId) -> Detection {
    let Some(last_applied) = state.last_applied_timestamp else {
        return Detection::Changed(snapshot);
    };

    if snapshot.timestamp > last_applied {
        return Detection::Changed(snapshot);
    }
    if snapshot.timestamp < last_applied {
        return Detection::Unchanged;
    }

    if snapshot.origin == own_id {
        return Detection::Unchanged;
    }

    let matches_applied = state
        .last_applied_hash
        .as_deref()
        .is_some_and(|hash| hash == content_hash(&snapshot.records));
    if matches_applied {
        Detection::Unchanged
    } else {
        Detection::Changed(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CollectionKey, Record};
    use chrono::{Duration, Utc};
    use serde_json::{json, Map};

    fn record(label: &str) -> Record {
        let mut fields = Map::new();
        fields.insert("label".into(), json!(label));
        Record::new(fields)
    }

    fn snapshot(records: Vec<Record>, origin: SystemId) -> Snapshot {
        Snapshot {
            collection: CollectionKey::Tasks,
            records,
            timestamp: Utc::now(),
            version: 1,
            origin,
        }
    }

    fn applied_state(snapshot: &Snapshot) -> SyncState {
        SyncState {
            last_applied_timestamp: Some(snapshot.timestamp),
            last_applied_hash: Some(content_hash(&snapshot.records)),
            last_version: snapshot.version,
        }
    }

    #[test]
    fn first_snapshot_is_a_change() {
        let own = SystemId::generate();
        let snap = snapshot(vec![record("a")], SystemId::generate());
        assert!(matches!(
            detect(&SyncState::default(), snap, own),
            Detection::Changed(_)
        ));
    }

    #[test]
    fn newer_timestamp_is_a_change() {
        let own = SystemId::generate();
        let snap = snapshot(vec![record("a")], SystemId::generate());
        let state = applied_state(&snap);

        let mut newer = snapshot(vec![record("b")], SystemId::generate());
        newer.timestamp = snap.timestamp + Duration::milliseconds(1);
        assert!(matches!(detect(&state, newer, own), Detection::Changed(_)));
    }

    #[test]
    fn older_timestamp_is_ignored() {
        let own = SystemId::generate();
        let snap = snapshot(vec![record("a")], SystemId::generate());
        let state = applied_state(&snap);

        let mut older = snapshot(vec![record("b")], SystemId::generate());
        older.timestamp = snap.timestamp - Duration::milliseconds(1);
        assert_eq!(detect(&state, older, own), Detection::Unchanged);
    }

    #[test]
    fn own_write_at_applied_timestamp_is_an_echo() {
        let own = SystemId::generate();
        let snap = snapshot(vec![record("a")], own);
        let state = applied_state(&snap);

        assert_eq!(detect(&state, snap, own), Detection::Unchanged);
    }

    #[test]
    fn remote_resave_of_identical_records_is_not_a_change() {
        let own = SystemId::generate();
        let snap = snapshot(vec![record("a")], SystemId::generate());
        let state = applied_state(&snap);

        let resave = snap.clone();
        assert_eq!(detect(&state, resave, own), Detection::Unchanged);
    }

    #[test]
    fn remote_write_at_equal_timestamp_with_new_content_is_a_change() {
        let own = SystemId::generate();
        let snap = snapshot(vec![record("a")], SystemId::generate());
        let state = applied_state(&snap);

        let mut conflicting = snapshot(vec![record("b")], SystemId::generate());
        conflicting.timestamp = snap.timestamp;
        assert!(matches!(
            detect(&state, conflicting, own),
            Detection::Changed(_)
        ));
    }

    #[test]
    fn content_hash_tracks_record_order() {
        let first = record("a");
        let second = record("b");

        let forward = content_hash(&[first.clone(), second.clone()]);
        let reversed = content_hash(&[second, first]);
        assert_ne!(forward, reversed);
    }
}
