use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use atrium_core::models::HierarchyEdge;
use atrium_core::storage::{probe, MemoryStore, StorageAdapter};
use atrium_core::{
    Alert, CollectionKey, DataService, MeetingRoom, PollConfig, Record, RecordId, SyncEngine,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::CliError;

/// Resolve the engine configuration from command-line values, falling back
/// to `ATRIUM_SHARED_ROOT` for the shared folder.
pub fn resolve_config(shared_root: Option<PathBuf>, poll_interval_secs: u64) -> PollConfig {
    let mut config = PollConfig::new()
        // The poll ticker panics on a zero period.
        .with_poll_interval(Duration::from_secs(poll_interval_secs.max(1)));

    let root = shared_root.or_else(|| env::var_os("ATRIUM_SHARED_ROOT").map(PathBuf::from));
    if let Some(root) = root {
        config = config.with_shared_root(root);
    }

    config
}

/// Open a console instance over the configured storage.
///
/// When neither the shared folder nor app-data storage can be initialized,
/// the instance degrades to process-local in-memory state seeded with the
/// default rooms, and nothing it writes survives exit.
pub async fn open_console(config: &PollConfig) -> Result<Arc<SyncEngine>, CliError> {
    let (storage, in_memory): (Arc<dyn StorageAdapter>, bool) =
        match probe(config.shared_root.as_deref(), config.system_id).await {
            Ok(storage) => (storage, false),
            Err(error) => {
                warn!("Storage unavailable ({error}); running on in-memory state only");
                (Arc::new(MemoryStore::new(config.system_id)), true)
            }
        };

    let service = DataService::new(storage, config.system_id);
    let engine = Arc::new(SyncEngine::new(service, config.poll_interval));
    engine.register_all();

    if in_memory {
        engine.service().ensure_default_rooms().await?;
    }

    Ok(engine)
}

/// Resolve a record within a collection by exact ID or unique ID prefix.
pub async fn resolve_record(
    service: &DataService,
    key: CollectionKey,
    query: &str,
) -> Result<Record, CliError> {
    let query = normalize_record_identifier(query)?;
    let records = service.records(key).await?;

    if let Ok(id) = query.parse::<RecordId>() {
        if let Some(record) = records.iter().find(|record| record.id == id) {
            return Ok(record.clone());
        }
    }

    let mut matches = records
        .into_iter()
        .filter(|record| record.id.as_str().starts_with(&query))
        .collect::<Vec<_>>();

    match matches.len() {
        0 => Err(CliError::RecordNotFound(query)),
        1 => Ok(matches.remove(0)),
        _ => {
            let options = matches
                .iter()
                .take(3)
                .map(|record| short_record_id(record.id))
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousRecordId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RoomListItem {
    pub id: String,
    #[serde(flatten)]
    pub room: MeetingRoom,
}

#[derive(Debug, Serialize)]
pub struct AlertListItem {
    pub id: String,
    pub live: bool,
    #[serde(flatten)]
    pub alert: Alert,
}

#[derive(Debug, Serialize)]
pub struct OrgEdgeItem {
    pub id: String,
    #[serde(flatten)]
    pub edge: HierarchyEdge,
}

pub fn format_room_lines(rooms: &[(RecordId, MeetingRoom)]) -> Vec<String> {
    rooms
        .iter()
        .map(|(_, room)| {
            room.current_booking.as_ref().map_or_else(
                || format!("{:<14}  {:<20}  vacant", room.room_id, room.name),
                |booking| {
                    format!(
                        "{:<14}  {:<20}  occupied by {} until {}",
                        room.room_id,
                        room.name,
                        booking.employee,
                        format_timestamp(booking.end_time)
                    )
                },
            )
        })
        .collect()
}

pub fn format_alert_lines(alerts: &[(RecordId, Alert)], now: DateTime<Utc>) -> Vec<String> {
    alerts
        .iter()
        .map(|(id, alert)| {
            let state = if alert.is_live(now) {
                "live"
            } else if alert.is_active {
                "expired"
            } else {
                "closed"
            };
            let expiry = alert.expiry_date.map_or_else(String::new, |expiry| {
                format!("  expires {}", format_timestamp(expiry))
            });

            format!(
                "{}  {state:<7}  {}: {}{expiry}",
                short_record_id(*id),
                alert.title,
                alert.message
            )
        })
        .collect()
}

pub fn format_edge_lines(edges: &[(RecordId, HierarchyEdge)]) -> Vec<String> {
    edges
        .iter()
        .map(|(_, edge)| format!("{} -> {}", edge.employee_id, edge.reports_to))
        .collect()
}

/// Render reporting lines as an indented forest rooted at top-level managers.
///
/// Foreign data can hold a cycle with no top-level manager at all; those
/// edges produce no tree lines and the caller falls back to a flat listing.
pub fn format_org_tree(edges: &[(RecordId, HierarchyEdge)]) -> Vec<String> {
    let mut roots: Vec<&str> = Vec::new();
    for (_, edge) in edges {
        let has_own_manager = edges
            .iter()
            .any(|(_, candidate)| candidate.employee_id == edge.reports_to);
        if !has_own_manager && !roots.contains(&edge.reports_to.as_str()) {
            roots.push(&edge.reports_to);
        }
    }

    let mut lines = Vec::new();
    for root in roots {
        push_subtree(edges, root, 0, &mut lines);
    }
    lines
}

fn push_subtree(
    edges: &[(RecordId, HierarchyEdge)],
    name: &str,
    depth: usize,
    lines: &mut Vec<String>,
) {
    // Depth cannot exceed the edge count in acyclic data.
    if depth > edges.len() {
        return;
    }

    lines.push(format!("{}{name}", "  ".repeat(depth)));
    for (_, edge) in edges {
        if edge.reports_to == name {
            push_subtree(edges, &edge.employee_id, depth + 1, lines);
        }
    }
}

pub fn format_record_lines(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|record| {
            format!(
                "{}  {}  {}",
                short_record_id(record.id),
                format_timestamp(record.updated_at),
                record_preview(record, 60)
            )
        })
        .collect()
}

pub fn record_preview(record: &Record, max_chars: usize) -> String {
    let rendered = Value::Object(record.fields.clone()).to_string();
    let collapsed = rendered.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn short_record_id(id: RecordId) -> String {
    id.as_str().chars().take(13).collect()
}

pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M UTC").to_string()
}

pub fn normalize_record_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyRecordId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn normalize_alert_title(title: &str) -> Result<String, CliError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyAlertTitle)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn parse_record_fields(payload: &str) -> Result<Map<String, Value>, CliError> {
    let value: Value = serde_json::from_str(payload)?;
    match value {
        Value::Object(fields) => Ok(fields),
        _ => Err(CliError::PayloadNotAnObject),
    }
}
