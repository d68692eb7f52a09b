//! Organizational hierarchy operations
//!
//! The edge set is kept single-manager and acyclic: every mutation
//! re-validates against the full set before persisting. Remote snapshots
//! are installed as-is; their origin validated them.

use serde_json::Value;
use tracing::debug;

use super::DataService;
use crate::error::{Error, Result};
use crate::models::{CollectionKey, HierarchyEdge, Record, RecordId};
use crate::util::normalize_name;

/// Whether adding `employee_id -> reports_to` would close a reporting loop.
///
/// Walks upward from `reports_to`; reaching `employee_id` means the new
/// edge would make someone their own transitive manager. The walk is
/// bounded by the edge count, so a loop already present in foreign data
/// terminates instead of spinning.
fn would_cycle(edges: &[HierarchyEdge], employee_id: &str, reports_to: &str) -> bool {
    let mut current = reports_to;
    for _ in 0..=edges.len() {
        if current == employee_id {
            return true;
        }
        match edges.iter().find(|edge| edge.employee_id == current) {
            Some(edge) => current = edge.reports_to.as_str(),
            None => return false,
        }
    }
    false
}

fn employee_of(record: &Record) -> Option<&str> {
    record.field("employeeId").and_then(Value::as_str)
}

impl DataService {
    /// All reporting edges with their record ids.
    ///
    /// Records that do not parse as edges are skipped.
    pub async fn hierarchy_edges(&self) -> Result<Vec<(RecordId, HierarchyEdge)>> {
        let records = self.records(CollectionKey::Hierarchy).await?;
        Ok(records
            .iter()
            .filter_map(|record| match record.view::<HierarchyEdge>() {
                Ok(edge) => Some((record.id, edge)),
                Err(error) => {
                    debug!("Skipping non-edge record '{}': {error}", record.id);
                    None
                }
            })
            .collect())
    }

    /// Record that `employee_id` reports to `reports_to`.
    ///
    /// Fails with `SelfReport` when the two are equal, `DuplicateManager`
    /// when the employee already has a manager, and `CycleDetected` when
    /// the edge would make `reports_to` a transitive report of
    /// `employee_id`.
    pub async fn add_edge(&self, employee_id: &str, reports_to: &str) -> Result<HierarchyEdge> {
        let employee_id = normalize_name(employee_id)
            .ok_or_else(|| Error::InvalidInput("employee id cannot be empty".to_string()))?;
        let reports_to = normalize_name(reports_to)
            .ok_or_else(|| Error::InvalidInput("manager id cannot be empty".to_string()))?;
        if employee_id == reports_to {
            return Err(Error::SelfReport(employee_id));
        }

        let mut state = self.state.lock().await;
        let records = self.loaded(&mut state, CollectionKey::Hierarchy).await?;

        let edges: Vec<HierarchyEdge> = records
            .iter()
            .filter_map(|record| record.view::<HierarchyEdge>().ok())
            .collect();
        if edges.iter().any(|edge| edge.employee_id == employee_id) {
            return Err(Error::DuplicateManager(employee_id));
        }
        if would_cycle(&edges, &employee_id, &reports_to) {
            return Err(Error::CycleDetected {
                employee: employee_id,
                manager: reports_to,
            });
        }

        let edge = HierarchyEdge::new(employee_id, reports_to);
        let mut next = records.clone();
        next.push(Record::from_view(&edge)?);

        let meta = self.persist(CollectionKey::Hierarchy, &next).await?;
        state.collections.insert(CollectionKey::Hierarchy, next);
        self.publish(CollectionKey::Hierarchy, meta.timestamp);
        Ok(edge)
    }

    /// Remove `employee_id`'s reporting edge.
    pub async fn remove_edge(&self, employee_id: &str) -> Result<()> {
        let employee_id = normalize_name(employee_id)
            .ok_or_else(|| Error::InvalidInput("employee id cannot be empty".to_string()))?;

        let mut state = self.state.lock().await;
        let records = self.loaded(&mut state, CollectionKey::Hierarchy).await?;
        let position = records
            .iter()
            .position(|record| employee_of(record) == Some(employee_id.as_str()))
            .ok_or_else(|| Error::NotFound(format!("employee '{employee_id}' has no manager")))?;

        let mut next = records.clone();
        next.remove(position);

        let meta = self.persist(CollectionKey::Hierarchy, &next).await?;
        state.collections.insert(CollectionKey::Hierarchy, next);
        self.publish(CollectionKey::Hierarchy, meta.timestamp);
        Ok(())
    }

    /// Who `employee_id` reports to, if anyone.
    pub async fn manager_of(&self, employee_id: &str) -> Result<Option<String>> {
        let edges = self.hierarchy_edges().await?;
        Ok(edges
            .into_iter()
            .find(|(_, edge)| edge.employee_id == employee_id)
            .map(|(_, edge)| edge.reports_to))
    }

    /// Everyone reporting directly to `manager_id`, in stored order.
    pub async fn direct_reports(&self, manager_id: &str) -> Result<Vec<String>> {
        let edges = self.hierarchy_edges().await?;
        Ok(edges
            .into_iter()
            .filter(|(_, edge)| edge.reports_to == manager_id)
            .map(|(_, edge)| edge.employee_id)
            .collect())
    }

    /// The chain of managers above `employee_id`, nearest first.
    ///
    /// Bounded by the edge count, so corrupt foreign data with a loop
    /// yields a truncated chain instead of hanging.
    pub async fn manager_chain(&self, employee_id: &str) -> Result<Vec<String>> {
        let edges: Vec<HierarchyEdge> = self
            .hierarchy_edges()
            .await?
            .into_iter()
            .map(|(_, edge)| edge)
            .collect();

        let mut chain = Vec::new();
        let mut current = employee_id;
        for _ in 0..edges.len() {
            let Some(edge) = edges.iter().find(|edge| edge.employee_id == current) else {
                break;
            };
            chain.push(edge.reports_to.clone());
            current = edge.reports_to.as_str();
        }
        Ok(chain)
    }
}
