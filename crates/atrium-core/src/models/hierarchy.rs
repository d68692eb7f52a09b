//! Organizational hierarchy model

use serde::{Deserialize, Serialize};

/// One reporting edge in the org chart: `employee_id` reports to `reports_to`.
///
/// The edge set is kept single-manager and acyclic by the data service; the
/// model itself is just the wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyEdge {
    /// Employee on the reporting side of the edge
    pub employee_id: String,
    /// The employee's manager
    pub reports_to: String,
}

impl HierarchyEdge {
    /// Create a reporting edge
    #[must_use]
    pub fn new(employee_id: impl Into<String>, reports_to: impl Into<String>) -> Self {
        Self {
            employee_id: employee_id.into(),
            reports_to: reports_to.into(),
        }
    }
}
