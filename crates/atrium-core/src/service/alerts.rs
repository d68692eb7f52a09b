//! Alert lifecycle operations

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::debug;

use super::DataService;
use crate::error::Result;
use crate::models::{Alert, CollectionKey, Record, RecordId};

impl DataService {
    /// All alerts with their record ids, live or not.
    ///
    /// Records that do not parse as alerts are skipped.
    pub async fn alerts(&self) -> Result<Vec<(RecordId, Alert)>> {
        let records = self.records(CollectionKey::Alerts).await?;
        Ok(records
            .iter()
            .filter_map(|record| match record.view::<Alert>() {
                Ok(alert) => Some((record.id, alert)),
                Err(error) => {
                    debug!("Skipping non-alert record '{}': {error}", record.id);
                    None
                }
            })
            .collect())
    }

    /// Alerts that should currently be shown.
    ///
    /// A pure filter over the collection, re-evaluated against the clock on
    /// every call so expiry is never stale.
    pub async fn active_alerts(&self) -> Result<Vec<(RecordId, Alert)>> {
        let now = Utc::now();
        let mut alerts = self.alerts().await?;
        alerts.retain(|(_, alert)| alert.is_live(now));
        Ok(alerts)
    }

    /// Publish a new alert to the console.
    pub async fn post_alert(&self, alert: Alert) -> Result<Record> {
        let record = Record::from_view(&alert)?;
        self.create(CollectionKey::Alerts, record).await
    }

    /// Switch an alert off. It stays in the collection for the record but
    /// disappears from [`Self::active_alerts`].
    pub async fn close_alert(&self, id: RecordId) -> Result<Alert> {
        let mut fields = Map::new();
        fields.insert("isActive".to_string(), Value::Bool(false));
        let record = self.update(CollectionKey::Alerts, id, fields).await?;
        record.view()
    }
}
