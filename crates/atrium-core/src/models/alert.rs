//! Alert model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A console-wide alert banner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Short headline shown in the banner
    pub title: String,
    /// Full alert body
    pub message: String,
    /// Whether the alert is switched on
    pub is_active: bool,
    /// Optional expiry; a past expiry hides the alert without deactivating it.
    ///
    /// `None` serializes as an explicit `null` so a view merge can clear a
    /// stored expiry.
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
}

impl Alert {
    /// Create an active alert without an expiry
    #[must_use]
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            is_active: true,
            expiry_date: None,
        }
    }

    /// Set an expiry on this alert
    #[must_use]
    pub const fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry_date = Some(expiry);
        self
    }

    /// Whether the alert should be shown at `now`.
    ///
    /// Evaluated against the caller's clock on every call; the result is
    /// never cached so expiry always reflects current time.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expiry_date.is_none_or(|expiry| expiry > now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn alert_without_expiry_is_live_while_active() {
        let alert = Alert::new("Maintenance", "Server room closed");
        assert!(alert.is_live(Utc::now()));

        let mut off = alert;
        off.is_active = false;
        assert!(!off.is_live(Utc::now()));
    }

    #[test]
    fn alert_expiry_is_evaluated_against_now() {
        let now = Utc::now();
        let alert = Alert::new("Visit", "VIPs at 3pm").with_expiry(now + Duration::hours(1));
        assert!(alert.is_live(now));
        assert!(!alert.is_live(now + Duration::hours(2)));
    }

    #[test]
    fn alert_expiring_exactly_now_is_not_live() {
        let now = Utc::now();
        let alert = Alert::new("Lunch", "Pizza in the kitchen").with_expiry(now);
        assert!(!alert.is_live(now));
    }

    #[test]
    fn alert_wire_format_uses_camel_case() {
        let alert = Alert::new("t", "m");
        let value = serde_json::to_value(&alert).unwrap();
        assert!(value.get("isActive").is_some());
        assert!(value["expiryDate"].is_null());
    }
}
