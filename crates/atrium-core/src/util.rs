//! Shared utility functions used across multiple modules.

use chrono::{DateTime, Duration, Utc};

/// Normalize a user-supplied name by trimming whitespace.
///
/// Returns `None` when the trimmed value is empty.
pub fn normalize_name(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Next write timestamp for a collection: wall clock, bumped to stay
/// strictly after the previous stored timestamp even when clocks tie or
/// run backwards.
pub fn monotonic_after(now: DateTime<Utc>, prev: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match prev {
        Some(prev) if now <= prev => prev + Duration::milliseconds(1),
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_name_rejects_empty() {
        assert_eq!(normalize_name(""), None);
        assert_eq!(normalize_name("   "), None);
    }

    #[test]
    fn normalize_name_trims_value() {
        assert_eq!(normalize_name(" room-1 "), Some("room-1".to_string()));
    }

    #[test]
    fn monotonic_after_uses_wall_clock_when_ahead() {
        let prev = Utc::now();
        let now = prev + Duration::seconds(5);
        assert_eq!(monotonic_after(now, Some(prev)), now);
    }

    #[test]
    fn monotonic_after_bumps_on_tie_or_regression() {
        let prev = Utc::now();
        let bumped = monotonic_after(prev, Some(prev));
        assert!(bumped > prev);

        let behind = prev - Duration::seconds(3);
        let bumped = monotonic_after(behind, Some(prev));
        assert!(bumped > prev);
    }
}
