//! Meeting room and booking models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Occupancy state of a meeting room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Vacant,
    Occupied,
}

/// The single active booking of an occupied room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingInfo {
    /// Employee holding the room
    pub employee: String,
    /// Booking start
    pub start_time: DateTime<Utc>,
    /// Booking end; the room reverts to vacant once this passes
    pub end_time: DateTime<Utc>,
}

impl BookingInfo {
    /// Whether the booking's end time has passed
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.end_time <= now
    }
}

/// A bookable meeting room.
///
/// Invariant: `status` is `Occupied` iff `current_booking` holds exactly one
/// non-expired booking. `sweep` restores the invariant after time passes or
/// after a foreign snapshot is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingRoom {
    /// Stable room identifier (e.g. `conference-a`)
    pub room_id: String,
    /// Display name
    pub name: String,
    /// Occupancy state
    pub status: RoomStatus,
    /// Present iff the room is occupied.
    ///
    /// `None` serializes as an explicit `null`; view merges overwrite stored
    /// keys in place, and an omitted key would leave a cleared booking
    /// behind.
    #[serde(default)]
    pub current_booking: Option<BookingInfo>,
}

impl MeetingRoom {
    /// Create a vacant room
    #[must_use]
    pub fn vacant(room_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            name: name.into(),
            status: RoomStatus::Vacant,
            current_booking: None,
        }
    }

    /// Whether the room is free to book
    #[must_use]
    pub const fn is_vacant(&self) -> bool {
        matches!(self.status, RoomStatus::Vacant)
    }

    /// Whether the room currently holds a booking whose end time has passed
    #[must_use]
    pub fn has_expired_booking(&self, now: DateTime<Utc>) -> bool {
        self.current_booking
            .as_ref()
            .is_some_and(|booking| booking.is_expired(now))
    }

    /// Re-derive occupancy from the booking at `now`.
    ///
    /// Expired bookings are cleared, and status is forced consistent with
    /// the booking's presence. Returns `true` when anything changed.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> bool {
        let expired = self.has_expired_booking(now);
        if expired {
            self.current_booking = None;
        }
        let derived = if self.current_booking.is_some() {
            RoomStatus::Occupied
        } else {
            RoomStatus::Vacant
        };
        let swept = expired || self.status != derived;
        self.status = derived;
        swept
    }

    /// Mark the room occupied by `booking`.
    ///
    /// Callers must have validated vacancy and the interval first.
    pub fn occupy(&mut self, booking: BookingInfo) {
        self.status = RoomStatus::Occupied;
        self.current_booking = Some(booking);
    }

    /// Clear occupancy
    pub fn vacate(&mut self) {
        self.status = RoomStatus::Vacant;
        self.current_booking = None;
    }
}
