//! Meeting room booking operations
//!
//! Mutual exclusion is enforced at validation time within this instance:
//! a room must read vacant, after the expiry sweep, before a booking is
//! accepted. Across instances the guarantee is eventual (last writer wins
//! until the next poll), which is the documented limit of the medium.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::debug;

use super::DataService;
use crate::error::{Error, Result};
use crate::models::{BookingInfo, CollectionKey, MeetingRoom, Record, RecordId};
use crate::util::normalize_name;

/// Rooms seeded into a fresh instance that has no stored collection
#[must_use]
pub fn default_rooms() -> Vec<MeetingRoom> {
    vec![
        MeetingRoom::vacant("conference-a", "Conference Room A"),
        MeetingRoom::vacant("conference-b", "Conference Room B"),
        MeetingRoom::vacant("huddle-1", "Huddle Room 1"),
        MeetingRoom::vacant("huddle-2", "Huddle Room 2"),
    ]
}

/// Sweep every parseable room record at `now`. Returns whether anything
/// changed. Records that do not parse as rooms are left untouched.
pub(crate) fn sweep_rooms(records: &mut [Record], now: DateTime<Utc>) -> bool {
    let mut swept = false;
    for record in records.iter_mut() {
        let Ok(mut room) = record.view::<MeetingRoom>() else {
            continue;
        };
        if room.sweep(now) && record.write_view(&room).is_ok() {
            swept = true;
        }
    }
    swept
}

fn room_id_of(record: &Record) -> Option<&str> {
    record.field("roomId").and_then(Value::as_str)
}

impl DataService {
    /// All meeting rooms with their record ids, swept for expired bookings.
    ///
    /// Records that do not parse as rooms are skipped.
    pub async fn rooms(&self) -> Result<Vec<(RecordId, MeetingRoom)>> {
        let mut state = self.state.lock().await;
        let records = self.loaded(&mut state, CollectionKey::MeetingRooms).await?;
        sweep_rooms(records, Utc::now());

        Ok(records
            .iter()
            .filter_map(|record| match record.view::<MeetingRoom>() {
                Ok(room) => Some((record.id, room)),
                Err(error) => {
                    debug!("Skipping non-room record '{}': {error}", record.id);
                    None
                }
            })
            .collect())
    }

    /// Find a room by its stable identifier, creating it vacant when absent.
    pub async fn ensure_room(&self, room_id: &str, name: &str) -> Result<MeetingRoom> {
        let room_id = normalize_name(room_id)
            .ok_or_else(|| Error::InvalidInput("room id cannot be empty".to_string()))?;
        let name = normalize_name(name)
            .ok_or_else(|| Error::InvalidInput("room name cannot be empty".to_string()))?;

        let mut state = self.state.lock().await;
        let records = self.loaded(&mut state, CollectionKey::MeetingRooms).await?;
        if let Some(record) = records
            .iter()
            .find(|record| room_id_of(record) == Some(room_id.as_str()))
        {
            return record.view();
        }

        let room = MeetingRoom::vacant(room_id, name);
        let mut next = records.clone();
        next.push(Record::from_view(&room)?);

        let meta = self.persist(CollectionKey::MeetingRooms, &next).await?;
        state.collections.insert(CollectionKey::MeetingRooms, next);
        self.publish(CollectionKey::MeetingRooms, meta.timestamp);
        Ok(room)
    }

    /// Seed the default room set when the collection is empty.
    ///
    /// Returns how many rooms were created; zero when rooms already exist.
    pub async fn ensure_default_rooms(&self) -> Result<usize> {
        let mut state = self.state.lock().await;
        let records = self.loaded(&mut state, CollectionKey::MeetingRooms).await?;
        if !records.is_empty() {
            return Ok(0);
        }

        let rooms = default_rooms();
        let mut next = Vec::with_capacity(rooms.len());
        for room in &rooms {
            next.push(Record::from_view(room)?);
        }

        let meta = self.persist(CollectionKey::MeetingRooms, &next).await?;
        state.collections.insert(CollectionKey::MeetingRooms, next);
        self.publish(CollectionKey::MeetingRooms, meta.timestamp);
        Ok(rooms.len())
    }

    /// Book a room for `[start_time, end_time)`.
    ///
    /// Fails with `RoomOccupied` when the room is not vacant at validation
    /// time and `InvalidInterval` when the interval is empty, inverted, or
    /// starts in the past.
    pub async fn book(
        &self,
        room_id: &str,
        employee: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<MeetingRoom> {
        self.book_at(room_id, employee, start_time, end_time, Utc::now())
            .await
    }

    /// Book a room starting now.
    pub async fn book_now(
        &self,
        room_id: &str,
        employee: &str,
        duration: Duration,
    ) -> Result<MeetingRoom> {
        let now = Utc::now();
        self.book_at(room_id, employee, now, now + duration, now)
            .await
    }

    /// Booking against an injected clock, shared by the public entry points
    /// and the expiry tests.
    pub(crate) async fn book_at(
        &self,
        room_id: &str,
        employee: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<MeetingRoom> {
        let employee = normalize_name(employee)
            .ok_or_else(|| Error::InvalidInput("employee name cannot be empty".to_string()))?;
        if start_time >= end_time {
            return Err(Error::InvalidInterval(
                "start time must be before end time".to_string(),
            ));
        }
        if start_time < now {
            return Err(Error::InvalidInterval(
                "start time cannot be in the past".to_string(),
            ));
        }

        self.mutate_room(room_id, now, |room| {
            if !room.is_vacant() {
                return Err(Error::RoomOccupied(room.room_id.clone()));
            }
            room.occupy(BookingInfo {
                employee,
                start_time,
                end_time,
            });
            Ok(())
        })
        .await
    }

    /// Cancel a room's active booking. Fails with `NoActiveBooking` when the
    /// room is already vacant (or its booking has expired).
    pub async fn cancel(&self, room_id: &str) -> Result<MeetingRoom> {
        self.mutate_room(room_id, Utc::now(), |room| {
            if room.is_vacant() {
                return Err(Error::NoActiveBooking(room.room_id.clone()));
            }
            room.vacate();
            Ok(())
        })
        .await
    }

    /// Run a validated mutation against one room and persist the result.
    ///
    /// The collection is swept at `now` first so validation sees derived
    /// occupancy, then the closure mutates the room's view, which is written
    /// back preserving any fields the view does not model.
    async fn mutate_room<F>(&self, room_id: &str, now: DateTime<Utc>, mutate: F) -> Result<MeetingRoom>
    where
        F: FnOnce(&mut MeetingRoom) -> Result<()>,
    {
        let mut state = self.state.lock().await;
        let records = self.loaded(&mut state, CollectionKey::MeetingRooms).await?;

        let mut next = records.clone();
        sweep_rooms(&mut next, now);

        let position = next
            .iter()
            .position(|record| room_id_of(record) == Some(room_id))
            .ok_or_else(|| Error::NotFound(format!("no meeting room '{room_id}'")))?;

        let mut room: MeetingRoom = next[position].view()?;
        mutate(&mut room)?;
        next[position].write_view(&room)?;

        let meta = self.persist(CollectionKey::MeetingRooms, &next).await?;
        state.collections.insert(CollectionKey::MeetingRooms, next);
        self.publish(CollectionKey::MeetingRooms, meta.timestamp);
        Ok(room)
    }
}
