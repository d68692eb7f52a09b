//! Data models for Atrium

mod alert;
mod booking;
mod hierarchy;
mod record;

pub use alert::Alert;
pub use booking::{BookingInfo, MeetingRoom, RoomStatus};
pub use hierarchy::HierarchyEdge;
pub use record::{CollectionKey, Record, RecordId, SystemId};
