//! Record envelope and collection identity

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// The named collections synchronized by the console.
///
/// Wire names are the camelCase keys the console stores under the shared
/// root (`meetingRooms`, `alerts`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CollectionKey {
    Alerts,
    MeetingRooms,
    Tasks,
    Hierarchy,
    News,
    Knowledge,
    Help,
    Attendance,
}

impl CollectionKey {
    /// Every collection the console synchronizes, in default registration order.
    pub const ALL: [Self; 8] = [
        Self::Alerts,
        Self::MeetingRooms,
        Self::Tasks,
        Self::Hierarchy,
        Self::News,
        Self::Knowledge,
        Self::Help,
        Self::Attendance,
    ];

    /// Stable wire name of this collection
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alerts => "alerts",
            Self::MeetingRooms => "meetingRooms",
            Self::Tasks => "tasks",
            Self::Hierarchy => "hierarchy",
            Self::News => "news",
            Self::Knowledge => "knowledge",
            Self::Help => "help",
            Self::Attendance => "attendance",
        }
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidInput(format!("Unknown collection '{s}'")))
    }
}

/// A unique identifier for a record, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Create a new unique record ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Identity of one running console instance, stamped into every snapshot it
/// writes so other instances (and the instance itself, for echo suppression)
/// can tell who produced a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SystemId(Uuid);

impl SystemId {
    /// Generate a fresh instance identity
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SystemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A record in a collection: the engine-owned envelope plus an opaque,
/// collection-specific payload.
///
/// The envelope carries identity and timestamps; everything else lives in
/// `fields` and is flattened into the same JSON object on the wire, so blobs
/// keep the shape the console UI reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Unique identifier within the collection
    pub id: RecordId,
    /// Creation timestamp
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Last update timestamp
    pub updated_at: chrono::DateTime<chrono::Utc>,
    /// Collection-specific payload, opaque to the sync engine
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Create a new record with the given payload fields
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: RecordId::new(),
            created_at: now,
            updated_at: now,
            fields,
        }
    }

    /// Create a new record from a typed payload view.
    ///
    /// Fails with `InvalidInput` when the view does not serialize to a JSON
    /// object.
    pub fn from_view<T: Serialize>(view: &T) -> Result<Self> {
        let mut record = Self::new(Map::new());
        record.write_view(view)?;
        Ok(record)
    }

    /// Look up a payload field by name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Parse the payload into a typed view
    pub fn view<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.fields.clone()))?)
    }

    /// Serialize a typed view back into the payload.
    ///
    /// Known keys are overwritten; payload fields the view does not model are
    /// preserved, so a typed round-trip never drops foreign data.
    pub fn write_view<T: Serialize>(&mut self, view: &T) -> Result<()> {
        let Value::Object(fields) = serde_json::to_value(view)? else {
            return Err(Error::InvalidInput(
                "record payload must be a JSON object".to_string(),
            ));
        };
        self.fields.extend(fields);
        self.touch();
        Ok(())
    }

    /// Merge raw payload fields, overwriting existing keys
    pub fn merge_fields(&mut self, fields: Map<String, Value>) {
        self.fields.extend(fields);
        self.touch();
    }

    /// Bump the update timestamp
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now();
    }
}
