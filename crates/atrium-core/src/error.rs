//! Error types for atrium-core

use thiserror::Error;

/// Result type alias using atrium-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in atrium-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// No storage variant could be initialized
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Corrupt or foreign snapshot blob
    #[error("Snapshot parse error for '{collection}': {message}")]
    Parse {
        /// Collection whose blob failed to parse
        collection: String,
        /// Underlying parse failure
        message: String,
    },

    /// A write raced another writer and its base version is no longer current
    #[error("Stale snapshot for '{collection}': base version {base}, stored version {stored}")]
    StaleSnapshot {
        /// Collection being written
        collection: String,
        /// Version the writer based its mutation on
        base: u64,
        /// Version actually stored in the medium
        stored: u64,
    },

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Room already has an active booking
    #[error("Room occupied: {0}")]
    RoomOccupied(String),

    /// Booking interval is empty or starts in the past
    #[error("Invalid booking interval: {0}")]
    InvalidInterval(String),

    /// Cancel requested on a vacant room
    #[error("No active booking for room: {0}")]
    NoActiveBooking(String),

    /// Employee reporting to themselves
    #[error("Employee cannot report to themselves: {0}")]
    SelfReport(String),

    /// Employee already has a manager edge
    #[error("Employee already has a manager: {0}")]
    DuplicateManager(String),

    /// Edge would make the manager a transitive report of the employee
    #[error("Reporting edge would create a cycle: {employee} -> {manager}")]
    CycleDetected {
        /// Employee being assigned a manager
        employee: String,
        /// Manager that is already a transitive report
        manager: String,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build a `Parse` error for a collection blob.
    pub fn parse(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            collection: collection.into(),
            message: message.into(),
        }
    }
}
