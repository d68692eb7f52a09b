//! atrium-core - Core library for Atrium
//!
//! This crate contains the shared-state synchronization engine and the
//! domain rules of the Atrium console: storage adapters over a shared
//! folder, polling change detection with echo suppression, change event
//! fan-out, and the collection services (meeting rooms, alerts,
//! organizational hierarchy) whose invariants must hold after any local
//! mutation or remote apply.

pub mod error;
pub mod events;
pub mod models;
pub mod service;
pub mod storage;
pub mod subscription;
pub mod sync;
mod util;

pub use error::{Error, Result};
pub use events::{ChangeEvent, EventBus};
pub use models::{Alert, CollectionKey, MeetingRoom, Record, RecordId, SystemId};
pub use service::DataService;
pub use subscription::{SubscriptionHook, SubscriptionStatus};
pub use sync::{EngineStatus, PollConfig, PollerHandle, SyncEngine};
