//! Per-surface subscription adapter
//!
//! A UI surface subscribes to the collections it renders and pulls a status
//! snapshot whenever it redraws. Change events are drained from the
//! broadcast receiver on each pull; nothing here runs in the background.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::warn;

use crate::error::Result;
use crate::events::ChangeEvent;
use crate::models::CollectionKey;
use crate::sync::SyncEngine;

/// Connectivity and activity snapshot for one subscriber
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    /// Whether the subscription can still receive events
    pub is_connected: bool,
    /// When this subscriber last observed a sync
    pub last_sync: Option<DateTime<Utc>>,
    /// Change events observed for subscribed collections
    pub sync_count: u64,
    /// Recent engine poll failures, oldest first
    pub errors: Vec<String>,
}

/// Everything a diagnostics surface wants in one object
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStats {
    /// Collections this subscriber watches
    pub subscribed: Vec<CollectionKey>,
    /// Change events observed for subscribed collections
    pub sync_count: u64,
    /// When this subscriber last observed a sync
    pub last_sync: Option<DateTime<Utc>>,
    /// Latest observed change timestamp per collection
    pub updates: HashMap<CollectionKey, DateTime<Utc>>,
}

/// A handle subscribing one consumer to a set of collections.
///
/// Subscribing registers the collections with the engine's poll rotation.
/// All accessors drain pending events first, so the returned snapshot is
/// current as of the call.
pub struct SubscriptionHook {
    engine: Arc<SyncEngine>,
    keys: Vec<CollectionKey>,
    receiver: Option<broadcast::Receiver<ChangeEvent>>,
    updates: HashMap<CollectionKey, DateTime<Utc>>,
    sync_count: u64,
    last_sync: Option<DateTime<Utc>>,
}

impl SubscriptionHook {
    /// Subscribe to change notifications for `keys`.
    #[must_use]
    pub fn new(engine: Arc<SyncEngine>, keys: impl IntoIterator<Item = CollectionKey>) -> Self {
        let keys: Vec<CollectionKey> = keys.into_iter().collect();
        for key in &keys {
            engine.register(*key);
        }
        let receiver = engine.service().subscribe();
        Self {
            engine,
            keys,
            receiver: Some(receiver),
            updates: HashMap::new(),
            sync_count: 0,
            last_sync: None,
        }
    }

    /// Current connectivity and activity snapshot.
    pub fn status(&mut self) -> SubscriptionStatus {
        self.drain();
        SubscriptionStatus {
            is_connected: self.receiver.is_some(),
            last_sync: self.last_sync,
            sync_count: self.sync_count,
            errors: self.engine.errors(),
        }
    }

    /// Latest observed change timestamp per subscribed collection.
    pub fn updates(&mut self) -> HashMap<CollectionKey, DateTime<Utc>> {
        self.drain();
        self.updates.clone()
    }

    /// Run a manual off-cycle sync pass and return the collections that
    /// changed.
    pub async fn sync_now(&mut self) -> Result<Vec<CollectionKey>> {
        let changed = self.engine.sync_now().await?;
        self.last_sync = Some(Utc::now());
        self.drain();
        Ok(changed)
    }

    /// Full diagnostics object.
    pub fn stats(&mut self) -> SubscriptionStats {
        self.drain();
        SubscriptionStats {
            subscribed: self.keys.clone(),
            sync_count: self.sync_count,
            last_sync: self.last_sync,
            updates: self.updates.clone(),
        }
    }

    /// Stop receiving events. Idempotent, and safe to call after the
    /// engine side has been torn down.
    pub fn unsubscribe(&mut self) {
        self.receiver.take();
    }

    /// Pull everything pending off the receiver into local bookkeeping.
    fn drain(&mut self) {
        let Some(receiver) = self.receiver.as_mut() else {
            return;
        };
        loop {
            match receiver.try_recv() {
                Ok(event) => {
                    if self.keys.contains(&event.collection) {
                        self.updates.insert(event.collection, event.timestamp);
                        self.sync_count += 1;
                        self.last_sync = Some(event.timestamp);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    warn!("Subscription fell behind, {missed} events dropped");
                }
                Err(broadcast::error::TryRecvError::Empty) => break,
                Err(broadcast::error::TryRecvError::Closed) => {
                    self.receiver = None;
                    break;
                }
            }
        }
    }
}
