//! Record Store: one student record per uid.
//!
//! `AppState` holds an `Arc<dyn RecordStore>`; Postgres in hosted mode,
//! `InMemoryRecordStore` otherwise. Every successful `upsert` is published
//! on a per-uid broadcast channel so open subscriptions see the change.

pub mod memory;
pub mod postgres;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::models::student::StudentRecord;

pub use memory::InMemoryRecordStore;
pub use postgres::PgRecordStore;

const FEED_CAPACITY: usize = 16;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts the record, or merges it into the existing one with the same uid.
    async fn upsert(&self, record: StudentRecord) -> Result<StudentRecord, AppError>;

    async fn get(&self, uid: &str) -> Result<Option<StudentRecord>, AppError>;

    /// Every record, oldest first.
    async fn list_all(&self) -> Result<Vec<StudentRecord>, AppError>;

    /// Opens a live feed of changes to one record.
    fn subscribe(&self, uid: &str) -> RecordSubscription;
}

type Channels = HashMap<String, broadcast::Sender<StudentRecord>>;

/// Per-uid broadcast channels. Channels are created on first subscription and
/// removed when their last subscription is dropped.
#[derive(Clone, Default)]
pub struct RecordFeed {
    channels: Arc<Mutex<Channels>>,
}

impl RecordFeed {
    pub fn subscribe(&self, uid: &str) -> RecordSubscription {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = channels
            .entry(uid.to_string())
            .or_insert_with(|| broadcast::channel(FEED_CAPACITY).0);
        let receiver = sender.subscribe();
        debug!(
            "Subscribed to record {uid} ({} subscribers)",
            sender.receiver_count()
        );
        RecordSubscription {
            uid: uid.to_string(),
            receiver: Some(receiver),
            feed: self.clone(),
        }
    }

    /// Sends the record to its subscribers. Returns how many received it.
    pub fn publish(&self, record: &StudentRecord) -> usize {
        let channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels
            .get(&record.uid)
            .and_then(|sender| sender.send(record.clone()).ok())
            .unwrap_or(0)
    }

    #[cfg(test)]
    pub fn subscriber_count(&self, uid: &str) -> usize {
        let channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels.get(uid).map(|s| s.receiver_count()).unwrap_or(0)
    }

    fn release(&self, uid: &str) {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        if channels.get(uid).is_some_and(|s| s.receiver_count() == 0) {
            channels.remove(uid);
            debug!("Removed record feed for {uid}");
        }
    }
}

/// Handle on a live record feed. Dropping it unsubscribes.
pub struct RecordSubscription {
    uid: String,
    receiver: Option<broadcast::Receiver<StudentRecord>>,
    feed: RecordFeed,
}

impl RecordSubscription {
    /// Waits for the next change. `None` once the feed is closed.
    ///
    /// Missed updates (a slow consumer) are logged and skipped; the next
    /// delivered record is always the latest state anyway.
    pub async fn next(&mut self) -> Option<StudentRecord> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(record) => return Some(record),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("Subscription to {} lagged, skipped {missed} updates", self.uid);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for RecordSubscription {
    fn drop(&mut self) {
        // The receiver has to go before the count check in `release`.
        drop(self.receiver.take());
        self.feed.release(&self.uid);
    }
}
