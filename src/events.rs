//! Synchronous fan-out of `dependency-loaded` notifications.
//!
//! Subscribers register a `(file key, callback)` pair and are invoked in the
//! same tick as the store transition that produced the event. Removing a
//! document's subscriptions on close is what makes late notifications for
//! that document disappear.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use thiserror::Error;

use crate::store::{DependencyRecord, FileKey};

/// Name of the only event kind
pub const DID_LOAD_DEPENDENCY: &str = "did-load-dependency";

/// Default bound on registered subscribers
pub const DEFAULT_MAX_SUBSCRIBERS: usize = 256;

/// A dependency whose data (or error) just became available
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyLoaded {
    pub dependency: DependencyRecord,
    pub file_key: FileKey,
}

pub type Callback = Arc<dyn Fn(&DependencyLoaded) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("event hub is full ({0} subscribers)")]
    Full(usize),
}

struct Subscriber {
    id: SubscriptionId,
    file_key: FileKey,
    callback: Callback,
}

pub struct EventHub {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
    max_subscribers: usize,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_SUBSCRIBERS)
    }

    pub fn with_capacity(max_subscribers: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            max_subscribers,
        }
    }

    pub fn subscribe(
        &self,
        file_key: FileKey,
        callback: impl Fn(&DependencyLoaded) + Send + Sync + 'static,
    ) -> Result<SubscriptionId, EventError> {
        let mut subscribers = self.lock();
        if subscribers.len() >= self.max_subscribers {
            return Err(EventError::Full(self.max_subscribers));
        }
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        subscribers.push(Subscriber {
            id,
            file_key,
            callback: Arc::new(callback),
        });
        Ok(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.lock();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    /// Drop every subscription registered for a document
    pub fn unsubscribe_file(&self, file_key: &FileKey) -> usize {
        let mut subscribers = self.lock();
        let before = subscribers.len();
        subscribers.retain(|s| &s.file_key != file_key);
        before - subscribers.len()
    }

    /// Deliver an event to the subscribers of its file. Returns how many
    /// callbacks ran.
    pub fn emit(&self, event: &DependencyLoaded) -> usize {
        // callbacks run outside the lock so they may (un)subscribe
        let callbacks: Vec<Callback> = self
            .lock()
            .iter()
            .filter(|s| s.file_key == event.file_key)
            .map(|s| Arc::clone(&s.callback))
            .collect();

        tracing::debug!(
            "{} {} in {} ({} subscribers)",
            DID_LOAD_DEPENDENCY,
            event.dependency.name,
            event.file_key,
            callbacks.len()
        );

        for callback in &callbacks {
            callback(event);
        }
        callbacks.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Subscriber>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn event(file: &str, name: &str) -> DependencyLoaded {
        DependencyLoaded {
            dependency: DependencyRecord::new(name, 1),
            file_key: FileKey::from(file),
        }
    }

    fn counter(hub: &EventHub, file: &str) -> (SubscriptionId, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let id = hub
            .subscribe(FileKey::from(file), move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        (id, count)
    }

    #[test]
    fn test_emit_reaches_only_matching_file() {
        let hub = EventHub::new();
        let (_, a) = counter(&hub, "a/package.json");
        let (_, b) = counter(&hub, "b/package.json");

        assert_eq!(hub.emit(&event("a/package.json", "axios")), 1);
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe() {
        let hub = EventHub::new();
        let (id, count) = counter(&hub, "a");
        assert!(hub.unsubscribe(id));
        assert!(!hub.unsubscribe(id));
        assert_eq!(hub.emit(&event("a", "axios")), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe_file_drops_closed_document() {
        let hub = EventHub::new();
        counter(&hub, "a");
        counter(&hub, "a");
        counter(&hub, "b");
        assert_eq!(hub.unsubscribe_file(&FileKey::from("a")), 2);
        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(hub.emit(&event("a", "axios")), 0);
    }

    #[test]
    fn test_capacity_is_bounded() {
        let hub = EventHub::with_capacity(1);
        counter(&hub, "a");
        let err = hub.subscribe(FileKey::from("b"), |_| {}).unwrap_err();
        assert_eq!(err, EventError::Full(1));
    }

    #[test]
    fn test_callback_may_unsubscribe_itself() {
        let hub = Arc::new(EventHub::new());
        let inner = Arc::clone(&hub);
        hub.subscribe(FileKey::from("a"), move |event| {
            inner.unsubscribe_file(&event.file_key);
        })
        .unwrap();
        assert_eq!(hub.emit(&event("a", "axios")), 1);
        assert_eq!(hub.subscriber_count(), 0);
    }
}
