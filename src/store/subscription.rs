//! Change detection between store snapshots.
//!
//! After every transition the new snapshot is diffed against the last one
//! observed. Each settled record (data or error, not fetching) that is new
//! or differs from its previous version yields exactly one
//! [`DependencyLoaded`].

use std::sync::{Arc, Mutex, PoisonError};

use super::reducer::{FileDependencies, StoreState};
use super::{FileKey, Store};
use crate::events::{DependencyLoaded, EventHub};

/// Remembers the last observed snapshot and reports what changed since
pub struct ChangeDetector {
    last: Mutex<Arc<StoreState>>,
}

impl ChangeDetector {
    /// Start from `baseline`. Records already present there are never
    /// reported unless they change later.
    pub fn new(baseline: Arc<StoreState>) -> Self {
        Self {
            last: Mutex::new(baseline),
        }
    }

    /// Replace the last observed snapshot with `next` and return the
    /// dependencies that were newly loaded in between.
    pub fn observe(&self, next: &Arc<StoreState>) -> Vec<DependencyLoaded> {
        let previous = {
            let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *last, Arc::clone(next))
        };

        if Arc::ptr_eq(&previous, next) || *previous == **next {
            return Vec::new();
        }

        let mut loaded = Vec::new();
        for (file_key, records) in next.files() {
            let before = previous.file(file_key);
            if before.is_some_and(|before| Arc::ptr_eq(before, records) || before == records) {
                continue;
            }
            diff_file(file_key, before.map(Arc::as_ref), records, &mut loaded);
        }
        loaded
    }
}

fn diff_file(
    file_key: &FileKey,
    before: Option<&FileDependencies>,
    after: &FileDependencies,
    loaded: &mut Vec<DependencyLoaded>,
) {
    let mut changed: Vec<_> = after
        .values()
        .filter(|record| record.is_resolved() && !record.is_fetching)
        .filter(|record| before.and_then(|b| b.get(&record.name)) != Some(*record))
        .collect();
    changed.sort_by_key(|record| record.line);

    loaded.extend(changed.into_iter().map(|record| DependencyLoaded {
        dependency: record.clone(),
        file_key: file_key.clone(),
    }));
}

/// Wire change detection from `store` into `hub`.
///
/// The baseline is the snapshot current at subscription time, so records
/// that existed before are not announced.
pub fn subscribe_to_dependencies(store: &Store, hub: Arc<EventHub>) {
    store.subscribe(move |current| {
        let detector = ChangeDetector::new(Arc::clone(current));
        Box::new(move |next: &Arc<StoreState>| {
            for event in detector.observe(next) {
                hub.emit(&event);
            }
        })
    });
}
