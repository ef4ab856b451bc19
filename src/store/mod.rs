//! Reactive store for per-file dependency fetch state
//!
//! The store holds one immutable [`StoreState`] snapshot. Every
//! [`Store::dispatch`] reduces an [`Action`] into a new snapshot, swaps it in
//! and then runs the registered listeners with it, one transition at a time.
//!
//! - [`reducer`]: pure state transitions
//! - [`selectors`]: read helpers over a snapshot
//! - [`subscription`]: change detection emitting `dependency-loaded`
//! - [`dispatcher`]: fetch lifecycle (pending, fulfilled, rejected)

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tower_lsp::lsp_types::Url;

pub mod dispatcher;
pub mod record;
pub mod reducer;
pub mod selectors;
pub mod subscription;

pub use dispatcher::{FetchDispatcher, FetchError};
pub use record::{DependencyRecord, FetchedDependency};
pub use reducer::{Action, FileDependencies, StoreState};

/// Stable identity of an open document (its path or URI)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FileKey(Arc<str>);

impl FileKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileKey {
    fn from(key: &str) -> Self {
        Self(Arc::from(key))
    }
}

impl From<String> for FileKey {
    fn from(key: String) -> Self {
        Self(Arc::from(key))
    }
}

impl From<&Url> for FileKey {
    fn from(uri: &Url) -> Self {
        Self::from(uri.as_str())
    }
}

/// Callback run after each transition with the new snapshot.
///
/// Listeners run while the store serializes transitions, so they must not
/// dispatch into the same store.
pub type Listener = Box<dyn Fn(&Arc<StoreState>) + Send + Sync>;

/// Holder of the current snapshot and its listeners
pub struct Store {
    state: Mutex<Arc<StoreState>>,
    listeners: Mutex<Vec<Listener>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::with_state(StoreState::default())
    }

    pub fn with_state(state: StoreState) -> Self {
        Self {
            state: Mutex::new(Arc::new(state)),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Current snapshot
    pub fn state(&self) -> Arc<StoreState> {
        Arc::clone(&self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Apply an action and notify listeners with the resulting snapshot
    pub fn dispatch(&self, action: Action) -> Arc<StoreState> {
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let next = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let next = reducer::reduce(&state, &action);
            *state = Arc::clone(&next);
            next
        };

        tracing::debug!("{} {}", action.kind(), action.file_key());

        for listener in listeners.iter() {
            listener(&next);
        }
        next
    }

    /// Register a listener built from the snapshot current at registration.
    ///
    /// No transition can happen between reading that snapshot and the
    /// listener being installed.
    pub fn subscribe<F>(&self, init: F)
    where
        F: FnOnce(&Arc<StoreState>) -> Listener,
    {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let current = self.state();
        listeners.push(init(&current));
    }
}
