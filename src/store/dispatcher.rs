//! Fetch lifecycle for dependencies.
//!
//! A fetch registers `PENDING` synchronously, then either resolves from
//! cached metadata or performs one registry lookup and settles as
//! `FULFILLED` or `REJECTED`. Lookups in flight are memoized per
//! `(file, name)` so concurrent callers share a single request.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{self, BoxFuture, Shared};
use thiserror::Error;
use tokio::sync::{Semaphore, oneshot};
use tokio::task::JoinHandle;

use super::record::{DependencyRecord, FetchedDependency};
use super::reducer::Action;
use super::{FileKey, Store, selectors};
use crate::parsers::ExtractedDependency;
use crate::registries::Registry;

/// Registry lookups allowed to run at once
pub const MAX_CONCURRENT_REQUESTS: usize = 5;

/// Generic failure handed back to callers. The registry error itself is
/// logged, the store only records `error: true`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("problems getting dependency {name}")]
    Rejected { name: String },
    #[error("fetch of {name} was interrupted")]
    Interrupted { name: String },
}

/// Outcome of a fetch, shareable between every caller waiting on it
pub type SharedFetch = Shared<BoxFuture<'static, Result<DependencyRecord, FetchError>>>;

type InFlight = DashMap<(FileKey, String), SharedFetch>;

pub struct FetchDispatcher {
    store: Arc<Store>,
    registry: Arc<dyn Registry>,
    in_flight: Arc<InFlight>,
    permits: Arc<Semaphore>,
}

impl FetchDispatcher {
    pub fn new(store: Arc<Store>, registry: Arc<dyn Registry>) -> Self {
        Self {
            store,
            registry,
            in_flight: Arc::new(DashMap::new()),
            permits: Arc::new(Semaphore::new(MAX_CONCURRENT_REQUESTS)),
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Number of registry lookups currently outstanding
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Fetch metadata for `name` declared on `line` of `file_key`.
    ///
    /// `PENDING` is applied before this returns its future, so it is visible
    /// before any network activity starts.
    pub async fn dispatch_fetch(
        &self,
        file_key: &FileKey,
        name: &str,
        line: u32,
        auth_token: Option<&str>,
    ) -> Result<DependencyRecord, FetchError> {
        self.begin_fetch(file_key, name, line, auth_token).await
    }

    /// Synchronous half of [`dispatch_fetch`](Self::dispatch_fetch): register
    /// the fetch and hand back a future for its outcome.
    ///
    /// A second call for a pair that is already in flight joins the
    /// outstanding lookup. It only moves the record to `line` when the
    /// dependency moved; no second request is made.
    ///
    /// No in-flight guard is held while the store runs its listeners.
    pub fn begin_fetch(
        &self,
        file_key: &FileKey,
        name: &str,
        line: u32,
        auth_token: Option<&str>,
    ) -> SharedFetch {
        let key = (file_key.clone(), name.to_string());
        let stored = selectors::select_dependency(&self.store.state(), file_key, name).cloned();

        let vacant = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                let joined = entry.get().clone();
                drop(entry);
                tracing::debug!("Joining in-flight fetch of {} for {}", name, file_key);
                if stored.is_some_and(|record| record.line != line) {
                    self.store.dispatch(Action::Pending {
                        file_key: file_key.clone(),
                        name: name.to_string(),
                        line,
                    });
                }
                return joined;
            }
            Entry::Vacant(vacant) => vacant,
        };

        if let Some(data) = stored.and_then(|record| record.data) {
            drop(vacant);
            tracing::debug!("Cache hit for {} in {}", name, file_key);
            self.store.dispatch(Action::Pending {
                file_key: file_key.clone(),
                name: name.to_string(),
                line,
            });
            let payload = FetchedDependency {
                name: name.to_string(),
                line,
                data,
                updated_at: Utc::now(),
            };
            self.store.dispatch(Action::Fulfilled {
                file_key: file_key.clone(),
                payload: payload.clone(),
            });
            return future::ready(Ok::<_, FetchError>(payload.into()))
                .boxed()
                .shared();
        }

        // the task waits until PENDING is applied and its entry exists
        let (start_tx, start_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(fetch_from_registry(
            FetchContext {
                store: Arc::clone(&self.store),
                registry: Arc::clone(&self.registry),
                in_flight: Arc::clone(&self.in_flight),
                permits: Arc::clone(&self.permits),
            },
            key,
            line,
            auth_token.map(str::to_owned),
            start_rx,
        ));

        let store = Arc::clone(&self.store);
        let in_flight = Arc::clone(&self.in_flight);
        let task_key = (file_key.clone(), name.to_string());
        let shared = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let (file_key, name) = task_key;
                    tracing::warn!("Fetch task for {} was aborted: {}", name, e);
                    in_flight.remove(&(file_key.clone(), name.clone()));
                    store.dispatch(Action::Rejected {
                        file_key,
                        name: name.clone(),
                    });
                    Err(FetchError::Interrupted { name })
                }
            }
        }
        .boxed()
        .shared();

        vacant.insert(shared.clone());

        self.store.dispatch(Action::Pending {
            file_key: file_key.clone(),
            name: name.to_string(),
            line,
        });
        let _ = start_tx.send(());
        shared
    }

    /// Bring the store in line with a fresh extraction of `file_key`.
    ///
    /// Records for names no longer declared are removed. Names that are new,
    /// moved to another line, failed before, or have no data yet are fetched.
    /// Records already fulfilled on the same line are left alone so a
    /// re-save only notifies about what actually changed.
    pub fn reconcile_file(
        &self,
        file_key: &FileKey,
        extracted: &[ExtractedDependency],
        auth_token: Option<&str>,
    ) -> Vec<JoinHandle<Result<DependencyRecord, FetchError>>> {
        let state = self.store.state();
        let existing = selectors::select_dependencies(&state, file_key);

        if let Some(records) = existing {
            let mut stale: Vec<&String> = records
                .keys()
                .filter(|name| !extracted.iter().any(|dep| &dep.name == *name))
                .collect();
            stale.sort();
            for name in stale {
                self.store.dispatch(Action::Remove {
                    file_key: file_key.clone(),
                    name: name.clone(),
                });
            }
        }

        extracted
            .iter()
            .filter(|dep| {
                let current = existing.and_then(|records| records.get(&dep.name));
                !current.is_some_and(|record| {
                    record.line == dep.line
                        && !record.error
                        && (record.is_fetching || record.data.is_some())
                })
            })
            .map(|dep| {
                tokio::spawn(self.begin_fetch(file_key, &dep.name, dep.line, auth_token))
            })
            .collect()
    }
}

/// Shared handles a spawned lookup settles into
struct FetchContext {
    store: Arc<Store>,
    registry: Arc<dyn Registry>,
    in_flight: Arc<InFlight>,
    permits: Arc<Semaphore>,
}

async fn fetch_from_registry(
    ctx: FetchContext,
    key: (FileKey, String),
    line: u32,
    auth_token: Option<String>,
    start: oneshot::Receiver<()>,
) -> Result<DependencyRecord, FetchError> {
    let (file_key, name) = key.clone();
    let FetchContext {
        store,
        registry,
        in_flight,
        permits,
    } = ctx;

    // a dropped sender means registration already finished or unwound
    let _ = start.await;

    let lookup = async {
        let _permit = permits.acquire().await;
        registry.fetch_package(&name, auth_token.as_deref()).await
    };

    let outcome = match AssertUnwindSafe(lookup).catch_unwind().await {
        Ok(Ok(data)) => {
            // the dependency may have moved while the request ran
            let line = selectors::select_dependency(&store.state(), &file_key, &name)
                .map_or(line, |record| record.line);
            let payload = FetchedDependency {
                name: name.clone(),
                line,
                data: Arc::new(data),
                updated_at: Utc::now(),
            };
            store.dispatch(Action::Fulfilled {
                file_key: file_key.clone(),
                payload: payload.clone(),
            });
            Ok(DependencyRecord::from(payload))
        }
        Ok(Err(e)) => {
            tracing::warn!("Failed to fetch {} for {}: {}", name, file_key, e);
            store.dispatch(Action::Rejected {
                file_key: file_key.clone(),
                name: name.clone(),
            });
            Err(FetchError::Rejected { name })
        }
        Err(_) => {
            tracing::warn!("Registry lookup for {} panicked", name);
            store.dispatch(Action::Rejected {
                file_key: file_key.clone(),
                name: name.clone(),
            });
            Err(FetchError::Interrupted { name })
        }
    };

    in_flight.remove(&key);
    outcome
}
