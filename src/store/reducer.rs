//! State transitions for the dependency store.
//!
//! Snapshots are immutable: every transition builds a new [`StoreState`]
//! that shares untouched file scopes with the previous one.

use std::sync::Arc;

use hashbrown::HashMap;

use super::FileKey;
use super::record::{DependencyRecord, FetchedDependency};

/// Dependency records of one file, keyed by dependency name
pub type FileDependencies = HashMap<String, DependencyRecord>;

/// One snapshot of the store: file key -> dependency name -> record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub(crate) files: HashMap<FileKey, Arc<FileDependencies>>,
}

impl StoreState {
    pub fn file(&self, file_key: &FileKey) -> Option<&Arc<FileDependencies>> {
        self.files.get(file_key)
    }

    pub fn files(&self) -> impl Iterator<Item = (&FileKey, &Arc<FileDependencies>)> {
        self.files.iter()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Build a snapshot from plain records, mostly for seeding tests
    pub fn from_records(records: impl IntoIterator<Item = (FileKey, DependencyRecord)>) -> Self {
        let mut files: HashMap<FileKey, FileDependencies> = HashMap::new();
        for (file_key, record) in records {
            files
                .entry(file_key)
                .or_default()
                .insert(record.name.clone(), record);
        }
        Self {
            files: files.into_iter().map(|(k, v)| (k, Arc::new(v))).collect(),
        }
    }
}

/// Intents accepted by the store
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A document was opened: make room for its dependencies
    OpenFile { file_key: FileKey },
    /// A document was closed: evict everything recorded for it
    CloseFile { file_key: FileKey },
    /// A fetch was registered for a dependency
    Pending {
        file_key: FileKey,
        name: String,
        line: u32,
    },
    /// Metadata became available (from the registry or the store itself)
    Fulfilled {
        file_key: FileKey,
        payload: FetchedDependency,
    },
    /// The registry lookup failed
    Rejected { file_key: FileKey, name: String },
    /// The dependency is no longer declared
    Remove { file_key: FileKey, name: String },
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::OpenFile { .. } => "OPEN_FILE",
            Action::CloseFile { .. } => "CLOSE_FILE",
            Action::Pending { .. } => "ADD_DEPENDENCY_PENDING",
            Action::Fulfilled { .. } => "ADD_DEPENDENCY_FULFILLED",
            Action::Rejected { .. } => "ADD_DEPENDENCY_REJECTED",
            Action::Remove { .. } => "REMOVE_DEPENDENCY",
        }
    }

    pub fn file_key(&self) -> &FileKey {
        match self {
            Action::OpenFile { file_key }
            | Action::CloseFile { file_key }
            | Action::Pending { file_key, .. }
            | Action::Fulfilled { file_key, .. }
            | Action::Rejected { file_key, .. }
            | Action::Remove { file_key, .. } => file_key,
        }
    }
}

/// Apply one action. Returns the same snapshot when nothing changes.
pub fn reduce(state: &Arc<StoreState>, action: &Action) -> Arc<StoreState> {
    match action {
        Action::OpenFile { file_key } => {
            if state.files.contains_key(file_key) {
                return Arc::clone(state);
            }
            let mut next = StoreState::clone(state);
            next.files.insert(file_key.clone(), Arc::default());
            Arc::new(next)
        }
        Action::CloseFile { file_key } => {
            if !state.files.contains_key(file_key) {
                return Arc::clone(state);
            }
            let mut next = StoreState::clone(state);
            next.files.remove(file_key);
            Arc::new(next)
        }
        Action::Pending {
            file_key,
            name,
            line,
        } => update_record(state, file_key, |records| {
            let previous = records.remove(name);
            let record = DependencyRecord {
                is_fetching: true,
                // keep showing cached metadata while the refetch runs
                data: previous.as_ref().and_then(|p| p.data.clone()),
                updated_at: previous.as_ref().and_then(|p| p.updated_at),
                ..DependencyRecord::new(name.clone(), *line)
            };
            records.insert(name.clone(), record);
        }),
        Action::Fulfilled { file_key, payload } => update_record(state, file_key, |records| {
            records.insert(payload.name.clone(), payload.clone().into());
        }),
        Action::Rejected { file_key, name } => {
            // nothing to mark once the record is gone (closed file, removed name)
            if !has_record(state, file_key, name) {
                return Arc::clone(state);
            }
            update_record(state, file_key, |records| {
                if let Some(record) = records.get_mut(name) {
                    record.error = true;
                    record.is_fetching = false;
                }
            })
        }
        Action::Remove { file_key, name } => {
            if !has_record(state, file_key, name) {
                return Arc::clone(state);
            }
            update_record(state, file_key, |records| {
                records.remove(name);
            })
        }
    }
}

fn has_record(state: &StoreState, file_key: &FileKey, name: &str) -> bool {
    state
        .files
        .get(file_key)
        .is_some_and(|records| records.contains_key(name))
}

/// Copy-on-write update of one file scope, creating it when missing
fn update_record(
    state: &Arc<StoreState>,
    file_key: &FileKey,
    update: impl FnOnce(&mut FileDependencies),
) -> Arc<StoreState> {
    let mut next = StoreState::clone(state);
    let records = next.files.entry(file_key.clone()).or_default();
    update(Arc::make_mut(records));
    Arc::new(next)
}
