//! Read helpers over a store snapshot

use super::FileKey;
use super::record::DependencyRecord;
use super::reducer::{FileDependencies, StoreState};

pub fn select_dependencies<'a>(
    state: &'a StoreState,
    file_key: &FileKey,
) -> Option<&'a FileDependencies> {
    state.file(file_key).map(|records| records.as_ref())
}

pub fn select_dependency<'a>(
    state: &'a StoreState,
    file_key: &FileKey,
    name: &str,
) -> Option<&'a DependencyRecord> {
    select_dependencies(state, file_key)?.get(name)
}

/// Record declared on `line`, used to map a cursor position to a dependency
pub fn select_dependency_by_line<'a>(
    state: &'a StoreState,
    file_key: &FileKey,
    line: u32,
) -> Option<&'a DependencyRecord> {
    select_dependencies(state, file_key)?
        .values()
        .find(|record| record.line == line)
}

/// Records with metadata, ordered by line
pub fn select_fetched_dependencies<'a>(
    state: &'a StoreState,
    file_key: &FileKey,
) -> Vec<&'a DependencyRecord> {
    let mut fetched: Vec<&DependencyRecord> = select_dependencies(state, file_key)
        .map(|records| records.values().filter(|r| r.is_fetched()).collect())
        .unwrap_or_default();
    fetched.sort_by_key(|record| record.line);
    fetched
}

pub fn is_dependency_fetched(state: &StoreState, file_key: &FileKey, name: &str) -> bool {
    select_dependency(state, file_key, name).is_some_and(DependencyRecord::is_fetched)
}
