//! Per-file, per-dependency fetch state

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::registries::PackageMetadata;

/// Fetch state of one dependency in one file.
///
/// A record is fetching, resolved with data, resolved with an error, or
/// (only right after registration) none of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyRecord {
    pub name: String,
    pub line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Arc<PackageMetadata>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
    pub is_fetching: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DependencyRecord {
    pub fn new(name: impl Into<String>, line: u32) -> Self {
        Self {
            name: name.into(),
            line,
            data: None,
            error: false,
            is_fetching: false,
            updated_at: None,
        }
    }

    /// Data or an error is available
    pub fn is_resolved(&self) -> bool {
        self.data.is_some() || self.error
    }

    pub fn is_fetched(&self) -> bool {
        self.data.is_some()
    }
}

/// Result of a successful fetch (or cache hit), applied by `FULFILLED`
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedDependency {
    pub name: String,
    pub line: u32,
    pub data: Arc<PackageMetadata>,
    pub updated_at: DateTime<Utc>,
}

impl From<FetchedDependency> for DependencyRecord {
    fn from(fetched: FetchedDependency) -> Self {
        Self {
            name: fetched.name,
            line: fetched.line,
            data: Some(fetched.data),
            error: false,
            is_fetching: false,
            updated_at: Some(fetched.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_unresolved() {
        let record = DependencyRecord::new("axios", 3);
        assert!(!record.is_resolved());
        assert!(!record.is_fetching);
    }

    #[test]
    fn test_error_counts_as_resolved() {
        let record = DependencyRecord {
            error: true,
            ..DependencyRecord::new("axios", 3)
        };
        assert!(record.is_resolved());
        assert!(!record.is_fetched());
    }

    #[test]
    fn test_serialize_omits_absent_fields() {
        let value = serde_json::to_value(DependencyRecord::new("axios", 3)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "name": "axios", "line": 3, "isFetching": false })
        );
    }
}
