//! Registry client for fetching package metadata

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod http_client;
pub mod npm;

/// Package metadata as returned by the registry.
///
/// Treated as an immutable blob once fetched: it is shared between store
/// snapshots and only ever replaced wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageMetadata {
    pub name: Option<String>,
    pub description: Option<String>,
    pub author: Option<Author>,
    pub homepage: Option<String>,
    /// Publication timestamps keyed by version (plus `created`/`modified`)
    pub time: HashMap<String, String>,
    #[serde(rename = "dist-tags")]
    pub dist_tags: DistTags,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistTags {
    pub latest: Option<String>,
}

/// The registry reports authors either as an object or as a
/// `"Name <email> (url)"` string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Author {
    Object { name: Option<String> },
    String(String),
}

impl Author {
    pub fn name(&self) -> Option<&str> {
        let name = match self {
            Author::Object { name } => name.as_deref()?,
            Author::String(s) => s.split(['<', '(']).next().unwrap_or(s.as_str()).trim(),
        };
        (!name.is_empty()).then_some(name)
    }
}

impl PackageMetadata {
    pub fn latest_version(&self) -> Option<&str> {
        self.dist_tags.latest.as_deref()
    }

    pub fn author_name(&self) -> Option<&str> {
        self.author.as_ref().and_then(Author::name)
    }

    /// Release date of the latest version, if the registry provided one
    pub fn latest_release_date(&self) -> Option<DateTime<Utc>> {
        let latest = self.latest_version()?;
        parse_registry_time(self.time.get(latest)?)
    }
}

/// Parse an RFC 3339 timestamp, falling back to a bare `YYYY-MM-DD` date
fn parse_registry_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Errors from a single registry lookup
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry returned {status} for {name}")]
    Status { name: String, status: u16 },
    #[error("request for {name} failed: {source}")]
    Http {
        name: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid metadata for {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid registry url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Trait for registry clients
#[async_trait]
pub trait Registry: Send + Sync {
    /// Look up one package, attaching `Authorization: Bearer <token>` when
    /// a token is given
    async fn fetch_package(
        &self,
        name: &str,
        auth_token: Option<&str>,
    ) -> Result<PackageMetadata, RegistryError>;
}
