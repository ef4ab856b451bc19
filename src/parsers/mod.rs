//! Manifest parsing and dependency extraction for package.json files

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod npm;

/// Identifier shown as the prefix of user-facing warnings
pub const EXTENSION_ID: &str = "npm-library-description";

/// A dependency name found in the manifest text, with its 0-indexed line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDependency {
    pub name: String,
    pub line: u32,
}

/// Parsed object form of a package.json
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Manifest {
    pub name: Option<String>,
    pub dependencies: BTreeMap<String, serde_json::Value>,
    pub dev_dependencies: BTreeMap<String, serde_json::Value>,
}

/// Errors raised while reading a manifest
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("{}: There was a problem reading {file_name}", EXTENSION_ID)]
    Parse {
        file_name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ManifestError {
    /// Warning text surfaced to the user, identical for every parse failure
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// Strictly parse manifest text.
///
/// The root must be a JSON object; `dependencies`/`devDependencies` values
/// that are not objects are treated as empty.
pub fn parse_manifest(file_name: &str, content: &str) -> Result<Manifest, ManifestError> {
    let parse_error = |source| ManifestError::Parse {
        file_name: file_name.to_string(),
        source,
    };

    let value: serde_json::Value = serde_json::from_str(content).map_err(parse_error)?;
    let serde_json::Value::Object(mut root) = value else {
        return Err(parse_error(<serde_json::Error as serde::de::Error>::custom(
            "manifest root is not an object",
        )));
    };

    let mut manifest = Manifest {
        name: root
            .remove("name")
            .and_then(|v| v.as_str().map(str::to_string)),
        ..Default::default()
    };
    if let Some(serde_json::Value::Object(deps)) = root.remove("dependencies") {
        manifest.dependencies = deps.into_iter().collect();
    }
    if let Some(serde_json::Value::Object(deps)) = root.remove("devDependencies") {
        manifest.dev_dependencies = deps.into_iter().collect();
    }
    Ok(manifest)
}

/// Read and parse a manifest from disk
pub async fn read_manifest_file(path: &Path) -> Result<(Manifest, String), ManifestError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ManifestError::Io {
            path: path.display().to_string(),
            source,
        })?;
    let file_name = file_name_of(&path.to_string_lossy()).to_string();
    let manifest = parse_manifest(&file_name, &content)?;
    Ok((manifest, content))
}

/// Last path segment of a path or URI
pub fn file_name_of(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
