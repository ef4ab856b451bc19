//! Marker placement for loaded dependencies.
//!
//! One marker per dependency line, placed when a `dependency-loaded`
//! notification arrives for an open document. Markers are what the inlay
//! hint and hover providers render.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use dashmap::DashMap;

use crate::events::{DependencyLoaded, EventError, EventHub, SubscriptionId};
use crate::providers::tooltip::{Tooltip, render_tooltip};
use crate::store::FileKey;

/// How a marker is presented, following `showTooltipWithMouseEvent`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerKind {
    /// Clickable badge next to the line
    #[default]
    Badge,
    /// Line decoration whose popover opens on hover
    Text,
}

impl MarkerKind {
    pub fn from_mouse_event(show_tooltip_with_mouse_event: bool) -> Self {
        if show_tooltip_with_mouse_event {
            MarkerKind::Text
        } else {
            MarkerKind::Badge
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub name: String,
    pub line: u32,
    pub kind: MarkerKind,
    /// Latest version, if the registry reported one
    pub latest: Option<String>,
    pub tooltip: Tooltip,
}

pub struct MarkerManager {
    markers: DashMap<FileKey, BTreeMap<u32, Marker>>,
    kind: RwLock<MarkerKind>,
}

impl Default for MarkerManager {
    fn default() -> Self {
        Self::new(MarkerKind::default())
    }
}

impl MarkerManager {
    pub fn new(kind: MarkerKind) -> Self {
        Self {
            markers: DashMap::new(),
            kind: RwLock::new(kind),
        }
    }

    pub fn kind(&self) -> MarkerKind {
        self.kind.read().map(|k| *k).unwrap_or_default()
    }

    /// Switch presentation; existing markers are converted in place
    pub fn set_kind(&self, kind: MarkerKind) {
        if let Ok(mut current) = self.kind.write() {
            *current = kind;
        }
        for mut file in self.markers.iter_mut() {
            for marker in file.values_mut() {
                marker.kind = kind;
            }
        }
    }

    /// Listen for notifications of `file_key` on `hub`
    pub fn attach(
        self: &Arc<Self>,
        hub: &EventHub,
        file_key: FileKey,
    ) -> Result<SubscriptionId, EventError> {
        let manager = Arc::clone(self);
        hub.subscribe(file_key, move |event| manager.place(event))
    }

    /// Place (or replace) the marker for a loaded dependency. Failed lookups
    /// have no data and get no marker.
    pub fn place(&self, event: &DependencyLoaded) {
        let dependency = &event.dependency;
        let mut file = self.markers.entry(event.file_key.clone()).or_default();
        file.retain(|_, marker| marker.name != dependency.name);

        let Some(data) = &dependency.data else {
            tracing::debug!(
                "No marker for {} in {}: lookup failed",
                dependency.name,
                event.file_key
            );
            return;
        };

        file.insert(
            dependency.line,
            Marker {
                name: dependency.name.clone(),
                line: dependency.line,
                kind: self.kind(),
                latest: data.latest_version().map(str::to_owned),
                tooltip: render_tooltip(&dependency.name, data),
            },
        );
    }

    /// Drop markers whose dependency is no longer declared at that line
    pub fn retain(&self, file_key: &FileKey, declared: &[(String, u32)]) {
        if let Some(mut file) = self.markers.get_mut(file_key) {
            file.retain(|line, marker| {
                declared
                    .iter()
                    .any(|(name, declared_line)| name == &marker.name && declared_line == line)
            });
        }
    }

    pub fn clear(&self, file_key: &FileKey) {
        self.markers.remove(file_key);
    }

    /// Markers of a file ordered by line
    pub fn markers(&self, file_key: &FileKey) -> Vec<Marker> {
        self.markers
            .get(file_key)
            .map(|file| file.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn marker_at(&self, file_key: &FileKey, line: u32) -> Option<Marker> {
        self.markers.get(file_key)?.get(&line).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registries::{DistTags, PackageMetadata};
    use crate::store::DependencyRecord;

    fn key() -> FileKey {
        FileKey::from("package.json")
    }

    fn loaded(name: &str, line: u32) -> DependencyLoaded {
        DependencyLoaded {
            dependency: DependencyRecord {
                data: Some(Arc::new(PackageMetadata {
                    name: Some(name.to_string()),
                    dist_tags: DistTags {
                        latest: Some("2.0.0".into()),
                    },
                    ..Default::default()
                })),
                ..DependencyRecord::new(name, line)
            },
            file_key: key(),
        }
    }

    fn failed(name: &str, line: u32) -> DependencyLoaded {
        DependencyLoaded {
            dependency: DependencyRecord {
                error: true,
                ..DependencyRecord::new(name, line)
            },
            file_key: key(),
        }
    }

    #[test]
    fn test_place_and_replace() {
        let manager = MarkerManager::default();
        manager.place(&loaded("axios", 2));
        manager.place(&loaded("axios", 2));
        manager.place(&loaded("react", 3));

        let markers = manager.markers(&key());
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].name, "axios");
        assert_eq!(markers[0].latest.as_deref(), Some("2.0.0"));
        assert_eq!(markers[0].kind, MarkerKind::Badge);
    }

    #[test]
    fn test_moved_dependency_keeps_one_marker() {
        let manager = MarkerManager::default();
        manager.place(&loaded("axios", 2));
        manager.place(&loaded("axios", 9));
        let markers = manager.markers(&key());
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].line, 9);
    }

    #[test]
    fn test_failed_lookup_has_no_marker() {
        let manager = MarkerManager::default();
        manager.place(&loaded("axios", 2));
        manager.place(&failed("ghost", 3));
        assert_eq!(manager.markers(&key()).len(), 1);
        assert!(manager.marker_at(&key(), 3).is_none());
    }

    #[test]
    fn test_retain_and_clear() {
        let manager = MarkerManager::default();
        manager.place(&loaded("axios", 2));
        manager.place(&loaded("react", 3));
        manager.retain(&key(), &[("react".to_string(), 3)]);
        assert_eq!(manager.markers(&key()).len(), 1);
        assert!(manager.marker_at(&key(), 3).is_some());

        manager.clear(&key());
        assert!(manager.markers(&key()).is_empty());
    }

    #[test]
    fn test_set_kind_converts_markers() {
        let manager = MarkerManager::new(MarkerKind::from_mouse_event(false));
        manager.place(&loaded("axios", 2));
        manager.set_kind(MarkerKind::from_mouse_event(true));
        assert_eq!(manager.kind(), MarkerKind::Text);
        assert_eq!(manager.markers(&key())[0].kind, MarkerKind::Text);
    }

    #[test]
    fn test_attach_places_on_emit() {
        let hub = EventHub::new();
        let manager = Arc::new(MarkerManager::default());
        manager.attach(&hub, key()).unwrap();
        hub.emit(&loaded("axios", 2));
        assert_eq!(manager.markers(&key()).len(), 1);
    }
}
