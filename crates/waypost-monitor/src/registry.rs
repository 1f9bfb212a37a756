//! Marker registry: the key→POI mapping behind the map's marker layer.
//!
//! The registry holds every placed point of interest, predefined and
//! user-added alike. The presentation layer consumes read-only snapshots and
//! uses the revision counter to notice changes.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use waypost_core::types::{Poi, PoiKey};

/// Key→marker mapping for all placed points of interest.
///
/// Guarantees: one entry per key, insertion order irrelevant to behavior,
/// redundant operations are no-ops.
#[derive(Debug, Default)]
pub struct MarkerRegistry {
    markers: RwLock<HashMap<PoiKey, Poi>>,
    revision: AtomicU64,
}

impl MarkerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-populated with the given POIs.
    pub fn with_pois(pois: impl IntoIterator<Item = Poi>) -> Self {
        let registry = Self::new();
        for poi in pois {
            registry.upsert(poi);
        }
        registry
    }

    /// Inserts or replaces the marker for `poi.key`.
    ///
    /// Returns true if the mapping changed. Re-inserting an identical entry
    /// is a no-op and does not bump the revision.
    pub fn upsert(&self, poi: Poi) -> bool {
        let mut markers = self.markers.write();
        match markers.get(&poi.key) {
            Some(existing) if *existing == poi => false,
            _ => {
                debug!(key = %poi.key, location = %poi.location, "marker upserted");
                markers.insert(poi.key.clone(), poi);
                self.revision.fetch_add(1, Ordering::Release);
                true
            }
        }
    }

    /// Removes the marker for `key`, returning it if present.
    ///
    /// Removing an absent key is a no-op returning `None`.
    pub fn remove(&self, key: &PoiKey) -> Option<Poi> {
        let removed = self.markers.write().remove(key);
        if removed.is_some() {
            debug!(key = %key, "marker removed");
            self.revision.fetch_add(1, Ordering::Release);
        }
        removed
    }

    /// Looks up a marker by key.
    pub fn get(&self, key: &PoiKey) -> Option<Poi> {
        self.markers.read().get(key).cloned()
    }

    /// Returns true if a marker exists for `key`.
    pub fn contains(&self, key: &PoiKey) -> bool {
        self.markers.read().contains_key(key)
    }

    /// Number of placed markers.
    pub fn len(&self) -> usize {
        self.markers.read().len()
    }

    /// Returns true if no markers are placed.
    pub fn is_empty(&self) -> bool {
        self.markers.read().is_empty()
    }

    /// Removes every marker (the full reset).
    pub fn clear(&self) {
        let mut markers = self.markers.write();
        if !markers.is_empty() {
            markers.clear();
            self.revision.fetch_add(1, Ordering::Release);
        }
    }

    /// Read-only snapshot of all markers, for the presentation layer.
    pub fn snapshot(&self) -> Vec<Poi> {
        self.markers.read().values().cloned().collect()
    }

    /// Monotonic counter bumped on every change; lets consumers detect that
    /// the mapping moved without diffing snapshots.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }
}
