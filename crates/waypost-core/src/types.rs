//! Core types for the Waypost proximity notifier.
//!
//! This module defines the fundamental types used throughout the system:
//! geographic coordinates, points of interest, position fixes, and the
//! watch-subscription token used to tie asynchronous callbacks to the
//! subscription that produced them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A geographic coordinate in decimal degrees.
///
/// Latitude is positive north of the equator, longitude positive east of the
/// prime meridian. The type is plain data; validity is checked explicitly
/// with [`LatLng::is_valid`] where coordinates enter the system (config,
/// right-click placement).
///
/// # Examples
///
/// ```
/// use waypost_core::types::LatLng;
///
/// let home = LatLng::new(33.46836, -84.66599);
/// assert!(home.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in decimal degrees (-90 to 90)
    pub lat: f64,
    /// Longitude in decimal degrees (-180 to 180)
    pub lng: f64,
}

impl LatLng {
    /// Creates a coordinate from latitude and longitude in decimal degrees.
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns true if both components are finite and in range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lng)
    }
}

impl From<(f64, f64)> for LatLng {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

/// Unique, stable identifier for a point of interest.
///
/// Keys for predefined POIs come from the configuration file; keys for
/// user-placed markers are generated with a UUID v4 suffix so they never
/// collide with configured ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoiKey(String);

impl PoiKey {
    /// Wraps an existing key string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Generates a fresh key for a user-placed marker.
    pub fn generate() -> Self {
        Self(format!("user-{}", Uuid::new_v4()))
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PoiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PoiKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PoiKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A point of interest: a named geographic coordinate with a stable key.
///
/// POIs are created from the static configuration list or from a right-click
/// on the map surface. They are never mutated; removal goes through the
/// marker registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    /// Unique, stable identifier
    pub key: PoiKey,
    /// Human-readable name shown next to the marker
    pub name: String,
    /// Geographic location
    pub location: LatLng,
}

impl Poi {
    /// Creates a POI with an explicit key.
    pub fn new(key: impl Into<PoiKey>, name: impl Into<String>, location: LatLng) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            location,
        }
    }

    /// Creates a user-placed POI with a generated key.
    pub fn placed_at(location: LatLng) -> Self {
        let key = PoiKey::generate();
        let name = format!("Marker {}", location);
        Self {
            key,
            name,
            location,
        }
    }
}

/// A single geolocation sample delivered by a location source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    /// Sampled position
    pub location: LatLng,
    /// Estimated accuracy radius in meters, if the source reports one
    pub accuracy_m: Option<f64>,
    /// When the fix was taken
    pub timestamp: DateTime<Utc>,
}

impl PositionFix {
    /// Creates a fix at the given location, stamped now.
    pub fn now(location: LatLng) -> Self {
        Self {
            location,
            accuracy_m: None,
            timestamp: Utc::now(),
        }
    }

    /// Sets the reported accuracy.
    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy_m = Some(accuracy_m);
        self
    }
}

/// Opaque token for a live continuous geolocation subscription.
///
/// Watch ids are drawn from a per-source monotonic counter. A callback that
/// arrives tagged with an id other than the currently held one refers to an
/// already-cleared watch and must be ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchId(u64);

impl WatchId {
    /// Wraps a raw generation number.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw generation number.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watch-{}", self.0)
    }
}
