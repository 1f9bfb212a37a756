//! Proximity circle: the visual + logical region around the active marker.
//!
//! Pure presentation state derived from the active selection plus the
//! user-set radius. The circle exposes no way to move its center except
//! through selection, so it can never desync from the logical target, and it
//! is never consulted to decide what is armed.

use serde::{Deserialize, Serialize};
use waypost_core::error::{ConfigError, Result};
use waypost_core::types::LatLng;

/// The proximity region mirrored from the active selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityCircle {
    center: Option<LatLng>,
    radius_m: f64,
}

impl ProximityCircle {
    /// Creates a circle with no center and the given radius.
    ///
    /// # Errors
    ///
    /// Rejects a non-positive or non-finite radius.
    pub fn new(radius_m: f64) -> Result<Self> {
        Self::check_radius(radius_m)?;
        Ok(Self {
            center: None,
            radius_m,
        })
    }

    /// Current center, `None` while nothing is selected.
    pub fn center(&self) -> Option<LatLng> {
        self.center
    }

    /// Current radius in meters.
    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    /// Mirrors the active selection's location (or clears the circle).
    pub fn set_center(&mut self, center: Option<LatLng>) {
        self.center = center;
    }

    /// Updates the radius, independent of the selection.
    ///
    /// # Errors
    ///
    /// Rejects a non-positive or non-finite radius; the old value is kept.
    pub fn set_radius(&mut self, radius_m: f64) -> Result<()> {
        Self::check_radius(radius_m)?;
        self.radius_m = radius_m;
        Ok(())
    }

    /// Returns true if the circle is currently shown.
    pub fn is_visible(&self) -> bool {
        self.center.is_some()
    }

    fn check_radius(radius_m: f64) -> Result<()> {
        if !(radius_m.is_finite() && radius_m > 0.0) {
            return Err(ConfigError::invalid_value(
                "radius_m",
                format!("must be a positive number of meters, got {radius_m}"),
            )
            .into());
        }
        Ok(())
    }
}
