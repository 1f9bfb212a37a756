//! # Waypost Geo
//!
//! Spherical geometry for the Waypost proximity notifier: great-circle
//! distance on the mean-Earth-radius sphere, the strict containment test the
//! arrival detector runs on every position update, and display helpers for
//! distances and bearings.

pub mod distance;
pub mod format;

pub use distance::{distance_m, initial_bearing_deg, within_radius, MEAN_EARTH_RADIUS_M};
pub use format::{format_bearing, format_distance};
