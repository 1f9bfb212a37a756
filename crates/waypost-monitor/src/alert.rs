//! Alert delivery seam.
//!
//! Arrival alerts and rejection prompts go through this trait so the core
//! can be exercised with a recording fake, the headless runner can log, and
//! the GUI can open a blocking modal.

use tracing::{info, warn};
use waypost_core::types::Poi;
use waypost_geo::format_distance;

/// Surfaces user-facing notifications.
pub trait AlertSink: Send + Sync {
    /// The user arrived within the proximity circle of `poi`.
    fn arrival(&self, poi: &Poi, distance_m: f64);

    /// A user action was rejected; show them why.
    fn prompt(&self, message: &str);
}

/// Alert sink that writes structured log lines. Used by the headless runner.
#[derive(Debug, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn arrival(&self, poi: &Poi, distance_m: f64) {
        info!(
            key = %poi.key,
            name = %poi.name,
            distance = %format_distance(distance_m),
            "arrived at destination"
        );
    }

    fn prompt(&self, message: &str) {
        warn!("{message}");
    }
}
