//! # Waypost Core
//!
//! Core types, error handling, and configuration for the Waypost
//! location-proximity notifier.
//!
//! This crate provides the foundational building blocks for the system:
//!
//! - **Types**: `LatLng`, `PoiKey`, `Poi`, `PositionFix`, and the `WatchId`
//!   subscription token used to detect stale geolocation callbacks.
//! - **Errors**: Comprehensive error types using `thiserror` for all failure
//!   modes — geolocation, selection/arming, and configuration.
//! - **Configuration**: YAML files with environment variable overrides and
//!   validation of POIs, radii, and timeouts.
//!
//! ## Example
//!
//! ```
//! use waypost_core::types::{LatLng, Poi};
//!
//! let poi = Poi::new("home", "Home", LatLng::new(33.46836, -84.66599));
//! assert!(poi.location.is_valid());
//! ```

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types for convenience
pub use config::AppConfig;
pub use error::{Result, WaypostError};
pub use types::{LatLng, Poi, PoiKey, PositionFix, WatchId};
