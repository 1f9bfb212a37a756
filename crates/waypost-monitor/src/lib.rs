//! # Waypost Monitor
//!
//! The arrival-detection core of the Waypost proximity notifier.
//!
//! - [`MarkerRegistry`]: the key→POI mapping behind the map's marker layer.
//! - [`ProximityCircle`]: the visual + logical region around the active
//!   marker; its center only ever mirrors the selection.
//! - [`ArrivalMonitor`]: the Idle/Selected/Armed state machine. Events go
//!   in, effects come out; the host applies them (watch lifecycle, map pans,
//!   alerts), so all mutations stay serialized on one event loop.
//! - [`AlertSink`]: the notification seam, with a tracing-backed sink for
//!   headless use.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use waypost_core::types::{LatLng, Poi};
//! use waypost_monitor::{ArrivalMonitor, MarkerRegistry, MonitorEvent, MonitorState};
//!
//! let registry = Arc::new(MarkerRegistry::with_pois(vec![
//!     Poi::new("home", "Home", LatLng::new(33.46836, -84.66599)),
//! ]));
//! let mut monitor = ArrivalMonitor::new(registry, 800.0).unwrap();
//!
//! monitor.handle(MonitorEvent::MarkerClicked("home".into()));
//! assert_eq!(monitor.state(), MonitorState::Selected);
//! ```

pub mod alert;
pub mod circle;
pub mod monitor;
pub mod registry;

pub use alert::{AlertSink, TracingAlertSink};
pub use circle::ProximityCircle;
pub use monitor::{ArmLabel, ArrivalMonitor, Effect, MonitorEvent, MonitorState};
pub use registry::MarkerRegistry;
