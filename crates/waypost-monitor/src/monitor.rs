//! Arrival-detection state machine.
//!
//! The monitor owns the active-marker selection, the proximity circle, and
//! the armed/disarmed notification state. It is deliberately synchronous:
//! discrete events go in, a list of effects comes out, and the host (GUI or
//! headless runner) applies the effects — starting and clearing watches,
//! panning the map, raising alerts. That keeps every mutation serialized on
//! the host's event loop and makes the machine testable without any
//! asynchronous machinery.

use crate::circle::ProximityCircle;
use crate::registry::MarkerRegistry;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use waypost_core::error::{GeolocationError, Result, SelectionError};
use waypost_core::types::{LatLng, Poi, PoiKey, PositionFix, WatchId};
use waypost_geo::distance_m;

/// The three states of the arrival detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// No active marker, no circle, no watch.
    Idle,
    /// An active marker and circle exist; no watch running.
    Selected,
    /// Active marker + circle + a live geolocation watch.
    Armed,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorState::Idle => write!(f, "Idle"),
            MonitorState::Selected => write!(f, "Selected"),
            MonitorState::Armed => write!(f, "Armed"),
        }
    }
}

/// Label shown on the arm control button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmLabel {
    /// Shown while disarmed.
    Notify,
    /// Shown while a watch is live.
    Cancel,
}

impl ArmLabel {
    /// The user-facing button text.
    pub fn text(&self) -> &'static str {
        match self {
            ArmLabel::Notify => "Notify me upon arrival",
            ArmLabel::Cancel => "Cancel notification",
        }
    }
}

/// A discrete input event for the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// A marker on the map was clicked.
    MarkerClicked(PoiKey),
    /// The arm control button was clicked.
    ArmToggled,
    /// The live watch delivered a position fix.
    PositionUpdate { watch_id: WatchId, fix: PositionFix },
    /// The live watch reported a non-fatal error.
    WatchError {
        watch_id: WatchId,
        error: GeolocationError,
    },
}

/// An effect the host must apply after handling an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// The proximity circle moved (or disappeared).
    CircleMoved(Option<LatLng>),
    /// Pan the map surface to this location.
    PanTo(LatLng),
    /// Start a continuous position watch and report back with
    /// [`ArrivalMonitor::watch_started`] or [`ArrivalMonitor::watch_failed`].
    RequestWatch,
    /// Clear this watch.
    StopWatch(WatchId),
    /// The user arrived inside the circle. The host raises the alert.
    Arrived { poi: Poi, distance_m: f64 },
    /// An operation was rejected; the host shows a user-facing prompt.
    Rejected(SelectionError),
    /// The arm control label changed.
    LabelChanged(ArmLabel),
}

/// The arrival-detection state machine.
pub struct ArrivalMonitor {
    registry: Arc<MarkerRegistry>,
    circle: ProximityCircle,
    active: Option<Poi>,
    watch_id: Option<WatchId>,
}

impl ArrivalMonitor {
    /// Creates an idle monitor over the given registry.
    ///
    /// # Errors
    ///
    /// Rejects a non-positive radius.
    pub fn new(registry: Arc<MarkerRegistry>, radius_m: f64) -> Result<Self> {
        Ok(Self {
            registry,
            circle: ProximityCircle::new(radius_m)?,
            active: None,
            watch_id: None,
        })
    }

    /// Current state, derived from the selection and watch fields.
    pub fn state(&self) -> MonitorState {
        match (&self.active, &self.watch_id) {
            (None, _) => MonitorState::Idle,
            (Some(_), None) => MonitorState::Selected,
            (Some(_), Some(_)) => MonitorState::Armed,
        }
    }

    /// The active selection, if any.
    pub fn active(&self) -> Option<&Poi> {
        self.active.as_ref()
    }

    /// The proximity circle (center mirrors the selection).
    pub fn circle(&self) -> &ProximityCircle {
        &self.circle
    }

    /// The live watch token, if armed.
    pub fn watch_id(&self) -> Option<WatchId> {
        self.watch_id
    }

    /// Current arm control label.
    pub fn arm_label(&self) -> ArmLabel {
        if self.watch_id.is_some() {
            ArmLabel::Cancel
        } else {
            ArmLabel::Notify
        }
    }

    /// Updates the circle radius, independent of the selection.
    pub fn set_radius(&mut self, radius_m: f64) -> Result<()> {
        self.circle.set_radius(radius_m)
    }

    /// Handles one event and returns the effects the host must apply.
    pub fn handle(&mut self, event: MonitorEvent) -> Vec<Effect> {
        match event {
            MonitorEvent::MarkerClicked(key) => self.on_marker_clicked(key),
            MonitorEvent::ArmToggled => self.on_arm_toggled(),
            MonitorEvent::PositionUpdate { watch_id, fix } => {
                self.on_position_update(watch_id, fix)
            }
            MonitorEvent::WatchError { watch_id, error } => {
                self.on_watch_error(watch_id, error)
            }
        }
    }

    /// Confirms that the watch requested via [`Effect::RequestWatch`] is
    /// live. Transitions Selected → Armed.
    pub fn watch_started(&mut self, watch_id: WatchId) -> Vec<Effect> {
        debug_assert!(self.active.is_some(), "watch confirmed with no selection");
        info!(watch = %watch_id, "notification armed");
        self.watch_id = Some(watch_id);
        vec![Effect::LabelChanged(ArmLabel::Cancel)]
    }

    /// Reports that starting the watch failed. The monitor stays in
    /// Selected; monitoring simply isn't possible this session.
    pub fn watch_failed(&mut self, error: &GeolocationError) {
        warn!(%error, "could not start position watch");
        self.watch_id = None;
    }

    fn on_marker_clicked(&mut self, key: PoiKey) -> Vec<Effect> {
        let Some(poi) = self.registry.get(&key) else {
            warn!(key = %key, "click on unknown marker");
            return vec![Effect::Rejected(SelectionError::unknown_marker(
                key.as_str(),
            ))];
        };

        let mut effects = Vec::new();

        // A selection change while armed first cancels the watch; the armed
        // flag always refers to the current target.
        if let Some(watch_id) = self.watch_id.take() {
            effects.push(Effect::StopWatch(watch_id));
            effects.push(Effect::LabelChanged(ArmLabel::Notify));
        }

        let toggled_off = self
            .active
            .as_ref()
            .is_some_and(|active| active.key == poi.key);

        if toggled_off {
            debug!(key = %poi.key, "marker toggled off");
            self.active = None;
            self.circle.set_center(None);
            effects.push(Effect::CircleMoved(None));
        } else {
            debug!(key = %poi.key, location = %poi.location, "marker selected");
            let location = poi.location;
            self.active = Some(poi);
            self.circle.set_center(Some(location));
            effects.push(Effect::CircleMoved(Some(location)));
            effects.push(Effect::PanTo(location));
        }

        effects
    }

    fn on_arm_toggled(&mut self) -> Vec<Effect> {
        if let Some(watch_id) = self.watch_id.take() {
            info!(watch = %watch_id, "notification cancelled");
            return vec![
                Effect::StopWatch(watch_id),
                Effect::LabelChanged(ArmLabel::Notify),
            ];
        }

        if self.active.is_none() {
            return vec![Effect::Rejected(SelectionError::NothingDesignated)];
        }

        vec![Effect::RequestWatch]
    }

    fn on_position_update(&mut self, watch_id: WatchId, fix: PositionFix) -> Vec<Effect> {
        if self.watch_id != Some(watch_id) {
            debug!(watch = %watch_id, "update from cleared watch ignored");
            return Vec::new();
        }
        let Some(poi) = self.active.clone() else {
            debug!(watch = %watch_id, "update with no selection ignored");
            return Vec::new();
        };

        let distance = distance_m(poi.location, fix.location);
        let radius = self.circle.radius_m();

        if distance < radius {
            info!(
                key = %poi.key,
                distance_m = distance,
                radius_m = radius,
                "arrival detected"
            );
            self.watch_id = None;
            return vec![
                Effect::StopWatch(watch_id),
                Effect::Arrived {
                    poi,
                    distance_m: distance,
                },
                Effect::LabelChanged(ArmLabel::Notify),
            ];
        }

        debug!(
            key = %poi.key,
            distance_m = distance,
            radius_m = radius,
            "position update outside circle"
        );
        Vec::new()
    }

    fn on_watch_error(&mut self, watch_id: WatchId, error: GeolocationError) -> Vec<Effect> {
        if self.watch_id != Some(watch_id) {
            debug!(watch = %watch_id, "error from cleared watch ignored");
            return Vec::new();
        }

        // Errors never tear the watch down; the subscription keeps
        // listening until arrival or an explicit cancel.
        warn!(watch = %watch_id, %error, "position watch error");
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypost_geo::MEAN_EARTH_RADIUS_M;

    const METERS_PER_DEG_LAT: f64 = MEAN_EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

    fn poi_a() -> Poi {
        Poi::new("A", "A", LatLng::new(33.46836, -84.66599))
    }

    fn poi_b() -> Poi {
        Poi::new("B", "B", LatLng::new(33.74900, -84.38800))
    }

    fn monitor_with(pois: Vec<Poi>) -> ArrivalMonitor {
        let registry = Arc::new(MarkerRegistry::with_pois(pois));
        ArrivalMonitor::new(registry, 800.0).unwrap()
    }

    fn armed_monitor() -> (ArrivalMonitor, WatchId) {
        let mut monitor = monitor_with(vec![poi_a()]);
        monitor.handle(MonitorEvent::MarkerClicked(poi_a().key));
        let effects = monitor.handle(MonitorEvent::ArmToggled);
        assert_eq!(effects, vec![Effect::RequestWatch]);
        let id = WatchId::new(1);
        monitor.watch_started(id);
        assert_eq!(monitor.state(), MonitorState::Armed);
        (monitor, id)
    }

    fn update(watch_id: WatchId, location: LatLng) -> MonitorEvent {
        MonitorEvent::PositionUpdate {
            watch_id,
            fix: PositionFix::now(location),
        }
    }

    #[test]
    fn test_click_selects_and_pans() {
        let mut monitor = monitor_with(vec![poi_a()]);
        let effects = monitor.handle(MonitorEvent::MarkerClicked(poi_a().key));

        assert_eq!(monitor.state(), MonitorState::Selected);
        assert_eq!(monitor.circle().center(), Some(poi_a().location));
        assert!(effects.contains(&Effect::CircleMoved(Some(poi_a().location))));
        assert!(effects.contains(&Effect::PanTo(poi_a().location)));
    }

    #[test]
    fn test_click_a_then_b_selects_b_only() {
        let mut monitor = monitor_with(vec![poi_a(), poi_b()]);
        monitor.handle(MonitorEvent::MarkerClicked(poi_a().key));
        monitor.handle(MonitorEvent::MarkerClicked(poi_b().key));

        assert_eq!(monitor.state(), MonitorState::Selected);
        assert_eq!(monitor.active().unwrap().key, poi_b().key);
        assert_eq!(monitor.circle().center(), Some(poi_b().location));
    }

    #[test]
    fn test_toggle_round_trip_returns_to_idle() {
        let mut monitor = monitor_with(vec![poi_a()]);
        monitor.handle(MonitorEvent::MarkerClicked(poi_a().key));
        let effects = monitor.handle(MonitorEvent::MarkerClicked(poi_a().key));

        assert_eq!(monitor.state(), MonitorState::Idle);
        assert!(monitor.active().is_none());
        assert_eq!(monitor.circle().center(), None);
        assert!(effects.contains(&Effect::CircleMoved(None)));
    }

    #[test]
    fn test_arm_without_selection_rejected() {
        let mut monitor = monitor_with(vec![poi_a()]);
        let effects = monitor.handle(MonitorEvent::ArmToggled);

        assert_eq!(
            effects,
            vec![Effect::Rejected(SelectionError::NothingDesignated)]
        );
        assert_eq!(monitor.state(), MonitorState::Idle);
        assert!(monitor.watch_id().is_none());
    }

    #[test]
    fn test_unknown_marker_rejected_without_state_change() {
        let mut monitor = monitor_with(vec![poi_a()]);
        monitor.handle(MonitorEvent::MarkerClicked(poi_a().key));

        let effects = monitor.handle(MonitorEvent::MarkerClicked(PoiKey::from("ghost")));
        assert!(matches!(
            effects.as_slice(),
            [Effect::Rejected(SelectionError::UnknownMarker { .. })]
        ));
        assert_eq!(monitor.active().unwrap().key, poi_a().key);
    }

    #[test]
    fn test_arm_label_follows_watch() {
        let (mut monitor, id) = armed_monitor();
        assert_eq!(monitor.arm_label(), ArmLabel::Cancel);

        monitor.handle(MonitorEvent::ArmToggled);
        assert_eq!(monitor.arm_label(), ArmLabel::Notify);
        let _ = id;
    }

    #[test]
    fn test_arrival_inside_radius() {
        let (mut monitor, id) = armed_monitor();

        // Fix exactly at the target: distance 0 < radius 800.
        let effects = monitor.handle(update(id, poi_a().location));

        assert_eq!(monitor.state(), MonitorState::Selected);
        assert!(effects.contains(&Effect::StopWatch(id)));
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::Arrived { poi, distance_m } if poi.key == poi_a().key && *distance_m == 0.0
        )));
    }

    #[test]
    fn test_far_update_keeps_armed() {
        let (mut monitor, id) = armed_monitor();

        // ~5 km north of the target: well outside the 800 m circle.
        let target = poi_a().location;
        let far = LatLng::new(target.lat + 5_000.0 / METERS_PER_DEG_LAT, target.lng);
        let effects = monitor.handle(update(id, far));

        assert!(effects.is_empty());
        assert_eq!(monitor.state(), MonitorState::Armed);
    }

    #[test]
    fn test_boundary_does_not_trigger() {
        let mut monitor = monitor_with(vec![poi_a()]);
        monitor.handle(MonitorEvent::MarkerClicked(poi_a().key));
        monitor.handle(MonitorEvent::ArmToggled);
        let id = WatchId::new(1);
        monitor.watch_started(id);

        // Probe a point north of the target, then set the radius to the
        // exact computed distance: strictly-less-than must not fire.
        let target = poi_a().location;
        let probe = LatLng::new(target.lat + 800.0 / METERS_PER_DEG_LAT, target.lng);
        let exact = distance_m(target, probe);

        monitor.set_radius(exact).unwrap();
        let effects = monitor.handle(update(id, probe));
        assert!(effects.is_empty());
        assert_eq!(monitor.state(), MonitorState::Armed);

        // A hair more radius puts the same probe strictly inside.
        monitor.set_radius(exact + 1e-6).unwrap();
        let effects = monitor.handle(update(id, probe));
        assert!(effects.iter().any(|e| matches!(e, Effect::Arrived { .. })));
        assert_eq!(monitor.state(), MonitorState::Selected);
    }

    #[test]
    fn test_cancel_before_any_fix() {
        let (mut monitor, id) = armed_monitor();
        let effects = monitor.handle(MonitorEvent::ArmToggled);

        assert_eq!(monitor.state(), MonitorState::Selected);
        assert!(effects.contains(&Effect::StopWatch(id)));
        assert!(!effects.iter().any(|e| matches!(e, Effect::Arrived { .. })));
    }

    #[test]
    fn test_stale_update_ignored() {
        let (mut monitor, id) = armed_monitor();
        monitor.handle(MonitorEvent::ArmToggled); // disarm, watch cleared

        // A pending update from the cleared watch arrives late.
        let effects = monitor.handle(update(id, poi_a().location));
        assert!(effects.is_empty());
        assert_eq!(monitor.state(), MonitorState::Selected);
    }

    #[test]
    fn test_watch_error_keeps_state() {
        let (mut monitor, id) = armed_monitor();
        let effects = monitor.handle(MonitorEvent::WatchError {
            watch_id: id,
            error: GeolocationError::Timeout { timeout_ms: 10_000 },
        });

        assert!(effects.is_empty());
        assert_eq!(monitor.state(), MonitorState::Armed);
    }

    #[test]
    fn test_marker_click_while_armed_disarms_first() {
        let mut monitor = monitor_with(vec![poi_a(), poi_b()]);
        monitor.handle(MonitorEvent::MarkerClicked(poi_a().key));
        monitor.handle(MonitorEvent::ArmToggled);
        let id = WatchId::new(1);
        monitor.watch_started(id);

        let effects = monitor.handle(MonitorEvent::MarkerClicked(poi_b().key));
        assert!(effects.contains(&Effect::StopWatch(id)));
        assert_eq!(monitor.state(), MonitorState::Selected);
        assert_eq!(monitor.active().unwrap().key, poi_b().key);
    }

    #[test]
    fn test_watch_failed_stays_selected() {
        let mut monitor = monitor_with(vec![poi_a()]);
        monitor.handle(MonitorEvent::MarkerClicked(poi_a().key));
        let effects = monitor.handle(MonitorEvent::ArmToggled);
        assert_eq!(effects, vec![Effect::RequestWatch]);

        monitor.watch_failed(&GeolocationError::PermissionDenied);
        assert_eq!(monitor.state(), MonitorState::Selected);
        assert_eq!(monitor.arm_label(), ArmLabel::Notify);
    }

    #[test]
    fn test_radius_configurable_independent_of_selection() {
        let mut monitor = monitor_with(vec![poi_a()]);
        monitor.set_radius(1_500.0).unwrap();
        assert_eq!(monitor.circle().radius_m(), 1_500.0);
        assert!(monitor.set_radius(0.0).is_err());
        assert_eq!(monitor.circle().radius_m(), 1_500.0);
    }
}
