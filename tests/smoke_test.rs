//! End-to-end smoke test: registry, monitor, and a replayed position stream.

use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;
use waypost_core::types::{LatLng, Poi};
use waypost_monitor::{ArrivalMonitor, Effect, MarkerRegistry, MonitorEvent, MonitorState};
use waypost_track::{LocationSource, ReplaySource, WatchOptions, WatchUpdate};

const TARGET: LatLng = LatLng {
    lat: 33.46836,
    lng: -84.66599,
};

fn approach_path() -> Vec<LatLng> {
    // Roughly 5 km, 2 km, 1 km north of the target, then on top of it.
    vec![
        LatLng::new(TARGET.lat + 0.045, TARGET.lng),
        LatLng::new(TARGET.lat + 0.018, TARGET.lng),
        LatLng::new(TARGET.lat + 0.009, TARGET.lng),
        TARGET,
    ]
}

#[tokio::test(flavor = "multi_thread")]
async fn test_arrival_end_to_end() {
    let registry = Arc::new(MarkerRegistry::with_pois(vec![Poi::new(
        "home", "Home", TARGET,
    )]));
    let mut monitor =
        ArrivalMonitor::new(Arc::clone(&registry), 800.0).expect("valid radius");

    // Select the target and arm.
    monitor.handle(MonitorEvent::MarkerClicked("home".into()));
    assert_eq!(monitor.state(), MonitorState::Selected);
    let effects = monitor.handle(MonitorEvent::ArmToggled);
    assert_eq!(effects, vec![Effect::RequestWatch]);

    let source = ReplaySource::from_fixes(approach_path(), Duration::from_millis(10));
    let mut watch = source
        .watch(WatchOptions::default().with_timeout(Duration::from_millis(500)))
        .expect("watch starts");
    monitor.watch_started(watch.id);
    assert_eq!(monitor.state(), MonitorState::Armed);

    let mut arrived = None;
    'outer: while let Some(update) = watch.updates.next().await {
        let event = match update {
            WatchUpdate::Fix { watch_id, fix } => MonitorEvent::PositionUpdate { watch_id, fix },
            WatchUpdate::Error { watch_id, error } => {
                MonitorEvent::WatchError { watch_id, error }
            }
        };
        for effect in monitor.handle(event) {
            match effect {
                Effect::StopWatch(_) => watch.handle.clear(),
                Effect::Arrived { poi, distance_m } => {
                    arrived = Some((poi, distance_m));
                    break 'outer;
                }
                _ => {}
            }
        }
    }

    let (poi, distance_m) = arrived.expect("arrival fired");
    assert_eq!(poi.key.as_str(), "home");
    assert!(distance_m < 800.0);
    assert_eq!(monitor.state(), MonitorState::Selected);
    assert!(watch.handle.is_cleared());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancel_mid_stream_suppresses_arrival() {
    let registry = Arc::new(MarkerRegistry::with_pois(vec![Poi::new(
        "home", "Home", TARGET,
    )]));
    let mut monitor =
        ArrivalMonitor::new(Arc::clone(&registry), 800.0).expect("valid radius");

    monitor.handle(MonitorEvent::MarkerClicked("home".into()));
    monitor.handle(MonitorEvent::ArmToggled);

    let source = ReplaySource::from_fixes(approach_path(), Duration::from_millis(10));
    let mut watch = source
        .watch(WatchOptions::default().with_timeout(Duration::from_millis(500)))
        .expect("watch starts");
    let id = watch.id;
    monitor.watch_started(id);

    // First fix arrives, still far away.
    let first = watch.updates.next().await.expect("first update");
    assert!(matches!(first, WatchUpdate::Fix { .. }));

    // User cancels before getting anywhere near the target.
    let effects = monitor.handle(MonitorEvent::ArmToggled);
    assert!(effects.contains(&Effect::StopWatch(id)));
    watch.handle.clear();
    assert_eq!(monitor.state(), MonitorState::Selected);

    // A late fix from the cleared watch is ignored, even on the target.
    let effects = monitor.handle(MonitorEvent::PositionUpdate {
        watch_id: id,
        fix: waypost_core::types::PositionFix::now(TARGET),
    });
    assert!(effects.is_empty());
    assert_eq!(monitor.state(), MonitorState::Selected);

    // The slot is free again for a re-arm.
    assert!(source
        .watch(WatchOptions::default().with_timeout(Duration::from_millis(500)))
        .is_ok());
}
