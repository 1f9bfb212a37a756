//! The eframe application: map surface, marker controls, and the event loop
//! that connects the arrival monitor to the geolocation watch.
//!
//! All state mutation happens on the UI thread. Watch updates cross over from
//! the tokio tasks through the watch channel and are drained once per frame,
//! so monitor events stay strictly ordered.

use crate::map_panel::MapPanelState;
use crate::overlay::{MapOverlay, MarkerSprite, OverlayFeedback};
use eframe::egui;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;
use waypost_core::config::AppConfig;
use waypost_core::types::{LatLng, Poi, PositionFix};
use waypost_geo::{distance_m, format_bearing, format_distance, initial_bearing_deg};
use waypost_monitor::{AlertSink, ArrivalMonitor, Effect, MarkerRegistry, MonitorEvent};
use waypost_track::{
    ChannelSource, FixInjector, LocationSource, WatchHandle, WatchOptions, WatchUpdate,
};

/// How often to repaint while a watch is live, so updates are drained even
/// when the user is not interacting.
const ARMED_REPAINT_INTERVAL: Duration = Duration::from_millis(100);

/// The Waypost application window.
pub struct WaypostApp {
    config: AppConfig,
    registry: Arc<MarkerRegistry>,
    monitor: ArrivalMonitor,
    source: ChannelSource,
    injector: FixInjector,
    alerts: Arc<dyn AlertSink>,
    rt: tokio::runtime::Handle,

    map: MapPanelState,
    feedback: Arc<OverlayFeedback>,

    /// The live watch, if armed: its handle plus the drained update channel.
    live_watch: Option<(WatchHandle, mpsc::Receiver<WatchUpdate>)>,
    last_fix: Option<PositionFix>,

    /// Status line under the controls (rejections, watch errors).
    status: Option<String>,
    /// Arrival dialog contents while it is open.
    arrival_notice: Option<(Poi, f64)>,

    /// Radius slider value, applied to the monitor on change.
    radius_m: f64,
    /// Simulated position controls.
    sim_lat: f64,
    sim_lng: f64,
}

impl WaypostApp {
    /// Builds the application from a validated configuration.
    ///
    /// # Errors
    ///
    /// Fails if the configured radius is not positive.
    pub fn new(
        config: AppConfig,
        alerts: Arc<dyn AlertSink>,
        rt: tokio::runtime::Handle,
    ) -> anyhow::Result<Self> {
        let registry = Arc::new(MarkerRegistry::with_pois(config.poi_list()));
        let monitor = ArrivalMonitor::new(Arc::clone(&registry), config.monitor.radius_m)?;
        let (source, injector) = ChannelSource::new();

        let center = config.map.center();
        let mut map = MapPanelState::new(center, config.map.zoom, config.map.tile_url.clone());
        map.pan_to(center);

        let radius_m = config.monitor.radius_m;
        Ok(Self {
            config,
            registry,
            monitor,
            source,
            injector,
            alerts,
            rt,
            map,
            feedback: Arc::new(OverlayFeedback::default()),
            live_watch: None,
            last_fix: None,
            status: None,
            arrival_notice: None,
            radius_m,
            sim_lat: center.lat,
            sim_lng: center.lng,
        })
    }

    /// Drains watch updates that arrived since the last frame and feeds them
    /// to the monitor as events.
    fn drain_watch_updates(&mut self) {
        let mut updates = Vec::new();
        if let Some((_, rx)) = self.live_watch.as_mut() {
            while let Ok(update) = rx.try_recv() {
                updates.push(update);
            }
        }
        for update in updates {
            let event = match update {
                WatchUpdate::Fix { watch_id, fix } => {
                    self.last_fix = Some(fix.clone());
                    MonitorEvent::PositionUpdate { watch_id, fix }
                }
                WatchUpdate::Error { watch_id, error } => {
                    self.status = Some(error.to_string());
                    MonitorEvent::WatchError { watch_id, error }
                }
            };
            self.dispatch(event);
        }
    }

    /// Runs one event through the monitor and applies the resulting effects.
    fn dispatch(&mut self, event: MonitorEvent) {
        let mut queue: VecDeque<Effect> = self.monitor.handle(event).into();
        while let Some(effect) = queue.pop_front() {
            match effect {
                // The circle and label are redrawn from monitor state every
                // frame; nothing to store.
                Effect::CircleMoved(_) | Effect::LabelChanged(_) => {}
                Effect::PanTo(location) => self.map.pan_to(location),
                Effect::RequestWatch => queue.extend(self.start_watch()),
                Effect::StopWatch(watch_id) => {
                    // The monitor only ever stops the watch it armed, which
                    // is the one held here.
                    if let Some((handle, _)) = self.live_watch.take() {
                        debug_assert_eq!(handle.id(), watch_id);
                        handle.clear();
                    }
                }
                Effect::Arrived { poi, distance_m } => {
                    self.alerts.arrival(&poi, distance_m);
                    self.arrival_notice = Some((poi, distance_m));
                    self.status = None;
                }
                Effect::Rejected(reason) => {
                    let message = reason.to_string();
                    self.alerts.prompt(&message);
                    self.status = Some(message);
                }
            }
        }
    }

    /// Starts the continuous watch requested by the monitor.
    fn start_watch(&mut self) -> Vec<Effect> {
        let opts = WatchOptions {
            timeout: self.config.monitor.watch_timeout(),
            high_accuracy: self.config.monitor.high_accuracy,
        };

        // Spawning the watch tasks needs the tokio runtime context.
        let _guard = self.rt.enter();
        match self.source.watch(opts) {
            Ok(watch) => {
                info!(watch = %watch.id, "position watch started");
                let rx = watch.updates.into_inner();
                let effects = self.monitor.watch_started(watch.id);
                self.live_watch = Some((watch.handle, rx));
                self.status = None;
                effects
            }
            Err(error) => {
                self.monitor.watch_failed(&error);
                self.status = Some(error.to_string());
                Vec::new()
            }
        }
    }

    /// Markers in a stable order so overlay indices survive the frame.
    fn ordered_markers(&self) -> Vec<Poi> {
        let mut pois = self.registry.snapshot();
        pois.sort_by(|a, b| a.key.as_str().cmp(b.key.as_str()));
        pois
    }

    fn side_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("controls")
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.heading("Waypost");
                ui.separator();

                ui.label(format!("State: {}", self.monitor.state()));
                if let (Some(fix), Some(target)) = (&self.last_fix, self.monitor.active()) {
                    ui.label(target_readout(fix, target));
                }
                if ui
                    .button(self.monitor.arm_label().text())
                    .clicked()
                {
                    self.dispatch(MonitorEvent::ArmToggled);
                }

                ui.add_space(8.0);
                ui.label("Radius (m)");
                let slider = egui::Slider::new(&mut self.radius_m, 50.0..=5_000.0)
                    .logarithmic(true);
                if ui.add(slider).changed() {
                    if let Err(error) = self.monitor.set_radius(self.radius_m) {
                        self.status = Some(error.to_string());
                    }
                }

                ui.separator();
                ui.label("Markers (click on map or right-click to add)");
                let mut clicked = None;
                let mut removed = None;
                for poi in self.ordered_markers() {
                    ui.horizontal(|ui| {
                        let is_active = self
                            .monitor
                            .active()
                            .is_some_and(|active| active.key == poi.key);
                        if ui.selectable_label(is_active, &poi.name).clicked() {
                            clicked = Some(poi.key.clone());
                        }
                        if ui.small_button("✖").clicked() {
                            removed = Some(poi.key.clone());
                        }
                    });
                }
                if let Some(key) = clicked {
                    self.dispatch(MonitorEvent::MarkerClicked(key));
                }
                if let Some(key) = removed {
                    // Removing the active marker first toggles it off so the
                    // circle and any watch go with it.
                    if self
                        .monitor
                        .active()
                        .is_some_and(|active| active.key == key)
                    {
                        self.dispatch(MonitorEvent::MarkerClicked(key.clone()));
                    }
                    self.registry.remove(&key);
                }

                ui.separator();
                ui.label("Simulated position");
                ui.horizontal(|ui| {
                    ui.label("lat");
                    ui.add(egui::DragValue::new(&mut self.sim_lat).speed(0.0001));
                    ui.label("lng");
                    ui.add(egui::DragValue::new(&mut self.sim_lng).speed(0.0001));
                });
                if ui.button("Send fix").clicked() {
                    self.injector
                        .send_fix(PositionFix::now(LatLng::new(self.sim_lat, self.sim_lng)));
                }

                if let Some(status) = &self.status {
                    ui.add_space(8.0);
                    ui.colored_label(egui::Color32::LIGHT_RED, status);
                }
            });
    }

    fn map_panel(&mut self, ctx: &egui::Context) {
        let markers = self.ordered_markers();
        let active_key = self.monitor.active().map(|poi| poi.key.clone());

        egui::CentralPanel::default().show(ctx, |ui| {
            let map_rect = ui.available_rect_before_wrap();

            let sprites = markers
                .iter()
                .enumerate()
                .map(|(index, poi)| MarkerSprite {
                    position: walkers::lat_lon(poi.location.lat, poi.location.lng),
                    label: poi.name.clone(),
                    active: active_key.as_ref() == Some(&poi.key),
                    index,
                })
                .collect();

            let circle = self.monitor.circle().center().map(|center| {
                (
                    walkers::lat_lon(center.lat, center.lng),
                    self.monitor.circle().radius_m(),
                )
            });

            let overlay = MapOverlay {
                markers: sprites,
                circle,
                last_fix: self
                    .last_fix
                    .as_ref()
                    .map(|fix| walkers::lat_lon(fix.location.lat, fix.location.lng)),
                feedback: Arc::clone(&self.feedback),
                map_rect,
            };

            let center = self.map.initial_center;
            let MapPanelState {
                tiles, map_memory, ..
            } = &mut self.map;
            if let Some(tiles) = tiles {
                let map = walkers::Map::new(
                    Some(tiles),
                    map_memory,
                    walkers::lat_lon(center.lat, center.lng),
                )
                .with_plugin(overlay);
                ui.add(map);
            }
        });

        // Consume what the overlay reported.
        let clicked = self.feedback.clicked_marker.lock().take();
        if let Some(index) = clicked {
            if let Some(poi) = markers.get(index) {
                self.dispatch(MonitorEvent::MarkerClicked(poi.key.clone()));
            }
        }
        if let Some(location) = self.feedback.placed_at.lock().take() {
            if location.is_valid() {
                self.registry.upsert(Poi::placed_at(location));
            }
        }
    }

    fn arrival_dialog(&mut self, ctx: &egui::Context) {
        let Some((poi, distance_m)) = self.arrival_notice.clone() else {
            return;
        };

        let mut dismissed = false;
        egui::Window::new("You have arrived")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(format!(
                    "You are within {} of {}.",
                    waypost_geo::format_distance(distance_m),
                    poi.name
                ));
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });

        if dismissed {
            self.arrival_notice = None;
        }
    }
}

/// Readout for the active target: distance and compass bearing from the
/// latest fix.
fn target_readout(fix: &PositionFix, target: &Poi) -> String {
    let distance = distance_m(fix.location, target.location);
    let bearing = initial_bearing_deg(fix.location, target.location);
    format!(
        "{} {} to {}",
        format_distance(distance),
        format_bearing(bearing),
        target.name
    )
}

impl eframe::App for WaypostApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.map.ensure_tiles(ctx);
        self.drain_watch_updates();

        self.side_panel(ctx);
        self.map_panel(ctx);
        self.arrival_dialog(ctx);

        if self.live_watch.is_some() {
            ctx.request_repaint_after(ARMED_REPAINT_INTERVAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_readout_distance_and_bearing() {
        // Fix one degree south of the target: ~111 km away, due north.
        let target = Poi::new("home", "Home", LatLng::new(33.46836, -84.66599));
        let fix = PositionFix::now(LatLng::new(32.46836, -84.66599));

        let readout = target_readout(&fix, &target);
        assert!(readout.contains("km"), "got {readout}");
        assert!(readout.contains("° N"), "got {readout}");
        assert!(readout.ends_with("to Home"), "got {readout}");
    }

    #[test]
    fn test_target_readout_close_in_meters() {
        let target = Poi::new("home", "Home", LatLng::new(0.0, 0.0));
        // ~445 m east of the target.
        let fix = PositionFix::now(LatLng::new(0.0, -0.004));

        let readout = target_readout(&fix, &target);
        assert!(readout.contains(" m "), "got {readout}");
        assert!(readout.contains("° E"), "got {readout}");
    }
}
