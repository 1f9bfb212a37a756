//! Map overlay plugin: markers, the proximity circle, and the latest fix.
//!
//! Runs inside the walkers map widget with access to the projector, so all
//! geographic positions are converted to screen space here. Click picking is
//! magnetic: a left click selects the nearest marker within a small screen
//! distance; a right click anywhere else reports the geographic position for
//! a new marker.

use egui::{Align2, Color32, FontId, Stroke};
use parking_lot::Mutex;
use std::sync::Arc;
use walkers::{MapMemory, Plugin, Position, Projector};
use waypost_core::types::LatLng;
use waypost_geo::MEAN_EARTH_RADIUS_M;

/// Maximum screen distance (px) for a click to select a marker.
const PICK_RADIUS_PX: f32 = 24.0;

/// What the overlay reported back from the last frame.
#[derive(Debug, Default)]
pub struct OverlayFeedback {
    /// Key index of the clicked marker, if any.
    pub clicked_marker: Mutex<Option<usize>>,
    /// Geographic position of a right click on empty map.
    pub placed_at: Mutex<Option<LatLng>>,
}

/// One marker prepared for drawing.
pub struct MarkerSprite {
    pub position: Position,
    pub label: String,
    pub active: bool,
    /// Index into the caller's marker list, reported back on click.
    pub index: usize,
}

/// Overlay drawn on top of the tile layer.
pub struct MapOverlay {
    pub markers: Vec<MarkerSprite>,
    /// Proximity circle: geographic center + radius in meters.
    pub circle: Option<(Position, f64)>,
    /// Latest position fix, drawn as the "you are here" dot.
    pub last_fix: Option<Position>,
    pub feedback: Arc<OverlayFeedback>,
    pub map_rect: egui::Rect,
}

impl MapOverlay {
    fn screen_radius_px(projector: &Projector, center: Position, radius_m: f64) -> f32 {
        // Project a point one radius east of the center; the screen distance
        // between the two is the circle radius in pixels at this zoom.
        let lat = center.y();
        let meters_per_deg_lng =
            MEAN_EARTH_RADIUS_M * std::f64::consts::PI / 180.0 * lat.to_radians().cos();
        let edge = walkers::lat_lon(lat, center.x() + radius_m / meters_per_deg_lng);

        let c = projector.project(center);
        let e = projector.project(edge);
        (e.x - c.x).abs()
    }
}

impl Plugin for MapOverlay {
    fn run(
        self: Box<Self>,
        ui: &mut egui::Ui,
        response: &egui::Response,
        projector: &Projector,
        _memory: &MapMemory,
    ) {
        let painter = ui.painter().with_clip_rect(self.map_rect);

        // Proximity circle under everything else.
        if let Some((center, radius_m)) = self.circle {
            let c = projector.project(center);
            let center_pos = egui::pos2(c.x, c.y);
            let radius_px = Self::screen_radius_px(projector, center, radius_m);

            painter.circle_filled(
                center_pos,
                radius_px,
                Color32::from_rgba_unmultiplied(220, 60, 60, 28),
            );
            painter.circle_stroke(
                center_pos,
                radius_px,
                Stroke::new(2.0, Color32::from_rgb(220, 60, 60)),
            );
        }

        let left_click = if response.clicked() {
            response.interact_pointer_pos()
        } else {
            None
        };

        let mut closest_dist = f32::MAX;
        let mut closest_idx: Option<usize> = None;

        for sprite in &self.markers {
            let v = projector.project(sprite.position);
            let screen_pos = egui::pos2(v.x, v.y);
            if !self.map_rect.expand(PICK_RADIUS_PX).contains(screen_pos) {
                continue;
            }

            let (color, radius) = if sprite.active {
                (Color32::from_rgb(250, 200, 40), 9.0)
            } else {
                (Color32::from_rgb(70, 130, 220), 7.0)
            };

            painter.circle_filled(screen_pos, radius, color);
            painter.circle_stroke(screen_pos, radius, Stroke::new(2.0, Color32::WHITE));
            painter.text(
                screen_pos + egui::vec2(10.0, -10.0),
                Align2::LEFT_CENTER,
                &sprite.label,
                FontId::proportional(12.0),
                Color32::WHITE,
            );

            if let Some(click) = left_click {
                let dist = screen_pos.distance(click);
                if dist < closest_dist {
                    closest_dist = dist;
                    closest_idx = Some(sprite.index);
                }
            }
        }

        // Magnetic pick: only within a small screen distance of a marker.
        if let (Some(idx), true) = (closest_idx, closest_dist < PICK_RADIUS_PX) {
            *self.feedback.clicked_marker.lock() = Some(idx);
        }

        // Right click on the map places a new marker.
        if response.secondary_clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let geo = projector.unproject(pos.to_vec2());
                *self.feedback.placed_at.lock() = Some(LatLng::new(geo.y(), geo.x()));
            }
        }

        // Latest fix on top.
        if let Some(fix) = self.last_fix {
            let v = projector.project(fix);
            let p = egui::pos2(v.x, v.y);
            painter.circle_filled(p, 6.0, Color32::BLACK);
            painter.circle_filled(p, 4.0, Color32::from_rgb(60, 200, 90));
        }
    }
}
