//! Great-circle distance on a fixed-radius sphere.
//!
//! The arrival test uses a single spherical model (haversine with the mean
//! Earth radius); no higher-fidelity geodesic is needed at the radii this
//! system works with.

use waypost_core::types::LatLng;

/// Mean Earth radius in meters.
pub const MEAN_EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Computes the great-circle surface distance between two coordinates,
/// in meters, using the haversine formula.
pub fn distance_m(a: LatLng, b: LatLng) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    MEAN_EARTH_RADIUS_M * c
}

/// Returns true if `p` lies strictly inside the circle of `radius_m` meters
/// around `center`.
///
/// The comparison is strict: a point at geodesic distance exactly `radius_m`
/// is on the boundary and does NOT count as inside.
pub fn within_radius(center: LatLng, radius_m: f64, p: LatLng) -> bool {
    distance_m(center, p) < radius_m
}

/// Initial bearing from `a` toward `b` in degrees clockwise from north,
/// normalized to `[0, 360)`.
pub fn initial_bearing_deg(a: LatLng, b: LatLng) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let y = d_lng.sin() * lat_b.cos();
    let x = lat_a.cos() * lat_b.sin() - lat_a.sin() * lat_b.cos() * d_lng.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}
