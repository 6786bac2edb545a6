//! Great-circle distance, compass bearing, and bounding-box math.
//!
//! All angles are degrees on the way in and out; distances are statute miles.

use serde::Serialize;

use crate::types::{BoundingBox, Coordinate};

/// Earth radius in statute miles used by the haversine formula.
pub const EARTH_RADIUS_MI: f64 = 3956.0;

/// Miles per degree of latitude (flat approximation for the pre-filter box).
pub const MILES_PER_DEG_LAT: f64 = 69.0;

/// Floor for `cos(lat)` in the longitude delta. Keeps the box finite near the poles.
pub const MIN_COS_LAT: f64 = 0.01;

// ---------------------------------------------------------------------------
// Haversine
// ---------------------------------------------------------------------------

/// Great-circle distance in statute miles.
pub fn haversine_mi(a: Coordinate, b: Coordinate) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1.0 for antipodal points.
    2.0 * EARTH_RADIUS_MI * h.clamp(0.0, 1.0).sqrt().asin()
}

// ---------------------------------------------------------------------------
// Bearing
// ---------------------------------------------------------------------------

/// Eight-point compass direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

const OCTANTS: [Direction; 8] = [
    Direction::N,
    Direction::NE,
    Direction::E,
    Direction::SE,
    Direction::S,
    Direction::SW,
    Direction::W,
    Direction::NW,
];

impl Direction {
    /// Nearest octant for a bearing in degrees (any range).
    pub fn from_bearing(bearing_deg: f64) -> Self {
        let idx = (bearing_deg.rem_euclid(360.0) / 45.0).round() as usize % 8;
        OCTANTS[idx]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::N => "N",
            Direction::NE => "NE",
            Direction::E => "E",
            Direction::SE => "SE",
            Direction::S => "S",
            Direction::SW => "SW",
            Direction::W => "W",
            Direction::NW => "NW",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Initial great-circle bearing from `from` to `to`, normalized to [0, 360).
pub fn bearing_deg(from: Coordinate, to: Coordinate) -> f64 {
    let dlon = (to.lon - from.lon).to_radians();
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let x = dlon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    x.atan2(y).to_degrees().rem_euclid(360.0)
}

/// Compass direction of `to` as seen from `from`.
pub fn direction(from: Coordinate, to: Coordinate) -> Direction {
    Direction::from_bearing(bearing_deg(from, to))
}

// ---------------------------------------------------------------------------
// Bounding box
// ---------------------------------------------------------------------------

/// Coarse rectangle around `center` covering `radius_mi`.
///
/// The longitude delta divides by `cos(lat)`, floored at [`MIN_COS_LAT`];
/// results are clamped to valid lat/lon ranges.
pub fn bounding_box(center: Coordinate, radius_mi: f64) -> BoundingBox {
    debug_assert!(
        radius_mi.is_finite() && radius_mi > 0.0,
        "radius must be positive, got {radius_mi}"
    );
    let lat_delta = radius_mi / MILES_PER_DEG_LAT;
    let cos_lat = center.lat.to_radians().cos().abs().max(MIN_COS_LAT);
    let lon_delta = radius_mi / (MILES_PER_DEG_LAT * cos_lat);

    BoundingBox {
        lat_min: (center.lat - lat_delta).max(-90.0),
        lat_max: (center.lat + lat_delta).min(90.0),
        lon_min: (center.lon - lon_delta).max(-180.0),
        lon_max: (center.lon + lon_delta).min(180.0),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
