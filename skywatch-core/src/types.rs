//! Shared types, error enum, and raw state-vector input for skywatch-core.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// All errors produced by skywatch-core.
#[derive(Debug, Error)]
pub enum SkywatchError {
    #[error("invalid ICAO address: {0:?}")]
    InvalidIcao(String),
    #[error("invalid radius: {0} miles")]
    InvalidRadius(f64),
    #[error("invalid coordinate: ({lat}, {lon})")]
    InvalidCoordinate { lat: f64, lon: f64 },
    #[error("reference data error: {0}")]
    Reference(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SkywatchError>;

// ---------------------------------------------------------------------------
// ICAO address helpers
// ---------------------------------------------------------------------------

/// 3-byte ICAO address. Stored as raw bytes so the session key is `Copy`.
pub type Icao = [u8; 3];

/// Format ICAO address as 6-char uppercase hex string.
pub fn icao_to_string(icao: &Icao) -> String {
    format!("{:02X}{:02X}{:02X}", icao[0], icao[1], icao[2])
}

/// Parse a 6-char hex string (either case) into an ICAO address.
pub fn icao_from_hex(hex: &str) -> Option<Icao> {
    let hex = hex.trim();
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let val = u32::from_str_radix(hex, 16).ok()?;
    Some([
        ((val >> 16) & 0xFF) as u8,
        ((val >> 8) & 0xFF) as u8,
        (val & 0xFF) as u8,
    ])
}

/// Serialize an ICAO address the way OpenSky writes it: 6 lowercase hex chars.
pub fn serialize_icao<S: Serializer>(icao: &Icao, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&icao_to_string(icao).to_ascii_lowercase())
}

pub fn serialize_icao_list<S: Serializer>(
    icaos: &[Icao],
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    s.collect_seq(icaos.iter().map(|i| icao_to_string(i).to_ascii_lowercase()))
}

// ---------------------------------------------------------------------------
// Geographic primitives
// ---------------------------------------------------------------------------

/// WGS-84 latitude/longitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Coordinate { lat, lon }
    }

    /// Range-checked constructor for values coming from users or config.
    pub fn checked(lat: f64, lon: f64) -> Result<Self> {
        if !lat.is_finite() || !lon.is_finite() || lat.abs() > 90.0 || lon.abs() > 180.0 {
            return Err(SkywatchError::InvalidCoordinate { lat, lon });
        }
        Ok(Coordinate { lat, lon })
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.4}, {:.4})", self.lat, self.lon)
    }
}

/// Rectangular pre-filter sent to the state-vector source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    pub fn contains(&self, c: Coordinate) -> bool {
        (self.lat_min..=self.lat_max).contains(&c.lat)
            && (self.lon_min..=self.lon_max).contains(&c.lon)
    }
}

// ---------------------------------------------------------------------------
// Raw input
// ---------------------------------------------------------------------------

/// One aircraft's report as delivered by the state-vector source.
///
/// Units are the source's: meters, meters per second, degrees. Absent
/// fields stay `None` and never collapse to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct RawStateVector {
    pub icao24: String,
    pub callsign: Option<String>,
    pub origin_country: String,
    pub lon: Option<f64>,
    pub lat: Option<f64>,
    pub baro_altitude_m: Option<f64>,
    pub velocity_ms: Option<f64>,
    pub true_track_deg: Option<f64>,
}

impl RawStateVector {
    /// Position if both axes are present and finite.
    pub fn position(&self) -> Option<Coordinate> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => {
                Some(Coordinate { lat, lon })
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icao_roundtrip() {
        let icao = icao_from_hex("a8b2c4").unwrap();
        assert_eq!(icao, [0xA8, 0xB2, 0xC4]);
        assert_eq!(icao_to_string(&icao), "A8B2C4");
    }

    #[test]
    fn test_icao_rejects_garbage() {
        assert_eq!(icao_from_hex(""), None);
        assert_eq!(icao_from_hex("a8b2c"), None);
        assert_eq!(icao_from_hex("+8b2c4"), None);
        assert_eq!(icao_from_hex("zzzzzz"), None);
    }

    #[test]
    fn test_coordinate_checked() {
        assert!(Coordinate::checked(42.0, -71.0).is_ok());
        assert!(Coordinate::checked(91.0, 0.0).is_err());
        assert!(Coordinate::checked(0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_raw_position_requires_both_axes() {
        let mut sv = RawStateVector {
            icao24: "abc123".into(),
            callsign: None,
            origin_country: "United States".into(),
            lon: Some(-71.0),
            lat: None,
            baro_altitude_m: None,
            velocity_ms: None,
            true_track_deg: None,
        };
        assert!(sv.position().is_none());
        sv.lat = Some(42.0);
        assert_eq!(sv.position(), Some(Coordinate::new(42.0, -71.0)));
    }

    #[test]
    fn test_bbox_contains() {
        let bb = BoundingBox {
            lat_min: 41.0,
            lat_max: 43.0,
            lon_min: -72.0,
            lon_max: -70.0,
        };
        assert!(bb.contains(Coordinate::new(42.0, -71.0)));
        assert!(!bb.contains(Coordinate::new(44.0, -71.0)));
    }
}
