//! Per-aircraft flight record and its derived classifications.
//!
//! A record is created on first sighting and updated in place afterwards.
//! Both paths go through [`FlightRecord::update`], so the derived fields
//! (distance, direction, ground status, altitude band, icon) are always
//! computed the same way from the latest raw values.

use serde::Serialize;

use crate::geo::{self, Direction};
use crate::types::{icao_from_hex, Coordinate, Icao, RawStateVector, Result, SkywatchError};

pub const FEET_PER_METER: f64 = 3.28084;
pub const MPH_PER_MS: f64 = 2.23694;

/// Below this altitude (ft) an aircraft may be on the ground.
pub const GROUND_ALTITUDE_FT: i32 = 100;
/// Below this speed (mph) an aircraft may be on the ground.
pub const GROUND_SPEED_MPH: i32 = 40;

pub const LOW_BAND_CEILING_FT: i32 = 3000;
pub const MID_BAND_CEILING_FT: i32 = 10000;

// ---------------------------------------------------------------------------
// Classifications
// ---------------------------------------------------------------------------

/// Altitude band used for coloring and the status icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AltitudeBand {
    Unknown,
    Low,
    Mid,
    High,
}

impl AltitudeBand {
    pub fn classify(altitude_ft: Option<i32>) -> Self {
        match altitude_ft {
            None => AltitudeBand::Unknown,
            Some(alt) if alt < LOW_BAND_CEILING_FT => AltitudeBand::Low,
            Some(alt) if alt < MID_BAND_CEILING_FT => AltitudeBand::Mid,
            Some(_) => AltitudeBand::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AltitudeBand::Unknown => "unknown",
            AltitudeBand::Low => "low",
            AltitudeBand::Mid => "mid",
            AltitudeBand::High => "high",
        }
    }
}

/// Status icon shown next to each flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusIcon {
    Parked,
    Takeoff,
    Landing,
    Cruise,
}

impl StatusIcon {
    pub fn for_band(band: AltitudeBand) -> Self {
        match band {
            AltitudeBand::Unknown => StatusIcon::Parked,
            AltitudeBand::Low => StatusIcon::Takeoff,
            AltitudeBand::Mid => StatusIcon::Landing,
            AltitudeBand::High => StatusIcon::Cruise,
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            StatusIcon::Parked => "🅿️",
            StatusIcon::Takeoff => "🛫",
            StatusIcon::Landing => "🛬",
            StatusIcon::Cruise => "✈️",
        }
    }
}

/// On ground iff (altitude unknown or < 100 ft) and (speed unknown or < 40 mph).
pub fn is_on_ground(altitude_ft: Option<i32>, speed_mph: Option<i32>) -> bool {
    let low = altitude_ft.is_none_or(|a| a < GROUND_ALTITUDE_FT);
    let slow = speed_mph.is_none_or(|s| s < GROUND_SPEED_MPH);
    low && slow
}

// ---------------------------------------------------------------------------
// Unit conversion
// ---------------------------------------------------------------------------

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

pub fn meters_to_feet(m: Option<f64>) -> Option<i32> {
    finite(m).map(|m| (m * FEET_PER_METER).round() as i32)
}

pub fn ms_to_mph(ms: Option<f64>) -> Option<i32> {
    finite(ms).map(|v| (v * MPH_PER_MS).round() as i32)
}

fn round_to(v: f64, places: i32) -> f64 {
    let f = 10f64.powi(places);
    (v * f).round() / f
}

// ---------------------------------------------------------------------------
// Metadata (filled in by the caller after lookups)
// ---------------------------------------------------------------------------

/// Where an aircraft model string came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataSource {
    OpenSky,
    LocalDataset,
}

impl std::fmt::Display for MetadataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataSource::OpenSky => write!(f, "OpenSky"),
            MetadataSource::LocalDataset => write!(f, "Local Dataset"),
        }
    }
}

/// Aircraft model and its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AircraftMetadata {
    pub model: String,
    pub source: MetadataSource,
}

impl std::fmt::Display for AircraftMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.model, self.source)
    }
}

// ---------------------------------------------------------------------------
// Flight record
// ---------------------------------------------------------------------------

/// Latest known state of one tracked aircraft.
///
/// Derived fields are private and only change through [`FlightRecord::update`].
#[derive(Debug, Clone, Serialize)]
pub struct FlightRecord {
    #[serde(serialize_with = "crate::types::serialize_icao")]
    pub icao: Icao,
    pub callsign: Option<String>,
    pub origin_country: String,

    pub position: Coordinate,
    pub altitude_ft: Option<i32>,
    pub speed_mph: Option<i32>,
    pub heading_deg: Option<i32>,

    distance_mi: f64,
    direction: Direction,
    on_ground: bool,
    band: AltitudeBand,
    icon: StatusIcon,

    pub aircraft: Option<AircraftMetadata>,
    pub airline: Option<String>,
}

impl FlightRecord {
    /// Build a record from its first sighting.
    pub fn new(raw: &RawStateVector, observer: Coordinate) -> Result<Self> {
        let icao = icao_from_hex(&raw.icao24)
            .ok_or_else(|| SkywatchError::InvalidIcao(raw.icao24.clone()))?;
        let position = raw.position().ok_or(SkywatchError::InvalidCoordinate {
            lat: raw.lat.unwrap_or(f64::NAN),
            lon: raw.lon.unwrap_or(f64::NAN),
        })?;

        let callsign = raw
            .callsign
            .as_deref()
            .map(str::trim)
            .filter(|cs| !cs.is_empty())
            .map(str::to_string);

        let mut record = FlightRecord {
            icao,
            callsign,
            origin_country: raw.origin_country.clone(),
            position,
            altitude_ft: None,
            speed_mph: None,
            heading_deg: None,
            distance_mi: 0.0,
            direction: Direction::N,
            on_ground: true,
            band: AltitudeBand::Unknown,
            icon: StatusIcon::Parked,
            aircraft: None,
            airline: None,
        };
        record.update(raw, observer)?;
        Ok(record)
    }

    /// Apply a fresh sighting of the same aircraft and recompute derived fields.
    pub fn update(&mut self, raw: &RawStateVector, observer: Coordinate) -> Result<()> {
        debug_assert_eq!(
            icao_from_hex(&raw.icao24),
            Some(self.icao),
            "update applied to a different aircraft"
        );
        let position = raw.position().ok_or(SkywatchError::InvalidCoordinate {
            lat: raw.lat.unwrap_or(f64::NAN),
            lon: raw.lon.unwrap_or(f64::NAN),
        })?;

        self.position = position;
        self.altitude_ft = meters_to_feet(raw.baro_altitude_m);
        self.speed_mph = ms_to_mph(raw.velocity_ms);
        self.heading_deg = finite(raw.true_track_deg).map(|h| h.round() as i32);

        self.distance_mi = round_to(geo::haversine_mi(observer, position), 2);
        self.direction = geo::direction(observer, position);
        self.on_ground = is_on_ground(self.altitude_ft, self.speed_mph);
        self.band = AltitudeBand::classify(self.altitude_ft);
        self.icon = StatusIcon::for_band(self.band);
        Ok(())
    }

    pub fn distance_mi(&self) -> f64 {
        self.distance_mi
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn on_ground(&self) -> bool {
        self.on_ground
    }

    pub fn band(&self) -> AltitudeBand {
        self.band
    }

    pub fn icon(&self) -> StatusIcon {
        self.icon
    }

    /// Callsign for display, `"N/A"` when unknown.
    pub fn callsign_or_na(&self) -> &str {
        self.callsign.as_deref().unwrap_or("N/A")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const OBSERVER: Coordinate = Coordinate::new(42.0, -71.0);

    fn raw(alt_m: Option<f64>, speed_ms: Option<f64>) -> RawStateVector {
        RawStateVector {
            icao24: "a1b2c3".into(),
            callsign: Some("DAL123  ".into()),
            origin_country: "United States".into(),
            lon: Some(-71.1),
            lat: Some(42.1),
            baro_altitude_m: alt_m,
            velocity_ms: speed_ms,
            true_track_deg: Some(271.6),
        }
    }

    #[test]
    fn test_new_populates_identity_and_derived() {
        let rec = FlightRecord::new(&raw(Some(3048.0), Some(200.0)), OBSERVER).unwrap();
        assert_eq!(rec.icao, [0xA1, 0xB2, 0xC3]);
        assert_eq!(rec.callsign.as_deref(), Some("DAL123"));
        assert_eq!(rec.altitude_ft, Some(10000));
        assert_eq!(rec.speed_mph, Some(447));
        assert_eq!(rec.heading_deg, Some(272));
        assert_eq!(rec.band(), AltitudeBand::High);
        assert_eq!(rec.icon(), StatusIcon::Cruise);
        assert!(!rec.on_ground());
        assert!(rec.distance_mi() > 8.0 && rec.distance_mi() < 9.0);
        assert_eq!(rec.direction(), Direction::NW);
    }

    #[test]
    fn test_serialized_record() {
        let mut rec = FlightRecord::new(&raw(Some(3048.0), Some(200.0)), OBSERVER).unwrap();
        rec.aircraft = Some(AircraftMetadata {
            model: "Airbus A321".into(),
            source: MetadataSource::LocalDataset,
        });
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["icao"], "a1b2c3");
        assert_eq!(v["callsign"], "DAL123");
        assert_eq!(v["altitude_ft"], 10000);
        assert_eq!(v["band"], "high");
        assert_eq!(v["icon"], "cruise");
        assert_eq!(v["direction"], "NW");
        assert_eq!(v["on_ground"], false);
        assert_eq!(v["aircraft"]["source"], "local_dataset");
        assert_eq!(v["position"]["lat"], 42.1);
        assert!(v["airline"].is_null());
    }

    #[test]
    fn test_blank_callsign_is_unknown() {
        let mut sv = raw(None, None);
        sv.callsign = Some("        ".into());
        let rec = FlightRecord::new(&sv, OBSERVER).unwrap();
        assert_eq!(rec.callsign, None);
        assert_eq!(rec.callsign_or_na(), "N/A");
    }

    #[test]
    fn test_missing_numbers_stay_unknown() {
        let rec = FlightRecord::new(&raw(None, None), OBSERVER).unwrap();
        assert_eq!(rec.altitude_ft, None);
        assert_eq!(rec.speed_mph, None);
        assert_eq!(rec.band(), AltitudeBand::Unknown);
        assert_eq!(rec.icon(), StatusIcon::Parked);
        assert!(rec.on_ground());
    }

    #[test]
    fn test_zero_altitude_is_a_reading() {
        let rec = FlightRecord::new(&raw(Some(0.0), Some(0.0)), OBSERVER).unwrap();
        assert_eq!(rec.altitude_ft, Some(0));
        assert_eq!(rec.speed_mph, Some(0));
        assert_eq!(rec.band(), AltitudeBand::Low);
        assert!(rec.on_ground());
    }

    #[test]
    fn test_update_recomputes_derived() {
        let mut rec = FlightRecord::new(&raw(None, None), OBSERVER).unwrap();
        assert!(rec.on_ground());

        let mut next = raw(Some(1000.0), Some(100.0));
        next.lat = Some(42.5);
        next.lon = Some(-71.0);
        rec.update(&next, OBSERVER).unwrap();

        assert_eq!(rec.altitude_ft, Some(3281));
        assert_eq!(rec.band(), AltitudeBand::Mid);
        assert_eq!(rec.icon(), StatusIcon::Landing);
        assert!(!rec.on_ground());
        assert_eq!(rec.direction(), Direction::N);
        assert!((rec.distance_mi() - 34.52).abs() < 0.05);
    }

    #[test]
    fn test_update_keeps_metadata() {
        let mut rec = FlightRecord::new(&raw(None, None), OBSERVER).unwrap();
        rec.airline = Some("Delta Air Lines".into());
        rec.update(&raw(Some(500.0), Some(90.0)), OBSERVER).unwrap();
        assert_eq!(rec.airline.as_deref(), Some("Delta Air Lines"));
    }

    #[test]
    fn test_new_rejects_bad_icao() {
        let mut sv = raw(None, None);
        sv.icao24 = "nope".into();
        assert!(matches!(
            FlightRecord::new(&sv, OBSERVER),
            Err(SkywatchError::InvalidIcao(_))
        ));
    }

    #[test]
    fn test_altitude_band_boundaries() {
        assert_eq!(AltitudeBand::classify(Some(2999)), AltitudeBand::Low);
        assert_eq!(AltitudeBand::classify(Some(3000)), AltitudeBand::Mid);
        assert_eq!(AltitudeBand::classify(Some(9999)), AltitudeBand::Mid);
        assert_eq!(AltitudeBand::classify(Some(10000)), AltitudeBand::High);
        assert_eq!(AltitudeBand::classify(None), AltitudeBand::Unknown);
    }

    #[test]
    fn test_band_unknown_regardless_of_speed() {
        let slow = FlightRecord::new(&raw(None, Some(0.0)), OBSERVER).unwrap();
        let fast = FlightRecord::new(&raw(None, Some(250.0)), OBSERVER).unwrap();
        assert_eq!(slow.band(), AltitudeBand::Unknown);
        assert_eq!(fast.band(), AltitudeBand::Unknown);
    }

    #[test]
    fn test_ground_status() {
        assert!(is_on_ground(None, Some(0)));
        assert!(is_on_ground(None, None));
        assert!(is_on_ground(Some(99), Some(39)));
        assert!(!is_on_ground(Some(500), Some(500)));
        assert!(!is_on_ground(Some(50), Some(120)));
        assert!(!is_on_ground(Some(100), None));
    }
}
