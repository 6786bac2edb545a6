//! Tracking-session state machine.
//!
//! Pure logic, no I/O. Each call to [`TrackingSession::ingest`] takes one
//! raw batch from the state-vector source and returns the arrivals and
//! departures relative to the previous cycle. The active set is rebuilt
//! from scratch every cycle: an aircraft missing from the batch is gone
//! immediately, with no grace period.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::display;
use crate::flight::{AircraftMetadata, FlightRecord};
use crate::geo;
use crate::types::*;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// When an aircraft counts as a new arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrivalPolicy {
    /// Announce each address once per session, even if it leaves and returns.
    #[default]
    EverSeen,
    /// Announce whenever an address appears that was absent last cycle.
    Continuous,
}

impl std::str::FromStr for ArrivalPolicy {
    type Err = SkywatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ever-seen" | "ever_seen" | "once" => Ok(ArrivalPolicy::EverSeen),
            "continuous" | "reentry" => Ok(ArrivalPolicy::Continuous),
            other => Err(SkywatchError::Config(format!(
                "unknown arrival policy: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for ArrivalPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArrivalPolicy::EverSeen => write!(f, "ever-seen"),
            ArrivalPolicy::Continuous => write!(f, "continuous"),
        }
    }
}

/// Immutable settings fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerConfig {
    pub observer: Coordinate,
    pub radius_mi: f64,
    pub arrival_policy: ArrivalPolicy,
}

impl TrackerConfig {
    pub fn new(observer: Coordinate, radius_mi: f64) -> Result<Self> {
        if !radius_mi.is_finite() || radius_mi <= 0.0 {
            return Err(SkywatchError::InvalidRadius(radius_mi));
        }
        let observer = Coordinate::checked(observer.lat, observer.lon)?;
        Ok(TrackerConfig {
            observer,
            radius_mi,
            arrival_policy: ArrivalPolicy::default(),
        })
    }

    pub fn with_arrival_policy(mut self, policy: ArrivalPolicy) -> Self {
        self.arrival_policy = policy;
        self
    }

    /// Pre-filter box to send to the state-vector source.
    pub fn bounding_box(&self) -> BoundingBox {
        geo::bounding_box(self.observer, self.radius_mi)
    }
}

// ---------------------------------------------------------------------------
// Cycle output
// ---------------------------------------------------------------------------

/// An aircraft that entered the radius this cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Arrival {
    #[serde(serialize_with = "crate::types::serialize_icao")]
    pub icao: Icao,
    pub callsign: Option<String>,
    /// Miles from the observer, rounded to 0.1.
    pub distance_mi: f64,
}

/// Differences between this cycle and the previous one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleReport {
    /// In batch order.
    pub arrivals: Vec<Arrival>,
    /// Addresses present last cycle and absent now, sorted.
    #[serde(serialize_with = "crate::types::serialize_icao_list")]
    pub departures: Vec<Icao>,
}

impl CycleReport {
    pub fn is_quiet(&self) -> bool {
        self.arrivals.is_empty() && self.departures.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Owns the active-flight set across polling cycles.
///
/// Single writer: `ingest` takes `&mut self`, so readers never observe a
/// half-applied batch.
#[derive(Debug)]
pub struct TrackingSession {
    config: TrackerConfig,
    active: HashMap<Icao, FlightRecord>,
    previous_ids: HashSet<Icao>,
    // Only populated under ArrivalPolicy::EverSeen.
    ever_seen: HashSet<Icao>,

    // Counters
    pub cycles: u64,
    pub vectors_seen: u64,
    pub vectors_skipped: u64,
    pub vectors_out_of_range: u64,
}

impl TrackingSession {
    pub fn new(config: TrackerConfig) -> Self {
        TrackingSession {
            config,
            active: HashMap::new(),
            previous_ids: HashSet::new(),
            ever_seen: HashSet::new(),
            cycles: 0,
            vectors_seen: 0,
            vectors_skipped: 0,
            vectors_out_of_range: 0,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Process one raw batch. An empty batch is a normal input: every
    /// previously active aircraft departs.
    pub fn ingest(&mut self, batch: &[RawStateVector]) -> CycleReport {
        self.cycles += 1;
        let observer = self.config.observer;
        let mut next: HashMap<Icao, FlightRecord> = HashMap::with_capacity(batch.len());
        let mut arrivals = Vec::new();

        for sv in batch {
            self.vectors_seen += 1;

            let Some(pos) = sv.position() else {
                self.vectors_skipped += 1;
                continue;
            };
            let Some(icao) = icao_from_hex(&sv.icao24) else {
                tracing::debug!(icao24 = %sv.icao24, "skipping vector with malformed address");
                self.vectors_skipped += 1;
                continue;
            };

            let distance = geo::haversine_mi(observer, pos);
            if distance > self.config.radius_mi {
                self.vectors_out_of_range += 1;
                continue;
            }

            // Same address twice in one batch: the later vector wins.
            let repeated = next.contains_key(&icao);
            let existing = next.remove(&icao).or_else(|| self.active.remove(&icao));
            let record = match existing {
                Some(mut rec) => rec.update(sv, observer).map(|_| rec),
                None => FlightRecord::new(sv, observer),
            };
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    tracing::debug!(icao24 = %sv.icao24, error = %e, "skipping malformed vector");
                    self.vectors_skipped += 1;
                    continue;
                }
            };

            let is_arrival = match self.config.arrival_policy {
                ArrivalPolicy::EverSeen => self.ever_seen.insert(icao),
                ArrivalPolicy::Continuous => !repeated && !self.previous_ids.contains(&icao),
            };
            if is_arrival {
                arrivals.push(Arrival {
                    icao,
                    callsign: record.callsign.clone(),
                    distance_mi: (distance * 10.0).round() / 10.0,
                });
            }
            next.insert(icao, record);
        }

        let current_ids: HashSet<Icao> = next.keys().copied().collect();
        let mut departures: Vec<Icao> = self
            .previous_ids
            .difference(&current_ids)
            .copied()
            .collect();
        departures.sort_unstable();

        self.active = next;
        self.previous_ids = current_ids;

        tracing::debug!(
            cycle = self.cycles,
            batch = batch.len(),
            active = self.active.len(),
            arrivals = arrivals.len(),
            departures = departures.len(),
            "ingested batch"
        );

        CycleReport {
            arrivals,
            departures,
        }
    }

    /// Active records keyed by ICAO address.
    pub fn active(&self) -> &HashMap<Icao, FlightRecord> {
        &self.active
    }

    pub fn get(&self, icao: &Icao) -> Option<&FlightRecord> {
        self.active.get(icao)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Addresses present in the last ingested batch.
    #[cfg(test)]
    pub fn previous_ids(&self) -> &HashSet<Icao> {
        &self.previous_ids
    }

    /// Sorted, deduplicated records for rendering.
    pub fn render_list(&self) -> Vec<&FlightRecord> {
        display::render_list(self.active.values())
    }

    /// Attach looked-up metadata to an active record. Returns false if the
    /// aircraft is no longer active.
    pub fn set_metadata(
        &mut self,
        icao: &Icao,
        aircraft: AircraftMetadata,
        airline: String,
    ) -> bool {
        match self.active.get_mut(icao) {
            Some(rec) => {
                rec.aircraft = Some(aircraft);
                rec.airline = Some(airline);
                true
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::MetadataSource;

    const OBSERVER: Coordinate = Coordinate::new(42.0, -71.0);

    fn make_session() -> TrackingSession {
        TrackingSession::new(TrackerConfig::new(OBSERVER, 50.0).unwrap())
    }

    fn sv(icao: &str, callsign: &str, lat: f64, lon: f64) -> RawStateVector {
        RawStateVector {
            icao24: icao.into(),
            callsign: Some(callsign.into()),
            origin_country: "United States".into(),
            lon: Some(lon),
            lat: Some(lat),
            baro_altitude_m: Some(2000.0),
            velocity_ms: Some(120.0),
            true_track_deg: Some(90.0),
        }
    }

    fn icao(hex: &str) -> Icao {
        icao_from_hex(hex).unwrap()
    }

    #[test]
    fn test_config_rejects_bad_radius() {
        assert!(TrackerConfig::new(OBSERVER, 0.0).is_err());
        assert!(TrackerConfig::new(OBSERVER, -5.0).is_err());
        assert!(TrackerConfig::new(OBSERVER, f64::INFINITY).is_err());
    }

    #[test]
    fn test_end_to_end_radius_filter() {
        let mut session = make_session();
        // ~10 mi north and ~200 mi south of the observer.
        let near = sv("a00001", "NEAR1", 42.1447, -71.0);
        let far = sv("a00002", "FAR1", 39.1, -71.0);
        let report = session.ingest(&[near, far]);

        assert_eq!(session.len(), 1);
        assert_eq!(report.arrivals.len(), 1);
        assert_eq!(report.arrivals[0].callsign.as_deref(), Some("NEAR1"));
        assert!((report.arrivals[0].distance_mi - 10.0).abs() < 0.15);
        assert!(session.get(&icao("a00002")).is_none());
        assert!(!session.previous_ids().contains(&icao("a00002")));
        assert!(report.departures.is_empty());
        assert_eq!(session.vectors_out_of_range, 1);
    }

    #[test]
    fn test_vector_on_radius_is_kept() {
        let edge = Coordinate::new(42.3, -71.2);
        let radius = geo::haversine_mi(OBSERVER, edge);
        let mut session = TrackingSession::new(TrackerConfig::new(OBSERVER, radius).unwrap());

        let on = sv("a00001", "EDGE1", edge.lat, edge.lon);
        let beyond = sv("a00002", "EDGE2", edge.lat + 0.001, edge.lon);
        let report = session.ingest(&[on, beyond]);

        assert_eq!(session.len(), 1);
        assert!(session.get(&icao("a00001")).is_some());
        assert_eq!(report.arrivals.len(), 1);
        assert_eq!(session.vectors_out_of_range, 1);
    }

    #[test]
    fn test_same_batch_twice_is_quiet() {
        let mut session = make_session();
        let batch = vec![
            sv("a00001", "AAL1", 42.1, -71.1),
            sv("a00002", "UAL2", 42.2, -70.9),
        ];
        let first = session.ingest(&batch);
        assert_eq!(first.arrivals.len(), 2);

        let second = session.ingest(&batch);
        assert!(second.is_quiet());
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn test_empty_batch_departs_everything() {
        let mut session = make_session();
        session.ingest(&[
            sv("a00001", "AAL1", 42.1, -71.1),
            sv("a00002", "UAL2", 42.2, -70.9),
        ]);

        let report = session.ingest(&[]);
        assert!(session.is_empty());
        assert!(report.arrivals.is_empty());
        assert_eq!(report.departures, vec![icao("a00001"), icao("a00002")]);
        assert!(session.previous_ids().is_empty());
    }

    #[test]
    fn test_empty_first_cycle() {
        let mut session = make_session();
        let report = session.ingest(&[]);
        assert!(report.is_quiet());
        assert!(session.is_empty());
    }

    #[test]
    fn test_departure_then_no_repeat() {
        let mut session = make_session();
        session.ingest(&[sv("a00001", "AAL1", 42.1, -71.1)]);
        let r = session.ingest(&[]);
        assert_eq!(r.departures.len(), 1);
        let r = session.ingest(&[]);
        assert!(r.departures.is_empty());
    }

    #[test]
    fn test_ever_seen_suppresses_reentry() {
        let mut session = make_session();
        session.ingest(&[sv("a00001", "AAL1", 42.1, -71.1)]);
        session.ingest(&[]);
        let report = session.ingest(&[sv("a00001", "AAL1", 42.1, -71.1)]);
        assert!(report.arrivals.is_empty());
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_continuous_announces_reentry() {
        let config = TrackerConfig::new(OBSERVER, 50.0)
            .unwrap()
            .with_arrival_policy(ArrivalPolicy::Continuous);
        let mut session = TrackingSession::new(config);
        let batch = [sv("a00001", "AAL1", 42.1, -71.1)];

        assert_eq!(session.ingest(&batch).arrivals.len(), 1);
        assert!(session.ingest(&batch).arrivals.is_empty());
        session.ingest(&[]);
        assert_eq!(session.ingest(&batch).arrivals.len(), 1);
    }

    #[test]
    fn test_no_id_in_both_arrivals_and_departures() {
        let mut session = make_session();
        session.ingest(&[sv("a00001", "AAL1", 42.1, -71.1)]);
        let report = session.ingest(&[sv("a00002", "UAL2", 42.2, -71.2)]);
        assert_eq!(report.arrivals.len(), 1);
        assert_eq!(report.departures, vec![icao("a00001")]);
        for a in &report.arrivals {
            assert!(!report.departures.contains(&a.icao));
        }
    }

    #[test]
    fn test_missing_position_skipped() {
        let mut session = make_session();
        let mut no_lat = sv("a00001", "AAL1", 42.1, -71.1);
        no_lat.lat = None;
        let mut no_lon = sv("a00002", "UAL2", 42.1, -71.1);
        no_lon.lon = None;
        let ok = sv("a00003", "DAL3", 42.1, -71.1);

        let report = session.ingest(&[no_lat, no_lon, ok]);
        assert_eq!(session.len(), 1);
        assert_eq!(report.arrivals.len(), 1);
        assert_eq!(session.vectors_skipped, 2);
    }

    #[test]
    fn test_malformed_address_does_not_abort_batch() {
        let mut session = make_session();
        let report = session.ingest(&[
            sv("not-hex", "BAD1", 42.1, -71.1),
            sv("a00003", "DAL3", 42.1, -71.1),
        ]);
        assert_eq!(session.len(), 1);
        assert_eq!(report.arrivals.len(), 1);
    }

    #[test]
    fn test_duplicate_address_in_batch_last_wins() {
        let mut session = make_session();
        let mut later = sv("a00001", "AAL1", 42.3, -71.0);
        later.baro_altitude_m = Some(100.0);
        let report = session.ingest(&[sv("a00001", "AAL1", 42.1, -71.0), later]);

        assert_eq!(session.len(), 1);
        assert_eq!(report.arrivals.len(), 1);
        let rec = session.get(&icao("a00001")).unwrap();
        assert!((rec.position.lat - 42.3).abs() < 1e-9);
        assert_eq!(rec.altitude_ft, Some(328));
    }

    #[test]
    fn test_update_in_place_keeps_metadata() {
        let mut session = make_session();
        session.ingest(&[sv("a00001", "AAL1", 42.1, -71.1)]);
        assert!(session.set_metadata(
            &icao("a00001"),
            AircraftMetadata {
                model: "Airbus A321".into(),
                source: MetadataSource::OpenSky,
            },
            "American Airlines".into(),
        ));

        session.ingest(&[sv("a00001", "AAL1", 42.2, -71.1)]);
        let rec = session.get(&icao("a00001")).unwrap();
        assert_eq!(rec.airline.as_deref(), Some("American Airlines"));
        assert!((rec.position.lat - 42.2).abs() < 1e-9);
    }

    #[test]
    fn test_set_metadata_on_departed() {
        let mut session = make_session();
        assert!(!session.set_metadata(
            &icao("a00001"),
            AircraftMetadata {
                model: "x".into(),
                source: MetadataSource::LocalDataset,
            },
            "y".into(),
        ));
    }

    #[test]
    fn test_render_list_dedupes() {
        let mut session = make_session();
        session.ingest(&[
            sv("a00001", "JBU42", 42.100, -71.100),
            sv("a00002", "JBU42", 42.104, -71.104),
            sv("a00003", "DAL3", 42.3, -71.0),
        ]);
        assert_eq!(session.len(), 3);
        let list = session.render_list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].icao, icao("a00001"));
    }

    #[test]
    fn test_counters() {
        let mut session = make_session();
        session.ingest(&[sv("a00001", "AAL1", 42.1, -71.1)]);
        session.ingest(&[]);
        assert_eq!(session.cycles, 2);
        assert_eq!(session.vectors_seen, 1);
    }

    #[test]
    fn test_arrival_policy_parse() {
        assert_eq!(
            "ever-seen".parse::<ArrivalPolicy>().unwrap(),
            ArrivalPolicy::EverSeen
        );
        assert_eq!(
            "Continuous".parse::<ArrivalPolicy>().unwrap(),
            ArrivalPolicy::Continuous
        );
        assert!("sometimes".parse::<ArrivalPolicy>().is_err());
    }
}
