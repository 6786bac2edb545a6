//! Collapse near-identical reports of the same physical aircraft.
//!
//! Upstream sources occasionally list one aircraft twice under different
//! addresses with the same callsign and practically the same position.
//! Duplicates are resolved in display order: the first record of a cluster
//! is kept and later ones are dropped.

use crate::flight::FlightRecord;

/// Positions closer than this on both axes (degrees) count as the same spot.
pub const DUPLICATE_EPSILON_DEG: f64 = 0.01;

/// True if `candidate` matches a record already accepted for this pass.
///
/// Unknown callsigns compare equal to each other.
pub fn is_duplicate(candidate: &FlightRecord, accepted: &[&FlightRecord]) -> bool {
    accepted.iter().any(|other| {
        candidate.callsign == other.callsign
            && (candidate.position.lat - other.position.lat).abs() < DUPLICATE_EPSILON_DEG
            && (candidate.position.lon - other.position.lon).abs() < DUPLICATE_EPSILON_DEG
    })
}

/// Keep the first record of every duplicate cluster, preserving order.
pub fn dedupe<'a, I>(ordered: I) -> Vec<&'a FlightRecord>
where
    I: IntoIterator<Item = &'a FlightRecord>,
{
    let mut accepted: Vec<&FlightRecord> = Vec::new();
    for rec in ordered {
        if is_duplicate(rec, &accepted) {
            tracing::debug!(
                icao = %crate::types::icao_to_string(&rec.icao),
                callsign = rec.callsign_or_na(),
                "suppressed duplicate report"
            );
            continue;
        }
        accepted.push(rec);
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Coordinate, RawStateVector};

    const OBSERVER: Coordinate = Coordinate::new(42.0, -71.0);

    fn rec(icao: &str, callsign: Option<&str>, lat: f64, lon: f64) -> FlightRecord {
        let sv = RawStateVector {
            icao24: icao.into(),
            callsign: callsign.map(String::from),
            origin_country: "United States".into(),
            lon: Some(lon),
            lat: Some(lat),
            baro_altitude_m: Some(3000.0),
            velocity_ms: Some(200.0),
            true_track_deg: None,
        };
        FlightRecord::new(&sv, OBSERVER).unwrap()
    }

    #[test]
    fn test_same_callsign_near_position_is_duplicate() {
        let a = rec("aaaaaa", Some("JBU42"), 42.100, -71.100);
        let b = rec("bbbbbb", Some("JBU42"), 42.105, -71.095);
        assert!(is_duplicate(&b, &[&a]));
    }

    #[test]
    fn test_different_callsign_not_duplicate() {
        let a = rec("aaaaaa", Some("JBU42"), 42.1, -71.1);
        let b = rec("bbbbbb", Some("JBU43"), 42.1, -71.1);
        assert!(!is_duplicate(&b, &[&a]));
    }

    #[test]
    fn test_far_position_not_duplicate() {
        let a = rec("aaaaaa", Some("JBU42"), 42.10, -71.10);
        let lat_off = rec("bbbbbb", Some("JBU42"), 42.12, -71.10);
        let lon_off = rec("cccccc", Some("JBU42"), 42.10, -71.12);
        assert!(!is_duplicate(&lat_off, &[&a]));
        assert!(!is_duplicate(&lon_off, &[&a]));
    }

    #[test]
    fn test_unknown_callsigns_match() {
        let a = rec("aaaaaa", None, 42.1, -71.1);
        let b = rec("bbbbbb", Some("   "), 42.1, -71.1);
        assert!(is_duplicate(&b, &[&a]));
    }

    #[test]
    fn test_empty_accepted() {
        let a = rec("aaaaaa", Some("JBU42"), 42.1, -71.1);
        assert!(!is_duplicate(&a, &[]));
    }

    #[test]
    fn test_dedupe_first_wins() {
        let a = rec("aaaaaa", Some("JBU42"), 42.100, -71.100);
        let b = rec("bbbbbb", Some("JBU42"), 42.101, -71.101);
        let c = rec("cccccc", Some("DAL9"), 42.3, -71.3);
        let kept = dedupe([&a, &b, &c]);
        let ids: Vec<_> = kept.iter().map(|r| r.icao).collect();
        assert_eq!(ids, vec![a.icao, c.icao]);

        let kept = dedupe([&b, &a, &c]);
        assert_eq!(kept[0].icao, b.icao);
        assert_eq!(kept.len(), 2);
    }
}
