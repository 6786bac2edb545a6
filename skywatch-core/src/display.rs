//! Deterministic render order for the active set.
//!
//! Airborne aircraft come first, then those on the ground; within each
//! group the nearest is first. The ICAO address breaks exact ties so the
//! order never depends on hash-map iteration.

use std::cmp::Ordering;

use crate::dedup;
use crate::flight::FlightRecord;

fn display_cmp(a: &FlightRecord, b: &FlightRecord) -> Ordering {
    a.on_ground()
        .cmp(&b.on_ground())
        .then_with(|| a.distance_mi().total_cmp(&b.distance_mi()))
        .then_with(|| a.icao.cmp(&b.icao))
}

/// All records sorted for display.
pub fn display_order<'a, I>(records: I) -> Vec<&'a FlightRecord>
where
    I: IntoIterator<Item = &'a FlightRecord>,
{
    let mut sorted: Vec<&FlightRecord> = records.into_iter().collect();
    sorted.sort_by(|a, b| display_cmp(a, b));
    sorted
}

/// Sorted and deduplicated: exactly what gets rendered each cycle.
pub fn render_list<'a, I>(records: I) -> Vec<&'a FlightRecord>
where
    I: IntoIterator<Item = &'a FlightRecord>,
{
    dedup::dedupe(display_order(records))
}
