//! Display timezone for cycle timestamps.
//!
//! An explicitly configured IANA zone wins. Otherwise the observer's zone
//! comes from the timezone boundary data in `tzf-rs`, and a location the
//! data cannot name renders in UTC.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tzf_rs::DefaultFinder;

use skywatch_core::types::Coordinate;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

// Loading the boundary polygons takes a moment; do it once.
static FINDER: LazyLock<DefaultFinder> = LazyLock::new(DefaultFinder::new);

/// Zone whose boundary contains `at`.
pub fn zone_at(at: Coordinate) -> Option<Tz> {
    parse_zone(FINDER.get_tz_name(at.lon, at.lat))
}

fn parse_zone(name: &str) -> Option<Tz> {
    if name.is_empty() {
        return None;
    }
    name.parse().ok()
}

/// Display zone for an observer.
pub fn resolve_timezone(configured: Option<&str>, observer: Coordinate) -> Tz {
    if let Some(name) = configured {
        match name.trim().parse::<Tz>() {
            Ok(tz) => return tz,
            Err(e) => tracing::warn!(timezone = name, error = %e, "unknown timezone, resolving from location"),
        }
    }
    match zone_at(observer) {
        Some(tz) => tz,
        None => {
            tracing::info!(observer = %observer, "no timezone for location, using UTC");
            Tz::UTC
        }
    }
}

/// `2024-05-01 14:03:07 EDT`-style timestamp in `tz`.
pub fn format_timestamp(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format(TIMESTAMP_FORMAT).to_string()
}
