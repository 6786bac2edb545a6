//! skywatch-core: Pure tracking library for polled aircraft state vectors.
//!
//! No async and no network: geo math and the per-cycle state machine.
//! The `skywatch` binary fetches batches, feeds them to a
//! [`TrackingSession`], and renders the result.

pub mod config;
pub mod dedup;
pub mod display;
pub mod enrich;
pub mod flight;
pub mod geo;
pub mod session;
pub mod types;

// Re-export commonly used types at crate root
pub use enrich::ReferenceData;
pub use flight::{AircraftMetadata, AltitudeBand, FlightRecord, MetadataSource, StatusIcon};
pub use geo::Direction;
pub use session::{Arrival, ArrivalPolicy, CycleReport, TrackerConfig, TrackingSession};
pub use types::*;
