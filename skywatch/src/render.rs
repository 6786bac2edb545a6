//! Terminal rendering of one cycle: header, arrivals, departures, flight table.

use std::io::{self, Write};

use comfy_table::{Cell, Color, Table};
use serde::Serialize;

use skywatch_core::flight::{AltitudeBand, FlightRecord};
use skywatch_core::session::CycleReport;
use skywatch_core::types::icao_to_string;

/// ANSI sequence that clears the screen and homes the cursor.
pub const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";

/// Everything shown for a single cycle.
#[derive(Serialize)]
pub struct CycleView<'a> {
    pub timestamp: String,
    pub radius_mi: f64,
    pub active: usize,
    #[serde(flatten)]
    pub report: &'a CycleReport,
    /// Already sorted and deduplicated.
    pub flights: Vec<&'a FlightRecord>,
}

/// Summary line for the top of the screen.
pub fn header(timestamp: &str, active: usize, radius_mi: f64) -> String {
    if active > 0 {
        format!("🛬 {timestamp} - Tracking {active} active plane(s) within {radius_mi:.1} miles.")
    } else {
        format!("🛰️ {timestamp} - No planes in the designated bounding box. Scanning...")
    }
}

fn band_color(band: AltitudeBand) -> Color {
    match band {
        AltitudeBand::Unknown => Color::Yellow,
        AltitudeBand::Low => Color::Red,
        AltitudeBand::Mid => Color::Green,
        AltitudeBand::High => Color::Blue,
    }
}

fn or_na<T: std::fmt::Display>(v: Option<T>, unit: &str) -> String {
    match v {
        Some(x) => format!("{x}{unit}"),
        None => format!("N/A{unit}"),
    }
}

/// Flight table for the render list.
pub fn flight_table(flights: &[&FlightRecord], color: bool) -> Table {
    let mut table = Table::new();
    if color {
        table.enforce_styling();
    } else {
        table.force_no_tty();
    }
    table.set_header(vec![
        "", "Callsign", "Airline", "Aircraft", "Country", "Dist (mi)", "Dir", "ICAO24",
        "Position", "Alt (ft)", "Speed (mph)", "Hdg", "Status",
    ]);

    for f in flights {
        let status = if f.on_ground() {
            "Probably on the runway"
        } else {
            "Airborne"
        };
        table.add_row(vec![
            Cell::new(f.icon().glyph()),
            Cell::new(f.callsign_or_na()).fg(Color::Cyan),
            Cell::new(f.airline.as_deref().unwrap_or("-")),
            Cell::new(
                f.aircraft
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or("-".into()),
            ),
            Cell::new(&f.origin_country),
            Cell::new(format!("{:.2}", f.distance_mi())),
            Cell::new(f.direction()),
            Cell::new(icao_to_string(&f.icao).to_ascii_lowercase()),
            Cell::new(format!("({:.4}, {:.4})", f.position.lat, f.position.lon)),
            Cell::new(or_na(f.altitude_ft, "")).fg(band_color(f.band())),
            Cell::new(or_na(f.speed_mph, "")).fg(Color::Green),
            Cell::new(or_na(f.heading_deg, "°")).fg(Color::Yellow),
            Cell::new(status),
        ]);
    }
    table
}

/// Write a full cycle to `out`.
pub fn render<W: Write>(out: &mut W, view: &CycleView<'_>, color: bool) -> io::Result<()> {
    writeln!(out, "{}", header(&view.timestamp, view.active, view.radius_mi))?;

    for a in &view.report.arrivals {
        writeln!(
            out,
            "🔔 New Arrival: {} entered airspace ({:.1} mi)",
            a.callsign.as_deref().unwrap_or("N/A"),
            a.distance_mi
        )?;
    }
    for icao in &view.report.departures {
        writeln!(
            out,
            "👋 Departure: Aircraft {} has left the area",
            icao_to_string(icao).to_ascii_lowercase()
        )?;
    }

    if !view.flights.is_empty() {
        writeln!(out)?;
        writeln!(out, "🛫 Active Planes in Bounds:")?;
        writeln!(out, "{}", flight_table(&view.flights, color))?;
    }
    out.flush()
}

/// Write a cycle as one line of JSON.
pub fn render_json<W: Write>(out: &mut W, view: &CycleView<'_>) -> io::Result<()> {
    serde_json::to_writer(&mut *out, view)?;
    writeln!(out)?;
    out.flush()
}
