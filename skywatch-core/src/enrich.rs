//! Local reference data: airline names and operator aircraft types.
//!
//! Both tables are keyed by the three-letter ICAO operator prefix of a
//! callsign. Built-in entries cover common North American and European
//! operators; JSON files (`{"AAL": "American Airlines", ...}`) can be
//! merged on top.

use std::collections::HashMap;
use std::path::Path;

use crate::types::{Result, SkywatchError};

pub const UNKNOWN_CARRIER: &str = "Unknown Carrier";
pub const UNKNOWN_TYPE: &str = "Unknown Type";

// ---------------------------------------------------------------------------
// Built-in tables
// ---------------------------------------------------------------------------

/// Airline ICAO prefixes → operator name.
const AIRLINE_PREFIXES: &[(&str, &str)] = &[
    ("AAL", "American Airlines"),
    ("DAL", "Delta Air Lines"),
    ("UAL", "United Airlines"),
    ("SWA", "Southwest Airlines"),
    ("JBU", "JetBlue Airways"),
    ("NKS", "Spirit Airlines"),
    ("FFT", "Frontier Airlines"),
    ("ASA", "Alaska Airlines"),
    ("HAL", "Hawaiian Airlines"),
    ("SKW", "SkyWest Airlines"),
    ("RPA", "Republic Airways"),
    ("ENY", "Envoy Air"),
    ("ASH", "Mesa Airlines"),
    ("PDT", "Piedmont Airlines"),
    ("JIA", "PSA Airlines"),
    ("EDV", "Endeavor Air"),
    ("CPZ", "Compass Airlines"),
    ("GJS", "GoJet Airlines"),
    ("MXY", "Breeze Airways"),
    ("AAY", "Allegiant Air"),
    ("SCX", "Sun Country Airlines"),
    ("KAP", "Cape Air"),
    ("EJA", "NetJets"),
    ("LXJ", "Flexjet"),
    ("UPS", "UPS"),
    ("FDX", "FedEx"),
    ("GTI", "Atlas Air"),
    ("ABX", "ABX Air"),
    ("ACA", "Air Canada"),
    ("JZA", "Jazz Aviation"),
    ("WJA", "WestJet"),
    ("PTR", "Porter Airlines"),
    ("BAW", "British Airways"),
    ("VIR", "Virgin Atlantic"),
    ("EIN", "Aer Lingus"),
    ("ICE", "Icelandair"),
    ("DLH", "Lufthansa"),
    ("AFR", "Air France"),
    ("KLM", "KLM Royal Dutch Airlines"),
    ("SWR", "Swiss International Air Lines"),
    ("TAP", "TAP Air Portugal"),
    ("IBE", "Iberia"),
    ("EZY", "easyJet"),
    ("RYR", "Ryanair"),
    ("UAE", "Emirates"),
    ("QTR", "Qatar Airways"),
    ("THY", "Turkish Airlines"),
];

/// Operator prefix → typical aircraft type, used when no per-airframe
/// model is available.
const OPERATOR_TYPES: &[(&str, &str)] = &[
    ("AAL", "Airbus A321"),
    ("DAL", "Airbus A321"),
    ("UAL", "Boeing 737-900"),
    ("SWA", "Boeing 737-800"),
    ("JBU", "Airbus A320"),
    ("NKS", "Airbus A320neo"),
    ("SKW", "Embraer E175"),
    ("RPA", "Embraer E175"),
    ("ENY", "Embraer E175"),
    ("PDT", "Embraer E145"),
    ("JIA", "Bombardier CRJ900"),
    ("EDV", "Bombardier CRJ900"),
    ("MXY", "Airbus A220-300"),
    ("ACA", "Airbus A220-300"),
    ("JZA", "De Havilland Dash 8-400"),
    ("PTR", "De Havilland Dash 8-400"),
    ("BAW", "Boeing 777-200"),
    ("VIR", "Airbus A330-300"),
    ("EIN", "Airbus A321LR"),
    ("ICE", "Boeing 757-200"),
    ("DLH", "Airbus A340-600"),
    ("AFR", "Boeing 777-300ER"),
    ("KLM", "Boeing 787-9"),
    ("TAP", "Airbus A321neo"),
    ("EJA", "Embraer Phenom 300"),
    ("FDX", "McDonnell Douglas MD-11F"),
    ("UPS", "Boeing 757-200F"),
    ("ABX", "Boeing 767-200F"),
    ("GTI", "Boeing 747-400F"),
    ("KAP", "Cessna 172"),
    ("LXJ", "Bombardier Challenger 300"),
];

/// US civil registrations used as callsigns ("N123AB") are private aircraft.
const PRIVATE_PREFIX: &str = "N";
const PRIVATE_TYPE: &str = "Private Aircraft";

// ---------------------------------------------------------------------------
// Prefix helpers
// ---------------------------------------------------------------------------

/// Uppercased first three characters of a callsign, or fewer if shorter.
pub fn operator_prefix(callsign: &str) -> String {
    callsign
        .trim()
        .chars()
        .take(3)
        .collect::<String>()
        .to_ascii_uppercase()
}

fn is_registration(callsign: &str) -> bool {
    let mut chars = callsign.trim().chars();
    matches!(
        (chars.next(), chars.next()),
        (Some('N' | 'n'), Some(d)) if d.is_ascii_digit()
    )
}

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

/// Merged reference tables.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    airlines: HashMap<String, String>,
    types: HashMap<String, String>,
}

impl Default for ReferenceData {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ReferenceData {
    /// Only the compiled-in tables.
    pub fn builtin() -> Self {
        let to_map = |table: &[(&str, &str)]| {
            table
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>()
        };
        ReferenceData {
            airlines: to_map(AIRLINE_PREFIXES),
            types: to_map(OPERATOR_TYPES),
        }
    }

    /// Merge a JSON object of prefix → airline name over the current table.
    pub fn merge_airlines_json(&mut self, text: &str) -> Result<usize> {
        merge_json(&mut self.airlines, text)
    }

    /// Merge a JSON object of prefix → aircraft type over the current table.
    pub fn merge_types_json(&mut self, text: &str) -> Result<usize> {
        merge_json(&mut self.types, text)
    }

    /// Built-in tables plus whichever of the given files exist and parse.
    ///
    /// A missing or unreadable file is logged and skipped.
    pub fn load(types_path: Option<&Path>, airlines_path: Option<&Path>) -> Self {
        let mut data = Self::builtin();
        if let Some(path) = types_path {
            match read_json_file(path).and_then(|t| data.merge_types_json(&t)) {
                Ok(n) => tracing::info!(path = %path.display(), entries = n, "loaded aircraft types"),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "aircraft types not loaded"),
            }
        }
        if let Some(path) = airlines_path {
            match read_json_file(path).and_then(|t| data.merge_airlines_json(&t)) {
                Ok(n) => tracing::info!(path = %path.display(), entries = n, "loaded airlines"),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "airlines not loaded"),
            }
        }
        data
    }

    /// Carrier name for a callsign.
    pub fn lookup_airline(&self, callsign: &str) -> Option<&str> {
        let prefix = operator_prefix(callsign);
        if prefix.len() < 3 {
            return None;
        }
        self.airlines.get(&prefix).map(String::as_str)
    }

    /// Carrier name, or [`UNKNOWN_CARRIER`].
    pub fn airline_name(&self, callsign: &str) -> &str {
        self.lookup_airline(callsign).unwrap_or(UNKNOWN_CARRIER)
    }

    /// Typical aircraft type for the callsign's operator.
    pub fn lookup_type(&self, callsign: &str) -> Option<&str> {
        let prefix = operator_prefix(callsign);
        if let Some(t) = self.types.get(&prefix) {
            return Some(t);
        }
        if is_registration(callsign) {
            return Some(self.types.get(PRIVATE_PREFIX).map_or(PRIVATE_TYPE, String::as_str));
        }
        None
    }

    /// Aircraft type, or [`UNKNOWN_TYPE`].
    pub fn local_type(&self, callsign: &str) -> &str {
        self.lookup_type(callsign).unwrap_or(UNKNOWN_TYPE)
    }

    pub fn airline_count(&self) -> usize {
        self.airlines.len()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}

fn read_json_file(path: &Path) -> Result<String> {
    Ok(std::fs::read_to_string(path)?)
}

fn merge_json(table: &mut HashMap<String, String>, text: &str) -> Result<usize> {
    let parsed: HashMap<String, serde_json::Value> =
        serde_json::from_str(text).map_err(|e| SkywatchError::Reference(e.to_string()))?;
    let mut merged = 0;
    for (key, value) in parsed {
        // Non-string values (nulls, nested objects) are ignored.
        if let Some(name) = value.as_str().map(str::trim).filter(|s| !s.is_empty()) {
            table.insert(key.trim().to_ascii_uppercase(), name.to_string());
            merged += 1;
        }
    }
    Ok(merged)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
