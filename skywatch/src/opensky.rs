//! OpenSky Network REST client for state vectors and aircraft metadata.
//!
//! `GET /states/all?lamin=..&lamax=..&lomin=..&lomax=..` returns rows of
//! positional arrays. Rows are parsed one at a time so a single malformed
//! entry never spoils the rest of the batch.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use skywatch_core::types::{BoundingBox, RawStateVector};

use crate::error::FetchError;

/// Per-request timeout for OpenSky calls.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

// Column indices in a state-vector row.
const COL_ICAO24: usize = 0;
const COL_CALLSIGN: usize = 1;
const COL_ORIGIN_COUNTRY: usize = 2;
const COL_LONGITUDE: usize = 5;
const COL_LATITUDE: usize = 6;
const COL_BARO_ALTITUDE: usize = 7;
const COL_VELOCITY: usize = 9;
const COL_TRUE_TRACK: usize = 10;
const MIN_COLUMNS: usize = 11;

// ---------------------------------------------------------------------------
// State source
// ---------------------------------------------------------------------------

/// Anything that can produce a batch of state vectors for a box.
///
/// Implementations never fail: problems are logged and reported as an
/// empty batch so the cycle still runs.
#[async_trait]
pub trait StateSource: Send + Sync {
    async fn fetch(&self, bbox: &BoundingBox) -> Vec<RawStateVector>;
}

/// OpenSky account credentials (basic auth).
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// HTTP client for the OpenSky REST API.
#[derive(Clone)]
pub struct OpenSkyClient {
    base_url: String,
    credentials: Option<Credentials>,
    client: reqwest::Client,
}

impl OpenSkyClient {
    pub fn new(base_url: &str, credentials: Option<Credentials>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("skywatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(OpenSkyClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            client,
        })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let req = self.client.get(url);
        match &self.credentials {
            Some(c) => req.basic_auth(&c.username, Some(&c.password)),
            None => req,
        }
    }

    /// Fetch all state vectors inside `bbox`.
    pub async fn fetch_states(&self, bbox: &BoundingBox) -> Result<Vec<RawStateVector>, FetchError> {
        let url = states_url(&self.base_url, bbox);
        let response = self.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }
        let response: StatesResponse = response.json().await?;
        Ok(states_batch(response))
    }

    /// Aircraft model for one ICAO address, `None` if OpenSky has nothing useful.
    pub async fn fetch_model(&self, icao24: &str) -> Result<Option<String>, FetchError> {
        let url = format!(
            "{}/metadata/aircraft/icao24/{}",
            self.base_url,
            icao24.to_ascii_lowercase()
        );
        let response = self.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }
        let meta: MetadataResponse = response.json().await?;
        Ok(model_name(meta))
    }
}

#[async_trait]
impl StateSource for OpenSkyClient {
    async fn fetch(&self, bbox: &BoundingBox) -> Vec<RawStateVector> {
        match self.fetch_states(bbox).await {
            Ok(batch) => {
                tracing::debug!(vectors = batch.len(), "fetched state vectors");
                batch
            }
            Err(e) => {
                tracing::warn!(error = %e, "state vector fetch failed, treating as empty batch");
                Vec::new()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct StatesResponse {
    #[allow(dead_code)]
    time: Option<i64>,
    states: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct MetadataResponse {
    model: Option<String>,
}

/// Build the `/states/all` URL for a bounding box.
pub fn states_url(base_url: &str, bbox: &BoundingBox) -> String {
    format!(
        "{}/states/all?lamin={}&lamax={}&lomin={}&lomax={}",
        base_url.trim_end_matches('/'),
        bbox.lat_min,
        bbox.lat_max,
        bbox.lon_min,
        bbox.lon_max
    )
}

/// Parse a `/states/all` response body. `"states": null` is an empty batch.
pub fn parse_states(body: &str) -> Result<Vec<RawStateVector>, FetchError> {
    let response: StatesResponse = serde_json::from_str(body)?;
    Ok(states_batch(response))
}

fn states_batch(response: StatesResponse) -> Vec<RawStateVector> {
    let rows = response.states.unwrap_or_default();
    let total = rows.len();
    let batch: Vec<RawStateVector> = rows.iter().filter_map(parse_row).collect();
    if batch.len() < total {
        tracing::debug!(skipped = total - batch.len(), "skipped malformed state rows");
    }
    batch
}

/// Parse one positional row. Missing or mistyped numeric columns become
/// `None`; a row without an address or with too few columns is rejected.
pub fn parse_row(row: &Value) -> Option<RawStateVector> {
    let cols = row.as_array()?;
    if cols.len() < MIN_COLUMNS {
        return None;
    }
    let icao24 = cols[COL_ICAO24].as_str()?.trim().to_string();
    if icao24.is_empty() {
        return None;
    }
    Some(RawStateVector {
        icao24,
        callsign: cols[COL_CALLSIGN].as_str().map(str::to_string),
        origin_country: cols[COL_ORIGIN_COUNTRY]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        lon: cols[COL_LONGITUDE].as_f64(),
        lat: cols[COL_LATITUDE].as_f64(),
        baro_altitude_m: cols[COL_BARO_ALTITUDE].as_f64(),
        velocity_ms: cols[COL_VELOCITY].as_f64(),
        true_track_deg: cols[COL_TRUE_TRACK].as_f64(),
    })
}

/// Non-blank model from a `/metadata/aircraft/icao24/{id}` response.
fn model_name(meta: MetadataResponse) -> Option<String> {
    meta.model
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
