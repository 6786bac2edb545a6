//! Observer location: configured coordinates, or a Nominatim address lookup.

use async_trait::async_trait;
use serde::Deserialize;

use skywatch_core::config::DEFAULT_OBSERVER;
use skywatch_core::types::Coordinate;

use crate::error::FetchError;
use crate::opensky::HTTP_TIMEOUT;

pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// Free-text address → coordinate.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, FetchError>;
}

/// OpenStreetMap Nominatim search client.
pub struct NominatimGeocoder {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        // Nominatim's usage policy requires an identifying User-Agent.
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("skywatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(NominatimGeocoder {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, FetchError> {
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }
        let places: Vec<Place> = response.json().await?;
        Ok(first_place(&places))
    }
}

/// First usable result of a Nominatim search response.
fn first_place(places: &[Place]) -> Option<Coordinate> {
    places.iter().find_map(|p| {
        let lat = p.lat.trim().parse().ok()?;
        let lon = p.lon.trim().parse().ok()?;
        Coordinate::checked(lat, lon).ok()
    })
}

/// Pick the observer: explicit coordinates win, then the geocoded
/// address, then [`DEFAULT_OBSERVER`].
pub async fn resolve_observer(
    explicit: Option<Coordinate>,
    address: Option<&str>,
    geocoder: &dyn Geocoder,
) -> Coordinate {
    if let Some(c) = explicit {
        return c;
    }
    let Some(address) = address.map(str::trim).filter(|a| !a.is_empty()) else {
        tracing::warn!(observer = %DEFAULT_OBSERVER, "no observer configured, using default location");
        return DEFAULT_OBSERVER;
    };
    match geocoder.geocode(address).await {
        Ok(Some(c)) => {
            tracing::info!(address, observer = %c, "geocoded observer");
            c
        }
        Ok(None) => {
            tracing::warn!(address, "address not found, using default location");
            DEFAULT_OBSERVER
        }
        Err(e) => {
            tracing::warn!(address, error = %e, "could not geocode address, using default location");
            DEFAULT_OBSERVER
        }
    }
}
