//! Errors from the external collaborators (OpenSky, Nominatim, files).
//!
//! None of these reach the tracking core: every call site logs them and
//! substitutes a fallback (empty batch, default observer, local dataset).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status: {0}")]
    Status(reqwest::StatusCode),
    #[error("invalid response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no more recorded batches")]
    Exhausted,
}
