//! Aircraft model lookup with a per-address memo cache.
//!
//! Lookups go to OpenSky first; an empty or failed answer falls back to the
//! local operator table and the address is appended to the miss log. Each
//! address is resolved at most once per process: concurrent requests for
//! the same address share one in-flight lookup.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::future::join_all;
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;

use skywatch_core::enrich::UNKNOWN_TYPE;
use skywatch_core::flight::{AircraftMetadata, MetadataSource};
use skywatch_core::types::{icao_to_string, Icao};
use skywatch_core::ReferenceData;

use crate::error::FetchError;
use crate::opensky::OpenSkyClient;

// ---------------------------------------------------------------------------
// Lookup backends
// ---------------------------------------------------------------------------

/// Remote per-airframe model lookup.
#[async_trait]
pub trait AircraftLookup: Send + Sync {
    async fn model(&self, icao: &Icao) -> Result<Option<String>, FetchError>;
}

#[async_trait]
impl AircraftLookup for OpenSkyClient {
    async fn model(&self, icao: &Icao) -> Result<Option<String>, FetchError> {
        self.fetch_model(&icao_to_string(icao)).await
    }
}

/// Lookup that never reaches the network; everything comes from local data.
pub struct OfflineLookup;

#[async_trait]
impl AircraftLookup for OfflineLookup {
    async fn model(&self, _icao: &Icao) -> Result<Option<String>, FetchError> {
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Miss log
// ---------------------------------------------------------------------------

/// Append-only file of addresses OpenSky had no model for.
#[derive(Debug, Clone)]
pub struct MissLog {
    path: Option<PathBuf>,
}

impl MissLog {
    pub fn new(path: Option<PathBuf>) -> Self {
        MissLog { path }
    }

    pub fn disabled() -> Self {
        MissLog { path: None }
    }

    pub async fn record(&self, icao: &Icao) {
        let Some(path) = &self.path else {
            return;
        };
        let line = format!("{}\n", icao_to_string(icao).to_ascii_lowercase());
        let result = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await?;
            file.write_all(line.as_bytes()).await
        }
        .await;
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "could not append to miss log");
        }
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

type Slot = Arc<OnceCell<AircraftMetadata>>;

/// Memoizing, coalescing metadata resolver.
pub struct MetadataResolver<L: AircraftLookup> {
    lookup: L,
    reference: Arc<ReferenceData>,
    misses: MissLog,
    capacity: usize,
    cache: Mutex<HashMap<Icao, Slot>>,
    remote_lookups: AtomicU64,
}

impl<L: AircraftLookup> MetadataResolver<L> {
    pub fn new(lookup: L, reference: Arc<ReferenceData>, misses: MissLog, capacity: usize) -> Self {
        MetadataResolver {
            lookup,
            reference,
            misses,
            capacity,
            cache: Mutex::new(HashMap::new()),
            remote_lookups: AtomicU64::new(0),
        }
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    /// Number of calls made to the remote lookup so far.
    pub fn remote_lookups(&self) -> u64 {
        self.remote_lookups.load(Ordering::Relaxed)
    }

    pub fn cached(&self) -> usize {
        self.slots().len()
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, HashMap<Icao, Slot>> {
        // The map holds no invariants a panicking holder could break.
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Model for `icao`, resolving it on first use.
    pub async fn resolve(&self, icao: Icao, callsign: Option<&str>) -> AircraftMetadata {
        let slot = self.slots().entry(icao).or_default().clone();
        slot.get_or_init(|| self.lookup_uncached(icao, callsign))
            .await
            .clone()
    }

    /// Resolve many addresses concurrently; order matches the input.
    pub async fn resolve_all(
        &self,
        requests: &[(Icao, Option<String>)],
    ) -> Vec<(Icao, AircraftMetadata)> {
        join_all(requests.iter().map(|(icao, callsign)| async move {
            (*icao, self.resolve(*icao, callsign.as_deref()).await)
        }))
        .await
    }

    /// Carrier name from the local table.
    pub fn airline(&self, callsign: Option<&str>) -> String {
        self.reference.airline_name(callsign.unwrap_or_default()).to_string()
    }

    /// Drop cached entries for inactive aircraft once the cache is over capacity.
    pub fn prune(&self, active: &HashSet<Icao>) -> usize {
        let mut slots = self.slots();
        if slots.len() <= self.capacity {
            return 0;
        }
        let before = slots.len();
        slots.retain(|icao, _| active.contains(icao));
        let removed = before - slots.len();
        tracing::debug!(removed, remaining = slots.len(), "pruned metadata cache");
        removed
    }

    async fn lookup_uncached(&self, icao: Icao, callsign: Option<&str>) -> AircraftMetadata {
        self.remote_lookups.fetch_add(1, Ordering::Relaxed);
        let remote = match self.lookup.model(&icao).await {
            Ok(model) => model,
            Err(e) => {
                tracing::debug!(icao = %icao_to_string(&icao), error = %e, "metadata lookup failed");
                None
            }
        };

        if let Some(model) = remote {
            return AircraftMetadata {
                model,
                source: MetadataSource::OpenSky,
            };
        }

        self.misses.record(&icao).await;
        let model = callsign
            .map(|cs| self.reference.local_type(cs))
            .unwrap_or(UNKNOWN_TYPE)
            .to_string();
        AircraftMetadata {
            model,
            source: MetadataSource::LocalDataset,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
