//! The polling loop: fetch → ingest → enrich → render → sleep.
//!
//! One cycle runs to completion before the next starts, so the session has
//! a single writer and the renderer always sees a complete state.

use std::collections::HashSet;
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::Tz;

use skywatch_core::session::{CycleReport, TrackingSession};
use skywatch_core::types::{icao_to_string, BoundingBox, Icao, RawStateVector};

use crate::error::FetchError;
use crate::metadata::{AircraftLookup, MetadataResolver};
use crate::opensky::{self, StateSource};
use crate::render::{self, CycleView, CLEAR_SCREEN};
use crate::tz::format_timestamp;

// ---------------------------------------------------------------------------
// Replay source
// ---------------------------------------------------------------------------

/// Recorded `/states/all` responses played back one per cycle.
pub struct ReplaySource {
    batches: Mutex<std::vec::IntoIter<Vec<RawStateVector>>>,
}

impl ReplaySource {
    pub fn new(batches: Vec<Vec<RawStateVector>>) -> Self {
        ReplaySource {
            batches: Mutex::new(batches.into_iter()),
        }
    }

    /// Read a file with one JSON response per line. Unparseable lines
    /// become empty batches, like a failed fetch would.
    pub fn from_file(path: &Path) -> Result<Self, FetchError> {
        let file = std::fs::File::open(path)?;
        let mut batches = Vec::new();
        for (n, line) in std::io::BufReader::new(file).lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match opensky::parse_states(line) {
                Ok(batch) => batches.push(batch),
                Err(e) => {
                    tracing::warn!(line = n + 1, error = %e, "unreadable recorded batch");
                    batches.push(Vec::new());
                }
            }
        }
        Ok(Self::new(batches))
    }

    pub fn remaining(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, std::vec::IntoIter<Vec<RawStateVector>>> {
        self.batches.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl StateSource for ReplaySource {
    /// Next recorded batch, cut to `bbox` the way the live API filters it.
    async fn fetch(&self, bbox: &BoundingBox) -> Vec<RawStateVector> {
        let mut batch = self.lock().next().unwrap_or_default();
        batch.retain(|sv| sv.position().is_some_and(|p| bbox.contains(p)));
        batch
    }
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

/// Output options for the loop.
#[derive(Debug, Clone)]
pub struct PollOptions {
    pub interval: Duration,
    /// Stop after this many cycles.
    pub max_cycles: Option<u64>,
    pub clear_screen: bool,
    pub color: bool,
    /// One JSON object per cycle instead of the table.
    pub json: bool,
}

/// Drives a [`TrackingSession`] from a [`StateSource`].
pub struct Poller<S: StateSource, L: AircraftLookup> {
    session: TrackingSession,
    source: S,
    metadata: MetadataResolver<L>,
    tz: Tz,
    options: PollOptions,
}

impl<S: StateSource, L: AircraftLookup> Poller<S, L> {
    pub fn new(
        session: TrackingSession,
        source: S,
        metadata: MetadataResolver<L>,
        tz: Tz,
        options: PollOptions,
    ) -> Self {
        Poller {
            session,
            source,
            metadata,
            tz,
            options,
        }
    }

    pub fn session(&self) -> &TrackingSession {
        &self.session
    }

    /// Fetch one batch, ingest it, and attach metadata to active records.
    pub async fn cycle(&mut self) -> CycleReport {
        let bbox = self.session.config().bounding_box();
        let batch = self.source.fetch(&bbox).await;
        let report = self.session.ingest(&batch);

        for a in &report.arrivals {
            tracing::info!(
                icao = %icao_to_string(&a.icao),
                callsign = a.callsign.as_deref().unwrap_or("N/A"),
                distance_mi = a.distance_mi,
                "arrival"
            );
        }
        for icao in &report.departures {
            tracing::info!(icao = %icao_to_string(icao), "departure");
        }
        if report.is_quiet() {
            tracing::debug!(cycle = self.session.cycles, "no arrivals or departures");
        }

        self.enrich().await;
        report
    }

    async fn enrich(&mut self) {
        let requests: Vec<(Icao, Option<String>)> = self
            .session
            .active()
            .values()
            .filter(|r| r.aircraft.is_none())
            .map(|r| (r.icao, r.callsign.clone()))
            .collect();

        if !requests.is_empty() {
            let resolved = self.metadata.resolve_all(&requests).await;
            for ((icao, meta), (_, callsign)) in resolved.into_iter().zip(&requests) {
                let airline = self.metadata.airline(callsign.as_deref());
                self.session.set_metadata(&icao, meta, airline);
            }
        }

        let active: HashSet<Icao> = self.session.active().keys().copied().collect();
        self.metadata.prune(&active);
    }

    /// Render the current state after a cycle.
    pub fn render<W: Write>(&self, out: &mut W, report: &CycleReport) -> std::io::Result<()> {
        let view = CycleView {
            timestamp: format_timestamp(Utc::now(), self.tz),
            radius_mi: self.session.config().radius_mi,
            active: self.session.len(),
            report,
            flights: self.session.render_list(),
        };
        if self.options.json {
            return render::render_json(out, &view);
        }
        if self.options.clear_screen {
            write!(out, "{CLEAR_SCREEN}")?;
        }
        render::render(out, &view, self.options.color)
    }

    /// Run until ctrl-c, `max_cycles`, or a render error.
    pub async fn run(mut self) -> std::io::Result<()> {
        let mut interval = tokio::time::interval(self.options.interval.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("interrupted, exiting");
                    break;
                }
                _ = interval.tick() => {}
            }

            let report = self.cycle().await;
            self.render(&mut std::io::stdout().lock(), &report)?;

            if self
                .options
                .max_cycles
                .is_some_and(|max| self.session.cycles >= max)
            {
                break;
            }
        }

        tracing::info!(
            cycles = self.session.cycles,
            vectors = self.session.vectors_seen,
            skipped = self.session.vectors_skipped,
            out_of_range = self.session.vectors_out_of_range,
            metadata_lookups = self.metadata.remote_lookups(),
            "session finished"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
