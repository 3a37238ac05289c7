//! Live telemetry ingest
//!
//! Live snapshots arrive over HTTP at their own pace. The most recent one is
//! parked in a [`LiveSlot`] and read by the tick loop through
//! [`IngestSource`] for as long as it is fresh.

use anyhow::Result;
use pitwall_core::{TelemetrySnapshot, TelemetrySource};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::info;

/// Most recent live snapshot and when it arrived
pub struct LiveSlot {
    latest: Mutex<Option<(Instant, TelemetrySnapshot)>>,
    max_age: Duration,
}

impl LiveSlot {
    pub fn new(max_age: Duration) -> Self {
        Self {
            latest: Mutex::new(None),
            max_age,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<(Instant, TelemetrySnapshot)>> {
        // The slot is only ever replaced whole, so a poisoned lock still holds a valid value
        self.latest.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn publish(&self, snapshot: TelemetrySnapshot) {
        *self.lock() = Some((Instant::now(), snapshot));
    }

    /// The latest snapshot, if it is younger than `max_age`
    pub fn fresh(&self) -> Option<TelemetrySnapshot> {
        self.lock()
            .as_ref()
            .filter(|(at, _)| at.elapsed() <= self.max_age)
            .map(|(_, snapshot)| snapshot.clone())
    }

    pub fn is_fresh(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|(at, _)| at.elapsed() <= self.max_age)
    }

    pub fn age(&self) -> Option<Duration> {
        self.lock().as_ref().map(|(at, _)| at.elapsed())
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }
}

/// Source backed by a [`LiveSlot`]; detected while the slot is fresh
pub struct IngestSource {
    slot: Arc<LiveSlot>,
    active: bool,
}

impl IngestSource {
    pub fn new(slot: Arc<LiveSlot>) -> Self {
        Self {
            slot,
            active: false,
        }
    }
}

impl TelemetrySource for IngestSource {
    fn name(&self) -> &str {
        "Ingest"
    }

    fn detect(&self) -> bool {
        self.slot.is_fresh()
    }

    fn start(&mut self) -> Result<()> {
        self.active = true;
        info!("Live ingest active");
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.active = false;
        Ok(())
    }

    fn read_snapshot(&mut self) -> Result<Option<TelemetrySnapshot>> {
        if !self.active {
            return Ok(None);
        }
        Ok(self.slot.fresh())
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
