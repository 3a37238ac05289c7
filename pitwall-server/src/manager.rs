//! Tick loop and source lifecycle
//!
//! This module handles:
//! - Registering the configured live sources
//! - Polling sources for detection and starting/stopping them
//! - Running the tick pipeline against the active source's data
//! - Publishing each snapshot to subscribers and the session recorder

use crate::ingest::IngestSource;
use crate::recorder::SessionRecorder;
use crate::state::AppState;
use anyhow::Result;
use pitwall_core::{FieldMask, TelemetrySnapshot};
use pitwall_sim::DatalogReplay;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

pub const DETECTION_INTERVAL: Duration = Duration::from_secs(1);

/// Rate limit for detection checks
#[derive(Debug, Default)]
pub struct DetectionTimer {
    last_check: Option<Instant>,
}

impl DetectionTimer {
    /// True at most once per [`DETECTION_INTERVAL`]
    pub fn due(&mut self) -> bool {
        match self.last_check {
            Some(last) if last.elapsed() < DETECTION_INTERVAL => false,
            _ => {
                self.last_check = Some(Instant::now());
                true
            }
        }
    }
}

/// Register the ingest source, plus the datalog and recorder if configured
pub async fn register_default_sources(state: &AppState) -> Result<()> {
    state
        .register_source(Box::new(IngestSource::new(state.live.clone())))
        .await;

    if let Some(path) = &state.config.datalog {
        let replay = DatalogReplay::from_path(path)?;
        state.register_source(Box::new(replay)).await;
    }

    if let Some(path) = &state.config.record {
        let mask = state.config.record_fields.as_deref().map(FieldMask::parse);
        state.set_recorder(SessionRecorder::create(path, mask)?).await;
    }

    Ok(())
}

/// Main tick loop; returns once `state.shutdown` is cancelled
pub async fn run(state: AppState) {
    let mut interval = tokio::time::interval(state.config.tick_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut detection = DetectionTimer::default();

    info!(
        tick_ms = state.config.tick_interval_ms,
        policy = %state.config.policy,
        "Tick loop started"
    );

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => break,
            _ = interval.tick() => {}
        }

        if let Err(e) = cycle(&state, detection.due()).await {
            error!("Error in tick cycle: {}", e);
        }
    }

    if let Some(recorder) = state.recorder.lock().await.as_mut() {
        if let Err(e) = recorder.flush() {
            warn!("Failed to flush recording: {}", e);
        }
    }
    info!("Tick loop stopped");
}

/// One tick: optional detection pass, read live data, run the pipeline, publish
pub async fn cycle(state: &AppState, detect: bool) -> Result<TelemetrySnapshot> {
    if detect {
        detection_cycle(state).await?;
    }

    let live = read_live(state).await;

    let tick = {
        let mut engine = state.engine.lock().await;
        engine.tick(live.as_ref())
    };

    *state.latest.write().await = Some(tick.snapshot.clone());
    *state.field_sources.write().await = tick.sources;

    if let Some(recorder) = state.recorder.lock().await.as_mut() {
        if let Err(e) = recorder.record(&tick.snapshot) {
            warn!("Failed to record snapshot: {}", e);
        }
    }

    // Ignore error if no receivers (they'll get the next snapshot)
    let _ = state.telemetry_tx.send(tick.snapshot.clone());

    Ok(tick.snapshot)
}

/// Check all sources for detection
///
/// Registration order is priority: a detected source registered ahead of the
/// active one takes over from it.
async fn detection_cycle(state: &AppState) -> Result<()> {
    let mut sources = state.sources.write().await;
    let mut active_source = state.active_source.write().await;

    let mut current = active_source
        .as_deref()
        .and_then(|name| sources.iter().position(|s| s.name() == name));

    // If we have an active source, check if it's still detected
    if let Some(idx) = current {
        let source = &mut sources[idx];
        if !source.detect() {
            info!("Source {} no longer detected, stopping", source.name());
            if let Err(e) = source.stop() {
                error!("Error stopping source {}: {}", source.name(), e);
            }
            *active_source = None;
            current = None;
        }
    }

    // Look for a detected source ahead of the active one
    let candidates = current.unwrap_or(sources.len());
    for idx in 0..candidates {
        if !sources[idx].detect() || sources[idx].is_active() {
            continue;
        }

        let name = sources[idx].name().to_string();
        info!("Source {} detected, starting", name);
        if let Err(e) = sources[idx].start() {
            error!("Failed to start source {}: {}", name, e);
            continue;
        }

        if let Some(prev) = current {
            let previous = &mut sources[prev];
            info!("Source {} takes over from {}", name, previous.name());
            if let Err(e) = previous.stop() {
                error!("Error stopping source {}: {}", previous.name(), e);
            }
        }
        *active_source = Some(name);
        break;
    }

    Ok(())
}

/// Read from the active source, if any
async fn read_live(state: &AppState) -> Option<TelemetrySnapshot> {
    let active_name = state.active_source.read().await.clone()?;
    let mut sources = state.sources.write().await;
    let source = sources.iter_mut().find(|s| s.name() == active_name)?;

    match source.read_snapshot() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Error reading from {}: {}", active_name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_timer_rate_limits() {
        let mut timer = DetectionTimer::default();
        assert!(timer.due());
        assert!(!timer.due());
    }
}
