//! Application state management

use crate::config::{ConfigError, ServerConfig};
use crate::ingest::LiveSlot;
use crate::recorder::SessionRecorder;
use pitwall_core::jitter::{EntropyJitter, JitterSource, SeededJitter};
use pitwall_core::{FieldSources, SimulationClock, TelemetrySnapshot, TelemetrySource};
use pitwall_sim::{TelemetryEngine, TelemetrySimulator};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

/// Tick pipeline as held by the server
pub type Engine = TelemetryEngine<Box<dyn JitterSource>>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// All registered live sources, in priority order
    pub sources: Arc<RwLock<Vec<Box<dyn TelemetrySource>>>>,

    /// Name of the currently active source
    pub active_source: Arc<RwLock<Option<String>>>,

    /// Broadcast channel for published snapshots
    /// Multiple consumers can subscribe to receive them
    pub telemetry_tx: broadcast::Sender<TelemetrySnapshot>,

    /// Most recent published snapshot
    pub latest: Arc<RwLock<Option<TelemetrySnapshot>>>,

    /// Field origins of the most recent snapshot
    pub field_sources: Arc<RwLock<FieldSources>>,

    pub engine: Arc<Mutex<Engine>>,

    /// Parking spot for snapshots posted to the ingest endpoint
    pub live: Arc<LiveSlot>,

    pub recorder: Arc<Mutex<Option<SessionRecorder>>>,

    pub config: Arc<ServerConfig>,

    /// Stops the tick loop
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let jitter: Box<dyn JitterSource> = match config.seed {
            Some(seed) => Box::new(SeededJitter::new(seed)),
            None => Box::new(EntropyJitter::new()),
        };
        let simulator = TelemetrySimulator::with_jitter(SimulationClock::wall(), jitter)
            .with_cell_count(config.cell_count)
            .with_power_map(config.power_map)?;
        let engine = TelemetryEngine::new(simulator, config.policy, config.build_history()?)
            .with_tracked_metrics(config.tracked_metrics());

        // Create broadcast channel with capacity for 100 snapshots
        let (telemetry_tx, _) = broadcast::channel(100);

        Ok(Self {
            sources: Arc::new(RwLock::new(Vec::new())),
            active_source: Arc::new(RwLock::new(None)),
            telemetry_tx,
            latest: Arc::new(RwLock::new(None)),
            field_sources: Arc::new(RwLock::new(FieldSources::default())),
            engine: Arc::new(Mutex::new(engine)),
            live: Arc::new(LiveSlot::new(config.live_max_age())),
            recorder: Arc::new(Mutex::new(None)),
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
        })
    }

    /// Register a live source. Earlier registrations win when several are detected.
    pub async fn register_source(&self, source: Box<dyn TelemetrySource>) {
        let mut sources = self.sources.write().await;
        sources.push(source);
    }

    pub async fn set_recorder(&self, recorder: SessionRecorder) {
        *self.recorder.lock().await = Some(recorder);
    }

    /// Subscribe to published snapshots
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetrySnapshot> {
        self.telemetry_tx.subscribe()
    }
}
