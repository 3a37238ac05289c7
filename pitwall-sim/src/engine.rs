//! Per-tick pipeline: generate, arbitrate, classify, buffer

use crate::simulator::TelemetrySimulator;
use pitwall_core::jitter::JitterSource;
use pitwall_core::status::StatusReport;
use pitwall_core::{Arbiter, ArbitrationPolicy, FieldSources, HistoryBuffer, Metric, TelemetrySnapshot};
use tracing::debug;

/// Output of one tick
#[derive(Debug, Clone)]
pub struct Tick {
    /// Merged snapshot with status attached
    pub snapshot: TelemetrySnapshot,
    /// Origin of every populated field
    pub sources: FieldSources,
}

pub struct TelemetryEngine<J: JitterSource> {
    simulator: TelemetrySimulator<J>,
    policy: ArbitrationPolicy,
    history: HistoryBuffer,
    tracked: Vec<Metric>,
    ticks: u64,
}

impl<J: JitterSource> TelemetryEngine<J> {
    /// Engine that records every metric into `history`
    pub fn new(simulator: TelemetrySimulator<J>, policy: ArbitrationPolicy, history: HistoryBuffer) -> Self {
        Self {
            simulator,
            policy,
            history,
            tracked: Metric::all(),
            ticks: 0,
        }
    }

    pub fn with_tracked_metrics(mut self, tracked: Vec<Metric>) -> Self {
        self.tracked = tracked;
        self
    }

    pub fn policy(&self) -> ArbitrationPolicy {
        self.policy
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn tracked_metrics(&self) -> &[Metric] {
        &self.tracked
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn simulator(&self) -> &TelemetrySimulator<J> {
        &self.simulator
    }

    pub fn simulator_mut(&mut self) -> &mut TelemetrySimulator<J> {
        &mut self.simulator
    }

    /// Run one tick at the simulator clock's current time
    pub fn tick(&mut self, live: Option<&TelemetrySnapshot>) -> Tick {
        let synthetic = self.simulator.generate();
        self.finish(live, synthetic)
    }

    /// Run one tick at an explicit simulation time
    pub fn tick_at(&mut self, t: f64, live: Option<&TelemetrySnapshot>) -> Tick {
        let synthetic = self.simulator.generate_at(t);
        self.finish(live, synthetic)
    }

    fn finish(&mut self, live: Option<&TelemetrySnapshot>, synthetic: TelemetrySnapshot) -> Tick {
        let mut arbiter = Arbiter::new(self.policy);
        let mut snapshot = arbiter.merge(live, synthetic);
        snapshot.status = Some(StatusReport::evaluate(&snapshot));

        self.history.record(&snapshot, &self.tracked);
        self.ticks += 1;

        let sources = arbiter.into_sources();
        debug!(
            tick = self.ticks,
            live_fields = sources.live_count(),
            synthetic_fields = sources.synthetic_count(),
            "Tick complete"
        );

        Tick { snapshot, sources }
    }
}
