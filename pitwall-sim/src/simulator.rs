//! Synthetic telemetry source
//!
//! Produces a full snapshot from the closed-form generators. Thermal signals
//! carry over from the previous snapshot, so successive snapshots heat and
//! cool smoothly instead of jumping to their targets.
//!
//! The simulator also owns the [`Strategy`] state. A power map shapes the
//! motor output and a pit stop starts a new stint on a full battery with
//! fresh tyres.

use crate::generators::{self, DriverLoad, DEFAULT_CELL_COUNT};
use crate::strategy::{Strategy, StrategyError, StrategyStatus, FRESH_TIRE_TEMPERATURE};
use anyhow::Result;
use chrono::Utc;
use pitwall_core::jitter::{EntropyJitter, JitterSource};
use pitwall_core::model::{Corners, TelemetrySnapshot, TireCorner};
use pitwall_core::units::{Celsius, Seconds};
use pitwall_core::{SimulationClock, TelemetrySource};
use tracing::{debug, info};

pub struct TelemetrySimulator<J = EntropyJitter> {
    active: bool,
    clock: SimulationClock,
    jitter: J,
    cell_count: usize,
    previous: Option<TelemetrySnapshot>,
    frame_count: u64,
    strategy: Strategy,
}

impl TelemetrySimulator<EntropyJitter> {
    /// Wall-clock simulator with entropy-seeded jitter
    pub fn new() -> Self {
        Self::with_jitter(SimulationClock::wall(), EntropyJitter::new())
    }
}

impl Default for TelemetrySimulator<EntropyJitter> {
    fn default() -> Self {
        Self::new()
    }
}

impl<J: JitterSource> TelemetrySimulator<J> {
    pub fn with_jitter(clock: SimulationClock, jitter: J) -> Self {
        Self {
            active: false,
            clock,
            jitter,
            cell_count: DEFAULT_CELL_COUNT,
            previous: None,
            frame_count: 0,
            strategy: Strategy::default(),
        }
    }

    pub fn with_cell_count(mut self, cell_count: usize) -> Self {
        self.cell_count = cell_count;
        self
    }

    pub fn cell_count(&self) -> usize {
        self.cell_count
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut SimulationClock {
        &mut self.clock
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Start with a power map selected
    pub fn with_power_map(mut self, id: Option<u8>) -> Result<Self, StrategyError> {
        self.strategy.set_power_map(id)?;
        Ok(self)
    }

    pub fn set_power_map(&mut self, id: Option<u8>) -> Result<(), StrategyError> {
        self.strategy.set_power_map(id)?;
        info!(
            power_map = ?self.strategy.power_map().map(|m| m.name),
            "Power map selected"
        );
        Ok(())
    }

    pub fn activate_attack_mode(&mut self) -> Result<(), StrategyError> {
        let t = self.clock.now().0;
        self.strategy.activate_attack_mode(t)?;
        info!(t, "Attack mode activated");
        Ok(())
    }

    /// Pit stop at the clock's current time
    pub fn pit_stop(&mut self) {
        let t = self.clock.now().0;
        self.pit_stop_at(t);
    }

    /// Recharge the battery and fit fresh tyres at `t`
    pub fn pit_stop_at(&mut self, t: f64) {
        self.strategy.pit_stop(t);
        let corners = self
            .previous
            .as_mut()
            .and_then(|s| s.tires.as_mut())
            .and_then(|tires| tires.corners.as_mut());
        if let Some(corners) = corners {
            let fresh = Corners::from_fn(|corner| TireCorner {
                temperature: Some(Celsius(FRESH_TIRE_TEMPERATURE)),
                ..corners.at(corner)
            });
            *corners = fresh;
        }
        info!(t, pit_stops = self.strategy.status(t).pit_stops, "Pit stop");
    }

    pub fn strategy(&self) -> StrategyStatus {
        self.strategy.status(self.clock.now().0)
    }

    /// Forget thermal and strategy timing state
    pub fn reset(&mut self) {
        self.previous = None;
        self.frame_count = 0;
        self.strategy.restart();
    }

    /// Snapshot at the clock's current time
    pub fn generate(&mut self) -> TelemetrySnapshot {
        let t = self.clock.now().0;
        self.generate_at(t)
    }

    /// Snapshot at an explicit simulation time
    pub fn generate_at(&mut self, t: f64) -> TelemetrySnapshot {
        self.frame_count += 1;
        self.strategy.update(t);
        let stint = self.strategy.stint_time(t);
        let power_map = self.strategy.power_map();
        let jitter: &mut dyn JitterSource = &mut self.jitter;
        let prev = self.previous.as_ref();

        let motor = generators::motor(t, power_map.as_ref(), prev.and_then(|s| s.motor.as_ref()), jitter);
        let battery = generators::battery(t, stint, prev.and_then(|s| s.battery.as_ref()), jitter);
        let soc = battery.soc.map(|s| s.0).unwrap_or_default();
        let cells = generators::cells(soc, self.cell_count, jitter);
        let chassis = generators::chassis(t, prev.and_then(|s| s.chassis.as_ref()), jitter);
        let speed = chassis.speed.map(|s| s.0).unwrap_or_default();
        let brake_pedal = chassis.brake.map(|b| b.0).unwrap_or_default();
        let brakes = generators::brakes(t, brake_pedal, prev.and_then(|s| s.brakes.as_ref()), jitter);
        let tires = generators::tires(t, stint, speed, prev.and_then(|s| s.tires.as_ref()), jitter);
        let aero = generators::aero(speed, jitter);

        let load = DriverLoad::sample(t, jitter);
        let biosignals = generators::biosignals(t, load, jitter);
        let emotional_state = generators::emotional_state(t, load, jitter);

        let snapshot = TelemetrySnapshot {
            timestamp: Utc::now(),
            source: "simulator".to_string(),
            sim_time: Seconds(t),
            motor: Some(motor),
            battery: Some(battery),
            chassis: Some(chassis),
            brakes: Some(brakes),
            tires: Some(tires),
            aero: Some(aero),
            cell_monitoring: Some(cells),
            biosignals: Some(biosignals),
            emotional_state: Some(emotional_state),
            status: None,
        };

        if self.frame_count % 600 == 1 {
            debug!(t, frame = self.frame_count, "Generated synthetic snapshot");
        }

        self.previous = Some(snapshot.clone());
        snapshot
    }
}

impl<J: JitterSource + Sync> TelemetrySource for TelemetrySimulator<J> {
    fn name(&self) -> &str {
        "Simulator"
    }

    fn detect(&self) -> bool {
        true
    }

    fn start(&mut self) -> Result<()> {
        self.active = true;
        if !self.clock.is_manual() {
            self.clock = SimulationClock::wall();
        }
        self.reset();
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

        Ok(Some(self.generate()))
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
