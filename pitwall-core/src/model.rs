//! Unified telemetry data model
//!
//! Defines the TelemetrySnapshot structure produced once per tick.
//! Every section and every scalar is an `Option`: a live snapshot is usually
//! partial, and "absent" must stay distinguishable from a reading of zero.

use crate::metric::{Corner, Metric};
use crate::status::StatusReport;
use crate::units::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// Complete telemetry snapshot for one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySnapshot {
    /// Wall-clock time the snapshot was produced
    pub timestamp: DateTime<Utc>,

    /// Producer label ("simulator", "ingest", "datalog", "merged")
    pub source: String,

    /// Simulation time the synthetic values were sampled at
    pub sim_time: Seconds,

    pub motor: Option<MotorReading>,
    pub battery: Option<BatteryReading>,
    pub chassis: Option<ChassisReading>,
    pub brakes: Option<BrakeReading>,
    pub tires: Option<TireReading>,
    pub aero: Option<AeroReading>,
    pub cell_monitoring: Option<CellMonitoring>,
    pub biosignals: Option<Biosignals>,
    pub emotional_state: Option<EmotionalState>,

    /// Subsystem health, filled in after arbitration
    pub status: Option<StatusReport>,
}

impl TelemetrySnapshot {
    /// Empty snapshot with every section absent
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            source: source.into(),
            sim_time: Seconds(0.0),
            motor: None,
            battery: None,
            chassis: None,
            brakes: None,
            tires: None,
            aero: None,
            cell_monitoring: None,
            biosignals: None,
            emotional_state: None,
            status: None,
        }
    }

    /// Read a single scalar signal, if present
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::MotorRpm => self.motor.as_ref()?.rpm.map(|v| v.0),
            Metric::MotorTorque => self.motor.as_ref()?.torque.map(|v| v.0),
            Metric::MotorPower => self.motor.as_ref()?.power.map(|v| v.0),
            Metric::MotorTemperature => self.motor.as_ref()?.temperature.map(|v| v.0),
            Metric::MotorEfficiency => self.motor.as_ref()?.efficiency.map(|v| v.0),
            Metric::BatterySoc => self.battery.as_ref()?.soc.map(|v| v.0),
            Metric::BatteryVoltage => self.battery.as_ref()?.voltage.map(|v| v.0),
            Metric::BatteryCurrent => self.battery.as_ref()?.current.map(|v| v.0),
            Metric::BatteryTemperature => self.battery.as_ref()?.temperature.map(|v| v.0),
            Metric::Speed => self.chassis.as_ref()?.speed.map(|v| v.0),
            Metric::LateralG => self.chassis.as_ref()?.g_force.as_ref()?.lateral.map(|v| v.0),
            Metric::LongitudinalG => self
                .chassis
                .as_ref()?
                .g_force
                .as_ref()?
                .longitudinal
                .map(|v| v.0),
            Metric::SteeringAngle => self.chassis.as_ref()?.steering_angle.map(|v| v.0),
            Metric::Throttle => self.chassis.as_ref()?.throttle.map(|v| v.0),
            Metric::Brake => self.chassis.as_ref()?.brake.map(|v| v.0),
            Metric::SuspensionTravel(c) => self
                .chassis
                .as_ref()?
                .suspension
                .as_ref()?
                .get(c)
                .travel
                .map(|v| v.0),
            Metric::SuspensionVelocity(c) => self
                .chassis
                .as_ref()?
                .suspension
                .as_ref()?
                .get(c)
                .velocity
                .map(|v| v.0),
            Metric::BrakeTemperature(c) => self
                .brakes
                .as_ref()?
                .temperatures
                .as_ref()?
                .at(c)
                .map(|v| v.0),
            Metric::BrakePressure => self.brakes.as_ref()?.pressure.map(|v| v.0),
            Metric::BrakeBias => self.brakes.as_ref()?.bias.map(|v| v.0),
            Metric::TireTemperature(c) => self
                .tires
                .as_ref()?
                .corners
                .as_ref()?
                .get(c)
                .temperature
                .map(|v| v.0),
            Metric::TirePressure(c) => self
                .tires
                .as_ref()?
                .corners
                .as_ref()?
                .get(c)
                .pressure
                .map(|v| v.0),
            Metric::TireWear(c) => self
                .tires
                .as_ref()?
                .corners
                .as_ref()?
                .get(c)
                .wear
                .map(|v| v.0),
            Metric::Downforce => self.aero.as_ref()?.downforce.map(|v| v.0),
            Metric::Drag => self.aero.as_ref()?.drag.map(|v| v.0),
            Metric::CellVoltage => self.cell_monitoring.as_ref()?.mean_voltage().map(|v| v.0),
            Metric::HeartRate => self.biosignals.as_ref()?.heart_rate.map(|v| v.0),
            Metric::HrvRmssd => self.biosignals.as_ref()?.hrv_rmssd.map(|v| v.0),
            Metric::Ecg => self.biosignals.as_ref()?.ecg.map(|v| v.0),
            Metric::SkinConductance => self.biosignals.as_ref()?.skin_conductance.map(|v| v.0),
            Metric::RespirationRate => self.biosignals.as_ref()?.respiration_rate.map(|v| v.0),
            Metric::Spo2 => self.biosignals.as_ref()?.spo2.map(|v| v.0),
            Metric::SkinTemperature => self.biosignals.as_ref()?.skin_temperature.map(|v| v.0),
            Metric::Stress => self.emotional_state.as_ref()?.stress.map(|v| v.0),
            Metric::Focus => self.emotional_state.as_ref()?.focus.map(|v| v.0),
            Metric::Fatigue => self.emotional_state.as_ref()?.fatigue.map(|v| v.0),
            Metric::Alertness => self.emotional_state.as_ref()?.alertness.map(|v| v.0),
            Metric::FlowState => self.emotional_state.as_ref()?.flow_state.map(|v| v.0),
            Metric::Readiness => self.emotional_state.as_ref()?.overall_readiness.map(|v| v.0),
        }
    }
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self::new("")
    }
}

/// Per-corner values (Front-Left, Front-Right, Rear-Left, Rear-Right)
///
/// Corners missing from a partial JSON object deserialize as `T::default()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Corners<T> {
    pub front_left: T,
    pub front_right: T,
    pub rear_left: T,
    pub rear_right: T,
}

impl<T: Copy> Corners<T> {
    pub fn at(&self, corner: Corner) -> T {
        *self.get(corner)
    }
}

impl<T> Corners<T> {
    /// Build by evaluating `f` for every corner
    pub fn from_fn(mut f: impl FnMut(Corner) -> T) -> Self {
        Self {
            front_left: f(Corner::FrontLeft),
            front_right: f(Corner::FrontRight),
            rear_left: f(Corner::RearLeft),
            rear_right: f(Corner::RearRight),
        }
    }

    pub fn get(&self, corner: Corner) -> &T {
        match corner {
            Corner::FrontLeft => &self.front_left,
            Corner::FrontRight => &self.front_right,
            Corner::RearLeft => &self.rear_left,
            Corner::RearRight => &self.rear_right,
        }
    }

    pub fn all(&self) -> [&T; 4] {
        [
            &self.front_left,
            &self.front_right,
            &self.rear_left,
            &self.rear_right,
        ]
    }
}

/// Electric motor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorReading {
    pub rpm: Option<Rpm>,
    pub torque: Option<NewtonMeters>,
    /// Mechanical output power, `rpm * torque / 9549`
    pub power: Option<Kilowatts>,
    pub temperature: Option<Celsius>,
    pub efficiency: Option<Percent>,
}

/// Traction battery pack
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryReading {
    /// State of charge (0-100)
    pub soc: Option<Percent>,
    pub voltage: Option<Volts>,
    pub current: Option<Amperes>,
    pub temperature: Option<Celsius>,
}

/// Combined lateral/longitudinal acceleration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GForceVector {
    /// Positive = right
    pub lateral: Option<GForce>,
    /// Positive = accelerating
    pub longitudinal: Option<GForce>,
}

impl GForceVector {
    pub fn magnitude(&self) -> Option<f64> {
        Some(self.lateral?.0.hypot(self.longitudinal?.0))
    }
}

/// Suspension state at one corner
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuspensionCorner {
    pub travel: Option<Millimeters>,
    pub velocity: Option<MillimetersPerSecond>,
}

/// Chassis dynamics and driver inputs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChassisReading {
    pub speed: Option<KilometersPerHour>,
    pub g_force: Option<GForceVector>,
    /// Positive = right turn
    pub steering_angle: Option<Degrees>,
    pub throttle: Option<Percent>,
    pub brake: Option<Percent>,
    pub suspension: Option<Corners<SuspensionCorner>>,
}

/// Brake system
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrakeReading {
    pub temperatures: Option<Corners<Option<Celsius>>>,
    pub pressure: Option<Bar>,
    /// Front share of braking force
    pub bias: Option<Percent>,
}

/// One tyre
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TireCorner {
    pub temperature: Option<Celsius>,
    pub pressure: Option<Bar>,
    /// Remaining tread (100 = new)
    pub wear: Option<Percent>,
}

/// All four tyres
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TireReading {
    pub corners: Option<Corners<TireCorner>>,
}

/// Aerodynamic loads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AeroReading {
    pub downforce: Option<Kilograms>,
    pub drag: Option<Newtons>,
    pub drag_coefficient: Option<f64>,
}

/// Cell-level battery monitoring
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellMonitoring {
    pub cell_voltages: Vec<Volts>,
    pub min_voltage: Option<Volts>,
    pub max_voltage: Option<Volts>,
    pub voltage_delta: Option<Volts>,
    /// Indices of cells sitting well below the pack average (at most 5)
    pub weak_cells: Vec<usize>,
    pub balancing_active: bool,
    pub pack_health: Option<Percent>,
}

/// Maximum number of weak cells reported
pub const MAX_WEAK_CELLS: usize = 5;

impl CellMonitoring {
    /// Build from raw voltages, deriving every statistic
    pub fn from_voltages(cell_voltages: Vec<Volts>) -> Self {
        let mut cells = Self {
            cell_voltages,
            ..Self::default()
        };
        cells.recompute();
        cells
    }

    pub fn mean_voltage(&self) -> Option<Volts> {
        if self.cell_voltages.is_empty() {
            return None;
        }
        let sum: f64 = self.cell_voltages.iter().map(|v| v.0).sum();
        Some(Volts(sum / self.cell_voltages.len() as f64))
    }

    /// Refresh the derived statistics from `cell_voltages`
    pub fn recompute(&mut self) {
        let Some(mean) = self.mean_voltage() else {
            self.min_voltage = None;
            self.max_voltage = None;
            self.voltage_delta = None;
            self.weak_cells.clear();
            self.balancing_active = false;
            self.pack_health = None;
            return;
        };

        let min = self
            .cell_voltages
            .iter()
            .map(|v| v.0)
            .fold(f64::INFINITY, f64::min);
        let max = self
            .cell_voltages
            .iter()
            .map(|v| v.0)
            .fold(f64::NEG_INFINITY, f64::max);
        let delta = max - min;

        self.min_voltage = Some(Volts(min));
        self.max_voltage = Some(Volts(max));
        self.voltage_delta = Some(Volts(delta));
        self.weak_cells = self
            .cell_voltages
            .iter()
            .enumerate()
            .filter(|(_, v)| v.0 < mean.0 - 0.1)
            .map(|(i, _)| i)
            .take(MAX_WEAK_CELLS)
            .collect();
        self.balancing_active = delta > 0.05;

        // 0.2 V spread costs 10 points of voltage health
        let voltage_health = 100.0 - (delta / 0.2) * 10.0;
        self.pack_health = Some(Percent::new((voltage_health + 100.0) / 2.0));
    }
}

/// EEG band powers (µV²)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EegBands {
    pub delta: Option<f64>,
    pub theta: Option<f64>,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub gamma: Option<f64>,
}

impl EegBands {
    pub fn bands(&self) -> [Option<f64>; 5] {
        [self.delta, self.theta, self.alpha, self.beta, self.gamma]
    }

    /// Fill absent bands from `other`
    pub fn or(self, other: EegBands) -> Self {
        Self {
            delta: self.delta.or(other.delta),
            theta: self.theta.or(other.theta),
            alpha: self.alpha.or(other.alpha),
            beta: self.beta.or(other.beta),
            gamma: self.gamma.or(other.gamma),
        }
    }
}

/// Driver biosignals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Biosignals {
    pub heart_rate: Option<BeatsPerMinute>,
    pub hrv_rmssd: Option<Milliseconds>,
    /// Instantaneous ECG sample
    pub ecg: Option<Millivolts>,
    pub skin_conductance: Option<Microsiemens>,
    pub respiration_rate: Option<BreathsPerMinute>,
    pub spo2: Option<Percent>,
    pub skin_temperature: Option<Celsius>,
    pub eeg: Option<EegBands>,
}

/// Driver state indices derived from biosignals (all 0-1)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionalState {
    pub stress: Option<Ratio>,
    pub focus: Option<Ratio>,
    pub fatigue: Option<Ratio>,
    pub alertness: Option<Ratio>,
    pub flow_state: Option<Ratio>,
    pub overall_readiness: Option<Ratio>,
}

// === Field Masking for Selective Output ===

/// Specifies which sections to include in serialized output
///
/// This is used to reduce bandwidth by only transmitting the sections
/// that a consumer renders.
#[derive(Debug, Clone, Default)]
pub struct FieldMask {
    fields: HashSet<String>,
    include_all: bool,
}

impl FieldMask {
    /// Create a mask that includes all sections
    pub fn all() -> Self {
        Self {
            fields: HashSet::new(),
            include_all: true,
        }
    }

    /// Create a mask from a comma-separated list of section names
    pub fn parse(fields: &str) -> Self {
        let fields: HashSet<String> = fields
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            fields,
            include_all: false,
        }
    }

    /// Check if a section should be included
    pub fn includes(&self, field: &str) -> bool {
        self.include_all || self.fields.contains(&field.to_lowercase())
    }

    /// Check if all sections should be included
    pub fn is_all(&self) -> bool {
        self.include_all
    }
}

impl FromStr for FieldMask {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl TelemetrySnapshot {
    /// Serialize this snapshot respecting the given field mask
    ///
    /// `timestamp`, `source` and `sim_time` are always included.
    pub fn to_json_filtered(&self, mask: Option<&FieldMask>) -> serde_json::Result<String> {
        let mask = match mask {
            Some(mask) if !mask.is_all() => mask,
            _ => return serde_json::to_string(self),
        };

        let full = serde_json::to_value(self)?;
        let mut map = serde_json::Map::new();
        if let serde_json::Value::Object(fields) = full {
            for (key, value) in fields {
                let always = matches!(key.as_str(), "timestamp" | "source" | "sim_time");
                if always || (mask.includes(&key) && !value.is_null()) {
                    map.insert(key, value);
                }
            }
        }

        serde_json::to_string(&map)
    }
}
