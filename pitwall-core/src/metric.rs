//! Typed keys for every scalar signal in a snapshot
//!
//! Metric names are dotted paths (`motor.rpm`, `suspension.fl.travel`).
//! They key the generators, the history buffers and the arbitration report.

use crate::error::CoreError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Wheel position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Corner {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::FrontLeft,
        Corner::FrontRight,
        Corner::RearLeft,
        Corner::RearRight,
    ];

    pub fn short_name(&self) -> &'static str {
        match self {
            Corner::FrontLeft => "fl",
            Corner::FrontRight => "fr",
            Corner::RearLeft => "rl",
            Corner::RearRight => "rr",
        }
    }

    pub fn is_front(&self) -> bool {
        matches!(self, Corner::FrontLeft | Corner::FrontRight)
    }

    pub fn is_left(&self) -> bool {
        matches!(self, Corner::FrontLeft | Corner::RearLeft)
    }

    fn from_short_name(name: &str) -> Option<Self> {
        Corner::ALL.into_iter().find(|c| c.short_name() == name)
    }
}

/// A scalar telemetry signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    // Motor
    MotorRpm,
    MotorTorque,
    MotorPower,
    MotorTemperature,
    MotorEfficiency,

    // Battery
    BatterySoc,
    BatteryVoltage,
    BatteryCurrent,
    BatteryTemperature,

    // Chassis
    Speed,
    LateralG,
    LongitudinalG,
    SteeringAngle,
    Throttle,
    Brake,
    SuspensionTravel(Corner),
    SuspensionVelocity(Corner),

    // Brakes
    BrakeTemperature(Corner),
    BrakePressure,
    BrakeBias,

    // Tires
    TireTemperature(Corner),
    TirePressure(Corner),
    TireWear(Corner),

    // Aero
    Downforce,
    Drag,

    // Cells
    CellVoltage,

    // Biosignals
    HeartRate,
    HrvRmssd,
    Ecg,
    SkinConductance,
    RespirationRate,
    Spo2,
    SkinTemperature,

    // Emotional state
    Stress,
    Focus,
    Fatigue,
    Alertness,
    FlowState,
    Readiness,
}

impl Metric {
    /// Every metric, in a stable order
    pub fn all() -> Vec<Metric> {
        let mut all = vec![
            Metric::MotorRpm,
            Metric::MotorTorque,
            Metric::MotorPower,
            Metric::MotorTemperature,
            Metric::MotorEfficiency,
            Metric::BatterySoc,
            Metric::BatteryVoltage,
            Metric::BatteryCurrent,
            Metric::BatteryTemperature,
            Metric::Speed,
            Metric::LateralG,
            Metric::LongitudinalG,
            Metric::SteeringAngle,
            Metric::Throttle,
            Metric::Brake,
        ];
        for corner in Corner::ALL {
            all.push(Metric::SuspensionTravel(corner));
            all.push(Metric::SuspensionVelocity(corner));
        }
        for corner in Corner::ALL {
            all.push(Metric::BrakeTemperature(corner));
        }
        all.push(Metric::BrakePressure);
        all.push(Metric::BrakeBias);
        for corner in Corner::ALL {
            all.push(Metric::TireTemperature(corner));
            all.push(Metric::TirePressure(corner));
            all.push(Metric::TireWear(corner));
        }
        all.extend([
            Metric::Downforce,
            Metric::Drag,
            Metric::CellVoltage,
            Metric::HeartRate,
            Metric::HrvRmssd,
            Metric::Ecg,
            Metric::SkinConductance,
            Metric::RespirationRate,
            Metric::Spo2,
            Metric::SkinTemperature,
            Metric::Stress,
            Metric::Focus,
            Metric::Fatigue,
            Metric::Alertness,
            Metric::FlowState,
            Metric::Readiness,
        ]);
        all
    }

    /// Physically plausible range for this signal.
    ///
    /// Synthetic values are clamped to exactly this range.
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            Metric::MotorRpm => (0.0, 9000.0),
            Metric::MotorTorque => (0.0, 320.0),
            Metric::MotorPower => (0.0, 160.0),
            Metric::MotorTemperature => (AMBIENT_TEMPERATURE, 120.0),
            Metric::MotorEfficiency => (80.0, 97.0),
            Metric::BatterySoc => (0.0, 100.0),
            Metric::BatteryVoltage => (700.0, 910.0),
            Metric::BatteryCurrent => (0.0, 400.0),
            Metric::BatteryTemperature => (20.0, 60.0),
            Metric::Speed => (0.0, 340.0),
            Metric::LateralG | Metric::LongitudinalG => (-4.0, 4.0),
            Metric::SteeringAngle => (-90.0, 90.0),
            Metric::Throttle | Metric::Brake => (0.0, 100.0),
            Metric::SuspensionTravel(_) => (0.0, 60.0),
            Metric::SuspensionVelocity(_) => (-500.0, 500.0),
            Metric::BrakeTemperature(_) => (150.0, 850.0),
            Metric::BrakePressure => (0.0, 120.0),
            Metric::BrakeBias => (50.0, 65.0),
            Metric::TireTemperature(_) => (60.0, 125.0),
            Metric::TirePressure(_) => (1.5, 2.3),
            Metric::TireWear(_) => (0.0, 100.0),
            Metric::Downforce => (0.0, 2000.0),
            Metric::Drag => (0.0, 8000.0),
            Metric::CellVoltage => (3.0, 4.2),
            Metric::HeartRate => (40.0, 200.0),
            Metric::HrvRmssd => (5.0, 120.0),
            Metric::Ecg => (-1.5, 1.5),
            Metric::SkinConductance => (0.5, 20.0),
            Metric::RespirationRate => (6.0, 40.0),
            Metric::Spo2 => (90.0, 100.0),
            Metric::SkinTemperature => (30.0, 39.0),
            Metric::Stress
            | Metric::Focus
            | Metric::Fatigue
            | Metric::Alertness
            | Metric::FlowState
            | Metric::Readiness => (0.0, 1.0),
        }
    }

    /// Clamp a value into this metric's bounds
    pub fn clamp_value(&self, value: f64) -> f64 {
        let (min, max) = self.bounds();
        value.clamp(min, max)
    }

    /// Whether the signal carries thermal inertia (lags toward its target)
    pub fn is_thermal(&self) -> bool {
        matches!(
            self,
            Metric::MotorTemperature
                | Metric::BatteryTemperature
                | Metric::BrakeTemperature(_)
                | Metric::TireTemperature(_)
        )
    }
}

/// Ambient air temperature the motor can never cool below (°C)
pub const AMBIENT_TEMPERATURE: f64 = 25.0;

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::MotorRpm => write!(f, "motor.rpm"),
            Metric::MotorTorque => write!(f, "motor.torque"),
            Metric::MotorPower => write!(f, "motor.power"),
            Metric::MotorTemperature => write!(f, "motor.temperature"),
            Metric::MotorEfficiency => write!(f, "motor.efficiency"),
            Metric::BatterySoc => write!(f, "battery.soc"),
            Metric::BatteryVoltage => write!(f, "battery.voltage"),
            Metric::BatteryCurrent => write!(f, "battery.current"),
            Metric::BatteryTemperature => write!(f, "battery.temperature"),
            Metric::Speed => write!(f, "chassis.speed"),
            Metric::LateralG => write!(f, "chassis.g_force.lateral"),
            Metric::LongitudinalG => write!(f, "chassis.g_force.longitudinal"),
            Metric::SteeringAngle => write!(f, "chassis.steering_angle"),
            Metric::Throttle => write!(f, "chassis.throttle"),
            Metric::Brake => write!(f, "chassis.brake"),
            Metric::SuspensionTravel(c) => write!(f, "suspension.{}.travel", c.short_name()),
            Metric::SuspensionVelocity(c) => write!(f, "suspension.{}.velocity", c.short_name()),
            Metric::BrakeTemperature(c) => write!(f, "brakes.{}.temperature", c.short_name()),
            Metric::BrakePressure => write!(f, "brakes.pressure"),
            Metric::BrakeBias => write!(f, "brakes.bias"),
            Metric::TireTemperature(c) => write!(f, "tires.{}.temperature", c.short_name()),
            Metric::TirePressure(c) => write!(f, "tires.{}.pressure", c.short_name()),
            Metric::TireWear(c) => write!(f, "tires.{}.wear", c.short_name()),
            Metric::Downforce => write!(f, "aero.downforce"),
            Metric::Drag => write!(f, "aero.drag"),
            Metric::CellVoltage => write!(f, "cells.mean_voltage"),
            Metric::HeartRate => write!(f, "bio.heart_rate"),
            Metric::HrvRmssd => write!(f, "bio.hrv_rmssd"),
            Metric::Ecg => write!(f, "bio.ecg"),
            Metric::SkinConductance => write!(f, "bio.skin_conductance"),
            Metric::RespirationRate => write!(f, "bio.respiration_rate"),
            Metric::Spo2 => write!(f, "bio.spo2"),
            Metric::SkinTemperature => write!(f, "bio.skin_temperature"),
            Metric::Stress => write!(f, "emotion.stress"),
            Metric::Focus => write!(f, "emotion.focus"),
            Metric::Fatigue => write!(f, "emotion.fatigue"),
            Metric::Alertness => write!(f, "emotion.alertness"),
            Metric::FlowState => write!(f, "emotion.flow_state"),
            Metric::Readiness => write!(f, "emotion.readiness"),
        }
    }
}

impl FromStr for Metric {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        let parts: Vec<&str> = name.split('.').collect();

        // Per-corner metrics: <group>.<corner>.<field>
        if let [group, corner, field] = parts.as_slice() {
            if let Some(corner) = Corner::from_short_name(corner) {
                let metric = match (*group, *field) {
                    ("suspension", "travel") => Some(Metric::SuspensionTravel(corner)),
                    ("suspension", "velocity") => Some(Metric::SuspensionVelocity(corner)),
                    ("brakes", "temperature") => Some(Metric::BrakeTemperature(corner)),
                    ("tires", "temperature") => Some(Metric::TireTemperature(corner)),
                    ("tires", "pressure") => Some(Metric::TirePressure(corner)),
                    ("tires", "wear") => Some(Metric::TireWear(corner)),
                    _ => None,
                };
                return metric.ok_or_else(|| CoreError::UnknownMetric(s.to_string()));
            }
        }

        Metric::all()
            .into_iter()
            .find(|m| m.to_string() == name)
            .ok_or_else(|| CoreError::UnknownMetric(s.to_string()))
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Metric {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
