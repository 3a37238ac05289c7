//! Type-safe wrappers for physical units
//!
//! Newtype wrappers around f64 so a motor temperature can never be handed
//! to something expecting a pack voltage.
//!
//! All unit types serialize with 4 decimal places to reduce JSON payload size.

use serde::{Deserialize, Serialize};

/// Round f64 to 4 decimal places for compact JSON serialization
fn round4<S: serde::Serializer>(val: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64((*val * 10000.0).round() / 10000.0)
}

/// Access to the raw magnitude of a unit wrapper
pub trait Scalar: Copy {
    fn value(&self) -> f64;
}

impl Scalar for f64 {
    fn value(&self) -> f64 {
        *self
    }
}

macro_rules! impl_scalar {
    ($($unit:ident),* $(,)?) => {
        $(
            impl Scalar for $unit {
                fn value(&self) -> f64 {
                    self.0
                }
            }
        )*
    };
}

/// Revolutions per minute
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rpm(#[serde(serialize_with = "round4")] pub f64);

/// Newton-meters (torque)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NewtonMeters(#[serde(serialize_with = "round4")] pub f64);

/// Kilowatts (power)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Kilowatts(#[serde(serialize_with = "round4")] pub f64);

impl Kilowatts {
    /// Mechanical power from shaft speed and torque.
    ///
    /// 9549 = 60 * 1000 / (2π): rpm·N·m to kW.
    pub fn from_rpm_torque(rpm: Rpm, torque: NewtonMeters) -> Self {
        Self(rpm.0 * torque.0 / 9549.0)
    }
}

/// Celsius
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Celsius(#[serde(serialize_with = "round4")] pub f64);

/// Volts
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Volts(#[serde(serialize_with = "round4")] pub f64);

/// Millivolts (biosignal waveforms)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Millivolts(#[serde(serialize_with = "round4")] pub f64);

/// Amperes (positive = discharge)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Amperes(#[serde(serialize_with = "round4")] pub f64);

/// Percentage (0.0 to 100.0)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Percent(#[serde(serialize_with = "round4")] pub f64);

impl Percent {
    /// Create a new percentage, clamping to [0.0, 100.0]
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 100.0))
    }

    /// Get as a ratio (0-1)
    pub fn as_ratio(&self) -> f64 {
        self.0 / 100.0
    }
}

/// Ratio (0.0 to 1.0), used for normalised indices such as stress or focus
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Ratio(#[serde(serialize_with = "round4")] pub f64);

impl Ratio {
    /// Create a new ratio, clamping to [0.0, 1.0]
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    /// Get as percentage (0-100)
    pub fn as_percent(&self) -> f64 {
        self.0 * 100.0
    }
}

/// Millimeters (suspension travel)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Millimeters(#[serde(serialize_with = "round4")] pub f64);

/// Millimeters per second (damper velocity)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MillimetersPerSecond(#[serde(serialize_with = "round4")] pub f64);

/// Kilometers per hour
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KilometersPerHour(#[serde(serialize_with = "round4")] pub f64);

impl KilometersPerHour {
    pub fn as_meters_per_second(&self) -> f64 {
        self.0 / 3.6
    }
}

/// Kilograms (downforce is quoted as equivalent mass)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Kilograms(#[serde(serialize_with = "round4")] pub f64);

/// Newtons
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Newtons(#[serde(serialize_with = "round4")] pub f64);

/// Bar (pressure)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bar(#[serde(serialize_with = "round4")] pub f64);

/// Degrees (steering wheel angle)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Degrees(#[serde(serialize_with = "round4")] pub f64);

/// G-force (multiples of gravitational acceleration)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GForce(#[serde(serialize_with = "round4")] pub f64);

/// Heart rate
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BeatsPerMinute(#[serde(serialize_with = "round4")] pub f64);

/// Respiration rate
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BreathsPerMinute(#[serde(serialize_with = "round4")] pub f64);

/// Microsiemens (skin conductance)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Microsiemens(#[serde(serialize_with = "round4")] pub f64);

/// Milliseconds (HRV intervals)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Milliseconds(#[serde(serialize_with = "round4")] pub f64);

/// Seconds (simulation time)
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Seconds(#[serde(serialize_with = "round4")] pub f64);

impl_scalar!(
    Rpm,
    NewtonMeters,
    Kilowatts,
    Celsius,
    Volts,
    Millivolts,
    Amperes,
    Percent,
    Ratio,
    Millimeters,
    MillimetersPerSecond,
    KilometersPerHour,
    Kilograms,
    Newtons,
    Bar,
    Degrees,
    GForce,
    BeatsPerMinute,
    BreathsPerMinute,
    Microsiemens,
    Milliseconds,
    Seconds,
);
