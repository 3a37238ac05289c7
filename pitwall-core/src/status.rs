//! Subsystem health classification
//!
//! Thresholds follow the pit-wall convention: warning well before a
//! component reaches its limit, critical close to it.

use crate::model::{BatteryReading, BrakeReading, MotorReading, TelemetrySnapshot, TireReading};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Optimal,
    Warning,
    Critical,
}

/// Per-subsystem status plus the worst of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub motor: Option<Status>,
    pub battery: Option<Status>,
    pub brakes: Option<Status>,
    pub tires: Option<Status>,
    pub overall: Status,
}

impl StatusReport {
    /// Classify every subsystem present in the snapshot.
    ///
    /// A subsystem without the readings its rule needs is left unclassified
    /// and does not affect `overall`.
    pub fn evaluate(snapshot: &TelemetrySnapshot) -> Self {
        let motor = snapshot.motor.as_ref().and_then(classify_motor);
        let battery = snapshot.battery.as_ref().and_then(classify_battery);
        let brakes = snapshot.brakes.as_ref().and_then(classify_brakes);
        let tires = snapshot.tires.as_ref().and_then(classify_tires);

        let overall = [motor, battery, brakes, tires]
            .into_iter()
            .flatten()
            .max()
            .unwrap_or(Status::Optimal);

        Self {
            motor,
            battery,
            brakes,
            tires,
            overall,
        }
    }
}

pub fn classify_motor(motor: &MotorReading) -> Option<Status> {
    let temp = motor.temperature?.0;
    Some(if temp > 90.0 {
        Status::Critical
    } else if temp > 80.0 {
        Status::Warning
    } else {
        Status::Optimal
    })
}

pub fn classify_battery(battery: &BatteryReading) -> Option<Status> {
    let soc = battery.soc.map(|v| v.0);
    let temp = battery.temperature.map(|v| v.0);
    if soc.is_none() && temp.is_none() {
        return None;
    }

    let soc_below = |limit: f64| soc.map(|s| s < limit).unwrap_or(false);
    let temp_above = |limit: f64| temp.map(|t| t > limit).unwrap_or(false);

    Some(if soc_below(15.0) || temp_above(50.0) {
        Status::Critical
    } else if soc_below(25.0) || temp_above(45.0) {
        Status::Warning
    } else {
        Status::Optimal
    })
}

pub fn classify_brakes(brakes: &BrakeReading) -> Option<Status> {
    let temps: Vec<f64> = brakes
        .temperatures
        .as_ref()?
        .all()
        .into_iter()
        .filter_map(|t| t.map(|c| c.0))
        .collect();
    if temps.is_empty() {
        return None;
    }

    let avg = temps.iter().sum::<f64>() / temps.len() as f64;
    Some(if avg > 800.0 {
        Status::Critical
    } else if avg > 700.0 {
        Status::Warning
    } else {
        Status::Optimal
    })
}

pub fn classify_tires(tires: &TireReading) -> Option<Status> {
    let corners = tires.corners.as_ref()?;
    let temps: Vec<f64> = corners
        .all()
        .into_iter()
        .filter_map(|c| c.temperature.map(|t| t.0))
        .collect();
    let min_wear = corners
        .all()
        .into_iter()
        .filter_map(|c| c.wear.map(|w| w.0))
        .fold(None, |acc: Option<f64>, w| Some(acc.map_or(w, |a| a.min(w))));

    if temps.is_empty() && min_wear.is_none() {
        return None;
    }

    let avg_temp = if temps.is_empty() {
        None
    } else {
        Some(temps.iter().sum::<f64>() / temps.len() as f64)
    };
    let temp_above = |limit: f64| avg_temp.map(|t| t > limit).unwrap_or(false);
    let wear_below = |limit: f64| min_wear.map(|w| w < limit).unwrap_or(false);

    Some(if temp_above(115.0) || wear_below(20.0) {
        Status::Critical
    } else if temp_above(105.0) || wear_below(40.0) {
        Status::Warning
    } else {
        Status::Optimal
    })
}
