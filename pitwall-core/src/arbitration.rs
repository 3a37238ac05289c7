//! Live/synthetic arbitration
//!
//! For every field of a snapshot, decide whether to show the live reading or
//! the synthetic stand-in. The decision is made per field, never per
//! snapshot, so one tick can mix live and synthetic values.
//!
//! Two policies are supported:
//!
//! - [`ArbitrationPolicy::Truthy`]: a live value wins only when it is
//!   non-zero and not NaN. This conflates a genuine zero (0 rpm at a
//!   standstill, 0 A at idle) with "no data" and silently replaces it with
//!   a synthetic value. Kept for dashboards that relied on it.
//! - [`ArbitrationPolicy::Presence`]: a live value wins whenever it is
//!   present and finite, zero included. This is the default.

use crate::error::CoreError;
use crate::metric::{Corner, Metric};
use crate::model::*;
use crate::units::Scalar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArbitrationPolicy {
    /// Zero and NaN count as "no live data"
    Truthy,
    /// Any present, finite live value wins
    #[default]
    Presence,
}

impl fmt::Display for ArbitrationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArbitrationPolicy::Truthy => write!(f, "truthy"),
            ArbitrationPolicy::Presence => write!(f, "presence"),
        }
    }
}

impl FromStr for ArbitrationPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "truthy" => Ok(ArbitrationPolicy::Truthy),
            "presence" => Ok(ArbitrationPolicy::Presence),
            _ => Err(CoreError::UnknownPolicy(s.to_string())),
        }
    }
}

/// Where a displayed value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Live,
    Synthetic,
}

/// Decide a single scalar field.
///
/// Never fails: an absent or rejected live value falls through to the
/// synthetic one.
pub fn arbitrate(policy: ArbitrationPolicy, live: Option<f64>, synthetic: f64) -> (f64, Origin) {
    match live {
        Some(v) if accepts_scalar(policy, v) => (v, Origin::Live),
        _ => (synthetic, Origin::Synthetic),
    }
}

fn accepts_scalar(policy: ArbitrationPolicy, value: f64) -> bool {
    match policy {
        ArbitrationPolicy::Truthy => value != 0.0 && !value.is_nan(),
        ArbitrationPolicy::Presence => value.is_finite(),
    }
}

/// Origin of every populated field after a merge, keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSources {
    fields: BTreeMap<String, Origin>,
}

impl FieldSources {
    pub fn origin(&self, field: &str) -> Option<Origin> {
        self.fields.get(field).copied()
    }

    pub fn origin_of(&self, metric: Metric) -> Option<Origin> {
        self.origin(&metric.to_string())
    }

    pub fn live_count(&self) -> usize {
        self.fields.values().filter(|o| **o == Origin::Live).count()
    }

    pub fn synthetic_count(&self) -> usize {
        self.fields.values().filter(|o| **o == Origin::Synthetic).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Origin)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn record(&mut self, field: String, origin: Origin) {
        self.fields.insert(field, origin);
    }
}

/// Field-by-field merger of a live snapshot over a synthetic one
#[derive(Debug, Default)]
pub struct Arbiter {
    policy: ArbitrationPolicy,
    sources: FieldSources,
}

impl Arbiter {
    pub fn new(policy: ArbitrationPolicy) -> Self {
        Self {
            policy,
            sources: FieldSources::default(),
        }
    }

    pub fn policy(&self) -> ArbitrationPolicy {
        self.policy
    }

    /// Origins recorded so far
    pub fn sources(&self) -> &FieldSources {
        &self.sources
    }

    pub fn into_sources(self) -> FieldSources {
        self.sources
    }

    /// Decide one scalar field
    pub fn pick<T: Scalar>(&mut self, field: Metric, live: Option<T>, synthetic: Option<T>) -> Option<T> {
        let policy = self.policy;
        self.choose(field.to_string(), live, synthetic, |v| {
            accepts_scalar(policy, v.value())
        })
    }

    fn choose<T>(
        &mut self,
        field: String,
        live: Option<T>,
        synthetic: Option<T>,
        accepts: impl Fn(&T) -> bool,
    ) -> Option<T> {
        match live {
            Some(v) if accepts(&v) => {
                self.sources.record(field, Origin::Live);
                Some(v)
            }
            _ => {
                if synthetic.is_some() {
                    self.sources.record(field, Origin::Synthetic);
                }
                synthetic
            }
        }
    }

    /// Merge `live` over `synthetic`, field by field.
    ///
    /// Sections absent from both inputs stay absent. Cell statistics are
    /// recomputed from whichever voltage list won.
    pub fn merge(
        &mut self,
        live: Option<&TelemetrySnapshot>,
        synthetic: TelemetrySnapshot,
    ) -> TelemetrySnapshot {
        let before = self.sources.live_count();

        let motor = self.merge_motor(live.and_then(|s| s.motor.as_ref()), synthetic.motor);
        let battery = self.merge_battery(live.and_then(|s| s.battery.as_ref()), synthetic.battery);
        let chassis = self.merge_chassis(live.and_then(|s| s.chassis.as_ref()), synthetic.chassis);
        let brakes = self.merge_brakes(live.and_then(|s| s.brakes.as_ref()), synthetic.brakes);
        let tires = self.merge_tires(live.and_then(|s| s.tires.as_ref()), synthetic.tires);
        let aero = self.merge_aero(live.and_then(|s| s.aero.as_ref()), synthetic.aero);
        let cell_monitoring = self.merge_cells(
            live.and_then(|s| s.cell_monitoring.as_ref()),
            synthetic.cell_monitoring,
        );
        let biosignals =
            self.merge_biosignals(live.and_then(|s| s.biosignals.as_ref()), synthetic.biosignals);
        let emotional_state = self.merge_emotional_state(
            live.and_then(|s| s.emotional_state.as_ref()),
            synthetic.emotional_state,
        );

        let source = if self.sources.live_count() > before {
            "merged".to_string()
        } else {
            synthetic.source
        };

        TelemetrySnapshot {
            timestamp: synthetic.timestamp,
            source,
            sim_time: synthetic.sim_time,
            motor,
            battery,
            chassis,
            brakes,
            tires,
            aero,
            cell_monitoring,
            biosignals,
            emotional_state,
            status: None,
        }
    }

    fn merge_motor(&mut self, live: Option<&MotorReading>, syn: Option<MotorReading>) -> Option<MotorReading> {
        if live.is_none() && syn.is_none() {
            return None;
        }
        let syn = syn.unwrap_or_default();
        Some(MotorReading {
            rpm: self.pick(Metric::MotorRpm, live.and_then(|m| m.rpm), syn.rpm),
            torque: self.pick(Metric::MotorTorque, live.and_then(|m| m.torque), syn.torque),
            power: self.pick(Metric::MotorPower, live.and_then(|m| m.power), syn.power),
            temperature: self.pick(
                Metric::MotorTemperature,
                live.and_then(|m| m.temperature),
                syn.temperature,
            ),
            efficiency: self.pick(
                Metric::MotorEfficiency,
                live.and_then(|m| m.efficiency),
                syn.efficiency,
            ),
        })
    }

    fn merge_battery(
        &mut self,
        live: Option<&BatteryReading>,
        syn: Option<BatteryReading>,
    ) -> Option<BatteryReading> {
        if live.is_none() && syn.is_none() {
            return None;
        }
        let syn = syn.unwrap_or_default();
        Some(BatteryReading {
            soc: self.pick(Metric::BatterySoc, live.and_then(|b| b.soc), syn.soc),
            voltage: self.pick(Metric::BatteryVoltage, live.and_then(|b| b.voltage), syn.voltage),
            current: self.pick(Metric::BatteryCurrent, live.and_then(|b| b.current), syn.current),
            temperature: self.pick(
                Metric::BatteryTemperature,
                live.and_then(|b| b.temperature),
                syn.temperature,
            ),
        })
    }

    fn merge_chassis(
        &mut self,
        live: Option<&ChassisReading>,
        syn: Option<ChassisReading>,
    ) -> Option<ChassisReading> {
        if live.is_none() && syn.is_none() {
            return None;
        }
        let syn = syn.unwrap_or_default();

        let live_g = live.and_then(|c| c.g_force);
        let g_force = if live_g.is_none() && syn.g_force.is_none() {
            None
        } else {
            let syn_g = syn.g_force.unwrap_or_default();
            Some(GForceVector {
                lateral: self.pick(Metric::LateralG, live_g.and_then(|g| g.lateral), syn_g.lateral),
                longitudinal: self.pick(
                    Metric::LongitudinalG,
                    live_g.and_then(|g| g.longitudinal),
                    syn_g.longitudinal,
                ),
            })
        };

        let live_susp = live.and_then(|c| c.suspension);
        let suspension = if live_susp.is_none() && syn.suspension.is_none() {
            None
        } else {
            let syn_susp = syn.suspension.unwrap_or_default();
            Some(Corners::from_fn(|corner| {
                let l = live_susp.map(|s| s.at(corner));
                let s = syn_susp.at(corner);
                SuspensionCorner {
                    travel: self.pick(
                        Metric::SuspensionTravel(corner),
                        l.and_then(|c| c.travel),
                        s.travel,
                    ),
                    velocity: self.pick(
                        Metric::SuspensionVelocity(corner),
                        l.and_then(|c| c.velocity),
                        s.velocity,
                    ),
                }
            }))
        };

        Some(ChassisReading {
            speed: self.pick(Metric::Speed, live.and_then(|c| c.speed), syn.speed),
            g_force,
            steering_angle: self.pick(
                Metric::SteeringAngle,
                live.and_then(|c| c.steering_angle),
                syn.steering_angle,
            ),
            throttle: self.pick(Metric::Throttle, live.and_then(|c| c.throttle), syn.throttle),
            brake: self.pick(Metric::Brake, live.and_then(|c| c.brake), syn.brake),
            suspension,
        })
    }

    fn merge_brakes(&mut self, live: Option<&BrakeReading>, syn: Option<BrakeReading>) -> Option<BrakeReading> {
        if live.is_none() && syn.is_none() {
            return None;
        }
        let syn = syn.unwrap_or_default();

        let live_temps = live.and_then(|b| b.temperatures);
        let temperatures = if live_temps.is_none() && syn.temperatures.is_none() {
            None
        } else {
            let syn_temps = syn.temperatures.unwrap_or_default();
            Some(Corners::from_fn(|corner: Corner| {
                self.pick(
                    Metric::BrakeTemperature(corner),
                    live_temps.and_then(|t| t.at(corner)),
                    syn_temps.at(corner),
                )
            }))
        };

        Some(BrakeReading {
            temperatures,
            pressure: self.pick(Metric::BrakePressure, live.and_then(|b| b.pressure), syn.pressure),
            bias: self.pick(Metric::BrakeBias, live.and_then(|b| b.bias), syn.bias),
        })
    }

    fn merge_tires(&mut self, live: Option<&TireReading>, syn: Option<TireReading>) -> Option<TireReading> {
        if live.is_none() && syn.is_none() {
            return None;
        }
        let syn = syn.unwrap_or_default();

        let live_corners = live.and_then(|t| t.corners);
        let corners = if live_corners.is_none() && syn.corners.is_none() {
            None
        } else {
            let syn_corners = syn.corners.unwrap_or_default();
            Some(Corners::from_fn(|corner| {
                let l = live_corners.map(|c| c.at(corner));
                let s = syn_corners.at(corner);
                TireCorner {
                    temperature: self.pick(
                        Metric::TireTemperature(corner),
                        l.and_then(|c| c.temperature),
                        s.temperature,
                    ),
                    pressure: self.pick(
                        Metric::TirePressure(corner),
                        l.and_then(|c| c.pressure),
                        s.pressure,
                    ),
                    wear: self.pick(Metric::TireWear(corner), l.and_then(|c| c.wear), s.wear),
                }
            }))
        };

        Some(TireReading { corners })
    }

    fn merge_aero(&mut self, live: Option<&AeroReading>, syn: Option<AeroReading>) -> Option<AeroReading> {
        if live.is_none() && syn.is_none() {
            return None;
        }
        let syn = syn.unwrap_or_default();
        let policy = self.policy;
        Some(AeroReading {
            downforce: self.pick(Metric::Downforce, live.and_then(|a| a.downforce), syn.downforce),
            drag: self.pick(Metric::Drag, live.and_then(|a| a.drag), syn.drag),
            drag_coefficient: self.choose(
                "aero.drag_coefficient".to_string(),
                live.and_then(|a| a.drag_coefficient),
                syn.drag_coefficient,
                |v| accepts_scalar(policy, *v),
            ),
        })
    }

    fn merge_cells(
        &mut self,
        live: Option<&CellMonitoring>,
        syn: Option<CellMonitoring>,
    ) -> Option<CellMonitoring> {
        if live.is_none() && syn.is_none() {
            return None;
        }
        let policy = self.policy;
        let live_voltages = live.map(|c| c.cell_voltages.clone());
        let syn_voltages = syn.map(|c| c.cell_voltages).filter(|v| !v.is_empty());

        let voltages = self.choose(
            "cells.voltages".to_string(),
            live_voltages,
            syn_voltages,
            |cells| match policy {
                ArbitrationPolicy::Truthy => !cells.is_empty(),
                ArbitrationPolicy::Presence => {
                    !cells.is_empty() && cells.iter().all(|v| v.0.is_finite())
                }
            },
        );

        Some(CellMonitoring::from_voltages(voltages.unwrap_or_default()))
    }

    fn merge_biosignals(
        &mut self,
        live: Option<&Biosignals>,
        syn: Option<Biosignals>,
    ) -> Option<Biosignals> {
        if live.is_none() && syn.is_none() {
            return None;
        }
        let syn = syn.unwrap_or_default();
        let policy = self.policy;
        Some(Biosignals {
            heart_rate: self.pick(Metric::HeartRate, live.and_then(|b| b.heart_rate), syn.heart_rate),
            hrv_rmssd: self.pick(Metric::HrvRmssd, live.and_then(|b| b.hrv_rmssd), syn.hrv_rmssd),
            ecg: self.pick(Metric::Ecg, live.and_then(|b| b.ecg), syn.ecg),
            skin_conductance: self.pick(
                Metric::SkinConductance,
                live.and_then(|b| b.skin_conductance),
                syn.skin_conductance,
            ),
            respiration_rate: self.pick(
                Metric::RespirationRate,
                live.and_then(|b| b.respiration_rate),
                syn.respiration_rate,
            ),
            spo2: self.pick(Metric::Spo2, live.and_then(|b| b.spo2), syn.spo2),
            skin_temperature: self.pick(
                Metric::SkinTemperature,
                live.and_then(|b| b.skin_temperature),
                syn.skin_temperature,
            ),
            // A present band object is truthy even when every band reads zero.
            // Bands the live object leaves out come from the synthetic set.
            eeg: self
                .choose("bio.eeg".to_string(), live.and_then(|b| b.eeg), syn.eeg, |bands| {
                    match policy {
                        ArbitrationPolicy::Truthy => true,
                        ArbitrationPolicy::Presence => {
                            let present = bands.bands();
                            present.iter().any(Option::is_some)
                                && present.iter().flatten().all(|v| v.is_finite())
                        }
                    }
                })
                .map(|bands| match syn.eeg {
                    Some(fallback) => bands.or(fallback),
                    None => bands,
                }),
        })
    }

    fn merge_emotional_state(
        &mut self,
        live: Option<&EmotionalState>,
        syn: Option<EmotionalState>,
    ) -> Option<EmotionalState> {
        if live.is_none() && syn.is_none() {
            return None;
        }
        let syn = syn.unwrap_or_default();
        Some(EmotionalState {
            stress: self.pick(Metric::Stress, live.and_then(|e| e.stress), syn.stress),
            focus: self.pick(Metric::Focus, live.and_then(|e| e.focus), syn.focus),
            fatigue: self.pick(Metric::Fatigue, live.and_then(|e| e.fatigue), syn.fatigue),
            alertness: self.pick(Metric::Alertness, live.and_then(|e| e.alertness), syn.alertness),
            flow_state: self.pick(Metric::FlowState, live.and_then(|e| e.flow_state), syn.flow_state),
            overall_readiness: self.pick(
                Metric::Readiness,
                live.and_then(|e| e.overall_readiness),
                syn.overall_readiness,
            ),
        })
    }
}
