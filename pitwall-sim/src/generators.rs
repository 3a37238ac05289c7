//! Closed-form signal generators
//!
//! Every signal is a function of simulation time plus bounded jitter. Thermal
//! signals also take their previous value and lag toward a target. All
//! outputs are clamped to [`Metric::bounds`].
//!
//! [`generate`] covers every metric on its own, computing any upstream signal
//! it depends on without jitter. The section builders chain the jittered
//! upstream values instead, so one snapshot is internally consistent.

use crate::oscillator::{Oscillator, Wave};
use crate::strategy::PowerMap;
use pitwall_core::jitter::JitterSource;
use pitwall_core::metric::AMBIENT_TEMPERATURE;
use pitwall_core::model::*;
use pitwall_core::units::*;
use pitwall_core::{Corner, Metric};
use std::f64::consts::PI;

/// Fraction of the gap to the target closed per sample
pub const THERMAL_LAG: f64 = 0.1;

/// Cells in the default pack
pub const DEFAULT_CELL_COUNT: usize = 96;

/// SoC drains from 100 toward 5 over this period, then restarts
pub const SOC_PERIOD_SECS: f64 = 900.0;

/// Tyres go from new to 40% over this period, then restart
pub const TIRE_WEAR_PERIOD_SECS: f64 = 3600.0;

/// Radius of the friction circle (g)
pub const FRICTION_CIRCLE_G: f64 = 4.0;

/// Torque plateau up to the base speed, constant power above it
const PEAK_TORQUE: f64 = 320.0;
const BASE_SPEED_RPM: f64 = 4500.0;

const AIR_DENSITY: f64 = 1.225;
const DRAG_COEFFICIENT: f64 = 0.95;
const FRONTAL_AREA: f64 = 1.1;

const RPM_WAVES: [Wave; 2] = [Wave::new(3500.0, 0.4), Wave::new(1000.0, 1.5)];
const RPM: Oscillator = Oscillator::new(Metric::MotorRpm, 4000.0, &RPM_WAVES, 50.0);

const CURRENT_WAVES: [Wave; 2] = [Wave::new(100.0, 0.4), Wave::new(30.0, 1.5)];
const CURRENT: Oscillator = Oscillator::new(Metric::BatteryCurrent, 250.0, &CURRENT_WAVES, 5.0);

const SPEED_WAVES: [Wave; 2] = [Wave::new(90.0, 0.25), Wave::new(30.0, 0.9)];
const SPEED: Oscillator = Oscillator::new(Metric::Speed, 180.0, &SPEED_WAVES, 1.0);

const LATERAL_WAVES: [Wave; 2] = [Wave::new(2.5, 0.7), Wave::new(0.6, 1.9)];
const LATERAL: Oscillator = Oscillator::new(Metric::LateralG, 0.0, &LATERAL_WAVES, 0.05);

/// Shared phase of the pedals and longitudinal load
const PEDAL_WAVE: Wave = Wave::with_phase(1.0, 0.35, 1.0);
const LONGITUDINAL_WAVES: [Wave; 1] = [Wave::with_phase(1.4, 0.35, 1.0)];
const LONGITUDINAL: Oscillator =
    Oscillator::new(Metric::LongitudinalG, 0.0, &LONGITUDINAL_WAVES, 0.05);

const BUMP_WAVE_AMPLITUDE: f64 = 8.0;
const BUMP_WAVE_OMEGA: f64 = 2.1;

/// Move `previous` a fixed fraction of the way to `target`
pub fn thermal_lag(previous: Option<f64>, target: f64) -> f64 {
    match previous {
        Some(prev) if prev.is_finite() => prev + THERMAL_LAG * (target - prev),
        _ => target,
    }
}

fn corner_phase(corner: Corner) -> f64 {
    match corner {
        Corner::FrontLeft => 0.0,
        Corner::FrontRight => 0.5,
        Corner::RearLeft => 1.0,
        Corner::RearRight => 1.5,
    }
}

// === Motor ===

pub fn torque_for_rpm(rpm: f64) -> f64 {
    if rpm <= BASE_SPEED_RPM {
        PEAK_TORQUE
    } else {
        PEAK_TORQUE * BASE_SPEED_RPM / rpm
    }
}

fn motor_temperature_target(t: f64, rpm: f64) -> f64 {
    65.0 + 10.0 * (0.05 * t).sin() + rpm * 0.002
}

fn efficiency_for_temperature(temp: f64) -> f64 {
    92.0 - 0.1 * (temp - 60.0)
}

// === Battery ===

fn soc_deterministic(t: f64) -> f64 {
    100.0 - 95.0 * (t.rem_euclid(SOC_PERIOD_SECS) / SOC_PERIOD_SECS)
}

pub fn pack_voltage_for_soc(soc: f64) -> f64 {
    780.0 + soc / 100.0 * 120.0
}

fn battery_temperature_target(t: f64, soc: f64) -> f64 {
    30.0 + 15.0 * (1.0 - soc / 100.0) + 2.0 * (0.02 * t).sin()
}

pub fn cell_base_voltage(soc: f64) -> f64 {
    3.3 + 0.85 * soc / 100.0
}

// === Chassis ===

/// Scale a g vector back onto the friction circle if it falls outside
pub fn friction_circle(lateral: f64, longitudinal: f64) -> (f64, f64) {
    let magnitude = lateral.hypot(longitudinal);
    if magnitude > FRICTION_CIRCLE_G {
        let scale = FRICTION_CIRCLE_G / magnitude;
        (lateral * scale, longitudinal * scale)
    } else {
        (lateral, longitudinal)
    }
}

fn steering_for_lateral(lateral: f64) -> f64 {
    lateral / 3.5 * 45.0
}

fn throttle_at(t: f64) -> f64 {
    Metric::Throttle.clamp_value(100.0 * PEDAL_WAVE.at(t) + 20.0)
}

fn brake_at(t: f64) -> f64 {
    Metric::Brake.clamp_value(-100.0 * PEDAL_WAVE.at(t) - 20.0)
}

fn suspension_base(corner: Corner) -> f64 {
    if corner.is_front() {
        25.0
    } else {
        28.0
    }
}

fn suspension_travel_at(t: f64, corner: Corner, lateral: f64, longitudinal: f64) -> f64 {
    let bump = Wave::with_phase(BUMP_WAVE_AMPLITUDE, BUMP_WAVE_OMEGA, corner_phase(corner));
    // Outside wheels and the nose under braking compress
    let roll = if corner.is_left() { -lateral } else { lateral } * 2.5;
    let pitch = if corner.is_front() { -longitudinal } else { longitudinal } * 2.0;
    suspension_base(corner) + bump.at(t) + roll + pitch
}

fn suspension_velocity_at(t: f64, corner: Corner) -> f64 {
    Wave::with_phase(BUMP_WAVE_AMPLITUDE, BUMP_WAVE_OMEGA, corner_phase(corner)).rate(t)
}

// === Brakes & tyres ===

fn brake_temperature_target(t: f64, corner: Corner) -> f64 {
    let base = if corner.is_front() { 400.0 } else { 350.0 };
    base + 250.0 * (0.6 * t + corner_phase(corner)).sin().max(0.0)
}

fn tire_temperature_target(t: f64, corner: Corner, speed: f64) -> f64 {
    85.0 + 8.0 * (0.1 * t + corner_phase(corner)).sin() + speed * 0.02
}

pub fn tire_pressure_for_temperature(temp: f64) -> f64 {
    1.8 + 0.1 * (temp - 80.0) / 20.0
}

fn tire_wear_at(t: f64) -> f64 {
    100.0 - t.rem_euclid(TIRE_WEAR_PERIOD_SECS) / TIRE_WEAR_PERIOD_SECS * 60.0
}

// === Aero ===

pub fn downforce_for_speed(speed_kph: f64) -> f64 {
    500.0 + speed_kph / 300.0 * 800.0
}

pub fn drag_for_speed(speed_kph: f64) -> f64 {
    let v = KilometersPerHour(speed_kph).as_meters_per_second();
    0.5 * AIR_DENSITY * DRAG_COEFFICIENT * FRONTAL_AREA * v * v
}

// === Driver ===

/// Driver stress and fatigue, the two inputs every biosignal derives from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverLoad {
    pub stress: f64,
    pub fatigue: f64,
}

fn stress_deterministic(t: f64) -> f64 {
    let lap_position = (t * 0.02).rem_euclid(1.0);
    0.3 + 0.3 * (2.0 * PI * 5.0 * lap_position).sin() + 0.1 * (0.1 * t).sin()
}

fn fatigue_at(t: f64) -> f64 {
    (0.2 + 0.001 * t).min(0.8)
}

fn clamp_stress(value: f64) -> f64 {
    value.clamp(0.1, 0.9)
}

impl DriverLoad {
    pub fn deterministic(t: f64) -> Self {
        Self {
            stress: clamp_stress(stress_deterministic(t)),
            fatigue: fatigue_at(t),
        }
    }

    pub fn sample(t: f64, jitter: &mut dyn JitterSource) -> Self {
        Self {
            stress: clamp_stress(stress_deterministic(t) + jitter.jitter(0.02)),
            fatigue: fatigue_at(t),
        }
    }
}

fn heart_rate_for(load: DriverLoad) -> f64 {
    85.0 + 30.0 * load.stress
}

/// One PQRST complex per beat; `phase` is the position within the beat
pub fn ecg_waveform(phase: f64) -> f64 {
    match phase {
        p if (0.0..0.1).contains(&p) => 0.15 * (p * 10.0 * PI).sin(),
        p if (0.15..0.2).contains(&p) => -0.1 * ((p - 0.15) * 20.0 * PI).sin(),
        p if (0.2..0.25).contains(&p) => ((p - 0.2) * 20.0 * PI).sin(),
        p if (0.25..0.3).contains(&p) => -0.2 * ((p - 0.25) * 20.0 * PI).sin(),
        p if (0.35..0.5).contains(&p) => 0.3 * ((p - 0.35) * 6.67 * PI).sin(),
        _ => 0.0,
    }
}

fn ecg_at(t: f64, heart_rate: f64) -> f64 {
    ecg_waveform((t * heart_rate / 60.0).rem_euclid(1.0))
}

fn focus_for(t: f64, load: DriverLoad) -> f64 {
    0.7 - 0.3 * load.fatigue + 0.1 * (0.2 * t).sin()
}

fn alertness_for(load: DriverLoad) -> f64 {
    1.0 - 0.8 * load.fatigue
}

fn flow_for(focus: f64, load: DriverLoad) -> f64 {
    focus * (1.0 - load.stress)
}

fn readiness_for(focus: f64, alertness: f64, load: DriverLoad) -> f64 {
    ((1.0 - load.stress) + focus + (1.0 - load.fatigue) + alertness) / 4.0
}

/// Value of one metric at `t`.
///
/// `previous` feeds the thermal lag of temperature metrics and is ignored
/// by every other metric.
pub fn generate(
    metric: Metric,
    t: f64,
    previous: Option<f64>,
    jitter: &mut dyn JitterSource,
) -> f64 {
    let raw = match metric {
        Metric::MotorRpm => RPM.sample(t, jitter),
        Metric::MotorTorque => torque_for_rpm(RPM.deterministic(t)) + jitter.jitter(2.0),
        Metric::MotorPower => {
            let rpm = Metric::MotorRpm.clamp_value(RPM.deterministic(t));
            Kilowatts::from_rpm_torque(Rpm(rpm), NewtonMeters(torque_for_rpm(rpm))).0
        }
        Metric::MotorTemperature => {
            let target = motor_temperature_target(t, RPM.deterministic(t));
            thermal_lag(previous, target) + jitter.jitter(0.3)
        }
        Metric::MotorEfficiency => {
            let temp = motor_temperature_target(t, RPM.deterministic(t));
            efficiency_for_temperature(temp) + jitter.jitter(0.2)
        }
        Metric::BatterySoc => soc_deterministic(t) + jitter.jitter(0.1),
        Metric::BatteryVoltage => pack_voltage_for_soc(soc_deterministic(t)) + jitter.jitter(0.5),
        Metric::BatteryCurrent => CURRENT.sample(t, jitter),
        Metric::BatteryTemperature => {
            let target = battery_temperature_target(t, soc_deterministic(t));
            thermal_lag(previous, target) + jitter.jitter(0.1)
        }
        Metric::Speed => SPEED.sample(t, jitter),
        Metric::LateralG => {
            let (lat, _) = friction_circle(LATERAL.sample(t, jitter), LONGITUDINAL.deterministic(t));
            lat
        }
        Metric::LongitudinalG => {
            let (_, long) = friction_circle(LATERAL.deterministic(t), LONGITUDINAL.sample(t, jitter));
            long
        }
        Metric::SteeringAngle => {
            steering_for_lateral(LATERAL.deterministic(t)) + jitter.jitter(0.5)
        }
        Metric::Throttle => throttle_at(t),
        Metric::Brake => brake_at(t),
        Metric::SuspensionTravel(corner) => {
            let (lat, long) =
                friction_circle(LATERAL.deterministic(t), LONGITUDINAL.deterministic(t));
            suspension_travel_at(t, corner, lat, long) + jitter.jitter(0.3)
        }
        Metric::SuspensionVelocity(corner) => suspension_velocity_at(t, corner) + jitter.jitter(2.0),
        Metric::BrakeTemperature(corner) => {
            thermal_lag(previous, brake_temperature_target(t, corner)) + jitter.jitter(2.0)
        }
        Metric::BrakePressure => brake_at(t) * 1.2,
        Metric::BrakeBias => 57.5 + jitter.jitter(0.1),
        Metric::TireTemperature(corner) => {
            let target = tire_temperature_target(t, corner, SPEED.deterministic(t));
            thermal_lag(previous, target) + jitter.jitter(0.2)
        }
        Metric::TirePressure(corner) => {
            let temp = tire_temperature_target(t, corner, SPEED.deterministic(t));
            tire_pressure_for_temperature(temp) + jitter.jitter(0.005)
        }
        Metric::TireWear(_) => tire_wear_at(t),
        Metric::Downforce => downforce_for_speed(SPEED.deterministic(t)) + jitter.jitter(5.0),
        Metric::Drag => drag_for_speed(SPEED.deterministic(t)) + jitter.jitter(10.0),
        Metric::CellVoltage => cell_base_voltage(soc_deterministic(t)) + jitter.jitter(0.015),
        Metric::HeartRate => heart_rate_for(DriverLoad::deterministic(t)) + jitter.jitter(1.0),
        Metric::HrvRmssd => 35.0 - 15.0 * DriverLoad::deterministic(t).stress + jitter.jitter(1.0),
        Metric::Ecg => {
            let hr = heart_rate_for(DriverLoad::deterministic(t));
            ecg_at(t, hr) + jitter.jitter(0.02)
        }
        Metric::SkinConductance => {
            let load = DriverLoad::deterministic(t);
            2.0 + 5.0 * load.stress + 0.5 * (0.1 * t).sin() + jitter.jitter(0.1)
        }
        Metric::RespirationRate => {
            12.0 + 8.0 * DriverLoad::deterministic(t).stress + jitter.jitter(0.3)
        }
        Metric::Spo2 => 98.0 - 2.0 * fatigue_at(t) + jitter.jitter(0.2),
        Metric::SkinTemperature => {
            let load = DriverLoad::deterministic(t);
            33.0 + 1.5 * (0.01 * t).sin() + 2.0 * load.stress + jitter.jitter(0.05)
        }
        Metric::Stress => DriverLoad::sample(t, jitter).stress,
        Metric::Focus => focus_for(t, DriverLoad::deterministic(t)) + jitter.jitter(0.01),
        Metric::Fatigue => fatigue_at(t),
        Metric::Alertness => alertness_for(DriverLoad::deterministic(t)) + jitter.jitter(0.01),
        Metric::FlowState => {
            let load = DriverLoad::deterministic(t);
            flow_for(focus_for(t, load), load) + jitter.jitter(0.01)
        }
        Metric::Readiness => {
            let load = DriverLoad::deterministic(t);
            let focus = Metric::Focus.clamp_value(focus_for(t, load));
            let alertness = Metric::Alertness.clamp_value(alertness_for(load));
            readiness_for(focus, alertness, load)
        }
    };
    metric.clamp_value(raw)
}

// === Section builders ===

/// Motor section. A power map, when selected, scales torque and caps power.
pub fn motor(
    t: f64,
    power_map: Option<&PowerMap>,
    previous: Option<&MotorReading>,
    jitter: &mut dyn JitterSource,
) -> MotorReading {
    let rpm = RPM.sample(t, jitter);
    let nominal = torque_for_rpm(rpm) + jitter.jitter(2.0);
    let torque = Metric::MotorTorque.clamp_value(match power_map {
        Some(map) => map.limit_torque(rpm, nominal),
        None => nominal,
    });
    let power = Metric::MotorPower.clamp_value(Kilowatts::from_rpm_torque(Rpm(rpm), NewtonMeters(torque)).0);

    let prev_temp = previous.and_then(|m| m.temperature).map(|c| c.0);
    let temperature = Metric::MotorTemperature.clamp_value(
        thermal_lag(prev_temp, motor_temperature_target(t, rpm)) + jitter.jitter(0.3),
    );
    debug_assert!(temperature >= AMBIENT_TEMPERATURE);
    let efficiency =
        Metric::MotorEfficiency.clamp_value(efficiency_for_temperature(temperature) + jitter.jitter(0.2));

    MotorReading {
        rpm: Some(Rpm(rpm)),
        torque: Some(NewtonMeters(torque)),
        power: Some(Kilowatts(power)),
        temperature: Some(Celsius(temperature)),
        efficiency: Some(Percent::new(efficiency)),
    }
}

/// Battery section. SoC drains over `stint`, the time since the last recharge.
pub fn battery(
    t: f64,
    stint: f64,
    previous: Option<&BatteryReading>,
    jitter: &mut dyn JitterSource,
) -> BatteryReading {
    let soc = Metric::BatterySoc.clamp_value(soc_deterministic(stint) + jitter.jitter(0.1));
    let voltage = Metric::BatteryVoltage.clamp_value(pack_voltage_for_soc(soc) + jitter.jitter(0.5));
    let current = CURRENT.sample(t, jitter);

    let prev_temp = previous.and_then(|b| b.temperature).map(|c| c.0);
    let temperature = Metric::BatteryTemperature.clamp_value(
        thermal_lag(prev_temp, battery_temperature_target(t, soc)) + jitter.jitter(0.1),
    );

    BatteryReading {
        soc: Some(Percent::new(soc)),
        voltage: Some(Volts(voltage)),
        current: Some(Amperes(current)),
        temperature: Some(Celsius(temperature)),
    }
}

/// Per-cell voltages around a common SoC-derived base
pub fn cells(soc: f64, count: usize, jitter: &mut dyn JitterSource) -> CellMonitoring {
    let base = cell_base_voltage(soc);
    let voltages = (0..count)
        .map(|_| Volts(Metric::CellVoltage.clamp_value(base + jitter.jitter(0.015))))
        .collect();
    CellMonitoring::from_voltages(voltages)
}

pub fn chassis(
    t: f64,
    _previous: Option<&ChassisReading>,
    jitter: &mut dyn JitterSource,
) -> ChassisReading {
    let speed = SPEED.sample(t, jitter);
    let (lateral, longitudinal) =
        friction_circle(LATERAL.sample(t, jitter), LONGITUDINAL.sample(t, jitter));
    let steering = Metric::SteeringAngle.clamp_value(steering_for_lateral(lateral) + jitter.jitter(0.5));

    let suspension = Corners::from_fn(|corner| {
        let travel = Metric::SuspensionTravel(corner)
            .clamp_value(suspension_travel_at(t, corner, lateral, longitudinal) + jitter.jitter(0.3));
        let velocity = Metric::SuspensionVelocity(corner)
            .clamp_value(suspension_velocity_at(t, corner) + jitter.jitter(2.0));
        SuspensionCorner {
            travel: Some(Millimeters(travel)),
            velocity: Some(MillimetersPerSecond(velocity)),
        }
    });

    ChassisReading {
        speed: Some(KilometersPerHour(speed)),
        g_force: Some(GForceVector {
            lateral: Some(GForce(lateral)),
            longitudinal: Some(GForce(longitudinal)),
        }),
        steering_angle: Some(Degrees(steering)),
        throttle: Some(Percent::new(throttle_at(t))),
        brake: Some(Percent::new(brake_at(t))),
        suspension: Some(suspension),
    }
}

/// Brake temperatures lag toward a duty-cycle target; pressure follows the pedal
pub fn brakes(
    t: f64,
    brake_pedal: f64,
    previous: Option<&BrakeReading>,
    jitter: &mut dyn JitterSource,
) -> BrakeReading {
    let prev_temps = previous.and_then(|b| b.temperatures);
    let temperatures = Corners::from_fn(|corner| {
        let prev = prev_temps.and_then(|c| c.at(corner)).map(|c| c.0);
        let temp = Metric::BrakeTemperature(corner)
            .clamp_value(thermal_lag(prev, brake_temperature_target(t, corner)) + jitter.jitter(2.0));
        Some(Celsius(temp))
    });

    BrakeReading {
        temperatures: Some(temperatures),
        pressure: Some(Bar(Metric::BrakePressure.clamp_value(brake_pedal * 1.2))),
        bias: Some(Percent::new(Metric::BrakeBias.clamp_value(57.5 + jitter.jitter(0.1)))),
    }
}

/// Tyre section. Wear accumulates over `stint`, the time on the current set.
pub fn tires(
    t: f64,
    stint: f64,
    speed: f64,
    previous: Option<&TireReading>,
    jitter: &mut dyn JitterSource,
) -> TireReading {
    let prev_corners = previous.and_then(|r| r.corners);
    let wear = tire_wear_at(stint);
    let corners = Corners::from_fn(|corner| {
        let prev = prev_corners
            .and_then(|c| c.at(corner).temperature)
            .map(|c| c.0);
        let temperature = Metric::TireTemperature(corner).clamp_value(
            thermal_lag(prev, tire_temperature_target(t, corner, speed)) + jitter.jitter(0.2),
        );
        let pressure = Metric::TirePressure(corner).clamp_value(tire_pressure_for_temperature(temperature));
        TireCorner {
            temperature: Some(Celsius(temperature)),
            pressure: Some(Bar(pressure)),
            wear: Some(Percent::new(Metric::TireWear(corner).clamp_value(wear))),
        }
    });

    TireReading {
        corners: Some(corners),
    }
}

pub fn aero(speed: f64, jitter: &mut dyn JitterSource) -> AeroReading {
    AeroReading {
        downforce: Some(Kilograms(
            Metric::Downforce.clamp_value(downforce_for_speed(speed) + jitter.jitter(5.0)),
        )),
        drag: Some(Newtons(Metric::Drag.clamp_value(drag_for_speed(speed) + jitter.jitter(10.0)))),
        drag_coefficient: Some(DRAG_COEFFICIENT),
    }
}

/// EEG band power never goes negative
fn band(value: f64, jitter: &mut dyn JitterSource) -> Option<f64> {
    Some((value + jitter.jitter(0.2)).max(0.0))
}

pub fn biosignals(t: f64, load: DriverLoad, jitter: &mut dyn JitterSource) -> Biosignals {
    let heart_rate = Metric::HeartRate.clamp_value(heart_rate_for(load) + jitter.jitter(1.0));

    Biosignals {
        heart_rate: Some(BeatsPerMinute(heart_rate)),
        hrv_rmssd: Some(Milliseconds(
            Metric::HrvRmssd.clamp_value(35.0 - 15.0 * load.stress + jitter.jitter(1.0)),
        )),
        ecg: Some(Millivolts(
            Metric::Ecg.clamp_value(ecg_at(t, heart_rate) + jitter.jitter(0.02)),
        )),
        skin_conductance: Some(Microsiemens(Metric::SkinConductance.clamp_value(
            2.0 + 5.0 * load.stress + 0.5 * (0.1 * t).sin() + jitter.jitter(0.1),
        ))),
        respiration_rate: Some(BreathsPerMinute(
            Metric::RespirationRate.clamp_value(12.0 + 8.0 * load.stress + jitter.jitter(0.3)),
        )),
        spo2: Some(Percent::new(
            Metric::Spo2.clamp_value(98.0 - 2.0 * load.fatigue + jitter.jitter(0.2)),
        )),
        skin_temperature: Some(Celsius(Metric::SkinTemperature.clamp_value(
            33.0 + 1.5 * (0.01 * t).sin() + 2.0 * load.stress + jitter.jitter(0.05),
        ))),
        eeg: Some(EegBands {
            delta: band(4.0 + 2.0 * load.fatigue, jitter),
            theta: band(6.0 + 4.0 * load.fatigue, jitter),
            alpha: band(10.0 - 5.0 * load.stress, jitter),
            beta: band(8.0 + 10.0 * load.stress, jitter),
            gamma: band(3.0 + 2.0 * load.stress, jitter),
        }),
    }
}

pub fn emotional_state(t: f64, load: DriverLoad, jitter: &mut dyn JitterSource) -> EmotionalState {
    let focus = Metric::Focus.clamp_value(focus_for(t, load) + jitter.jitter(0.01));
    let alertness = Metric::Alertness.clamp_value(alertness_for(load) + jitter.jitter(0.01));
    let flow = Metric::FlowState.clamp_value(flow_for(focus, load));
    let readiness = Metric::Readiness.clamp_value(readiness_for(focus, alertness, load));

    EmotionalState {
        stress: Some(Ratio::new(load.stress)),
        focus: Some(Ratio::new(focus)),
        fatigue: Some(Ratio::new(load.fatigue)),
        alertness: Some(Ratio::new(alertness)),
        flow_state: Some(Ratio::new(flow)),
        overall_readiness: Some(Ratio::new(readiness)),
    }
}
