//! Integration tests for the TelemetrySimulator

use pitwall_core::jitter::{ConstantJitter, JitterSource, SeededJitter};
use pitwall_core::{Corner, Metric, SimulationClock, TelemetrySource};
use pitwall_sim::generators::{self, DEFAULT_CELL_COUNT};
use pitwall_sim::{StrategyError, TelemetrySimulator};
use std::time::Duration;

fn manual_simulator(seed: u64) -> TelemetrySimulator<SeededJitter> {
    TelemetrySimulator::with_jitter(SimulationClock::at_secs(0.0), SeededJitter::new(seed))
}

#[test]
fn test_simulator_name() {
    let simulator = TelemetrySimulator::new();
    assert_eq!(simulator.name(), "Simulator");
}

#[test]
fn test_simulator_detect_always_true() {
    let simulator = TelemetrySimulator::new();
    assert!(simulator.detect(), "Simulator should always be detected");
}

#[test]
fn test_simulator_initially_inactive() {
    let simulator = TelemetrySimulator::default();
    assert!(
        !simulator.is_active(),
        "Simulator should be inactive before start()"
    );
}

#[test]
fn test_read_snapshot_when_inactive_returns_none() {
    let mut simulator = TelemetrySimulator::new();
    let snapshot = simulator.read_snapshot().unwrap();
    assert!(
        snapshot.is_none(),
        "read_snapshot() should return None when inactive"
    );
}

#[test]
fn test_simulator_start_and_stop() {
    let mut simulator = TelemetrySimulator::new();

    simulator.start().expect("start() should succeed");
    assert!(simulator.is_active(), "Simulator should be active after start()");

    simulator.stop().expect("stop() should succeed");
    assert!(
        !simulator.is_active(),
        "Simulator should be inactive after stop()"
    );
}

#[test]
fn test_snapshot_has_every_section() {
    let mut simulator = manual_simulator(1);
    simulator.start().expect("start() should succeed");

    let snapshot = simulator
        .read_snapshot()
        .expect("read_snapshot() should not error")
        .expect("read_snapshot() should return Some after start()");

    assert_eq!(snapshot.source, "simulator");
    assert!(snapshot.motor.is_some(), "motor should be populated");
    assert!(snapshot.battery.is_some(), "battery should be populated");
    assert!(snapshot.chassis.is_some(), "chassis should be populated");
    assert!(snapshot.brakes.is_some(), "brakes should be populated");
    assert!(snapshot.tires.is_some(), "tires should be populated");
    assert!(snapshot.aero.is_some(), "aero should be populated");
    assert!(snapshot.biosignals.is_some(), "biosignals should be populated");
    assert!(
        snapshot.emotional_state.is_some(),
        "emotional_state should be populated"
    );

    let cells = snapshot
        .cell_monitoring
        .as_ref()
        .expect("cell_monitoring should be populated");
    assert_eq!(cells.cell_voltages.len(), DEFAULT_CELL_COUNT);
}

#[test]
fn test_every_metric_present_in_snapshot() {
    let mut simulator = manual_simulator(2);
    let snapshot = simulator.generate_at(37.0);

    for metric in Metric::all() {
        assert!(
            snapshot.metric(metric).is_some(),
            "{} should be populated",
            metric
        );
    }
}

#[test]
fn test_snapshot_values_within_bounds_seeded() {
    let mut simulator = manual_simulator(42);

    // Two full SoC cycles at 0.5 s steps
    for i in 0..3600 {
        let t = i as f64 * 0.5;
        let snapshot = simulator.generate_at(t);
        for metric in Metric::all() {
            let value = snapshot.metric(metric).unwrap();
            let (min, max) = metric.bounds();
            assert!(
                (min..=max).contains(&value),
                "{} = {} outside [{}, {}] at t={}",
                metric,
                value,
                min,
                max,
                t
            );
        }
    }
}

#[test]
fn test_generate_within_bounds_with_extreme_jitter() {
    for unit in [0.0, 1.0] {
        let mut jitter = ConstantJitter::new(unit);
        let mut previous = None;
        for i in 0..2000 {
            let t = i as f64 * 1.7;
            for metric in Metric::all() {
                let value = generators::generate(metric, t, previous, &mut jitter);
                let (min, max) = metric.bounds();
                assert!(
                    (min..=max).contains(&value),
                    "{} = {} outside [{}, {}] at t={}",
                    metric,
                    value,
                    min,
                    max,
                    t
                );
            }
            previous = Some(70.0);
        }
    }
}

#[test]
fn test_motor_temperature_never_below_ambient() {
    let mut simulator =
        TelemetrySimulator::with_jitter(SimulationClock::at_secs(0.0), ConstantJitter::new(0.0));
    for i in 0..1000 {
        let snapshot = simulator.generate_at(i as f64);
        let temp = snapshot.metric(Metric::MotorTemperature).unwrap();
        assert!(temp >= 25.0, "motor temperature {} below ambient", temp);
    }
}

#[test]
fn test_thermal_lag_smooths_temperature() {
    let mut simulator =
        TelemetrySimulator::with_jitter(SimulationClock::at_secs(0.0), ConstantJitter::centered());

    let first = simulator.generate_at(0.0);
    let second = simulator.generate_at(60.0);

    let t0 = first.metric(Metric::MotorTemperature).unwrap();
    let t1 = second.metric(Metric::MotorTemperature).unwrap();
    let target = generators::generate(Metric::MotorTemperature, 60.0, None, &mut ConstantJitter::centered());

    // One sample only closes a tenth of the gap
    assert!((t1 - (t0 + 0.1 * (target - t0))).abs() < 1.0);
}

#[test]
fn test_manual_clock_drives_sim_time() {
    let mut simulator = manual_simulator(3);
    simulator.clock_mut().advance(Duration::from_secs(10));

    let snapshot = simulator.generate();
    assert!((snapshot.sim_time.0 - 10.0).abs() < 1e-9);

    let expected = 4000.0 + 3500.0 * 4.0_f64.sin() + 1000.0 * 15.0_f64.sin();
    let rpm = snapshot.metric(Metric::MotorRpm).unwrap();
    assert!((rpm - expected).abs() <= 50.0, "rpm {} vs {}", rpm, expected);
}

#[test]
fn test_cell_count_is_configurable() {
    let mut simulator = manual_simulator(4).with_cell_count(12);
    let snapshot = simulator.generate_at(5.0);
    assert_eq!(snapshot.cell_monitoring.unwrap().cell_voltages.len(), 12);
}

#[test]
fn test_power_matches_rpm_and_torque() {
    let mut simulator = manual_simulator(5);
    let snapshot = simulator.generate_at(12.0);
    let motor = snapshot.motor.unwrap();

    let rpm = motor.rpm.unwrap().0;
    let torque = motor.torque.unwrap().0;
    let power = motor.power.unwrap().0;
    assert!((power - rpm * torque / 9549.0).abs() < 1e-6);
}

#[test]
fn test_snapshot_serializes_to_json() {
    let mut simulator = manual_simulator(6);
    let snapshot = simulator.generate_at(1.0);

    let json = serde_json::to_string(&snapshot).expect("Snapshot should serialize to JSON");
    let parsed: serde_json::Value =
        serde_json::from_str(&json).expect("JSON should be parseable");
    assert_eq!(parsed["source"], "simulator");
    assert!(parsed["motor"]["rpm"].is_number());
}

fn assert_cells_within_bounds<J: JitterSource>(mut simulator: TelemetrySimulator<J>) {
    // One full SoC cycle, so the pack goes from full to nearly empty
    for i in 0..=1800 {
        let t = i as f64 * 0.5;
        let cells = simulator.generate_at(t).cell_monitoring.unwrap();
        assert_eq!(cells.cell_voltages.len(), DEFAULT_CELL_COUNT);
        for (idx, voltage) in cells.cell_voltages.iter().enumerate() {
            assert!(
                (3.0..=4.2).contains(&voltage.0),
                "cell {} = {} outside [3.0, 4.2] at t={}",
                idx,
                voltage.0,
                t
            );
        }
    }
}

#[test]
fn test_cell_voltages_within_bounds_seeded() {
    for seed in [1, 42, 9001] {
        assert_cells_within_bounds(manual_simulator(seed));
    }
}

#[test]
fn test_cell_voltages_within_bounds_with_extreme_jitter() {
    for unit in [0.0, 1.0] {
        assert_cells_within_bounds(TelemetrySimulator::with_jitter(
            SimulationClock::at_secs(0.0),
            ConstantJitter::new(unit),
        ));
    }
}

// ==================== Strategy ====================

fn centered_simulator() -> TelemetrySimulator<ConstantJitter> {
    TelemetrySimulator::with_jitter(SimulationClock::at_secs(0.0), ConstantJitter::centered())
}

#[test]
fn test_power_map_scales_motor_output() {
    let mut unrestricted = centered_simulator();
    let mut eco = centered_simulator().with_power_map(Some(1)).unwrap();

    for t in [5.0, 40.0, 125.0] {
        let base = unrestricted.generate_at(t).motor.unwrap();
        let scaled = eco.generate_at(t).motor.unwrap();

        assert_eq!(base.rpm, scaled.rpm);
        let ratio = scaled.torque.unwrap().0 / base.torque.unwrap().0;
        assert!((ratio - 0.7).abs() < 1e-9, "ECO torque ratio {} at t={}", ratio, t);
        let power = scaled.power.unwrap().0;
        assert!((power - scaled.rpm.unwrap().0 * scaled.torque.unwrap().0 / 9549.0).abs() < 1e-6);
        assert!(power <= 200.0);
    }
}

#[test]
fn test_unknown_power_map_rejected() {
    assert_eq!(
        centered_simulator().with_power_map(Some(0)).err(),
        Some(StrategyError::UnknownPowerMap(0))
    );
}

#[test]
fn test_attack_mode_follows_clock() {
    let mut simulator = centered_simulator().with_power_map(Some(12)).unwrap();
    simulator.clock_mut().advance(Duration::from_secs(10));

    simulator.activate_attack_mode().unwrap();
    let status = simulator.strategy();
    assert!(status.attack_mode.active);
    assert_eq!(status.power_map.map(|m| m.name), Some("ATTACK"));

    simulator.clock_mut().advance(Duration::from_secs(240));
    simulator.generate();
    let status = simulator.strategy();
    assert!(!status.attack_mode.active);
    assert_eq!(status.power_map.map(|m| m.name), Some("SAFETY"));
    assert_eq!(status.attack_mode.activations_left, 1);
}

#[test]
fn test_pit_stop_recharges_and_fits_fresh_tires() {
    let mut simulator = centered_simulator();
    for i in 0..=600 {
        simulator.generate_at(i as f64);
    }
    let worn = simulator.generate_at(600.0);
    assert!(worn.battery.unwrap().soc.unwrap().0 < 50.0);
    let worn_tires = worn.tires.unwrap().corners.unwrap();
    assert!((worn_tires.front_left.wear.unwrap().0 - 90.0).abs() < 1e-9);

    simulator.pit_stop_at(600.0);
    let fresh = simulator.generate_at(600.0);
    assert!(fresh.battery.unwrap().soc.unwrap().0 > 99.0);

    let corners = fresh.tires.unwrap().corners.unwrap();
    for corner in Corner::ALL {
        let tire = corners.at(corner);
        assert_eq!(tire.wear.unwrap().0, 100.0);
        let temperature = tire.temperature.unwrap().0;
        assert!((temperature - 90.0).abs() < 2.0, "{:?} tyre at {}", corner, temperature);
    }

    // The stint clock runs from the stop
    let later = simulator.generate_at(1050.0);
    let soc = later.battery.unwrap().soc.unwrap().0;
    assert!((soc - 52.5).abs() < 0.2, "SoC {} halfway through the stint", soc);
    assert_eq!(simulator.strategy().pit_stops, 1);
}
