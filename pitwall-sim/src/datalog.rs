//! CSV datalog replay
//!
//! Plays back a car datalog one row per read, looping at the end. Header
//! names may carry a unit suffix (`BAMOVolt(V)`, `APPS(%)`); the suffix is
//! ignored when matching columns.
//!
//! Only what the log actually recorded is reported. A missing column or an
//! empty/unparsable cell leaves the field absent so the simulator fills it
//! in, rather than reading as zero.

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use pitwall_core::model::*;
use pitwall_core::units::*;
use pitwall_core::TelemetrySource;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Motor turns per wheel turn
const WHEEL_TO_MOTOR_RATIO: f64 = 4.0;

mod column {
    pub const WHEEL_RPM_LEFT: &str = "wheel_rpm_left";
    pub const WHEEL_RPM_RIGHT: &str = "wheel_rpm_right";
    pub const MOTOR_POWER_W: &str = "bamopower";
    pub const MOTOR_TEMP: &str = "motortemp";
    pub const PACK_VOLTAGE: &str = "bamovolt";
    pub const PACK_CURRENT: &str = "bamoamp";
    pub const PACK_TEMP: &str = "bamotemp";
    pub const ACCEL_LONGITUDINAL: &str = "imu_accelx";
    pub const ACCEL_LATERAL: &str = "imu_accely";
    pub const SPEED: &str = "gps_speed";
    pub const THROTTLE: &str = "apps";
    pub const BRAKE: &str = "bpps";
    pub const STROKE_FRONT_LEFT: &str = "stroke1_mm";
    pub const STROKE_FRONT_RIGHT: &str = "stroke2_mm";
}

/// `"BAMOVolt(V)"` -> `"bamovolt"`
fn normalize_header(header: &str) -> String {
    let name = match header.find('(') {
        Some(idx) => &header[..idx],
        None => header,
    };
    name.trim().to_lowercase()
}

pub struct DatalogReplay {
    columns: HashMap<String, usize>,
    rows: Vec<StringRecord>,
    cursor: usize,
    loops: u64,
    active: bool,
}

impl DatalogReplay {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open datalog {}", path.display()))?;
        let replay = Self::from_reader(file)
            .with_context(|| format!("Failed to parse datalog {}", path.display()))?;
        info!(
            path = %path.display(),
            rows = replay.len(),
            columns = replay.columns.len(),
            "Loaded datalog"
        );
        Ok(replay)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns = reader
            .headers()
            .context("Failed to read datalog header")?
            .iter()
            .enumerate()
            .map(|(idx, name)| (normalize_header(name), idx))
            .collect();

        let rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read datalog rows")?;

        Ok(Self {
            columns,
            rows,
            cursor: 0,
            loops: 0,
            active: false,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the next row to be played
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Completed passes over the log
    pub fn loops(&self) -> u64 {
        self.loops
    }

    fn value(&self, row: &StringRecord, column: &str) -> Option<f64> {
        let idx = *self.columns.get(column)?;
        row.get(idx)?
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }

    /// Snapshot for one row, without advancing playback
    pub fn snapshot_at(&self, index: usize) -> Option<TelemetrySnapshot> {
        let row = self.rows.get(index)?;
        let v = |column: &str| self.value(row, column);

        let wheel_rpm = match (v(column::WHEEL_RPM_LEFT), v(column::WHEEL_RPM_RIGHT)) {
            (Some(l), Some(r)) => Some((l + r) / 2.0),
            (one, other) => one.or(other),
        };
        let motor = MotorReading {
            rpm: wheel_rpm.map(|w| Rpm(w * WHEEL_TO_MOTOR_RATIO)),
            power: v(column::MOTOR_POWER_W).map(|w| Kilowatts(w / 1000.0)),
            temperature: v(column::MOTOR_TEMP).map(Celsius),
            ..Default::default()
        };

        let battery = BatteryReading {
            voltage: v(column::PACK_VOLTAGE).map(Volts),
            current: v(column::PACK_CURRENT).map(Amperes),
            temperature: v(column::PACK_TEMP).map(Celsius),
            ..Default::default()
        };

        let g_force = GForceVector {
            lateral: v(column::ACCEL_LATERAL).map(GForce),
            longitudinal: v(column::ACCEL_LONGITUDINAL).map(GForce),
        };
        let stroke = |column: &str| SuspensionCorner {
            travel: v(column).map(Millimeters),
            velocity: None,
        };
        let suspension = Corners {
            front_left: stroke(column::STROKE_FRONT_LEFT),
            front_right: stroke(column::STROKE_FRONT_RIGHT),
            rear_left: SuspensionCorner::default(),
            rear_right: SuspensionCorner::default(),
        };
        let chassis = ChassisReading {
            speed: v(column::SPEED).map(KilometersPerHour),
            g_force: present(g_force),
            steering_angle: None,
            throttle: v(column::THROTTLE).map(Percent::new),
            brake: v(column::BRAKE).map(Percent::new),
            suspension: present(suspension),
        };

        let mut snapshot = TelemetrySnapshot::new("datalog");
        snapshot.motor = present(motor);
        snapshot.battery = present(battery);
        snapshot.chassis = present(chassis);
        Some(snapshot)
    }
}

/// `Some` unless every field is absent
fn present<T: Default + PartialEq>(section: T) -> Option<T> {
    if section == T::default() {
        None
    } else {
        Some(section)
    }
}

impl TelemetrySource for DatalogReplay {
    fn name(&self) -> &str {
        "Datalog"
    }

    fn detect(&self) -> bool {
        !self.rows.is_empty()
    }

    fn start(&mut self) -> Result<()> {
        self.active = true;
        self.cursor = 0;
        info!(rows = self.rows.len(), "Datalog replay started");
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.active = false;
        info!(loops = self.loops, "Datalog replay stopped");
        Ok(())
    }

    fn read_snapshot(&mut self) -> Result<Option<TelemetrySnapshot>> {
        if !self.active || self.rows.is_empty() {
            return Ok(None);
        }

        let snapshot = self.snapshot_at(self.cursor);
        self.cursor += 1;
        if self.cursor >= self.rows.len() {
            self.cursor = 0;
            self.loops += 1;
            debug!(loops = self.loops, "Datalog wrapped to start");
        }
        Ok(snapshot)
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
