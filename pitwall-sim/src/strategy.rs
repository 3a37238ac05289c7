//! Race strategy controls for the simulator
//!
//! Power map presets scale the motor's torque and cap its power output.
//! Attack mode temporarily switches to the attack preset. A pit stop starts
//! a new stint, which refills the battery and fits fresh tyres.

use serde::Serialize;
use thiserror::Error;

/// Length of one attack mode window
pub const ATTACK_MODE_SECS: f64 = 240.0;

/// Attack mode activations allowed per session
pub const MAX_ATTACK_ACTIVATIONS: u32 = 2;

/// Preset that attack mode switches to
pub const ATTACK_POWER_MAP: u8 = 7;

/// Tyre carcass temperature after a tyre change
pub const FRESH_TIRE_TEMPERATURE: f64 = 90.0;

/// A motor power preset
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerMap {
    pub id: u8,
    pub name: &'static str,
    /// Maximum motor output in kW
    pub power_limit: f64,
    /// Share of the nominal torque curve made available
    pub torque_pct: f64,
}

const fn preset(id: u8, name: &'static str, power_limit: f64, torque_pct: f64) -> PowerMap {
    PowerMap {
        id,
        name,
        power_limit,
        torque_pct,
    }
}

pub const POWER_MAPS: [PowerMap; 12] = [
    preset(1, "ECO", 200.0, 70.0),
    preset(2, "ECO+", 220.0, 75.0),
    preset(3, "WET", 180.0, 60.0),
    preset(4, "WET+", 200.0, 65.0),
    preset(5, "RACE", 300.0, 90.0),
    preset(6, "RACE+", 320.0, 95.0),
    preset(7, "ATTACK", 350.0, 100.0),
    preset(8, "QUALI", 350.0, 100.0),
    preset(9, "PUSH", 330.0, 98.0),
    preset(10, "DEFEND", 280.0, 85.0),
    preset(11, "HARVEST", 250.0, 80.0),
    preset(12, "SAFETY", 150.0, 50.0),
];

impl PowerMap {
    /// Preset by its 1-based id
    pub fn by_id(id: u8) -> Option<PowerMap> {
        POWER_MAPS.iter().copied().find(|map| map.id == id)
    }

    /// Scale `torque` by the preset and cap it so `rpm * torque` stays
    /// within the power limit
    pub fn limit_torque(&self, rpm: f64, torque: f64) -> f64 {
        let scaled = torque * self.torque_pct / 100.0;
        if rpm > 0.0 {
            scaled.min(self.power_limit * 9549.0 / rpm)
        } else {
            scaled
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StrategyError {
    #[error("unknown power map: {0} (expected 1-12)")]
    UnknownPowerMap(u8),

    #[error("attack mode is already active")]
    AttackModeActive,

    #[error("attack mode used {0} times, no activations left")]
    AttackModeExhausted(u32),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AttackModeStatus {
    pub active: bool,
    pub remaining_secs: f64,
    pub activations: u32,
    pub activations_left: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyStatus {
    /// Preset in effect, `None` when the motor runs unrestricted
    pub power_map: Option<PowerMap>,
    pub attack_mode: AttackModeStatus,
    pub pit_stops: u32,
    pub stint_secs: f64,
}

/// Mutable strategy state owned by the simulator
#[derive(Debug, Clone, Default)]
pub struct Strategy {
    power_map: Option<PowerMap>,
    /// Preset to restore when attack mode ends
    before_attack: Option<Option<PowerMap>>,
    attack_until: Option<f64>,
    attack_activations: u32,
    stint_start: f64,
    pit_stops: u32,
}

impl Strategy {
    pub fn power_map(&self) -> Option<PowerMap> {
        self.power_map
    }

    /// Select a preset, or clear it with `None`. While attack mode runs the
    /// selection takes effect once it ends.
    pub fn set_power_map(&mut self, id: Option<u8>) -> Result<(), StrategyError> {
        let map = match id {
            Some(id) => Some(PowerMap::by_id(id).ok_or(StrategyError::UnknownPowerMap(id))?),
            None => None,
        };
        match self.before_attack.as_mut() {
            Some(restore) => *restore = map,
            None => self.power_map = map,
        }
        Ok(())
    }

    pub fn activate_attack_mode(&mut self, t: f64) -> Result<(), StrategyError> {
        self.update(t);
        if self.attack_until.is_some() {
            return Err(StrategyError::AttackModeActive);
        }
        if self.attack_activations >= MAX_ATTACK_ACTIVATIONS {
            return Err(StrategyError::AttackModeExhausted(self.attack_activations));
        }

        self.before_attack = Some(self.power_map);
        self.power_map = PowerMap::by_id(ATTACK_POWER_MAP);
        self.attack_until = Some(t + ATTACK_MODE_SECS);
        self.attack_activations += 1;
        Ok(())
    }

    /// Expire attack mode once its window has passed
    pub fn update(&mut self, t: f64) {
        if let Some(until) = self.attack_until {
            if t >= until {
                self.attack_until = None;
                self.power_map = self.before_attack.take().flatten();
            }
        }
    }

    /// Start a new stint at `t`
    pub fn pit_stop(&mut self, t: f64) {
        self.stint_start = t;
        self.pit_stops += 1;
    }

    /// Seconds since the current stint started
    pub fn stint_time(&self, t: f64) -> f64 {
        (t - self.stint_start).max(0.0)
    }

    /// Start a fresh session, keeping the selected preset
    pub fn restart(&mut self) {
        if let Some(restore) = self.before_attack.take() {
            self.power_map = restore;
        }
        self.attack_until = None;
        self.attack_activations = 0;
        self.stint_start = 0.0;
        self.pit_stops = 0;
    }

    pub fn status(&self, t: f64) -> StrategyStatus {
        let remaining_secs = self.attack_until.map(|until| (until - t).max(0.0)).unwrap_or(0.0);
        StrategyStatus {
            power_map: self.power_map,
            attack_mode: AttackModeStatus {
                active: self.attack_until.is_some(),
                remaining_secs,
                activations: self.attack_activations,
                activations_left: MAX_ATTACK_ACTIVATIONS.saturating_sub(self.attack_activations),
            },
            pit_stops: self.pit_stops,
            stint_secs: self.stint_time(t),
        }
    }
}
