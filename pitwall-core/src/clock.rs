//! Simulation clock
//!
//! Every generator takes its phase from an explicit clock value rather than
//! reading ambient wall time, so tests can pin time exactly.

use crate::units::Seconds;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
enum ClockMode {
    /// Backed by a monotonic `Instant`
    Wall { started: Instant },
    /// Only moves when told to
    Manual,
}

/// Monotonically increasing simulation time in seconds
#[derive(Debug, Clone)]
pub struct SimulationClock {
    mode: ClockMode,
    /// Manual time, or extra offset applied on top of wall time
    offset: Duration,
}

impl SimulationClock {
    /// Clock that follows real elapsed time from now
    pub fn wall() -> Self {
        Self {
            mode: ClockMode::Wall {
                started: Instant::now(),
            },
            offset: Duration::ZERO,
        }
    }

    /// Clock that stays at `start` until advanced
    pub fn manual(start: Duration) -> Self {
        Self {
            mode: ClockMode::Manual,
            offset: start,
        }
    }

    /// Convenience for a manual clock starting at `secs`
    ///
    /// Negative or non-finite values start at zero. Values past
    /// `Duration::MAX` saturate.
    pub fn at_secs(secs: f64) -> Self {
        let secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
        Self::manual(Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX))
    }

    /// Current simulation time
    pub fn now(&self) -> Seconds {
        let elapsed = match &self.mode {
            ClockMode::Wall { started } => started.elapsed().saturating_add(self.offset),
            ClockMode::Manual => self.offset,
        };
        Seconds(elapsed.as_secs_f64())
    }

    /// Move the clock forward, saturating at `Duration::MAX`. Time never
    /// goes backwards.
    pub fn advance(&mut self, dt: Duration) {
        self.offset = self.offset.saturating_add(dt);
    }

    pub fn is_manual(&self) -> bool {
        matches!(self.mode, ClockMode::Manual)
    }
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::wall()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_stays_put() {
        let clock = SimulationClock::at_secs(10.0);
        assert_eq!(clock.now(), Seconds(10.0));
        assert_eq!(clock.now(), Seconds(10.0));
        assert!(clock.is_manual());
    }

    #[test]
    fn test_manual_clock_advances() {
        let mut clock = SimulationClock::manual(Duration::ZERO);
        clock.advance(Duration::from_millis(250));
        clock.advance(Duration::from_millis(750));
        assert!((clock.now().0 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_start_is_clamped() {
        assert_eq!(SimulationClock::at_secs(-5.0).now(), Seconds(0.0));
        assert_eq!(SimulationClock::at_secs(f64::NAN).now(), Seconds(0.0));
    }

    #[test]
    fn test_huge_start_and_advance_saturate() {
        let mut clock = SimulationClock::at_secs(1e300);
        assert_eq!(clock.now(), Seconds(Duration::MAX.as_secs_f64()));

        clock.advance(Duration::MAX);
        assert_eq!(clock.now(), Seconds(Duration::MAX.as_secs_f64()));

        let mut wall = SimulationClock::wall();
        wall.advance(Duration::MAX);
        wall.advance(Duration::from_secs(1));
        assert_eq!(wall.now(), Seconds(Duration::MAX.as_secs_f64()));
    }

    #[test]
    fn test_wall_clock_is_monotonic() {
        let clock = SimulationClock::wall();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
        assert!(!clock.is_manual());
    }

    #[test]
    fn test_wall_clock_advance_adds_offset() {
        let mut clock = SimulationClock::wall();
        clock.advance(Duration::from_secs(60));
        assert!(clock.now().0 >= 60.0);
    }
}
