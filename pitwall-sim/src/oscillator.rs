//! Sum-of-sines signal shapes

use pitwall_core::jitter::JitterSource;
use pitwall_core::Metric;

/// One sinusoidal component: `amplitude * sin(omega * t + phase)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wave {
    pub amplitude: f64,
    /// Angular frequency in rad/s
    pub omega: f64,
    pub phase: f64,
}

impl Wave {
    pub const fn new(amplitude: f64, omega: f64) -> Self {
        Self {
            amplitude,
            omega,
            phase: 0.0,
        }
    }

    pub const fn with_phase(amplitude: f64, omega: f64, phase: f64) -> Self {
        Self {
            amplitude,
            omega,
            phase,
        }
    }

    pub fn at(&self, t: f64) -> f64 {
        self.amplitude * (self.omega * t + self.phase).sin()
    }

    /// Time derivative at `t`
    pub fn rate(&self, t: f64) -> f64 {
        self.amplitude * self.omega * (self.omega * t + self.phase).cos()
    }
}

/// A base level plus sinusoids plus bounded jitter, clamped to a metric's range
#[derive(Debug, Clone, Copy)]
pub struct Oscillator {
    pub base: f64,
    pub waves: &'static [Wave],
    /// Half-width of the uniform jitter band
    pub jitter: f64,
    pub metric: Metric,
}

impl Oscillator {
    pub const fn new(metric: Metric, base: f64, waves: &'static [Wave], jitter: f64) -> Self {
        Self {
            base,
            waves,
            jitter,
            metric,
        }
    }

    /// Noise-free value at `t`, not clamped
    pub fn deterministic(&self, t: f64) -> f64 {
        self.base + self.waves.iter().map(|w| w.at(t)).sum::<f64>()
    }

    /// Jittered, clamped sample at `t`
    pub fn sample(&self, t: f64, jitter: &mut dyn JitterSource) -> f64 {
        let value = self.deterministic(t) + jitter.jitter(self.jitter);
        self.metric.clamp_value(value)
    }
}
