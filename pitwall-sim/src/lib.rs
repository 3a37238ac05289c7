//! Telemetry sources for Pitwall
//!
//! - [`TelemetrySimulator`]: closed-form synthetic signals driven by a
//!   simulation clock and an injectable jitter source
//! - [`DatalogReplay`]: loops over a recorded CSV datalog
//! - [`Strategy`]: power map presets, attack mode and pit stops
//! - [`TelemetryEngine`]: the per-tick pipeline (generate, arbitrate,
//!   classify, buffer)

pub mod datalog;
pub mod engine;
pub mod generators;
pub mod oscillator;
pub mod simulator;
pub mod strategy;

pub use datalog::DatalogReplay;
pub use engine::{Tick, TelemetryEngine};
pub use oscillator::{Oscillator, Wave};
pub use simulator::TelemetrySimulator;
pub use strategy::{PowerMap, Strategy, StrategyError, StrategyStatus};
