//! Telemetry source trait definition

use crate::model::TelemetrySnapshot;
use anyhow::Result;

/// Trait for anything that produces telemetry snapshots
///
/// Each source is responsible for:
/// - Reporting whether it currently has data to offer
/// - Producing snapshots in the unified TelemetrySnapshot format
pub trait TelemetrySource: Send + Sync {
    /// Get the name of this source (e.g., "Simulator", "Datalog")
    fn name(&self) -> &str;

    /// Check if the source currently has data available
    ///
    /// This should be a lightweight check.
    fn detect(&self) -> bool;

    /// Start reading telemetry data
    fn start(&mut self) -> Result<()>;

    /// Stop reading telemetry data
    fn stop(&mut self) -> Result<()>;

    /// Read the next telemetry snapshot
    ///
    /// Returns:
    /// - `Ok(Some(snapshot))` if a new snapshot is available
    /// - `Ok(None)` if no new data (non-blocking)
    /// - `Err(_)` if an error occurred
    fn read_snapshot(&mut self) -> Result<Option<TelemetrySnapshot>>;

    /// Get whether the source is currently active
    fn is_active(&self) -> bool;
}
