//! Pitwall Core Library
//!
//! This crate provides the telemetry data model, the live/synthetic
//! arbitration policy and the rolling history buffers shared by the
//! simulator and the host service.

pub mod arbitration;
pub mod clock;
pub mod error;
pub mod history;
pub mod jitter;
pub mod metric;
pub mod model;
pub mod source;
pub mod status;
pub mod units;

pub use arbitration::{Arbiter, ArbitrationPolicy, FieldSources, Origin};
pub use clock::SimulationClock;
pub use error::CoreError;
pub use history::HistoryBuffer;
pub use jitter::JitterSource;
pub use metric::{Corner, Metric};
pub use model::{FieldMask, TelemetrySnapshot};
pub use source::TelemetrySource;
