//! Error types for the core library

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("history capacity must be at least 1 (got {0})")]
    InvalidCapacity(usize),

    #[error("unknown metric: {0}")]
    UnknownMetric(String),

    #[error("unknown arbitration policy: {0} (expected \"truthy\" or \"presence\")")]
    UnknownPolicy(String),
}
