//! Pitwall Server Library
//!
//! Runs the tick pipeline on a timer and serves the results over HTTP.

pub mod api;
pub mod config;
pub mod ingest;
pub mod manager;
pub mod recorder;
pub mod state;
