//! Rolling per-metric history
//!
//! Each metric keeps its most recent samples, oldest first. Pushing past
//! capacity evicts from the front.

use crate::error::CoreError;
use crate::metric::Metric;
use crate::model::TelemetrySnapshot;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    default_capacity: usize,
    capacities: HashMap<String, usize>,
    series: HashMap<String, VecDeque<f64>>,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Result<Self, CoreError> {
        if capacity == 0 {
            return Err(CoreError::InvalidCapacity(capacity));
        }
        Ok(Self {
            default_capacity: capacity,
            capacities: HashMap::new(),
            series: HashMap::new(),
        })
    }

    /// Override the capacity of one metric.
    ///
    /// Existing samples beyond the new capacity are evicted oldest first.
    pub fn with_metric_capacity(
        mut self,
        metric: impl Into<String>,
        capacity: usize,
    ) -> Result<Self, CoreError> {
        if capacity == 0 {
            return Err(CoreError::InvalidCapacity(capacity));
        }
        let metric = metric.into();
        if let Some(samples) = self.series.get_mut(&metric) {
            while samples.len() > capacity {
                samples.pop_front();
            }
        }
        self.capacities.insert(metric, capacity);
        Ok(self)
    }

    pub fn capacity_for(&self, metric: &str) -> usize {
        self.capacities
            .get(metric)
            .copied()
            .unwrap_or(self.default_capacity)
    }

    pub fn default_capacity(&self) -> usize {
        self.default_capacity
    }

    /// Append a sample. Non-finite values are dropped.
    pub fn push(&mut self, metric: &str, value: f64) {
        if !value.is_finite() {
            return;
        }
        let capacity = self.capacity_for(metric);
        let samples = self
            .series
            .entry(metric.to_string())
            .or_insert_with(|| VecDeque::with_capacity(capacity));
        samples.push_back(value);
        while samples.len() > capacity {
            samples.pop_front();
        }
    }

    /// Samples oldest to newest; empty when the metric has none
    pub fn series(&self, metric: &str) -> Vec<f64> {
        self.series
            .get(metric)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn latest(&self, metric: &str) -> Option<f64> {
        self.series.get(metric)?.back().copied()
    }

    pub fn len(&self, metric: &str) -> usize {
        self.series.get(metric).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self) -> bool {
        self.series.values().all(VecDeque::is_empty)
    }

    /// Names of every metric with at least one sample, sorted
    pub fn metrics(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .series
            .iter()
            .filter(|(_, s)| !s.is_empty())
            .map(|(k, _)| k.clone())
            .collect();
        names.sort();
        names
    }

    pub fn clear(&mut self) {
        self.series.clear();
    }

    /// Push every tracked metric present in the snapshot
    pub fn record(&mut self, snapshot: &TelemetrySnapshot, metrics: &[Metric]) {
        for metric in metrics {
            if let Some(value) = snapshot.metric(*metric) {
                self.push(&metric.to_string(), value);
            }
        }
    }
}
