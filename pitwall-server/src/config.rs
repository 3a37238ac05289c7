//! Server configuration
//!
//! Settings come from an optional TOML file, then CLI flags override
//! individual keys. Every key has a default, so an empty file (or none at
//! all) is a valid configuration.

use clap::Parser;
use pitwall_core::{ArbitrationPolicy, CoreError, HistoryBuffer, Metric};
use pitwall_sim::{PowerMap, StrategyError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Strategy(#[from] StrategyError),
}

/// Command-line flags
#[derive(Debug, Default, Parser)]
#[command(name = "pitwall", version, about = "Racing telemetry simulation and arbitration service")]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(long, env = "PITWALL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Tick interval in milliseconds
    #[arg(long)]
    pub tick_ms: Option<u64>,

    /// Live/synthetic arbitration policy (truthy or presence)
    #[arg(long)]
    pub policy: Option<ArbitrationPolicy>,

    /// Seed for reproducible jitter
    #[arg(long)]
    pub seed: Option<u64>,

    /// CSV datalog to replay as live telemetry
    #[arg(long)]
    pub datalog: Option<PathBuf>,

    /// Record published snapshots to this NDJSON file
    #[arg(long)]
    pub record: Option<PathBuf>,

    /// Power map preset (1-12) the simulator starts with
    #[arg(long)]
    pub power_map: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub tick_interval_ms: u64,
    /// A posted live snapshot is used for this long after arrival
    pub live_max_age_ms: u64,
    pub policy: ArbitrationPolicy,
    /// Entropy-seeded jitter when unset
    pub seed: Option<u64>,
    pub cell_count: usize,
    /// Power map preset id; the motor runs unrestricted when unset
    pub power_map: Option<u8>,
    pub history_capacity: usize,
    pub history_overrides: BTreeMap<Metric, usize>,
    /// Every metric when unset
    pub tracked_metrics: Option<Vec<Metric>>,
    pub datalog: Option<PathBuf>,
    pub record: Option<PathBuf>,
    /// Comma-separated sections written by the recorder; all when unset
    pub record_fields: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 9100)),
            tick_interval_ms: 100,
            live_max_age_ms: 1000,
            policy: ArbitrationPolicy::default(),
            seed: None,
            cell_count: 96,
            power_map: None,
            history_capacity: 60,
            history_overrides: BTreeMap::new(),
            tracked_metrics: None,
            datalog: None,
            record: None,
            record_fields: None,
        }
    }
}

impl ServerConfig {
    /// Load the file named by `cli.config` (if any) and apply CLI overrides
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(bind) = cli.bind {
            self.bind = bind;
        }
        if let Some(tick_ms) = cli.tick_ms {
            self.tick_interval_ms = tick_ms;
        }
        if let Some(policy) = cli.policy {
            self.policy = policy;
        }
        if let Some(seed) = cli.seed {
            self.seed = Some(seed);
        }
        if let Some(datalog) = &cli.datalog {
            self.datalog = Some(datalog.clone());
        }
        if let Some(record) = &cli.record {
            self.record = Some(record.clone());
        }
        if let Some(power_map) = cli.power_map {
            self.power_map = Some(power_map);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be at least 1".into()));
        }
        if self.history_capacity == 0 {
            return Err(CoreError::InvalidCapacity(0).into());
        }
        if let Some((metric, _)) = self.history_overrides.iter().find(|(_, c)| **c == 0) {
            return Err(ConfigError::Invalid(format!(
                "history override for {} must be at least 1",
                metric
            )));
        }
        if let Some(id) = self.power_map {
            PowerMap::by_id(id).ok_or(StrategyError::UnknownPowerMap(id))?;
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn live_max_age(&self) -> Duration {
        Duration::from_millis(self.live_max_age_ms)
    }

    pub fn tracked_metrics(&self) -> Vec<Metric> {
        self.tracked_metrics.clone().unwrap_or_else(Metric::all)
    }

    /// Empty buffers sized by `history_capacity` and `history_overrides`
    pub fn build_history(&self) -> Result<HistoryBuffer, CoreError> {
        self.history_overrides
            .iter()
            .try_fold(HistoryBuffer::new(self.history_capacity)?, |history, (metric, capacity)| {
                history.with_metric_capacity(metric.to_string(), *capacity)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitwall_core::Corner;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind.port(), 9100);
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
        assert_eq!(config.policy, ArbitrationPolicy::Presence);
        assert_eq!(config.tracked_metrics().len(), Metric::all().len());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let config: ServerConfig = toml::from_str(
            r#"
            bind = "127.0.0.1:9200"
            tick_interval_ms = 50
            policy = "truthy"
            seed = 7
            tracked_metrics = ["motor.rpm", "tires.fl.wear"]

            [history_overrides]
            "bio.ecg" = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.bind.port(), 9200);
        assert_eq!(config.tick_interval_ms, 50);
        assert_eq!(config.policy, ArbitrationPolicy::Truthy);
        assert_eq!(config.seed, Some(7));
        assert_eq!(
            config.tracked_metrics(),
            vec![Metric::MotorRpm, Metric::TireWear(Corner::FrontLeft)]
        );
        assert_eq!(config.history_overrides.get(&Metric::Ecg), Some(&500));
        // Untouched keys keep their defaults
        assert_eq!(config.live_max_age_ms, 1000);

        let history = config.build_history().unwrap();
        assert_eq!(history.capacity_for("bio.ecg"), 500);
        assert_eq!(history.capacity_for("motor.rpm"), 60);
    }

    #[test]
    fn test_unknown_metric_rejected() {
        let result: Result<ServerConfig, _> = toml::from_str(r#"tracked_metrics = ["motor.warp"]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result: Result<ServerConfig, _> = toml::from_str("tick_rate = 5");
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut config = ServerConfig::default();
        let cli = Cli::parse_from([
            "pitwall",
            "--tick-ms",
            "20",
            "--policy",
            "truthy",
            "--bind",
            "127.0.0.1:1234",
            "--power-map",
            "11",
        ]);
        config.apply_cli(&cli);

        assert_eq!(config.tick_interval_ms, 20);
        assert_eq!(config.power_map, Some(11));
        assert_eq!(config.policy, ArbitrationPolicy::Truthy);
        assert_eq!(config.bind.port(), 1234);
    }

    #[test]
    fn test_zero_capacity_invalid() {
        let config = ServerConfig {
            history_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Core(CoreError::InvalidCapacity(0)))
        ));

        let config = ServerConfig {
            tick_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_power_map_invalid() {
        let config: ServerConfig = toml::from_str("power_map = 13").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Strategy(StrategyError::UnknownPowerMap(13)))
        ));

        let config: ServerConfig = toml::from_str("power_map = 8").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pitwall.toml");
        std::fs::write(&path, "history_capacity = 120\n").unwrap();

        let cli = Cli {
            config: Some(path),
            seed: Some(3),
            ..Default::default()
        };
        let config = ServerConfig::load(&cli).unwrap();
        assert_eq!(config.history_capacity, 120);
        assert_eq!(config.seed, Some(3));
    }
}
