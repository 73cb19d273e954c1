//! Hierarchical configuration: a TOML file layered with
//! `ARBOT_*` environment overrides, with secrets accepted only from the
//! environment. A subset of fields can be hot-reloaded; the rest require a
//! restart, enforced by [`Config::diff_requires_restart`].

use std::collections::HashMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::core::domain::ExchangeId;
use crate::core::execution::ExecutorConfig;
use crate::core::market::StalenessPolicy;
use crate::core::risk::RiskConfig;
use crate::core::strategy::{FeeSchedule, SpatialConfig, TriangularConfig};
use crate::error::ConfigError;

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_metrics_addr")]
    pub metrics_addr: String,
    #[serde(default = "default_control_socket")]
    pub control_socket: std::path::PathBuf,
    #[serde(default)]
    pub execution_mode: ExecutionModeConfig,
    /// Starting portfolio equity, the baseline the drawdown monitor
    /// measures against.
    #[serde(default = "default_starting_equity_usd")]
    pub starting_equity_usd: Decimal,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            metrics_addr: default_metrics_addr(),
            control_socket: default_control_socket(),
            execution_mode: ExecutionModeConfig::default(),
            starting_equity_usd: default_starting_equity_usd(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_metrics_addr() -> String {
    "0.0.0.0:9898".to_string()
}
fn default_control_socket() -> std::path::PathBuf {
    std::path::PathBuf::from("/tmp/arbot.sock")
}
fn default_starting_equity_usd() -> Decimal {
    Decimal::new(10_000, 0)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionModeConfig {
    Backtest,
    #[default]
    Paper,
    Live,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default)]
    pub taker_fee_pct: Decimal,
    #[serde(default = "default_rate_limit_weight_per_minute")]
    pub rate_limit_weight_per_minute: u32,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub api_secret_env: Option<String>,
}

const fn default_rate_limit_weight_per_minute() -> u32 {
    1200
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExchangesConfig {
    pub enabled: Vec<String>,
    #[serde(flatten)]
    pub per_exchange: HashMap<String, ExchangeConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectorConfig {
    #[serde(default)]
    pub spatial: SpatialConfig,
    pub triangular: Option<TriangularConfig>,
}

/// Top-level configuration, assembled from `config.toml` plus `ARBOT_*`
/// environment overrides (secrets are environment-only and never read from
/// the file).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub system: SystemConfig,
    pub symbols: Vec<String>,
    pub exchanges: ExchangesConfig,
    pub detector: DetectorConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub execution: ExecutorConfig,
    #[serde(default)]
    pub market: StalenessPolicy,
}

impl Config {
    /// Load from a TOML file, then apply `ARBOT_*` environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::ReadFile { path: path.display().to_string(), source })?;
        let mut config: Self = toml::from_str(&raw)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Environment variables win over the file for the handful of fields
    /// operators commonly flip per-deployment; everything else (detector
    /// thresholds, risk limits) is file-only to keep the audit trail in
    /// version control.
    fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("ARBOT_LOG_LEVEL") {
            self.system.log_level = level;
        }
        if let Ok(addr) = std::env::var("ARBOT_METRICS_ADDR") {
            self.system.metrics_addr = addr;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.exchanges.enabled.is_empty() {
            return Err(ConfigError::MissingField { field: "exchanges.enabled" });
        }
        if self.symbols.is_empty() {
            return Err(ConfigError::MissingField { field: "symbols" });
        }
        for name in &self.exchanges.enabled {
            if !self.exchanges.per_exchange.contains_key(name) {
                return Err(ConfigError::InvalidValue {
                    field: "exchanges.enabled",
                    reason: format!("exchange `{name}` is enabled but has no `[exchanges.{name}]` section"),
                });
            }
        }
        Ok(())
    }

    /// Live-mode reload is restricted to non-disruptive fields (log level,
    /// risk limits can tighten but not loosen symbol/exchange sets without a
    /// restart). Returns the first disruptive field name found, if any.
    #[must_use]
    pub fn diff_requires_restart(&self, new: &Self) -> Option<&'static str> {
        if self.exchanges.enabled != new.exchanges.enabled {
            return Some("exchanges.enabled");
        }
        if self.symbols != new.symbols {
            return Some("symbols");
        }
        if self.system.execution_mode != new.system.execution_mode {
            return Some("system.execution_mode");
        }
        None
    }

    /// Rebuild a [`FeeSchedule`] from `exchanges.per_exchange`, used both at
    /// startup and after a reload that only touches fee tables.
    #[must_use]
    pub fn fee_schedule(&self) -> FeeSchedule {
        let mut schedule = FeeSchedule::default();
        for (name, exchange) in &self.exchanges.per_exchange {
            schedule.set(ExchangeId::from(name.as_str()), exchange.taker_fee_pct);
        }
        schedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_toml(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const MINIMAL: &str = r#"
        symbols = ["BTC/USDT"]

        [system]

        [exchanges]
        enabled = ["binance"]

        [exchanges.binance]
        taker_fee_pct = "0.1"

        [detector.spatial]
    "#;

    #[test]
    fn loads_minimal_valid_config() {
        let file = write_toml(MINIMAL);
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.exchanges.enabled, vec!["binance".to_string()]);
    }

    #[test]
    fn rejects_enabled_exchange_without_section() {
        let toml = r#"
            symbols = ["BTC/USDT"]

            [system]

            [exchanges]
            enabled = ["kraken"]

            [exchanges.binance]
            taker_fee_pct = "0.1"

            [detector.spatial]
        "#;
        let file = write_toml(toml);
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn restart_required_when_enabled_exchanges_change() {
        let file = write_toml(MINIMAL);
        let a = Config::load(file.path()).unwrap();
        let mut b = a.clone();
        b.exchanges.enabled.push("kraken".to_string());
        assert_eq!(a.diff_requires_restart(&b), Some("exchanges.enabled"));
    }

    #[test]
    fn no_restart_required_for_unchanged_config() {
        let file = write_toml(MINIMAL);
        let a = Config::load(file.path()).unwrap();
        let b = a.clone();
        assert_eq!(a.diff_requires_restart(&b), None);
    }
}
