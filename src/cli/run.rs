//! Handler for the `run` command.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::app::config::{Config, ExecutionModeConfig};
use crate::app::{AppState, Orchestrator};
use crate::cli::RunArgs;
use crate::core::exchange::ExchangeRegistry;
use crate::core::execution::{Executor, LiveExecutor, PaperExecutor};
use crate::core::ledger::{Journal, Portfolio};
use crate::core::market::MarketState;
use crate::core::risk::RiskManager;
use crate::core::service::{control, metrics, AlertSink};
use crate::core::strategy::{Detector, SpatialDetector, TriangularDetector};
use crate::error::{Error, Result};

/// Execute the `run` command: load config, wire the system, and drive the
/// detect/risk/execute cycle until interrupted.
pub async fn execute(config_path: &std::path::Path, log_level_override: Option<&str>, args: &RunArgs) -> Result<()> {
    let mut config = Config::load(config_path)?;
    apply_overrides(&mut config, args)?;
    if let Some(level) = log_level_override {
        config.system.log_level = level.to_string();
    }

    init_logging(&config.system.log_level);
    info!(exchanges = ?config.exchanges.enabled, symbols = ?config.symbols, "arbot starting");

    metrics::install(config.system.metrics_addr.parse().map_err(|_| {
        Error::Config(crate::error::ConfigError::InvalidValue {
            field: "system.metrics_addr",
            reason: "not a valid socket address".to_string(),
        })
    })?)?;

    let registry = ExchangeRegistry::simulated(&config.exchanges.enabled.iter().map(String::as_str).collect::<Vec<_>>());
    let execution_mode = config.system.execution_mode;

    let mut detectors: Vec<Box<dyn Detector>> = vec![Box::new(SpatialDetector::new(config.detector.spatial.clone()))];
    if let Some(triangular) = config.detector.triangular.clone() {
        let detector = TriangularDetector::new(triangular).map_err(|err| {
            Error::Config(crate::error::ConfigError::InvalidValue {
                field: "detector.triangular",
                reason: err.to_string(),
            })
        })?;
        detectors.push(Box::new(detector));
    }

    // Live mode needs order-placement connectors attached before `AppState`
    // moves behind an `Arc`, since emergency stop needs them and
    // `with_order_connectors` takes the state by value.
    let order_connectors = if execution_mode == ExecutionModeConfig::Live {
        Orchestrator::build_order_connectors(&registry, &config.exchanges.enabled).await
    } else {
        std::collections::HashMap::new()
    };

    let market = MarketState::new(config.market);
    let portfolio = Portfolio::new(config.system.starting_equity_usd);
    let risk = RiskManager::new(config.risk.clone());
    let alerts = AlertSink::new(Duration::from_secs(60));
    let socket_path = config.system.control_socket.clone();
    let shutdown_journal = Journal::open(socket_path.with_extension("shutdown"))?;

    let state = Arc::new(
        AppState::new(config, market, portfolio, risk, alerts)
            .with_order_connectors(order_connectors.clone())
            .with_shutdown_marker(shutdown_journal),
    );

    let orchestrator = Arc::new(Orchestrator::new(Arc::clone(&state), detectors));
    let connector_handles = orchestrator.spawn_connectors(&registry);
    let control_handle = tokio::spawn(control::serve(socket_path, Arc::clone(&state)));
    let daily_reset_handle = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            if let Err(err) = orchestrator.run_daily_reset_loop().await {
                error!(error = %err, "daily reset loop exited with error");
            }
        })
    };

    let interval = Duration::from_millis(args.interval_ms.unwrap_or(200));
    let run_result = match execution_mode {
        ExecutionModeConfig::Paper | ExecutionModeConfig::Backtest => {
            let executor = PaperExecutor::new(&state.market, state.config().execution.clone());
            run_until_interrupted(&orchestrator, &executor, interval).await
        }
        ExecutionModeConfig::Live => {
            let executor = LiveExecutor::new(order_connectors, state.config().execution.clone());
            run_until_interrupted(&orchestrator, &executor, interval).await
        }
    };

    control_handle.abort();
    daily_reset_handle.abort();
    for handle in connector_handles {
        handle.abort();
    }

    info!("arbot stopped");
    run_result
}

async fn run_until_interrupted(orchestrator: &Arc<Orchestrator>, executor: &dyn Executor, interval: Duration) -> Result<()> {
    tokio::select! {
        result = orchestrator.run_detector_loop(executor, interval) => {
            if let Err(err) = &result {
                error!(error = %err, "detector loop exited with error");
            }
            result
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
    }
}

fn apply_overrides(config: &mut Config, args: &RunArgs) -> Result<()> {
    if let Some(ref mode) = args.execution_mode {
        config.system.execution_mode = match mode.to_lowercase().as_str() {
            "backtest" => ExecutionModeConfig::Backtest,
            "paper" => ExecutionModeConfig::Paper,
            "live" => ExecutionModeConfig::Live,
            other => {
                return Err(Error::Config(crate::error::ConfigError::InvalidValue {
                    field: "execution_mode",
                    reason: format!("unknown mode `{other}`"),
                }))
            }
        };
    }
    if let Some(max_total_exposure) = args.max_total_exposure {
        config.risk.max_total_exposure_usd = max_total_exposure;
    }
    if let Some(max_position_per_coin) = args.max_position_per_coin {
        config.risk.max_position_per_coin_usd = max_position_per_coin;
    }
    Ok(())
}

fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
