//! Wires connectors, market state, detectors, risk, and execution into the
//! running system.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use rust_decimal::Decimal;

use crate::app::config::{Config, ExecutionModeConfig};
use crate::app::state::AppState;
use crate::core::domain::{ExchangeId, Symbol};
use crate::core::exchange::{Connector, ExchangeRegistry, MarketEvent};
use crate::core::execution::{self, ExecutionOutcome, Executor};
use crate::core::risk::{AnomalyContext, RiskDecision, RiskRejectReason};
use crate::core::service::{metrics, Alert, AlertSeverity};
use crate::core::strategy::Detector;
use crate::error::Result;

/// Polls every enabled connector for market events and runs detectors on a
/// fixed interval against the shared [`AppState`]. Reads the enabled
/// exchange/symbol set once at construction, since that subset of
/// [`Config`] requires a restart to change; everything hot-reloadable
/// (fees, risk thresholds) is read fresh from `state` on every cycle.
pub struct Orchestrator {
    state: Arc<AppState>,
    detectors: Vec<Box<dyn Detector>>,
    symbols: Vec<Symbol>,
    enabled_exchanges: Vec<String>,
    execution_mode: ExecutionModeConfig,
}

impl Orchestrator {
    #[must_use]
    pub fn new(state: Arc<AppState>, detectors: Vec<Box<dyn Detector>>) -> Self {
        let config = state.config();
        let symbols = config.symbols.iter().map(|s| Symbol::from(s.as_str())).collect();
        let enabled_exchanges = config.exchanges.enabled.clone();
        let execution_mode = config.system.execution_mode;
        Self { state, detectors, symbols, enabled_exchanges, execution_mode }
    }

    /// Spawn one reader task per enabled exchange, forwarding its market
    /// events into [`AppState::market`] until the connector closes.
    pub fn spawn_connectors(&self, registry: &ExchangeRegistry) -> Vec<tokio::task::JoinHandle<()>> {
        let depth = 10;
        let mut handles = Vec::new();
        for name in &self.enabled_exchanges {
            let Some(mut connector) = registry.build(name) else {
                warn!(exchange = %name, "no connector registered, skipping");
                continue;
            };
            let state = Arc::clone(&self.state);
            let symbols = self.symbols.clone();
            let exchange = ExchangeId::from(name.as_str());
            handles.push(tokio::spawn(async move {
                if let Err(err) = connector.connect().await {
                    error!(exchange = %exchange, error = %err, "connect failed");
                    return;
                }
                if let Err(err) = connector.subscribe(&symbols, depth).await {
                    error!(exchange = %exchange, error = %err, "subscribe failed");
                    return;
                }
                loop {
                    match connector.events().recv().await {
                        Some(MarketEvent::Snapshot(book) | MarketEvent::Incremental(book)) => {
                            state.market.publish(book);
                            metrics::market_state_pairs(state.market.len() as f64);
                        }
                        Some(MarketEvent::Trade { .. } | MarketEvent::OrderUpdate { .. }) => {}
                        Some(MarketEvent::Disconnected { reason }) => {
                            state.alerts.emit(Alert {
                                key: format!("conn:{exchange}"),
                                severity: AlertSeverity::Warning,
                                message: format!("{exchange} disconnected: {reason}"),
                            });
                        }
                        None => break,
                    }
                }
            }));
        }
        handles
    }

    /// Build one REST-capable connector per enabled exchange, dedicated to
    /// order placement and shared (via `Arc`) between the [`Executor`] and
    /// [`AppState::request_emergency_stop`]. Kept separate from the
    /// connector instance each market-data reader task owns exclusively,
    /// since `connect`/`subscribe` need `&mut self` while this one must be
    /// callable concurrently from multiple places.
    pub async fn build_order_connectors(registry: &ExchangeRegistry, enabled: &[String]) -> HashMap<ExchangeId, Arc<dyn Connector>> {
        let mut connectors = HashMap::new();
        for name in enabled {
            let Some(mut connector) = registry.build(name) else {
                warn!(exchange = %name, "no connector registered, skipping order connector");
                continue;
            };
            if let Err(err) = connector.connect().await {
                error!(exchange = %name, error = %err, "order connector connect failed");
                continue;
            }
            connectors.insert(ExchangeId::from(name.as_str()), Arc::from(connector));
        }
        connectors
    }

    /// Run the detect → risk → execute cycle forever on `interval`.
    pub async fn run_detector_loop(&self, executor: &dyn Executor, interval: Duration) -> Result<()> {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            self.run_one_cycle(executor).await;
        }
    }

    /// Reset the portfolio's daily counters once per UTC day. Polls rather
    /// than sleeping until midnight so a clock adjustment can't skip or
    /// double a rollover.
    pub async fn run_daily_reset_loop(&self) -> Result<()> {
        let mut ticker = tokio::time::interval(Duration::from_secs(30));
        let mut last_reset_date = chrono::Utc::now().date_naive();
        loop {
            ticker.tick().await;
            let today = chrono::Utc::now().date_naive();
            if today != last_reset_date {
                self.state.portfolio.reset_daily();
                last_reset_date = today;
                info!("daily portfolio counters reset at UTC rollover");
            }
        }
    }

    async fn run_one_cycle(&self, executor: &dyn Executor) {
        let fees = self.state.fees();
        let ctx = crate::core::strategy::DetectorContext {
            market: &self.state.market,
            symbols: &self.symbols,
            fees: &fees,
        };

        for detector in &self.detectors {
            for signal in detector.detect(&ctx) {
                metrics::signal_detected(detector.name());
                self.handle_signal(executor, signal).await;
            }
        }
    }

    async fn handle_signal(&self, executor: &dyn Executor, signal: crate::core::domain::Signal) {
        if self.state.is_shutting_down() {
            info!(signal_id = %signal.id, "signal rejected, emergency stop in effect");
            return;
        }

        let exposure = self.state.portfolio.exposure_full_snapshot();
        let equity = self.state.portfolio.equity_snapshot();
        let anomaly_ctx = self.anomaly_context(&signal);
        let circuit = *self.state.circuit.lock();
        let now = chrono::Utc::now();

        let decision = self.state.risk.evaluate(&signal, &exposure, &equity, &anomaly_ctx, &circuit, now);
        let (adjusted_notional_usd, warning) = match decision {
            RiskDecision::Approved { adjusted_notional_usd, warning } => (adjusted_notional_usd, warning),
            RiskDecision::Rejected(reason) => {
                // Paper mode never halts on a tripped breaker: it logs the
                // would-be rejection and keeps trading so the simulation
                // stays representative of what Live would see without it.
                if matches!(reason, RiskRejectReason::CircuitBreakerTripped { .. }) && self.execution_mode != ExecutionModeConfig::Live {
                    info!(signal_id = %signal.id, reason = ?reason, "circuit breaker tripped, would reject in live mode");
                } else {
                    metrics::signal_rejected(stage_label(&reason));
                    info!(signal_id = %signal.id, reason = ?reason, "signal rejected");
                    return;
                }
                (signal.notional_usd, None)
            }
        };

        if let Some(warning) = warning {
            self.state.alerts.emit(Alert {
                key: format!("risk:warning:{}", signal.id),
                severity: AlertSeverity::Warning,
                message: warning.message,
            });
        }

        let signal = scale_to_adjusted_notional(signal, adjusted_notional_usd);

        match executor.execute(&signal).await {
            Ok(report) => self.apply_report(&signal, report),
            Err(err) => {
                error!(signal_id = %signal.id, error = %err, "execution failed");
                self.state.record_trade_outcome(true);
            }
        }
    }

    /// Cross-exchange median mid-price per leg symbol, read fresh from
    /// market state so the anomaly detector judges against the same data
    /// the signal was built from.
    fn anomaly_context(&self, signal: &crate::core::domain::Signal) -> AnomalyContext {
        let mut median_price_by_symbol = HashMap::new();
        for leg in &signal.legs {
            if median_price_by_symbol.contains_key(&leg.symbol) {
                continue;
            }
            let mut mids: Vec<Decimal> = self.state.market.snapshot_all(&leg.symbol).iter().map(|top| top.mid()).collect();
            if mids.is_empty() {
                continue;
            }
            mids.sort_unstable();
            let median = mids[mids.len() / 2];
            median_price_by_symbol.insert(leg.symbol.clone(), median);
        }
        AnomalyContext { median_price_by_symbol }
    }

    fn apply_report(&self, signal: &crate::core::domain::Signal, report: crate::core::execution::ExecutionReport) {
        let realized_pnl = execution::realized_pnl_usd(&report.orders);
        let was_loss = match report.outcome {
            ExecutionOutcome::AllFailed => false,
            ExecutionOutcome::Filled | ExecutionOutcome::PartialBalanced => realized_pnl < Decimal::ZERO,
            // a one-filled-one-failed flatten counts as a loss even if the
            // flatten happened to net out, since the opportunity was missed.
            ExecutionOutcome::LegsFailed { .. } => true,
            ExecutionOutcome::PartialImbalance { .. } => realized_pnl <= Decimal::ZERO,
        };
        self.state.record_trade_outcome(was_loss);

        for (leg, order) in signal.legs.iter().zip(report.orders.iter()) {
            let filled_usd = order.filled_qty * order.avg_fill_price().unwrap_or(leg.target_price);
            self.state.portfolio.adjust_exposure(leg.symbol.base(), &leg.exchange, filled_usd);
            metrics::order_submitted(leg.exchange.as_str(), outcome_label(&report.outcome));

            if order.state.is_terminal() {
                self.state.untrack_order(order.id);
            } else {
                self.state.track_open_order(order.id, order.exchange.clone());
            }
        }

        self.state.portfolio.record_realized_pnl(realized_pnl);
    }
}

/// Scale every leg's `max_qty` down to match a risk-adjusted notional,
/// preserving the signal's per-leg price ratios. A no-op when the manager
/// approved the full requested size.
fn scale_to_adjusted_notional(signal: crate::core::domain::Signal, adjusted_notional_usd: Decimal) -> crate::core::domain::Signal {
    if signal.notional_usd <= Decimal::ZERO || adjusted_notional_usd >= signal.notional_usd {
        return signal;
    }
    let fraction = adjusted_notional_usd / signal.notional_usd;
    let mut signal = signal;
    for leg in &mut signal.legs {
        leg.max_qty *= fraction;
    }
    signal.notional_usd = adjusted_notional_usd;
    signal
}

fn stage_label(reason: &RiskRejectReason) -> &'static str {
    use RiskRejectReason::{
        AnomalousSpread, BelowEconomicMinimum, CircuitBreakerTripped, DailyLossLimitExceeded, DrawdownLimitExceeded, ExchangeExposureExceeded, FlashCrash, PositionLimitExceeded,
        PriceDeviation, SpreadVolatility, TotalExposureExceeded,
    };
    match reason {
        PositionLimitExceeded { .. } | ExchangeExposureExceeded { .. } | TotalExposureExceeded { .. } | BelowEconomicMinimum { .. } => "position_limits",
        DrawdownLimitExceeded { .. } | DailyLossLimitExceeded { .. } => "drawdown",
        PriceDeviation { .. } | FlashCrash { .. } | AnomalousSpread { .. } | SpreadVolatility { .. } => "anomaly",
        CircuitBreakerTripped { .. } => "circuit_breaker",
    }
}

fn outcome_label(outcome: &ExecutionOutcome) -> &'static str {
    match outcome {
        ExecutionOutcome::Filled => "filled",
        ExecutionOutcome::PartialBalanced => "partial_balanced",
        ExecutionOutcome::PartialImbalance { .. } => "partial_imbalance",
        ExecutionOutcome::LegsFailed { .. } => "legs_failed",
        ExecutionOutcome::AllFailed => "all_failed",
    }
}
