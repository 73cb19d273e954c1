//! Shared state handed to every task the orchestrator spawns.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::warn;

use crate::app::config::Config;
use crate::core::domain::{CircuitState, ExchangeId, OrderId};
use crate::core::exchange::Connector;
use crate::core::ledger::{Journal, Portfolio};
use crate::core::market::MarketState;
use crate::core::risk::RiskManager;
use crate::core::service::AlertSink;
use crate::core::strategy::FeeSchedule;

/// One line appended to the shutdown-marker journal by
/// [`AppState::request_emergency_stop`].
#[derive(Debug, Serialize)]
struct ShutdownMarker {
    event: &'static str,
    requested_at: DateTime<Utc>,
}

/// Deadline for [`AppState::request_emergency_stop`] to cancel every
/// tracked open order, per the control surface's 10s contract.
const EMERGENCY_STOP_DEADLINE: StdDuration = StdDuration::from_secs(10);

pub struct AppState {
    pub market: MarketState,
    pub portfolio: Portfolio,
    pub risk: RiskManager,
    pub alerts: AlertSink,
    pub circuit: Mutex<CircuitState>,
    /// Non-disruptive subset of [`Config`] (fee tables, risk thresholds),
    /// swapped in place by [`AppState::reload_config`]. Detector thresholds
    /// and the enabled symbol/exchange set are read once at startup and
    /// require a restart to change.
    config: ArcSwap<Config>,
    fees: RwLock<FeeSchedule>,
    /// Set by [`AppState::request_emergency_stop`] before the cancel sweep
    /// starts; checked by the orchestrator so no new signal is approved
    /// once a stop is in flight.
    shutdown_requested: AtomicBool,
    /// Where to persist the emergency-stop marker. `None` in tests that
    /// don't exercise the control surface.
    shutdown_marker: Option<Journal>,
    /// Orders believed still open on the exchange, tracked so an emergency
    /// stop knows what to cancel without scanning the whole ledger.
    open_orders: DashMap<OrderId, ExchangeId>,
    /// One REST-capable connector per exchange, dedicated to order
    /// placement and cancellation. Kept separate from the connector each
    /// exchange's market-data reader task owns exclusively, since
    /// [`Connector::connect`]/[`Connector::subscribe`] take `&mut self`
    /// while this one is shared behind an `Arc` for concurrent use by the
    /// executor and the control surface.
    order_connectors: HashMap<ExchangeId, Arc<dyn Connector>>,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config, market: MarketState, portfolio: Portfolio, risk: RiskManager, alerts: AlertSink) -> Self {
        let fees = config.fee_schedule();
        Self {
            market,
            portfolio,
            risk,
            alerts,
            circuit: Mutex::new(CircuitState::new()),
            config: ArcSwap::from_pointee(config),
            fees: RwLock::new(fees),
            shutdown_requested: AtomicBool::new(false),
            shutdown_marker: None,
            open_orders: DashMap::new(),
            order_connectors: HashMap::new(),
        }
    }

    /// Attach the order-placement connectors built for live/paper trading.
    /// Called once during startup, before the state is wrapped in an `Arc`.
    #[must_use]
    pub fn with_order_connectors(mut self, connectors: HashMap<ExchangeId, Arc<dyn Connector>>) -> Self {
        self.order_connectors = connectors;
        self
    }

    /// Attach the journal an emergency stop appends its shutdown marker to.
    #[must_use]
    pub fn with_shutdown_marker(mut self, journal: Journal) -> Self {
        self.shutdown_marker = Some(journal);
        self
    }

    /// Current configuration snapshot.
    #[must_use]
    pub fn config(&self) -> Arc<Config> {
        self.config.load_full()
    }

    /// Current fee schedule, read on every detector cycle.
    #[must_use]
    pub fn fees(&self) -> FeeSchedule {
        self.fees.read().clone()
    }

    /// Apply a reloaded config, restricted to the non-disruptive subset
    /// (fee tables, risk thresholds).
    /// Rejects anything that would require a restart, returning the
    /// offending field name; detector thresholds and the symbol/exchange
    /// set are silently carried over from the running config rather than
    /// applied, since live-swapping them safely needs more than a config
    /// diff check.
    pub fn reload_config(&self, new: Config) -> Result<(), &'static str> {
        let current = self.config.load();
        if let Some(field) = current.diff_requires_restart(&new) {
            return Err(field);
        }
        *self.fees.write() = new.fee_schedule();
        self.risk.update_config(new.risk.clone());
        self.config.store(Arc::new(new));
        Ok(())
    }

    /// `true` once an emergency stop has been requested; checked before a
    /// signal is risk-evaluated so nothing new executes mid-stop.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    /// Record that `order_id` on `exchange` is still open, so an emergency
    /// stop knows to cancel it.
    pub fn track_open_order(&self, order_id: OrderId, exchange: ExchangeId) {
        self.open_orders.insert(order_id, exchange);
    }

    /// Stop tracking `order_id` once it reaches a terminal state.
    pub fn untrack_order(&self, order_id: OrderId) {
        self.open_orders.remove(&order_id);
    }

    /// Feed one trade's outcome into the circuit breaker: a loss increments
    /// the consecutive-loss counter, a win resets it. Trips once the
    /// counter reaches the configured threshold.
    pub fn record_trade_outcome(&self, was_loss: bool) {
        let now = chrono::Utc::now();
        let risk_config = self.risk.config();
        let mut circuit = self.circuit.lock();
        if was_loss {
            circuit.consecutive_losses += 1;
            if circuit.consecutive_losses >= risk_config.circuit_breaker_consecutive_losses {
                circuit.tripped_at = Some(now);
                circuit.cooldown_until = Some(now + chrono::Duration::seconds(risk_config.circuit_breaker_cooldown_s));
            }
        } else {
            circuit.consecutive_losses = 0;
        }
    }

    /// Operator-triggered reset: clears the trip regardless of cooldown.
    pub fn reset_circuit_breaker(&self) {
        *self.circuit.lock() = CircuitState::new();
    }

    /// Cancel every tracked open order across all exchanges, best-effort,
    /// within a fixed deadline. Individual cancel failures are logged and
    /// do not stop the sweep; orders that don't respond in time are left
    /// for the operator to reconcile by hand. Also rejects every signal
    /// from this point on and appends a shutdown marker to the journal.
    pub async fn request_emergency_stop(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
        self.persist_shutdown_marker();

        let targets: Vec<(OrderId, ExchangeId)> = self.open_orders.iter().map(|e| (*e.key(), e.value().clone())).collect();
        warn!(count = targets.len(), "emergency stop requested, cancelling open orders");

        let sweep = async {
            for (order_id, exchange) in &targets {
                let Some(connector) = self.order_connectors.get(exchange) else {
                    warn!(%exchange, "no order connector registered, cannot cancel");
                    continue;
                };
                match connector.cancel_order(*order_id).await {
                    Ok(_) => {
                        self.open_orders.remove(order_id);
                    }
                    Err(err) => warn!(%order_id, %exchange, error = %err, "emergency cancel failed"),
                }
            }
        };

        if tokio::time::timeout(EMERGENCY_STOP_DEADLINE, sweep).await.is_err() {
            warn!("emergency stop deadline elapsed with orders still outstanding");
        }
    }

    fn persist_shutdown_marker(&self) {
        let Some(journal) = &self.shutdown_marker else {
            return;
        };
        let marker = ShutdownMarker { event: "emergency_stop", requested_at: Utc::now() };
        if let Err(err) = journal.append(&marker) {
            warn!(error = %err, "failed to persist shutdown marker");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::market::StalenessPolicy;
    use crate::core::risk::RiskConfig;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn state() -> AppState {
        AppState::new(
            Config::default(),
            MarketState::new(StalenessPolicy::default()),
            Portfolio::new(dec!(10000)),
            RiskManager::new(RiskConfig { circuit_breaker_consecutive_losses: 3, ..RiskConfig::default() }),
            AlertSink::new(Duration::from_secs(60)),
        )
    }

    #[test]
    fn trips_after_consecutive_losses_reach_threshold() {
        let state = state();
        state.record_trade_outcome(true);
        state.record_trade_outcome(true);
        assert_eq!(state.circuit.lock().phase(chrono::Utc::now()), crate::core::domain::CircuitPhase::Normal);
        state.record_trade_outcome(true);
        assert_eq!(state.circuit.lock().phase(chrono::Utc::now()), crate::core::domain::CircuitPhase::Tripped);
    }

    #[test]
    fn a_win_resets_the_streak() {
        let state = state();
        state.record_trade_outcome(true);
        state.record_trade_outcome(true);
        state.record_trade_outcome(false);
        assert_eq!(state.circuit.lock().consecutive_losses, 0);
    }

    #[test]
    fn operator_reset_clears_a_trip() {
        let state = state();
        state.record_trade_outcome(true);
        state.record_trade_outcome(true);
        state.record_trade_outcome(true);
        state.reset_circuit_breaker();
        assert_eq!(state.circuit.lock().phase(chrono::Utc::now()), crate::core::domain::CircuitPhase::Normal);
    }

    #[test]
    fn reload_config_rejects_disruptive_changes() {
        let state = state();
        let mut new = (*state.config()).clone();
        new.exchanges.enabled.push("kraken".to_string());
        assert_eq!(state.reload_config(new), Err("exchanges.enabled"));
    }

    #[test]
    fn reload_config_swaps_fee_schedule_and_risk_thresholds() {
        let state = state();
        let mut new = (*state.config()).clone();
        new.exchanges.per_exchange.insert(
            "binance".to_string(),
            crate::app::config::ExchangeConfig {
                taker_fee_pct: dec!(0.05),
                rate_limit_weight_per_minute: 1200,
                api_key_env: None,
                api_secret_env: None,
            },
        );
        new.risk.max_position_per_coin_usd = dec!(12345);
        assert!(state.reload_config(new).is_ok());
        assert_eq!(state.fees().taker_fee_pct(&crate::core::domain::ExchangeId::from("binance")), dec!(0.05));
        assert_eq!(state.risk.config().max_position_per_coin_usd, dec!(12345));
    }

    #[tokio::test]
    async fn emergency_stop_sets_shutdown_flag() {
        let state = state();
        assert!(!state.is_shutting_down());
        state.request_emergency_stop().await;
        assert!(state.is_shutting_down());
    }
}
