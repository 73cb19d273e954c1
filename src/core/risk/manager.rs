//! Four-stage risk pipeline: Position Limits, Drawdown Monitor,
//! Anomaly Detector, Circuit Breaker, evaluated in that order with the first
//! rejection short-circuiting the rest.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rust_decimal::{Decimal, MathematicalOps};

use crate::core::domain::{CircuitState, Signal};
use crate::core::risk::types::{AnomalyContext, EquitySnapshot, ExposureSnapshot, RiskConfig, RiskDecision, RiskRejectReason, RiskWarning};

/// Samples of `gross_spread_pct` kept per exchange pair/symbol for the
/// spread-volatility sub-check; oldest is dropped once the window fills.
const SPREAD_HISTORY_LEN: usize = 20;
/// Minimum samples before the volatility check starts judging anything; a
/// thin history would make the std-dev estimate meaningless.
const SPREAD_HISTORY_MIN_SAMPLES: usize = 5;

#[derive(Default)]
struct AnomalyHistory {
    spread_samples: HashMap<String, VecDeque<Decimal>>,
}

/// Evaluates signals against position limits, drawdown, spread sanity, and
/// the circuit breaker. The threshold config may be swapped between calls by
/// a config reload; the caller owns exposure tracking, PnL accounting, and
/// the circuit breaker state and passes fresh snapshots in on every call.
/// The manager keeps one piece of state of its own: a short rolling window
/// of observed gross spreads per exchange pair, needed for the spread
/// std-dev sub-check in the Anomaly Detector stage.
pub struct RiskManager {
    config: RwLock<RiskConfig>,
    history: Mutex<AnomalyHistory>,
}

impl RiskManager {
    #[must_use]
    pub fn new(config: RiskConfig) -> Self {
        Self { config: RwLock::new(config), history: Mutex::new(AnomalyHistory::default()) }
    }

    #[must_use]
    pub fn config(&self) -> RiskConfig {
        self.config.read().clone()
    }

    /// Swap in a new threshold set, applied to the next call to `evaluate`.
    /// Called by a non-disruptive config reload.
    pub fn update_config(&self, new: RiskConfig) {
        *self.config.write() = new;
    }

    /// Run the full pipeline against one signal.
    #[must_use]
    pub fn evaluate(
        &self,
        signal: &Signal,
        exposure: &ExposureSnapshot,
        equity: &EquitySnapshot,
        anomaly_ctx: &AnomalyContext,
        circuit: &CircuitState,
        now: DateTime<Utc>,
    ) -> RiskDecision {
        let (adjusted_notional_usd, warning) = match self.check_position_limits(signal, exposure) {
            Ok(ok) => ok,
            Err(reason) => return RiskDecision::Rejected(reason),
        };
        if let Some(reason) = self.check_drawdown(equity) {
            return RiskDecision::Rejected(reason);
        }
        if let Some(reason) = self.check_anomaly(signal, anomaly_ctx) {
            return RiskDecision::Rejected(reason);
        }
        if let Some(reason) = self.check_circuit_breaker(circuit, now) {
            return RiskDecision::Rejected(reason);
        }
        RiskDecision::Approved { adjusted_notional_usd, warning }
    }

    /// Clamps the signal's requested notional down to whatever headroom
    /// remains under the per-coin, per-exchange, and total exposure limits,
    /// rejecting outright only when a scope has no headroom left or the
    /// clamped result falls below the economic minimum.
    fn check_position_limits(&self, signal: &Signal, exposure: &ExposureSnapshot) -> Result<(Decimal, Option<RiskWarning>), RiskRejectReason> {
        let config = self.config.read();
        let mut adjusted = signal.notional_usd;

        for leg in &signal.legs {
            let asset = leg.symbol.base().to_string();
            let current = exposure.by_asset.get(&asset).copied().unwrap_or(Decimal::ZERO);
            let room = config.max_position_per_coin_usd - current;
            if room <= Decimal::ZERO {
                return Err(RiskRejectReason::PositionLimitExceeded { asset, requested_usd: signal.notional_usd, limit_usd: config.max_position_per_coin_usd });
            }
            adjusted = adjusted.min(room);

            let current_exchange = exposure.by_exchange.get(&leg.exchange).copied().unwrap_or(Decimal::ZERO);
            let room_exchange = config.max_position_per_exchange_usd - current_exchange;
            if room_exchange <= Decimal::ZERO {
                return Err(RiskRejectReason::ExchangeExposureExceeded {
                    exchange: leg.exchange.to_string(),
                    requested_usd: signal.notional_usd,
                    limit_usd: config.max_position_per_exchange_usd,
                });
            }
            adjusted = adjusted.min(room_exchange);
        }

        let room_total = config.max_total_exposure_usd - exposure.total_usd;
        if room_total <= Decimal::ZERO {
            return Err(RiskRejectReason::TotalExposureExceeded {
                requested_usd: signal.notional_usd,
                current_usd: exposure.total_usd,
                limit_usd: config.max_total_exposure_usd,
            });
        }
        adjusted = adjusted.min(room_total);

        if adjusted < config.min_economic_notional_usd {
            return Err(RiskRejectReason::BelowEconomicMinimum { adjusted_notional_usd: adjusted, minimum_usd: config.min_economic_notional_usd });
        }

        let hundred = Decimal::from(100);
        let mut peak_utilization_pct = (exposure.total_usd + adjusted) / config.max_total_exposure_usd * hundred;
        for leg in &signal.legs {
            let asset = leg.symbol.base().to_string();
            let current = exposure.by_asset.get(&asset).copied().unwrap_or(Decimal::ZERO);
            peak_utilization_pct = peak_utilization_pct.max((current + adjusted) / config.max_position_per_coin_usd * hundred);

            let current_exchange = exposure.by_exchange.get(&leg.exchange).copied().unwrap_or(Decimal::ZERO);
            peak_utilization_pct = peak_utilization_pct.max((current_exchange + adjusted) / config.max_position_per_exchange_usd * hundred);
        }

        let warning = (peak_utilization_pct >= config.warning_threshold_pct).then(|| RiskWarning {
            message: format!("exposure utilization at {peak_utilization_pct:.1}% crosses the {:.0}% warning threshold", config.warning_threshold_pct),
            utilization_pct: peak_utilization_pct,
        });

        Ok((adjusted, warning))
    }

    /// HWM drawdown and daily-loss checks. Day-boundary reset of the inputs
    /// is the caller's job (`Portfolio::reset_daily`, called at UTC rollover).
    fn check_drawdown(&self, equity: &EquitySnapshot) -> Option<RiskRejectReason> {
        let config = self.config.read();

        if equity.high_water_mark_usd > Decimal::ZERO {
            let drawdown_pct = (equity.high_water_mark_usd - equity.current_equity_usd).max(Decimal::ZERO) / equity.high_water_mark_usd * Decimal::from(100);
            if drawdown_pct >= config.max_drawdown_pct {
                return Some(RiskRejectReason::DrawdownLimitExceeded { drawdown_pct, limit_pct: config.max_drawdown_pct });
            }
        }

        if equity.daily_pnl_usd <= -config.max_daily_loss_usd {
            return Some(RiskRejectReason::DailyLossLimitExceeded { daily_pnl_usd: equity.daily_pnl_usd, limit_usd: config.max_daily_loss_usd });
        }

        if equity.daily_start_equity_usd > Decimal::ZERO {
            let pct_limit_usd = equity.daily_start_equity_usd * config.max_daily_loss_pct / Decimal::from(100);
            if equity.daily_pnl_usd <= -pct_limit_usd {
                return Some(RiskRejectReason::DailyLossLimitExceeded { daily_pnl_usd: equity.daily_pnl_usd, limit_usd: pct_limit_usd });
            }
        }

        None
    }

    /// Three sub-checks, in order: flash crash (coarse per-leg deviation, so
    /// a severe dislocation is reported as a flash crash rather than masked
    /// by the finer checks below), per-leg price deviation, then gross
    /// spread sanity (absolute ceiling, then std-dev over recent history).
    fn check_anomaly(&self, signal: &Signal, ctx: &AnomalyContext) -> Option<RiskRejectReason> {
        let config = self.config.read();

        for leg in &signal.legs {
            let Some(&median) = ctx.median_price_by_symbol.get(&leg.symbol) else { continue };
            if median <= Decimal::ZERO {
                continue;
            }
            let deviation_pct = (leg.target_price - median).abs() / median * Decimal::from(100);
            if deviation_pct > config.flash_crash_pct {
                return Some(RiskRejectReason::FlashCrash {
                    symbol: leg.symbol.to_string(),
                    observed_price: leg.target_price,
                    median_price: median,
                    deviation_pct,
                    limit_pct: config.flash_crash_pct,
                });
            }
        }

        for leg in &signal.legs {
            let Some(&median) = ctx.median_price_by_symbol.get(&leg.symbol) else { continue };
            if median <= Decimal::ZERO {
                continue;
            }
            let deviation_pct = (leg.target_price - median).abs() / median * Decimal::from(100);
            if deviation_pct > config.price_deviation_threshold_pct {
                return Some(RiskRejectReason::PriceDeviation {
                    symbol: leg.symbol.to_string(),
                    observed_price: leg.target_price,
                    median_price: median,
                    deviation_pct,
                    limit_pct: config.price_deviation_threshold_pct,
                });
            }
        }

        if signal.gross_spread_pct > config.max_spread_pct {
            return Some(RiskRejectReason::AnomalousSpread { gross_spread_pct: signal.gross_spread_pct, limit_pct: config.max_spread_pct });
        }

        self.check_spread_volatility(signal, &config)
    }

    fn check_spread_volatility(&self, signal: &Signal, config: &RiskConfig) -> Option<RiskRejectReason> {
        if signal.legs.len() != 2 {
            return None;
        }
        let key = format!("{}:{}:{}", signal.legs[0].exchange, signal.legs[1].exchange, signal.legs[0].symbol);

        let mut history = self.history.lock();
        let samples = history.spread_samples.entry(key).or_default();
        samples.push_back(signal.gross_spread_pct);
        if samples.len() > SPREAD_HISTORY_LEN {
            samples.pop_front();
        }
        if samples.len() < SPREAD_HISTORY_MIN_SAMPLES {
            return None;
        }

        let n = Decimal::from(samples.len() as u64);
        let mean: Decimal = samples.iter().copied().sum::<Decimal>() / n;
        let variance: Decimal = samples.iter().map(|s| (*s - mean) * (*s - mean)).sum::<Decimal>() / n;
        let Some(std_dev) = variance.sqrt() else { return None };
        if std_dev <= Decimal::ZERO {
            return None;
        }

        let observed_std_devs = (signal.gross_spread_pct - mean).abs() / std_dev;
        if observed_std_devs > config.spread_std_threshold {
            return Some(RiskRejectReason::SpreadVolatility { observed_std_devs, limit_std_devs: config.spread_std_threshold });
        }
        None
    }

    fn check_circuit_breaker(&self, circuit: &CircuitState, now: DateTime<Utc>) -> Option<RiskRejectReason> {
        use crate::core::domain::CircuitPhase;
        if circuit.phase(now) == CircuitPhase::Tripped {
            let remaining = circuit.cooldown_until.map_or(0, |until| (until - now).num_seconds().max(0));
            return Some(RiskRejectReason::CircuitBreakerTripped { cooldown_remaining_s: remaining });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{ExchangeId, Side, SignalId, SignalLeg, SignalStatus, StrategyKind, Symbol};
    use rust_decimal_macros::dec;

    fn signal(notional: Decimal, net_spread_pct: Decimal) -> Signal {
        Signal {
            id: SignalId::new(),
            strategy: StrategyKind::Spatial,
            legs: vec![
                SignalLeg {
                    exchange: ExchangeId::from("binance"),
                    symbol: Symbol::from("BTC/USDT"),
                    side: Side::Buy,
                    target_price: dec!(100),
                    max_qty: notional / dec!(100),
                },
                SignalLeg {
                    exchange: ExchangeId::from("kraken"),
                    symbol: Symbol::from("BTC/USDT"),
                    side: Side::Sell,
                    target_price: dec!(101),
                    max_qty: notional / dec!(100),
                },
            ],
            gross_spread_pct: net_spread_pct,
            net_spread_pct,
            estimated_pnl_usd: dec!(1),
            notional_usd: notional,
            detected_ts: Utc::now(),
            status: SignalStatus::Detected,
        }
    }

    fn exposure_with_asset(asset: &str, usd: Decimal) -> ExposureSnapshot {
        let mut by_asset = HashMap::new();
        by_asset.insert(asset.to_string(), usd);
        ExposureSnapshot { by_asset, ..ExposureSnapshot::default() }
    }

    #[test]
    fn approves_signal_within_all_limits() {
        let manager = RiskManager::new(RiskConfig::default());
        let decision = manager.evaluate(
            &signal(dec!(100), dec!(0.2)),
            &ExposureSnapshot::default(),
            &EquitySnapshot::default(),
            &AnomalyContext::default(),
            &CircuitState::new(),
            Utc::now(),
        );
        assert_eq!(decision, RiskDecision::Approved { adjusted_notional_usd: dec!(100), warning: None });
    }

    #[test]
    fn clamps_adjusted_notional_to_remaining_coin_headroom() {
        let manager = RiskManager::new(RiskConfig::default());
        let exposure = exposure_with_asset("BTC", dec!(950));
        let decision = manager.evaluate(&signal(dec!(100), dec!(0.2)), &exposure, &EquitySnapshot::default(), &AnomalyContext::default(), &CircuitState::new(), Utc::now());
        match decision {
            RiskDecision::Approved { adjusted_notional_usd, .. } => assert_eq!(adjusted_notional_usd, dec!(50)),
            other => panic!("expected a clamped approval, got {other:?}"),
        }
    }

    #[test]
    fn rejects_when_coin_headroom_is_exhausted() {
        let manager = RiskManager::new(RiskConfig::default());
        let exposure = exposure_with_asset("BTC", dec!(1000));
        let decision = manager.evaluate(&signal(dec!(100), dec!(0.2)), &exposure, &EquitySnapshot::default(), &AnomalyContext::default(), &CircuitState::new(), Utc::now());
        assert!(matches!(decision, RiskDecision::Rejected(RiskRejectReason::PositionLimitExceeded { .. })));
    }

    #[test]
    fn rejects_when_exchange_headroom_is_exhausted() {
        let manager = RiskManager::new(RiskConfig::default());
        let mut by_exchange = HashMap::new();
        by_exchange.insert(ExchangeId::from("binance"), dec!(2000));
        let exposure = ExposureSnapshot { by_exchange, ..ExposureSnapshot::default() };
        let decision = manager.evaluate(&signal(dec!(100), dec!(0.2)), &exposure, &EquitySnapshot::default(), &AnomalyContext::default(), &CircuitState::new(), Utc::now());
        assert!(matches!(decision, RiskDecision::Rejected(RiskRejectReason::ExchangeExposureExceeded { .. })));
    }

    #[test]
    fn rejects_when_adjusted_notional_falls_below_economic_minimum() {
        let config = RiskConfig { max_position_per_coin_usd: dec!(105), ..RiskConfig::default() };
        let manager = RiskManager::new(config);
        let exposure = exposure_with_asset("BTC", dec!(0));
        // requested 100, but the coin limit only leaves 5 usd of headroom.
        let decision = manager.evaluate(&signal(dec!(100), dec!(0.2)), &exposure, &EquitySnapshot::default(), &AnomalyContext::default(), &CircuitState::new(), Utc::now());
        assert!(matches!(decision, RiskDecision::Rejected(RiskRejectReason::BelowEconomicMinimum { .. })));
    }

    #[test]
    fn emits_warning_when_utilization_crosses_threshold() {
        let manager = RiskManager::new(RiskConfig::default());
        let exposure = exposure_with_asset("BTC", dec!(650));
        let decision = manager.evaluate(&signal(dec!(100), dec!(0.2)), &exposure, &EquitySnapshot::default(), &AnomalyContext::default(), &CircuitState::new(), Utc::now());
        match decision {
            RiskDecision::Approved { warning: Some(warning), .. } => assert!(warning.utilization_pct >= dec!(70)),
            other => panic!("expected an approval carrying a warning, got {other:?}"),
        }
    }

    #[test]
    fn rejects_when_daily_loss_limit_hit() {
        let manager = RiskManager::new(RiskConfig::default());
        let equity = EquitySnapshot { daily_pnl_usd: dec!(-600), ..EquitySnapshot::default() };
        let decision = manager.evaluate(&signal(dec!(100), dec!(0.2)), &ExposureSnapshot::default(), &equity, &AnomalyContext::default(), &CircuitState::new(), Utc::now());
        assert!(matches!(decision, RiskDecision::Rejected(RiskRejectReason::DailyLossLimitExceeded { .. })));
    }

    #[test]
    fn rejects_when_hwm_drawdown_limit_hit() {
        let manager = RiskManager::new(RiskConfig::default());
        let equity = EquitySnapshot { high_water_mark_usd: dec!(10_000), current_equity_usd: dec!(9_400), daily_start_equity_usd: dec!(10_000), daily_pnl_usd: dec!(0) };
        let decision = manager.evaluate(&signal(dec!(100), dec!(0.2)), &ExposureSnapshot::default(), &equity, &AnomalyContext::default(), &CircuitState::new(), Utc::now());
        assert!(matches!(decision, RiskDecision::Rejected(RiskRejectReason::DrawdownLimitExceeded { .. })));
    }

    #[test]
    fn rejects_anomalously_wide_spread() {
        let manager = RiskManager::new(RiskConfig::default());
        let decision = manager.evaluate(
            &signal(dec!(100), dec!(10)),
            &ExposureSnapshot::default(),
            &EquitySnapshot::default(),
            &AnomalyContext::default(),
            &CircuitState::new(),
            Utc::now(),
        );
        assert!(matches!(decision, RiskDecision::Rejected(RiskRejectReason::AnomalousSpread { .. })));
    }

    #[test]
    fn rejects_on_flash_crash_deviation() {
        let manager = RiskManager::new(RiskConfig::default());
        let mut median_price_by_symbol = HashMap::new();
        median_price_by_symbol.insert(Symbol::from("BTC/USDT"), dec!(89.95));
        let ctx = AnomalyContext { median_price_by_symbol };
        // leg target prices 100/101 from `signal()` deviate ~11% from the 89.95 median.
        let decision = manager.evaluate(&signal(dec!(100), dec!(0.2)), &ExposureSnapshot::default(), &EquitySnapshot::default(), &ctx, &CircuitState::new(), Utc::now());
        assert!(matches!(decision, RiskDecision::Rejected(RiskRejectReason::FlashCrash { .. })));
    }

    #[test]
    fn rejects_on_moderate_price_deviation_below_flash_crash_threshold() {
        let manager = RiskManager::new(RiskConfig::default());
        let mut median_price_by_symbol = HashMap::new();
        median_price_by_symbol.insert(Symbol::from("BTC/USDT"), dec!(95.5));
        let ctx = AnomalyContext { median_price_by_symbol };
        // leg prices 100/101 deviate ~4.7%/5.8% from 95.5: below the 10% flash-crash
        // threshold but above the 3% price-deviation threshold.
        let decision = manager.evaluate(&signal(dec!(100), dec!(0.2)), &ExposureSnapshot::default(), &EquitySnapshot::default(), &ctx, &CircuitState::new(), Utc::now());
        assert!(matches!(decision, RiskDecision::Rejected(RiskRejectReason::PriceDeviation { .. })));
    }

    #[test]
    fn rejects_while_circuit_breaker_tripped() {
        let manager = RiskManager::new(RiskConfig::default());
        let now = Utc::now();
        let circuit = CircuitState {
            consecutive_losses: 10,
            tripped_at: Some(now),
            cooldown_until: Some(now + chrono::Duration::minutes(10)),
        };
        let decision = manager.evaluate(&signal(dec!(100), dec!(0.2)), &ExposureSnapshot::default(), &EquitySnapshot::default(), &AnomalyContext::default(), &circuit, now);
        assert!(matches!(decision, RiskDecision::Rejected(RiskRejectReason::CircuitBreakerTripped { .. })));
    }

    #[test]
    fn update_config_takes_effect_on_next_evaluate() {
        let manager = RiskManager::new(RiskConfig::default());
        let exposure = exposure_with_asset("BTC", dec!(50));
        assert_eq!(
            manager.evaluate(&signal(dec!(100), dec!(0.2)), &exposure, &EquitySnapshot::default(), &AnomalyContext::default(), &CircuitState::new(), Utc::now()),
            RiskDecision::Approved { adjusted_notional_usd: dec!(100), warning: None }
        );

        manager.update_config(RiskConfig { max_position_per_coin_usd: dec!(50), ..RiskConfig::default() });
        assert!(matches!(
            manager.evaluate(&signal(dec!(100), dec!(0.2)), &exposure, &EquitySnapshot::default(), &AnomalyContext::default(), &CircuitState::new(), Utc::now()),
            RiskDecision::Rejected(RiskRejectReason::PositionLimitExceeded { .. })
        ));
    }

    #[test]
    fn position_limit_is_checked_before_drawdown() {
        let manager = RiskManager::new(RiskConfig::default());
        let exposure = exposure_with_asset("BTC", dec!(1000));
        let equity = EquitySnapshot { daily_pnl_usd: dec!(-600), ..EquitySnapshot::default() };
        let decision = manager.evaluate(&signal(dec!(100), dec!(0.2)), &exposure, &equity, &AnomalyContext::default(), &CircuitState::new(), Utc::now());
        assert!(matches!(decision, RiskDecision::Rejected(RiskRejectReason::PositionLimitExceeded { .. })));
    }
}
