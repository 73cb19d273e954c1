//! Risk decision and configuration types.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::core::domain::{ExchangeId, Symbol};

#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    #[serde(default = "default_max_position_per_coin_usd")]
    pub max_position_per_coin_usd: Decimal,
    #[serde(default = "default_max_position_per_exchange_usd")]
    pub max_position_per_exchange_usd: Decimal,
    #[serde(default = "default_max_total_exposure_usd")]
    pub max_total_exposure_usd: Decimal,
    #[serde(default = "default_warning_threshold_pct")]
    pub warning_threshold_pct: Decimal,
    #[serde(default = "default_min_economic_notional_usd")]
    pub min_economic_notional_usd: Decimal,
    #[serde(default = "default_max_daily_loss_usd")]
    pub max_daily_loss_usd: Decimal,
    #[serde(default = "default_max_daily_loss_pct")]
    pub max_daily_loss_pct: Decimal,
    #[serde(default = "default_max_drawdown_pct")]
    pub max_drawdown_pct: Decimal,
    #[serde(default = "default_price_deviation_threshold_pct")]
    pub price_deviation_threshold_pct: Decimal,
    #[serde(default = "default_max_spread_pct")]
    pub max_spread_pct: Decimal,
    #[serde(default = "default_spread_std_threshold")]
    pub spread_std_threshold: Decimal,
    #[serde(default = "default_flash_crash_pct")]
    pub flash_crash_pct: Decimal,
    #[serde(default = "default_circuit_breaker_consecutive_losses")]
    pub circuit_breaker_consecutive_losses: u32,
    #[serde(default = "default_circuit_breaker_cooldown_s")]
    pub circuit_breaker_cooldown_s: i64,
}

const fn default_max_position_per_coin_usd() -> Decimal {
    Decimal::new(1000, 0)
}
const fn default_max_position_per_exchange_usd() -> Decimal {
    Decimal::new(2000, 0)
}
const fn default_max_total_exposure_usd() -> Decimal {
    Decimal::new(10_000, 0)
}
const fn default_warning_threshold_pct() -> Decimal {
    Decimal::new(70, 0)
}
const fn default_min_economic_notional_usd() -> Decimal {
    Decimal::new(10, 0)
}
const fn default_max_daily_loss_usd() -> Decimal {
    Decimal::new(500, 0)
}
const fn default_max_daily_loss_pct() -> Decimal {
    Decimal::new(5, 0)
}
const fn default_max_drawdown_pct() -> Decimal {
    Decimal::new(5, 0)
}
const fn default_price_deviation_threshold_pct() -> Decimal {
    Decimal::new(3, 0)
}
const fn default_max_spread_pct() -> Decimal {
    Decimal::new(5, 0) // a 5% gross spread almost always means bad data, not a real edge
}
const fn default_spread_std_threshold() -> Decimal {
    Decimal::new(3, 0)
}
const fn default_flash_crash_pct() -> Decimal {
    Decimal::new(10, 0)
}
const fn default_circuit_breaker_consecutive_losses() -> u32 {
    10
}
const fn default_circuit_breaker_cooldown_s() -> i64 {
    900
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_position_per_coin_usd: default_max_position_per_coin_usd(),
            max_position_per_exchange_usd: default_max_position_per_exchange_usd(),
            max_total_exposure_usd: default_max_total_exposure_usd(),
            warning_threshold_pct: default_warning_threshold_pct(),
            min_economic_notional_usd: default_min_economic_notional_usd(),
            max_daily_loss_usd: default_max_daily_loss_usd(),
            max_daily_loss_pct: default_max_daily_loss_pct(),
            max_drawdown_pct: default_max_drawdown_pct(),
            price_deviation_threshold_pct: default_price_deviation_threshold_pct(),
            max_spread_pct: default_max_spread_pct(),
            spread_std_threshold: default_spread_std_threshold(),
            flash_crash_pct: default_flash_crash_pct(),
            circuit_breaker_consecutive_losses: default_circuit_breaker_consecutive_losses(),
            circuit_breaker_cooldown_s: default_circuit_breaker_cooldown_s(),
        }
    }
}

/// Per-asset/per-exchange/total exposure, read fresh from the ledger on
/// every `evaluate` call.
#[derive(Debug, Clone, Default)]
pub struct ExposureSnapshot {
    pub by_asset: HashMap<String, Decimal>,
    pub by_exchange: HashMap<ExchangeId, Decimal>,
    pub total_usd: Decimal,
}

/// Equity and drawdown inputs for the Drawdown Monitor stage, read fresh
/// from the ledger on every `evaluate` call.
#[derive(Debug, Clone, Copy, Default)]
pub struct EquitySnapshot {
    pub daily_pnl_usd: Decimal,
    pub daily_start_equity_usd: Decimal,
    pub current_equity_usd: Decimal,
    pub high_water_mark_usd: Decimal,
}

/// Cross-exchange reference prices for the Anomaly Detector stage. Built by
/// the caller from a point-in-time read of the market state; a symbol
/// absent from `median_price_by_symbol` means no reference was available
/// (e.g. only one exchange quoting it), and the per-leg deviation/flash-crash
/// checks abstain rather than guess.
#[derive(Debug, Clone, Default)]
pub struct AnomalyContext {
    pub median_price_by_symbol: HashMap<Symbol, Decimal>,
}

/// Emitted alongside an approval once exposure utilization crosses
/// `warning_threshold_pct`, without blocking the signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskWarning {
    pub message: String,
    pub utilization_pct: Decimal,
}

/// Why a signal was rejected, one variant per pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RiskRejectReason {
    PositionLimitExceeded { asset: String, requested_usd: Decimal, limit_usd: Decimal },
    ExchangeExposureExceeded { exchange: String, requested_usd: Decimal, limit_usd: Decimal },
    TotalExposureExceeded { requested_usd: Decimal, current_usd: Decimal, limit_usd: Decimal },
    BelowEconomicMinimum { adjusted_notional_usd: Decimal, minimum_usd: Decimal },
    DrawdownLimitExceeded { drawdown_pct: Decimal, limit_pct: Decimal },
    DailyLossLimitExceeded { daily_pnl_usd: Decimal, limit_usd: Decimal },
    PriceDeviation { symbol: String, observed_price: Decimal, median_price: Decimal, deviation_pct: Decimal, limit_pct: Decimal },
    FlashCrash { symbol: String, observed_price: Decimal, median_price: Decimal, deviation_pct: Decimal, limit_pct: Decimal },
    AnomalousSpread { gross_spread_pct: Decimal, limit_pct: Decimal },
    SpreadVolatility { observed_std_devs: Decimal, limit_std_devs: Decimal },
    CircuitBreakerTripped { cooldown_remaining_s: i64 },
}

/// Outcome of running a [`crate::core::risk::RiskManager`] pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RiskDecision {
    Approved { adjusted_notional_usd: Decimal, warning: Option<RiskWarning> },
    Rejected(RiskRejectReason),
}

impl RiskDecision {
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        matches!(self, Self::Approved { .. })
    }
}
