//! Cross-exchange spot arbitrage: buy low on one exchange, sell high on
//! another, same symbol.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::core::domain::{pct_of, Signal, SignalId, SignalLeg, SignalStatus, StrategyKind, Side, Symbol, TopOfBook};
use crate::core::strategy::sizing;
use crate::core::strategy::traits::{Detector, DetectorContext};

#[derive(Debug, Clone, Deserialize)]
pub struct SpatialConfig {
    #[serde(default = "default_min_net_spread_pct")]
    pub min_net_spread_pct: Decimal,
    #[serde(default = "default_max_position_per_coin_usd")]
    pub max_position_per_coin_usd: Decimal,
    /// Minimum shallow-side depth a candidate must clear before a signal is
    /// emitted at all; below this, the book is too thin to trust the quoted
    /// spread.
    #[serde(default = "default_min_depth_usd")]
    pub min_depth_usd: Decimal,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    /// Flat slippage haircut applied on top of book-depth sizing, since the
    /// top-of-book quantity alone overstates how much size clears at that
    /// exact price once the order starts walking the book.
    #[serde(default = "default_assumed_slippage_pct")]
    pub assumed_slippage_pct: Decimal,
}

const fn default_min_net_spread_pct() -> Decimal {
    Decimal::new(25, 2) // 0.25%
}
const fn default_max_position_per_coin_usd() -> Decimal {
    Decimal::new(1000, 0)
}
const fn default_min_depth_usd() -> Decimal {
    Decimal::new(1000, 0)
}
const fn default_cooldown_ms() -> u64 {
    2000
}
const fn default_assumed_slippage_pct() -> Decimal {
    Decimal::new(2, 2) // 0.02%
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            min_net_spread_pct: default_min_net_spread_pct(),
            max_position_per_coin_usd: default_max_position_per_coin_usd(),
            min_depth_usd: default_min_depth_usd(),
            cooldown_ms: default_cooldown_ms(),
            assumed_slippage_pct: default_assumed_slippage_pct(),
        }
    }
}

struct Candidate {
    buy: TopOfBook,
    sell: TopOfBook,
    gross_pct: Decimal,
    net_pct: Decimal,
    score: Decimal,
}

/// Detects two-leg spatial spread opportunities across every pair of
/// exchanges quoting the same symbol.
pub struct SpatialDetector {
    config: SpatialConfig,
    last_signal: DashMap<Symbol, Instant>,
}

impl SpatialDetector {
    #[must_use]
    pub fn new(config: SpatialConfig) -> Self {
        Self {
            config,
            last_signal: DashMap::new(),
        }
    }

    fn in_cooldown(&self, symbol: &Symbol) -> bool {
        self.last_signal
            .get(symbol)
            .is_some_and(|ts| ts.elapsed() < Duration::from_millis(self.config.cooldown_ms))
    }

    fn best_candidate(&self, tops: &[TopOfBook], ctx: &DetectorContext<'_>) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;
        for buy in tops {
            for sell in tops {
                if buy.exchange == sell.exchange {
                    continue;
                }
                if buy.is_crossed() || sell.is_crossed() {
                    continue;
                }
                let gross_pct = (sell.best_bid - buy.best_ask) / buy.best_ask * Decimal::from(100);
                if gross_pct <= Decimal::ZERO {
                    continue;
                }
                let fee_pct = ctx.fees.taker_fee_pct(&buy.exchange) + ctx.fees.taker_fee_pct(&sell.exchange);
                let net_pct = gross_pct - fee_pct - self.config.assumed_slippage_pct;
                if net_pct < self.config.min_net_spread_pct {
                    continue;
                }
                let buy_depth_usd = buy.best_ask_qty * buy.best_ask;
                let sell_depth_usd = sell.best_bid_qty * sell.best_bid;
                let min_depth_usd = buy_depth_usd.min(sell_depth_usd);
                let score = net_pct * min_depth_usd;

                if best.as_ref().map_or(true, |b| score > b.score) {
                    best = Some(Candidate {
                        buy: buy.clone(),
                        sell: sell.clone(),
                        gross_pct,
                        net_pct,
                        score,
                    });
                }
            }
        }
        best
    }
}

impl Detector for SpatialDetector {
    fn name(&self) -> &'static str {
        "spatial"
    }

    fn detect(&self, ctx: &DetectorContext<'_>) -> Vec<Signal> {
        let mut signals = Vec::new();

        for symbol in ctx.symbols {
            if self.in_cooldown(symbol) {
                continue;
            }
            let tops = ctx.market.snapshot_all(symbol);
            if tops.len() < 2 {
                continue;
            }
            let Some(candidate) = self.best_candidate(&tops, ctx) else {
                continue;
            };

            let buy_depth_usd = candidate.buy.best_ask_qty * candidate.buy.best_ask;
            let sell_depth_usd = candidate.sell.best_bid_qty * candidate.sell.best_bid;
            let min_depth_usd = buy_depth_usd.min(sell_depth_usd);
            if min_depth_usd < self.config.min_depth_usd {
                continue;
            }

            let target = sizing::target_notional_usd(self.config.max_position_per_coin_usd, min_depth_usd);
            let notional_usd = sizing::clamp_to_depth(target, min_depth_usd);
            if notional_usd <= Decimal::ZERO {
                continue;
            }
            let qty = notional_usd / candidate.buy.best_ask;

            let legs = vec![
                SignalLeg {
                    exchange: candidate.buy.exchange.clone(),
                    symbol: symbol.clone(),
                    side: Side::Buy,
                    target_price: candidate.buy.best_ask,
                    max_qty: qty,
                },
                SignalLeg {
                    exchange: candidate.sell.exchange.clone(),
                    symbol: symbol.clone(),
                    side: Side::Sell,
                    target_price: candidate.sell.best_bid,
                    max_qty: qty,
                },
            ];

            signals.push(Signal {
                id: SignalId::new(),
                strategy: StrategyKind::Spatial,
                legs,
                gross_spread_pct: candidate.gross_pct,
                net_spread_pct: candidate.net_pct,
                estimated_pnl_usd: pct_of(notional_usd, candidate.net_pct),
                notional_usd,
                detected_ts: chrono::Utc::now(),
                status: SignalStatus::Detected,
            });

            self.last_signal.insert(symbol.clone(), Instant::now());
        }

        signals
    }
}
