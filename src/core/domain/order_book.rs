//! Order book and top-of-book snapshot types.

use std::time::Instant;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::id::{ExchangeId, Symbol};
use super::money::{Price, Qty};

/// A single price level: price plus the quantity resting at that price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceLevel {
    pub price: Price,
    pub qty: Qty,
}

impl PriceLevel {
    #[must_use]
    pub const fn new(price: Price, qty: Qty) -> Self {
        Self { price, qty }
    }
}

/// Normalized order book for one (exchange, symbol) pair.
///
/// `bids` are sorted descending by price, `asks` ascending, matching the
/// invariant `bids[0].price < asks[0].price` enforced by [`OrderBook::new`].
#[derive(Debug, Clone)]
pub struct OrderBook {
    exchange: ExchangeId,
    symbol: Symbol,
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
    /// Exchange-reported event time, or ingress time if the exchange omits one.
    event_ts: DateTime<Utc>,
    /// Time the connector finished parsing this snapshot, monotonic for latency math.
    ingress_ts: Instant,
    /// Exchange sequence number, used to detect gaps in incremental updates.
    sequence: Option<u64>,
}

impl OrderBook {
    /// Build a new order book, sorting levels and dropping crossed books.
    ///
    /// Returns `None` if, after sorting, the best bid is not strictly below
    /// the best ask, or if either side is empty (depth must be ≥ 1 per side).
    pub fn new(
        exchange: ExchangeId,
        symbol: Symbol,
        mut bids: Vec<PriceLevel>,
        mut asks: Vec<PriceLevel>,
        event_ts: DateTime<Utc>,
        ingress_ts: Instant,
        sequence: Option<u64>,
    ) -> Option<Self> {
        bids.retain(|l| l.qty > Decimal::ZERO);
        asks.retain(|l| l.qty > Decimal::ZERO);
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));

        if bids.is_empty() || asks.is_empty() {
            return None;
        }
        if bids[0].price >= asks[0].price {
            return None;
        }

        Some(Self {
            exchange,
            symbol,
            bids,
            asks,
            event_ts,
            ingress_ts,
            sequence,
        })
    }

    #[must_use]
    pub fn exchange(&self) -> &ExchangeId {
        &self.exchange
    }

    #[must_use]
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    #[must_use]
    pub fn bids(&self) -> &[PriceLevel] {
        &self.bids
    }

    #[must_use]
    pub fn asks(&self) -> &[PriceLevel] {
        &self.asks
    }

    #[must_use]
    pub fn event_ts(&self) -> DateTime<Utc> {
        self.event_ts
    }

    #[must_use]
    pub fn ingress_ts(&self) -> Instant {
        self.ingress_ts
    }

    #[must_use]
    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    #[must_use]
    pub fn best_bid(&self) -> PriceLevel {
        self.bids[0]
    }

    #[must_use]
    pub fn best_ask(&self) -> PriceLevel {
        self.asks[0]
    }

    #[must_use]
    pub fn to_top_of_book(&self) -> TopOfBook {
        let bid = self.best_bid();
        let ask = self.best_ask();
        TopOfBook {
            exchange: self.exchange.clone(),
            symbol: self.symbol.clone(),
            best_bid: bid.price,
            best_bid_qty: bid.qty,
            best_ask: ask.price,
            best_ask_qty: ask.qty,
            event_ts: self.event_ts,
            ingress_ts: self.ingress_ts,
        }
    }

    /// USD notional available at or better than `limit_price` on the given side,
    /// walking the book up to `max_qty` units.
    #[must_use]
    pub fn depth_usd(&self, side: BookSide, limit_price: Price, max_qty: Qty) -> Decimal {
        let levels: &[PriceLevel] = match side {
            BookSide::Bid => &self.bids,
            BookSide::Ask => &self.asks,
        };
        let mut remaining = max_qty;
        let mut usd = Decimal::ZERO;
        for level in levels {
            let acceptable = match side {
                BookSide::Bid => level.price >= limit_price,
                BookSide::Ask => level.price <= limit_price,
            };
            if !acceptable || remaining <= Decimal::ZERO {
                break;
            }
            let take = level.qty.min(remaining);
            usd += take * level.price;
            remaining -= take;
        }
        usd
    }
}

/// Which side of the book a query or fill walk applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookSide {
    Bid,
    Ask,
}

/// Derived best-bid/best-ask snapshot, overwritten atomically per update.
#[derive(Debug, Clone)]
pub struct TopOfBook {
    pub exchange: ExchangeId,
    pub symbol: Symbol,
    pub best_bid: Price,
    pub best_bid_qty: Qty,
    pub best_ask: Price,
    pub best_ask_qty: Qty,
    pub event_ts: DateTime<Utc>,
    pub ingress_ts: Instant,
}

impl TopOfBook {
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        self.best_bid >= self.best_ask
    }

    #[must_use]
    pub fn mid(&self) -> Price {
        (self.best_bid + self.best_ask) / Decimal::TWO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn book(bids: Vec<(Decimal, Decimal)>, asks: Vec<(Decimal, Decimal)>) -> Option<OrderBook> {
        OrderBook::new(
            ExchangeId::from("binance"),
            Symbol::from("BTC/USDT"),
            bids.into_iter().map(|(p, q)| PriceLevel::new(p, q)).collect(),
            asks.into_iter().map(|(p, q)| PriceLevel::new(p, q)).collect(),
            Utc::now(),
            Instant::now(),
            Some(1),
        )
    }

    #[test]
    fn sorts_bids_descending_and_asks_ascending() {
        let b = book(
            vec![(dec!(99), dec!(1)), (dec!(100), dec!(1))],
            vec![(dec!(102), dec!(1)), (dec!(101), dec!(1))],
        )
        .unwrap();
        assert_eq!(b.best_bid().price, dec!(100));
        assert_eq!(b.best_ask().price, dec!(101));
    }

    #[test]
    fn rejects_crossed_book() {
        assert!(book(vec![(dec!(101), dec!(1))], vec![(dec!(100), dec!(1))]).is_none());
    }

    #[test]
    fn rejects_empty_side() {
        assert!(book(vec![], vec![(dec!(100), dec!(1))]).is_none());
    }

    #[test]
    fn depth_usd_walks_multiple_levels() {
        let b = book(
            vec![(dec!(100), dec!(1))],
            vec![(dec!(101), dec!(1)), (dec!(102), dec!(2))],
        )
        .unwrap();
        // 1 @ 101 + 2 @ 102 = 305, capped at max_qty 2 -> 1@101 + 1@102
        let usd = b.depth_usd(BookSide::Ask, dec!(103), dec!(2));
        assert_eq!(usd, dec!(101) + dec!(102));
    }

    #[test]
    fn depth_usd_respects_limit_price() {
        let b = book(vec![(dec!(100), dec!(1))], vec![(dec!(101), dec!(1)), (dec!(105), dec!(5))]).unwrap();
        let usd = b.depth_usd(BookSide::Ask, dec!(102), dec!(10));
        assert_eq!(usd, dec!(101));
    }

    #[test]
    fn top_of_book_detects_crossed() {
        let mut top = book(vec![(dec!(100), dec!(1))], vec![(dec!(101), dec!(1))])
            .unwrap()
            .to_top_of_book();
        assert!(!top.is_crossed());
        top.best_bid = dec!(102);
        assert!(top.is_crossed());
    }
}
