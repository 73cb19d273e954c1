//! Shared market state: the latest book per (exchange, symbol) pair.
//!
//! Readers never block writers and writers never block readers beyond a
//! single shard's lock, so reads never block on writes from a different
//! exchange. [`dashmap::DashMap`] gives us that sharding
//! for free; each slot additionally carries a version counter so
//! detectors can cheaply tell whether anything changed since their last
//! look without re-walking the book.

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::core::domain::{ExchangeId, OrderBook, Symbol, TopOfBook};
use crate::core::market::staleness::StalenessPolicy;

/// One slot in the market state: the latest book plus a monotonic version.
struct Slot {
    book: OrderBook,
    version: u64,
}

/// Emitted on [`MarketState::subscribe`] whenever a slot is published.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub exchange: ExchangeId,
    pub symbol: Symbol,
    pub version: u64,
}

/// Latest order book per (exchange, symbol), with read-time staleness
/// evaluation: staleness is judged when read, not when written, so a
/// slot that goes quiet is treated as stale without needing a background
/// sweep.
pub struct MarketState {
    slots: DashMap<(ExchangeId, Symbol), Slot>,
    staleness: StalenessPolicy,
    changes: broadcast::Sender<ChangeEvent>,
}

impl MarketState {
    #[must_use]
    pub fn new(staleness: StalenessPolicy) -> Self {
        let (changes, _) = broadcast::channel(1024);
        Self {
            slots: DashMap::new(),
            staleness,
            changes,
        }
    }

    /// Publish a new book for its (exchange, symbol) pair, bumping the
    /// slot's version and notifying subscribers. Out-of-order publishes
    /// (an older `event_ts` arriving after a newer one) are dropped.
    pub fn publish(&self, book: OrderBook) {
        let key = (book.exchange().clone(), book.symbol().clone());
        let version = {
            let mut entry = self.slots.entry(key.clone()).or_insert_with(|| Slot { book: book.clone(), version: 0 });
            if entry.version > 0 && book.event_ts() < entry.book.event_ts() {
                return;
            }
            entry.version += 1;
            entry.book = book;
            entry.version
        };
        let _ = self.changes.send(ChangeEvent {
            exchange: key.0,
            symbol: key.1,
            version,
        });
    }

    /// Latest top-of-book for `(exchange, symbol)`, or `None` if absent or
    /// stale as of now.
    #[must_use]
    pub fn snapshot(&self, exchange: &ExchangeId, symbol: &Symbol) -> Option<TopOfBook> {
        let slot = self.slots.get(&(exchange.clone(), symbol.clone()))?;
        let top = slot.book.to_top_of_book();
        let now_instant = std::time::Instant::now();
        let now = chrono::Utc::now();
        if self.staleness.is_fresh(top.event_ts, top.ingress_ts, now, now_instant) {
            Some(top)
        } else {
            None
        }
    }

    /// Full order book for `(exchange, symbol)`, for callers that need to
    /// walk depth (the paper executor's fill simulation). `None` if absent
    /// or stale.
    #[must_use]
    pub fn snapshot_book(&self, exchange: &ExchangeId, symbol: &Symbol) -> Option<OrderBook> {
        let slot = self.slots.get(&(exchange.clone(), symbol.clone()))?;
        let now_instant = std::time::Instant::now();
        let now = chrono::Utc::now();
        let fresh = self
            .staleness
            .is_fresh(slot.book.event_ts(), slot.book.ingress_ts(), now, now_instant);
        fresh.then(|| slot.book.clone())
    }

    /// Fresh top-of-book snapshots for every exchange quoting `symbol`.
    #[must_use]
    pub fn snapshot_all(&self, symbol: &Symbol) -> Vec<TopOfBook> {
        let now_instant = std::time::Instant::now();
        let now = chrono::Utc::now();
        self.slots
            .iter()
            .filter(|entry| &entry.key().1 == symbol)
            .filter_map(|entry| {
                let top = entry.book.to_top_of_book();
                self.staleness.is_fresh(top.event_ts, top.ingress_ts, now, now_instant).then_some(top)
            })
            .collect()
    }

    /// Subscribe to change notifications; lagging receivers drop the
    /// oldest events rather than blocking publishers.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    /// Number of (exchange, symbol) pairs currently tracked, for metrics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
