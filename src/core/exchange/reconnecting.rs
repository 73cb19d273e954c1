//! Reconnecting decorator for any [`Connector`].
//!
//! Wraps an inner connector with exponential backoff, jitter, and a
//! `Degraded` absorbing state: after `max_reconnect_attempts`
//! consecutive failures the wrapper stops trying and reports `Degraded`,
//! which the market state's staleness policy then treats as "no fresh
//! data" for every symbol on this exchange.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::core::domain::{Balance, OrderId, Symbol};
use crate::core::exchange::{Connector, ConnectorError, ConnectorState, MarketEvent, OrderSpec};

/// Backoff/reconnect tuning, deserialized from `exchanges.<name>.websocket`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectionConfig {
    #[serde(default = "default_reconnect_delay_s")]
    pub reconnect_delay_s: u64,
    #[serde(default = "default_max_delay_s")]
    pub max_delay_s: u64,
    #[serde(default = "default_max_attempts")]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_interval_ms: u64,
}

const fn default_reconnect_delay_s() -> u64 {
    5
}
const fn default_max_delay_s() -> u64 {
    60
}
const fn default_max_attempts() -> u32 {
    10
}
const fn default_heartbeat_ms() -> u64 {
    15_000
}

impl Default for ReconnectionConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_s: default_reconnect_delay_s(),
            max_delay_s: default_max_delay_s(),
            max_reconnect_attempts: default_max_attempts(),
            heartbeat_interval_ms: default_heartbeat_ms(),
        }
    }
}

/// Wraps a [`Connector`] with automatic, jittered, exponential-backoff reconnection.
pub struct Reconnecting<C: Connector> {
    inner: C,
    config: ReconnectionConfig,
    subscribed: Vec<Symbol>,
    subscribed_depth: usize,
    consecutive_failures: u32,
    current_delay_ms: u64,
    degraded: bool,
}

impl<C: Connector> Reconnecting<C> {
    #[must_use]
    pub fn new(inner: C, config: ReconnectionConfig) -> Self {
        let current_delay_ms = config.reconnect_delay_s * 1000;
        Self {
            inner,
            config,
            subscribed: Vec::new(),
            subscribed_depth: 0,
            consecutive_failures: 0,
            current_delay_ms,
            degraded: false,
        }
    }

    fn reset_backoff(&mut self) {
        self.consecutive_failures = 0;
        self.current_delay_ms = self.config.reconnect_delay_s * 1000;
        self.degraded = false;
    }

    fn next_delay(&mut self) -> Duration {
        let base = self.current_delay_ms;
        let jitter_frac: f64 = rand::thread_rng().gen_range(0.8..1.2);
        let jittered = (base as f64 * jitter_frac) as u64;

        let doubled = self.current_delay_ms.saturating_mul(2);
        self.current_delay_ms = doubled.min(self.config.max_delay_s * 1000);

        Duration::from_millis(jittered)
    }

    fn record_failure(&mut self) {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.config.max_reconnect_attempts {
            self.degraded = true;
            error!(
                exchange = self.inner.name(),
                attempts = self.consecutive_failures,
                "connector marked degraded after exhausting reconnect attempts"
            );
        }
    }

    async fn reconnect(&mut self) -> Result<(), ConnectorError> {
        if self.degraded {
            return Err(ConnectorError::Transient("connector is degraded".into()));
        }

        let delay = self.next_delay();
        info!(
            exchange = self.inner.name(),
            delay_ms = delay.as_millis(),
            attempt = self.consecutive_failures + 1,
            "reconnecting after backoff"
        );
        sleep(delay).await;

        match self.inner.connect().await {
            Ok(()) => {
                if !self.subscribed.is_empty() {
                    self.inner.subscribe(&self.subscribed, self.subscribed_depth).await?;
                }
                self.reset_backoff();
                info!(exchange = self.inner.name(), "reconnected");
                Ok(())
            }
            Err(e) => {
                warn!(exchange = self.inner.name(), error = %e, "reconnect attempt failed");
                self.record_failure();
                Err(e)
            }
        }
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}

#[async_trait]
impl<C: Connector> Connector for Reconnecting<C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn state(&self) -> ConnectorState {
        if self.degraded {
            ConnectorState::Degraded
        } else {
            self.inner.state()
        }
    }

    async fn connect(&mut self) -> Result<(), ConnectorError> {
        match self.inner.connect().await {
            Ok(()) => {
                self.reset_backoff();
                Ok(())
            }
            Err(e) => {
                self.record_failure();
                Err(e)
            }
        }
    }

    async fn subscribe(&mut self, symbols: &[Symbol], depth: usize) -> Result<(), ConnectorError> {
        self.subscribed = symbols.to_vec();
        self.subscribed_depth = depth;
        self.inner.subscribe(symbols, depth).await
    }

    fn events(&mut self) -> &mut mpsc::Receiver<MarketEvent> {
        self.inner.events()
    }

    async fn place_order(&self, signal_id_hint: &str, spec: OrderSpec) -> Result<OrderId, ConnectorError> {
        self.inner.place_order(signal_id_hint, spec).await
    }

    async fn cancel_order(&self, order_id: OrderId) -> Result<bool, ConnectorError> {
        self.inner.cancel_order(order_id).await
    }

    async fn balances(&self) -> Result<std::collections::HashMap<String, Balance>, ConnectorError> {
        self.inner.balances().await
    }

    async fn close(&mut self) -> Result<(), ConnectorError> {
        self.inner.close().await
    }
}

/// Drives reconnection in the background: call in a loop whenever
/// `connector.events()` yields `None`/`Disconnected` or the caller observes
/// a non-streaming state. Returns once the connector becomes degraded.
pub async fn run_until_degraded<C: Connector>(connector: &mut Reconnecting<C>) {
    let deadline_check_every = Duration::from_millis(connector.config.heartbeat_interval_ms);
    let mut last_event = Instant::now();
    loop {
        if connector.is_degraded() {
            return;
        }
        tokio::select! {
            maybe = connector.inner.events().recv() => {
                match maybe {
                    Some(MarketEvent::Disconnected { reason }) => {
                        warn!(exchange = connector.name(), reason = %reason, "disconnected, reconnecting");
                        let _ = connector.reconnect().await;
                    }
                    Some(_) => {
                        last_event = Instant::now();
                    }
                    None => {
                        let _ = connector.reconnect().await;
                    }
                }
            }
            () = sleep(deadline_check_every) => {
                if last_event.elapsed() > deadline_check_every * 2 {
                    warn!(exchange = connector.name(), "missed heartbeat, reconnecting");
                    let _ = connector.reconnect().await;
                }
            }
        }
    }
}
