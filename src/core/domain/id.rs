//! Identifier newtypes for exchanges, symbols, signals, and orders.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of an exchange as configured (e.g. `"binance"`, `"kraken"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExchangeId(String);

impl ExchangeId {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ExchangeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ExchangeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A trading pair such as `BTC/USDT`, stored as its canonical `BASE/QUOTE` form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Parse a `BASE/QUOTE` string, rejecting malformed pairs.
    pub fn parse(raw: &str) -> Option<Self> {
        let (base, quote) = raw.split_once('/')?;
        if base.is_empty() || quote.is_empty() {
            return None;
        }
        Some(Self(format!(
            "{}/{}",
            base.to_ascii_uppercase(),
            quote.to_ascii_uppercase()
        )))
    }

    #[must_use]
    pub fn base(&self) -> &str {
        self.0.split_once('/').map_or(self.0.as_str(), |(b, _)| b)
    }

    #[must_use]
    pub fn quote(&self) -> &str {
        self.0.split_once('/').map_or("", |(_, q)| q)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::parse(value).unwrap_or_else(|| Self(value.to_ascii_uppercase()))
    }
}

/// Unique identifier for an emitted [`crate::core::domain::Signal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalId(Uuid);

impl SignalId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SignalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an [`crate::core::domain::Order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(Uuid);

impl OrderId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
