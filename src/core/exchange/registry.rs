//! Runtime exchange selection by name.
//!
//! Exchange implementations are selected by name at startup from
//! `exchanges.enabled`; adding a new exchange means writing one more
//! [`Connector`] implementation and registering a constructor here. No
//! runtime code loading is required.

use std::collections::HashMap;

use crate::core::exchange::simulated::SimulatedConnector;
use crate::core::exchange::Connector;

/// Constructs a boxed [`Connector`] for one configured exchange.
pub type ConnectorFactory = Box<dyn Fn(&str) -> Box<dyn Connector> + Send + Sync>;

/// Maps exchange names to their connector constructors.
#[derive(Default)]
pub struct ExchangeRegistry {
    factories: HashMap<String, ConnectorFactory>,
}

impl ExchangeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for `name`. Re-registering replaces the prior entry.
    pub fn register(&mut self, name: impl Into<String>, factory: ConnectorFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// Build a connector for `name`, or `None` if nothing is registered.
    #[must_use]
    pub fn build(&self, name: &str) -> Option<Box<dyn Connector>> {
        self.factories.get(name).map(|f| f(name))
    }

    /// A registry pre-populated with the simulated connector under every
    /// name in `names`, suitable for Paper mode and tests without real
    /// exchange credentials.
    #[must_use]
    pub fn simulated(names: &[&str]) -> Self {
        let mut registry = Self::new();
        for &name in names {
            let owned = name.to_string();
            registry.register(
                name,
                Box::new(move |_| Box::new(SimulatedConnector::new(owned.clone(), vec![])) as Box<dyn Connector>),
            );
        }
        registry
    }
}
