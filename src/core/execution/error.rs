//! Execution subsystem error taxonomy.

use thiserror::Error;

use crate::core::exchange::ConnectorError;

#[derive(Error, Debug, Clone)]
pub enum ExecutionError {
    #[error("no connector configured for exchange {0}")]
    UnknownExchange(String),

    #[error("connector error while executing leg: {0}")]
    Connector(#[from] ConnectorError),

    #[error("order did not reach a terminal state within {0}ms")]
    OrderTimeout(u64),

    #[error("no book available to simulate a fill for {0}")]
    NoBook(String),

    #[error("flatten failed for order {0}: {1}")]
    FlattenFailed(String, String),
}
