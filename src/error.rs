//! Error taxonomy.
//!
//! Subsystems define their own `thiserror` enum over a shared taxonomy
//! (transient network, rate limit, auth/config, protocol,
//! business, invariant violation); [`Error`] composes them for call sites
//! that cross subsystem boundaries (the orchestrator, the CLI).

use thiserror::Error;

pub use crate::core::exchange::ConnectorError;
pub use crate::core::execution::ExecutionError;
pub use crate::core::risk::RiskError;

/// Top-level error type returned from orchestration and CLI entry points.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("connector error: {0}")]
    Connector(#[from] ConnectorError),

    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("risk error: {0}")]
    Risk(#[from] RiskError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Configuration loading/validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("live mode requires a non-disruptive-only reload; {field} requires a restart")]
    DisruptiveReload { field: &'static str },
}
