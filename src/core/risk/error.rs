//! Risk subsystem error taxonomy.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum RiskError {
    #[error("no position data for exchange {0}")]
    MissingPositionData(String),

    #[error("invalid risk configuration: {0}")]
    InvalidConfig(String),
}
