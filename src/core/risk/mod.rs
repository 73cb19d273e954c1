//! Risk management: a serial pipeline every signal must clear
//! before it reaches the execution engine.

mod error;
mod manager;
mod types;

pub use error::RiskError;
pub use manager::RiskManager;
pub use types::{AnomalyContext, EquitySnapshot, ExposureSnapshot, RiskConfig, RiskDecision, RiskRejectReason, RiskWarning};
