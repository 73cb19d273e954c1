//! Process wiring: configuration, shared state, and the orchestrator that
//! ties connectors, detectors, risk, and execution together.

pub mod config;
mod orchestrator;
mod state;

pub use config::Config;
pub use orchestrator::Orchestrator;
pub use state::AppState;
