//! Arbitrage detectors: pure scanners over [`crate::core::market::MarketState`]
//! that emit [`crate::core::domain::Signal`]s for the risk manager to evaluate.

mod sizing;
mod spatial;
mod traits;
mod triangular;

pub use sizing::{clamp_to_depth, target_notional_usd};
pub use spatial::{SpatialConfig, SpatialDetector};
pub use traits::{Detector, DetectorContext, FeeSchedule};
pub use triangular::{PathSpec, PathValidationError, TriangularConfig, TriangularDetector};
