//! Execution engine: turns approved signals into orders and
//! reconciles however their legs actually settle.

mod error;
mod live;
mod paper;
mod traits;
mod types;

pub use error::ExecutionError;
pub use live::LiveExecutor;
pub use paper::PaperExecutor;
pub use traits::Executor;
pub use types::{realized_pnl_usd, ExecutionOutcome, ExecutionReport, ExecutorConfig};
