//! The executor capability set.

use async_trait::async_trait;

use crate::core::domain::Signal;
use crate::core::execution::{ExecutionError, ExecutionReport};

/// Takes an approved signal and drives its legs to a terminal state,
/// reconciling partial fills and failures along the way.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, signal: &Signal) -> Result<ExecutionReport, ExecutionError>;
}
