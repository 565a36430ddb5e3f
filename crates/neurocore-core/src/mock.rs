use futures::future::BoxFuture;
use std::time::Duration;

use crate::action::{Operation, OptimizationResult};
use crate::error::Result;

/// Resolves after a fixed delay with a canned result.
///
/// Used for every action in `mock` execution mode so the presentation layers
/// can be exercised without touching the host.
#[derive(Debug, Clone)]
pub struct MockOperation {
    delay: Duration,
    result: OptimizationResult,
}

impl MockOperation {
    pub fn new(delay: Duration, result: OptimizationResult) -> Self {
        Self { delay, result }
    }
}

impl Operation for MockOperation {
    fn execute(&self) -> BoxFuture<'_, Result<OptimizationResult>> {
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(self.result.clone())
        })
    }
}
