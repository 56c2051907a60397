//! Tool invoker seam

use crate::tools::types::Invocation;
use async_trait::async_trait;
use std::time::Duration;

/// Executes one named tool against one target within a time budget.
///
/// Implementations must not panic or hang past `budget`: every failure,
/// including exceeding the budget, is reported as an unsuccessful
/// [`Invocation`]. Cancelling an in-flight call is the implementation's
/// concern; the engine always waits for the call to return.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, tool: &str, target: &str, budget: Duration) -> Invocation;
}
