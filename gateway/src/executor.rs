//! The contract a subschema fulfils: given a request, produce either a single
//! result or a stream of patches (initial result first).

use crate::error::TransportError;
use crate::wire::{AsyncExecutionResult, ExecutionResult, Request};
use async_trait::async_trait;
use futures::stream::BoxStream;

pub enum ExecutorResponse {
    Single(ExecutionResult),
    /// The first item is the initial result; later items are patches with
    /// `has_next = false` on the last.
    Stream(BoxStream<'static, AsyncExecutionResult>),
}

#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, request: Request) -> Result<ExecutorResponse, TransportError>;
}

/// In-process executor backed by a closure. Used for embedded subschemas and
/// throughout the test suite.
pub struct FnExecutor<F>(pub F);

#[async_trait]
impl<F> Executor for FnExecutor<F>
where
    F: Fn(Request) -> ExecutionResult + Send + Sync,
{
    async fn execute(&self, request: Request) -> Result<ExecutorResponse, TransportError> {
        Ok(ExecutorResponse::Single((self.0)(request)))
    }
}
