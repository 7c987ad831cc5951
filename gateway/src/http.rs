//! HTTP executor: POSTs the printed operation to a subschema endpoint.

use crate::error::TransportError;
use crate::executor::{Executor, ExecutorResponse};
use crate::wire::{ExecutionResult, JsonMap, Request};
use async_trait::async_trait;
use serde::Serialize;
use weft_composer::print::print_document;

#[derive(Serialize)]
struct HttpRequestBody<'a> {
    query: String,
    #[serde(rename = "operationName", skip_serializing_if = "Option::is_none")]
    operation_name: &'a Option<String>,
    variables: &'a JsonMap,
}

#[derive(Clone)]
pub struct HttpExecutor {
    pub url: String,
}

impl HttpExecutor {
    pub fn new(url: impl Into<String>) -> Self {
        HttpExecutor { url: url.into() }
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    async fn execute(&self, request: Request) -> Result<ExecutorResponse, TransportError> {
        let body = HttpRequestBody {
            query: print_document(&request.document),
            operation_name: &request.operation_name,
            variables: &request.variables,
        };
        let body =
            surf::Body::from_json(&body).map_err(|e| TransportError(e.to_string()))?;
        let mut response = surf::post(&self.url)
            .body(body)
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        let result: ExecutionResult = response
            .body_json()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        Ok(ExecutorResponse::Single(result))
    }
}
