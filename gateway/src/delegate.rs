//! The delegator: builds a sub-request for one root field, runs the
//! transform pipeline around the subschema's executor, and annotates the
//! outcome with provenance and relocated errors.

use crate::error::TransportError;
use crate::executor::ExecutorResponse;
use crate::external::ReceiverHandle;
use crate::receiver::Receiver;
use crate::subschema::Subschema;
use crate::transforms::{DelegationInfo, TransformChain};
use crate::wire::{ExecutionResult, GraphQLError, JsonMap, PathSegment, Request};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};
use weft_composer::ast::*;
use weft_composer::{OperationKind, SchemaIndex, StitchingInfo, SubschemaId};

/// Per-delegation immutable inputs.
pub struct DelegationParams {
    pub operation: OperationKind,
    /// Root field to call on the target subschema.
    pub field_name: String,
    /// Arguments for that root field, as JSON; lifted into variables.
    pub args: JsonMap,
    /// Requested subtree under the root field.
    pub selection_set: SelectionSet,
    /// Caller variable values; pruned to what the sub-request uses.
    pub variables: JsonMap,
    /// Caller variable definitions; pruned alongside the values.
    pub variable_definitions: Vec<VariableDefinition>,
    /// Caller fragment definitions referenced by the selection.
    pub fragments: Vec<FragmentDefinition>,
    /// Named type the delegated field resolves to in the composed schema.
    pub return_type: String,
    /// Composed-result path of the sub-request's root field value.
    pub path: Vec<PathSegment>,
    pub skip_type_merging: bool,
}

/// What came back: the value at the root field key plus annotations.
pub struct DelegationResult {
    pub value: Value,
    pub origin: SubschemaId,
    pub unpathed_errors: Vec<GraphQLError>,
    /// Errors already relocated under the composed path.
    pub pathed_errors: Vec<GraphQLError>,
    pub receiver: Option<ReceiverHandle>,
}

impl DelegationResult {
    fn failed(origin: SubschemaId, error: GraphQLError) -> Self {
        DelegationResult {
            value: Value::Null,
            origin,
            unpathed_errors: vec![],
            pathed_errors: vec![error],
            receiver: None,
        }
    }
}

pub struct Delegator {
    pub(crate) composed: Arc<SchemaIndex>,
    pub(crate) stitching: Arc<StitchingInfo>,
}

impl Delegator {
    pub fn new(composed: Arc<SchemaIndex>, stitching: Arc<StitchingInfo>) -> Self {
        Delegator {
            composed,
            stitching,
        }
    }

    #[instrument(
        level = "debug",
        skip_all,
        fields(subschema = %subschema.name, field = %params.field_name)
    )]
    pub async fn delegate(
        &self,
        subschema: &Arc<Subschema>,
        params: DelegationParams,
    ) -> DelegationResult {
        let delegation = DelegationInfo {
            subschema: Arc::clone(subschema),
            stitching: Arc::clone(&self.stitching),
            source_schema: Arc::clone(&self.composed),
            operation: params.operation,
            field_name: params.field_name.clone(),
            args: params.args.clone(),
            return_type: params.return_type.clone(),
            path: params.path.clone(),
            skip_type_merging: params.skip_type_merging,
        };

        let request = build_request(&params);
        let mut chain = TransformChain::for_delegation(subschema);
        let request = match chain.request(request, &delegation) {
            Ok(request) => request,
            Err(e) => {
                return DelegationResult::failed(
                    subschema.id,
                    GraphQLError::new(e.to_string()).located(params.path.clone()),
                )
            }
        };

        let response = match subschema.executor.execute(request).await {
            Ok(response) => response,
            Err(TransportError(message)) => {
                debug!(error = %message, "executor failed");
                return DelegationResult::failed(
                    subschema.id,
                    GraphQLError::new(message).located(params.path.clone()),
                );
            }
        };

        let (initial, receiver) = match response {
            ExecutorResponse::Single(result) => (result, None),
            ExecutorResponse::Stream(stream) => {
                let (initial, receiver) =
                    Receiver::from_stream(stream, params.path.clone()).await;
                (
                    ExecutionResult {
                        data: initial.data,
                        errors: initial.errors,
                    },
                    receiver,
                )
            }
        };

        let result = chain.result(initial, &delegation);
        let mut delegated = split_result(result, &params, subschema.id);
        // the delegated value sits under the root field key in the stream's
        // data, so the handle starts there
        delegated.receiver =
            receiver.map(|r| ReceiverHandle::new(r).child(&params.field_name));
        delegated
    }
}

fn build_request(params: &DelegationParams) -> Request {
    let root_field = FieldNode {
        position: pos(),
        alias: None,
        name: params.field_name.clone(),
        arguments: vec![],
        directives: vec![],
        selection_set: params.selection_set.clone(),
    };
    let selection_set = SelectionSet {
        span: span(),
        items: vec![Selection::Field(root_field)],
    };
    let variable_definitions = params.variable_definitions.clone();
    let operation = match params.operation {
        OperationKind::Query => OperationDefinition::Query(QueryOperation {
            position: pos(),
            name: None,
            variable_definitions,
            directives: vec![],
            selection_set,
        }),
        OperationKind::Mutation => OperationDefinition::Mutation(MutationOperation {
            position: pos(),
            name: None,
            variable_definitions,
            directives: vec![],
            selection_set,
        }),
        OperationKind::Subscription => OperationDefinition::Subscription(SubscriptionOperation {
            position: pos(),
            name: None,
            variable_definitions,
            directives: vec![],
            selection_set,
        }),
    };
    let mut definitions = vec![Definition::Operation(operation)];
    definitions.extend(
        params
            .fragments
            .iter()
            .cloned()
            .map(Definition::Fragment),
    );
    Request {
        document: QueryDocument { definitions },
        variables: params.variables.clone(),
        operation_name: None,
        operation_type: params.operation,
    }
}

/// Extracts the root field's value and relocates errors: pathed sub-errors
/// move under the composed path, unpathed ones ride on the external object.
fn split_result(
    result: ExecutionResult,
    params: &DelegationParams,
    origin: SubschemaId,
) -> DelegationResult {
    let mut unpathed = vec![];
    let mut pathed = vec![];
    for mut error in result.errors {
        match error.path.take() {
            Some(sub_path) => {
                let mut path = params.path.clone();
                // the sub path's first segment is the sub-request root field
                path.extend(sub_path.into_iter().skip(1));
                pathed.push(error.located(path));
            }
            None => unpathed.push(error),
        }
    }

    let value = match result.data {
        Some(Value::Object(mut map)) => map.remove(&params.field_name).unwrap_or(Value::Null),
        _ => Value::Null,
    };

    DelegationResult {
        value,
        origin,
        unpathed_errors: unpathed,
        pathed_errors: pathed,
        receiver: None,
    }
}
