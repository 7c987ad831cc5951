//! The request transform pipeline: an ordered set of bidirectional
//! transforms applied around every sub-request. Requests reduce
//! left-to-right, results reduce right-to-left, so a transform sees its own
//! additions on the way back. Each transform is a value implementing a
//! capability trait, with a private per-delegation context.

mod add_arguments_as_variables;
mod add_selection_sets;
mod add_typename;
mod expand_abstract_types;
mod filter_to_schema;
mod wrap_concrete_types;

pub use add_arguments_as_variables::AddArgumentsAsVariables;
pub use add_selection_sets::AddSelectionSets;
pub use add_typename::AddTypename;
pub use expand_abstract_types::ExpandAbstractTypes;
pub use filter_to_schema::FilterToSchema;
pub use wrap_concrete_types::WrapConcreteTypes;

use crate::error::DelegationError;
use crate::subschema::Subschema;
use crate::wire::{ExecutionResult, JsonMap, PathSegment, Request};
use std::any::Any;
use std::sync::Arc;
use weft_composer::ast::*;
use weft_composer::{OperationKind, SchemaIndex, StitchingInfo};

/// Immutable facts about the delegation a transform runs inside.
pub struct DelegationInfo {
    pub subschema: Arc<Subschema>,
    pub stitching: Arc<StitchingInfo>,
    /// The composed schema the incoming operation was written against.
    pub source_schema: Arc<SchemaIndex>,
    pub operation: OperationKind,
    pub field_name: String,
    pub args: JsonMap,
    pub return_type: String,
    pub path: Vec<PathSegment>,
    pub skip_type_merging: bool,
}

pub struct TransformContext<'a> {
    /// Private per-delegation state, created by `Transform::new_context`.
    pub state: &'a mut (dyn Any + Send),
    pub delegation: &'a DelegationInfo,
}

pub trait Transform: Send + Sync {
    /// Private state carried between `transform_request` and
    /// `transform_result`; initialized empty on every delegation.
    fn new_context(&self) -> Box<dyn Any + Send> {
        Box::new(())
    }

    fn transform_schema(&self, schema: SchemaIndex) -> SchemaIndex {
        schema
    }

    fn transform_request(
        &self,
        request: Request,
        cx: &mut TransformContext<'_>,
    ) -> Result<Request, DelegationError> {
        let _ = cx;
        Ok(request)
    }

    fn transform_result(
        &self,
        result: ExecutionResult,
        cx: &mut TransformContext<'_>,
    ) -> ExecutionResult {
        let _ = cx;
        result
    }
}

/// One delegation's transform instances and their contexts.
pub(crate) struct TransformChain {
    links: Vec<(Arc<dyn Transform>, Box<dyn Any + Send>)>,
}

impl TransformChain {
    /// Builds the standard chain: built-ins around the subschema's own
    /// transforms (reversed, as they were authored consumer-side), with
    /// schema filtering last and typename injection after it.
    pub fn for_delegation(subschema: &Subschema) -> Self {
        let mut transforms: Vec<Arc<dyn Transform>> = vec![
            Arc::new(WrapConcreteTypes),
            Arc::new(ExpandAbstractTypes),
            Arc::new(AddSelectionSets),
        ];
        transforms.extend(subschema.transforms.iter().rev().cloned());
        transforms.push(Arc::new(AddArgumentsAsVariables));
        transforms.push(Arc::new(FilterToSchema));
        transforms.push(Arc::new(AddTypename));
        TransformChain::new(transforms)
    }

    pub fn new(transforms: Vec<Arc<dyn Transform>>) -> Self {
        let links = transforms
            .into_iter()
            .map(|t| {
                let state = t.new_context();
                (t, state)
            })
            .collect();
        TransformChain { links }
    }

    pub fn request(
        &mut self,
        request: Request,
        delegation: &DelegationInfo,
    ) -> Result<Request, DelegationError> {
        let mut request = request;
        for (transform, state) in self.links.iter_mut() {
            let mut cx = TransformContext {
                state: state.as_mut(),
                delegation,
            };
            request = transform.transform_request(request, &mut cx)?;
        }
        Ok(request)
    }

    pub fn result(&mut self, result: ExecutionResult, delegation: &DelegationInfo) -> ExecutionResult {
        let mut result = result;
        for (transform, state) in self.links.iter_mut().rev() {
            let mut cx = TransformContext {
                state: state.as_mut(),
                delegation,
            };
            result = transform.transform_result(result, &mut cx);
        }
        result
    }
}

// document traversal helpers shared by the built-ins

pub(crate) fn split_document(
    document: QueryDocument,
) -> (Vec<OperationDefinition>, Vec<FragmentDefinition>) {
    let mut operations = vec![];
    let mut fragments = vec![];
    for def in document.definitions {
        match def {
            Definition::Operation(op) => operations.push(op),
            Definition::Fragment(frag) => fragments.push(frag),
        }
    }
    (operations, fragments)
}

pub(crate) fn join_document(
    operations: Vec<OperationDefinition>,
    fragments: Vec<FragmentDefinition>,
) -> QueryDocument {
    let mut definitions: Vec<Definition> = operations
        .into_iter()
        .map(Definition::Operation)
        .collect();
    definitions.extend(fragments.into_iter().map(Definition::Fragment));
    QueryDocument { definitions }
}

pub(crate) fn operation_selection_set_mut(op: &mut OperationDefinition) -> &mut SelectionSet {
    match op {
        OperationDefinition::SelectionSet(ss) => ss,
        OperationDefinition::Query(q) => &mut q.selection_set,
        OperationDefinition::Mutation(m) => &mut m.selection_set,
        OperationDefinition::Subscription(s) => &mut s.selection_set,
    }
}

pub(crate) fn operation_selection_set(op: &OperationDefinition) -> &SelectionSet {
    match op {
        OperationDefinition::SelectionSet(ss) => ss,
        OperationDefinition::Query(q) => &q.selection_set,
        OperationDefinition::Mutation(m) => &m.selection_set,
        OperationDefinition::Subscription(s) => &s.selection_set,
    }
}

pub(crate) fn variable_definitions_mut(
    op: &mut OperationDefinition,
) -> Option<&mut Vec<VariableDefinition>> {
    match op {
        OperationDefinition::SelectionSet(_) => None,
        OperationDefinition::Query(q) => Some(&mut q.variable_definitions),
        OperationDefinition::Mutation(m) => Some(&mut m.variable_definitions),
        OperationDefinition::Subscription(s) => Some(&mut s.variable_definitions),
    }
}

pub(crate) fn root_type_name<'a>(
    schema: &'a SchemaIndex,
    operation: OperationKind,
) -> Option<&'a str> {
    match operation {
        OperationKind::Query => schema.query_type(),
        OperationKind::Mutation => schema.mutation_type(),
        OperationKind::Subscription => schema.subscription_type(),
    }
}
