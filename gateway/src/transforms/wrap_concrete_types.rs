//! Wraps the delegated root field's selection set in an inline fragment on
//! its concrete return type, with `__typename`, so the selection survives
//! when the target serves the field through an abstract type.

use super::{operation_selection_set_mut, split_document, join_document, Transform, TransformContext};
use crate::error::DelegationError;
use crate::wire::Request;
use weft_composer::ast::*;

pub struct WrapConcreteTypes;

impl Transform for WrapConcreteTypes {
    fn transform_request(
        &self,
        mut request: Request,
        cx: &mut TransformContext<'_>,
    ) -> Result<Request, DelegationError> {
        let return_type = &cx.delegation.return_type;
        if !cx
            .delegation
            .subschema
            .transformed_schema
            .is_object(return_type)
        {
            return Ok(request);
        }
        let (mut operations, fragments) = split_document(std::mem::replace(
            &mut request.document,
            QueryDocument { definitions: vec![] },
        ));
        for op in operations.iter_mut() {
            for item in operation_selection_set_mut(op).items.iter_mut() {
                if let Selection::Field(field) = item {
                    if field.name == cx.delegation.field_name {
                        wrap(field, return_type);
                    }
                }
            }
        }
        request.document = join_document(operations, fragments);
        Ok(request)
    }
}

fn wrap(field: &mut FieldNode, return_type: &str) {
    if field.selection_set.items.is_empty() {
        return;
    }
    // already wrapped
    if field.selection_set.items.len() <= 2
        && field.selection_set.items.iter().all(|item| match item {
            Selection::InlineFragment(frag) => {
                matches!(&frag.type_condition, Some(TypeCondition::On(c)) if c == return_type)
            }
            Selection::Field(f) => f.name == TYPENAME_FIELD,
            _ => false,
        })
    {
        return;
    }
    let items = std::mem::replace(&mut field.selection_set.items, vec![]);
    field.selection_set.items = vec![
        Selection::Field(typename_field_node()),
        Selection::InlineFragment(InlineFragment {
            position: pos(),
            type_condition: Some(TypeCondition::On(return_type.to_string())),
            directives: vec![],
            selection_set: SelectionSet {
                span: span(),
                items,
            },
        }),
    ];
}
