//! Ensures every non-root selection set that selects a field also selects
//! `__typename`, so abstract types can be dispatched on the way back.

use super::{operation_selection_set_mut, split_document, join_document, Transform, TransformContext};
use crate::error::DelegationError;
use crate::wire::Request;
use weft_composer::ast::*;

pub struct AddTypename;

impl Transform for AddTypename {
    fn transform_request(
        &self,
        mut request: Request,
        _cx: &mut TransformContext<'_>,
    ) -> Result<Request, DelegationError> {
        let (mut operations, mut fragments) = split_document(std::mem::replace(
            &mut request.document,
            QueryDocument { definitions: vec![] },
        ));
        for op in operations.iter_mut() {
            // the operation root never gets a typename, its fields do
            for item in operation_selection_set_mut(op).items.iter_mut() {
                add_typename_below(item);
            }
        }
        for frag in fragments.iter_mut() {
            add_typename(&mut frag.selection_set);
        }
        request.document = join_document(operations, fragments);
        Ok(request)
    }
}

fn add_typename_below(item: &mut Selection) {
    match item {
        Selection::Field(field) => add_typename(&mut field.selection_set),
        Selection::InlineFragment(frag) => {
            for item in frag.selection_set.items.iter_mut() {
                add_typename_below(item);
            }
        }
        Selection::FragmentSpread(_) => {}
    }
}

fn add_typename(ss: &mut SelectionSet) {
    if ss.items.is_empty() {
        return;
    }
    let mut has_field = false;
    let mut has_typename = false;
    for item in ss.items.iter_mut() {
        match item {
            Selection::Field(field) => {
                has_field = true;
                if field.alias.is_none() && field.name == TYPENAME_FIELD {
                    has_typename = true;
                }
                add_typename(&mut field.selection_set);
            }
            Selection::InlineFragment(frag) => add_typename(&mut frag.selection_set),
            Selection::FragmentSpread(_) => {}
        }
    }
    if has_field && !has_typename {
        ss.items.push(Selection::Field(typename_field_node()));
    }
}
