//! Rewrites fragments on abstract types the target subschema does not know
//! into explicit fragments over the concrete implementations it does.

use super::{
    join_document, operation_selection_set_mut, split_document, Transform, TransformContext,
};
use crate::error::DelegationError;
use crate::wire::Request;
use std::collections::HashMap;
use weft_composer::ast::*;
use weft_composer::schema::SchemaIndex;

pub struct ExpandAbstractTypes;

impl Transform for ExpandAbstractTypes {
    fn transform_request(
        &self,
        mut request: Request,
        cx: &mut TransformContext<'_>,
    ) -> Result<Request, DelegationError> {
        let source = &cx.delegation.source_schema;
        let target = &cx.delegation.subschema.transformed_schema;
        let (mut operations, fragments) = split_document(std::mem::replace(
            &mut request.document,
            QueryDocument { definitions: vec![] },
        ));
        let by_name: HashMap<String, FragmentDefinition> = fragments
            .iter()
            .map(|f| (f.name.clone(), f.clone()))
            .collect();

        for op in operations.iter_mut() {
            expand(source, target, &by_name, operation_selection_set_mut(op));
        }
        let mut fragments = fragments;
        for frag in fragments.iter_mut() {
            expand(source, target, &by_name, &mut frag.selection_set);
        }
        request.document = join_document(operations, fragments);
        Ok(request)
    }
}

fn expand(
    source: &SchemaIndex,
    target: &SchemaIndex,
    fragments: &HashMap<String, FragmentDefinition>,
    ss: &mut SelectionSet,
) {
    let items = std::mem::replace(&mut ss.items, vec![]);
    for item in items {
        match item {
            Selection::Field(mut field) => {
                expand(source, target, fragments, &mut field.selection_set);
                ss.items.push(Selection::Field(field));
            }
            Selection::InlineFragment(mut frag) => {
                expand(source, target, fragments, &mut frag.selection_set);
                expand_fragment(source, target, frag, &mut ss.items);
            }
            Selection::FragmentSpread(sp) => {
                let frag = match fragments.get(&sp.fragment_name) {
                    Some(frag) => frag,
                    None => continue,
                };
                let TypeCondition::On(cond) = &frag.type_condition;
                if target.is_composite(cond) {
                    ss.items.push(Selection::FragmentSpread(sp));
                } else {
                    // convert to an inline fragment and expand that
                    let mut inline = InlineFragment {
                        position: pos(),
                        type_condition: Some(frag.type_condition.clone()),
                        directives: sp.directives.clone(),
                        selection_set: frag.selection_set.clone(),
                    };
                    expand(source, target, fragments, &mut inline.selection_set);
                    expand_fragment(source, target, inline, &mut ss.items);
                }
            }
        }
    }
}

/// Keeps a fragment whose condition the target knows; otherwise replaces it
/// with one fragment per concrete implementation present in the target, and
/// strips it entirely when none are.
fn expand_fragment(
    source: &SchemaIndex,
    target: &SchemaIndex,
    frag: InlineFragment,
    out: &mut Vec<Selection>,
) {
    let cond = match &frag.type_condition {
        Some(TypeCondition::On(cond)) => cond.clone(),
        None => {
            out.push(Selection::InlineFragment(frag));
            return;
        }
    };
    if target.is_composite(&cond) {
        out.push(Selection::InlineFragment(frag));
        return;
    }
    if source.is_abstract(&cond) {
        for implementation in source.possible_types(&cond) {
            if !target.is_object(implementation) {
                continue;
            }
            out.push(Selection::InlineFragment(InlineFragment {
                position: pos(),
                type_condition: Some(TypeCondition::On(implementation.clone())),
                directives: frag.directives.clone(),
                selection_set: frag.selection_set.clone(),
            }));
        }
    }
    // a concrete condition unknown to the target drops with its selection
}
