//! Injects the stitching index's required selection sets into the request:
//! key fields wherever a merged type is selected, computed-field dependencies
//! alongside the fields that need them, and caller-driven dynamic sets.

use super::{operation_selection_set_mut, split_document, join_document, Transform, TransformContext};
use crate::error::DelegationError;
use crate::wire::Request;
use weft_composer::ast::*;
use weft_composer::schema::{named_type, SchemaIndex};
use weft_composer::selections::merge_selection_sets;
use weft_composer::StitchingInfo;

pub struct AddSelectionSets;

impl Transform for AddSelectionSets {
    fn transform_request(
        &self,
        mut request: Request,
        cx: &mut TransformContext<'_>,
    ) -> Result<Request, DelegationError> {
        let source = &cx.delegation.source_schema;
        let info = &cx.delegation.stitching;
        let (mut operations, mut fragments) = split_document(std::mem::replace(
            &mut request.document,
            QueryDocument { definitions: vec![] },
        ));
        let root = match super::root_type_name(source, cx.delegation.operation) {
            Some(root) => root.to_string(),
            // the delegated root type may not exist in the composed schema
            // when delegating a bare entry point; fall back to Query
            None => QUERY_TYPE_NAME.to_string(),
        };
        for op in operations.iter_mut() {
            inject(source, info, &root, operation_selection_set_mut(op));
        }
        for frag in fragments.iter_mut() {
            let TypeCondition::On(cond) = frag.type_condition.clone();
            inject(source, info, &cond, &mut frag.selection_set);
        }
        request.document = join_document(operations, fragments);
        Ok(request)
    }
}

fn inject(source: &SchemaIndex, info: &StitchingInfo, parent_type: &str, ss: &mut SelectionSet) {
    // computed-field dependencies become siblings of the requesting field
    let mut dependencies: Vec<SelectionSet> = vec![];
    for item in &ss.items {
        if let Selection::Field(field) = item {
            if let Some(dependency) = info
                .selection_sets_by_field
                .get(parent_type)
                .and_then(|by_field| by_field.get(&field.name))
            {
                dependencies.push(dependency.clone());
            }
            if let Some(producers) = info
                .dynamic_selection_sets_by_field
                .get(parent_type)
                .and_then(|by_field| by_field.get(&field.name))
            {
                for producer in producers {
                    if let Some(dependency) = producer(field) {
                        dependencies.push(dependency);
                    }
                }
            }
        }
    }
    for dependency in dependencies {
        merge_selection_sets(ss, &dependency);
    }

    // recurse, adding key selection sets under fields of merged types
    let items = std::mem::replace(&mut ss.items, vec![]);
    let mut items = items;
    for item in items.iter_mut() {
        match item {
            Selection::Field(field) => {
                let return_type = source
                    .field_def(parent_type, &field.name)
                    .map(|def| named_type(&def.field_type).to_string());
                if let Some(return_type) = return_type {
                    if !field.selection_set.items.is_empty() {
                        if let Some(key) = info.selection_sets_by_type.get(&return_type) {
                            merge_selection_sets(&mut field.selection_set, key);
                        }
                        inject(source, info, &return_type, &mut field.selection_set);
                    }
                }
            }
            Selection::InlineFragment(frag) => {
                let cond = match &frag.type_condition {
                    Some(TypeCondition::On(cond)) => cond.clone(),
                    None => parent_type.to_string(),
                };
                inject(source, info, &cond, &mut frag.selection_set);
            }
            Selection::FragmentSpread(_) => {}
        }
    }
    ss.items = items;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use weft_composer::print::print_selection_set;
    use weft_composer::selections::parse_selection_set;

    fn info_with(
        type_keys: Vec<(&str, &str)>,
        field_deps: Vec<(&str, &str, &str)>,
    ) -> StitchingInfo {
        let mut info = StitchingInfo {
            selection_sets_by_type: HashMap::new(),
            selection_sets_by_field: HashMap::new(),
            dynamic_selection_sets_by_field: HashMap::new(),
            merged_types: HashMap::new(),
            root_fields: HashMap::new(),
        };
        for (type_name, key) in type_keys {
            info.selection_sets_by_type
                .insert(type_name.to_string(), parse_selection_set(key).unwrap());
        }
        for (type_name, field, dep) in field_deps {
            info.selection_sets_by_field
                .entry(type_name.to_string())
                .or_insert_with(HashMap::new)
                .insert(field.to_string(), parse_selection_set(dep).unwrap());
        }
        info
    }

    #[test]
    fn adds_type_keys_under_merged_type_fields() {
        let source = SchemaIndex::parse(
            "type Query { me: User } type User { id: ID! name: String }",
        )
        .unwrap();
        let info = info_with(vec![("User", "{ id }")], vec![]);
        let mut ss = parse_selection_set("{ me { name } }").unwrap();
        inject(&source, &info, "Query", &mut ss);
        assert_eq!(print_selection_set(&ss), "{me{name id}}");
    }

    #[test]
    fn dynamic_selection_sets_follow_the_requesting_field() {
        use std::sync::Arc;
        let source = SchemaIndex::parse(
            "type Query { me: User } type User { id: ID! avatar: String }",
        )
        .unwrap();
        let mut info = info_with(vec![], vec![]);
        info.dynamic_selection_sets_by_field
            .entry("User".to_string())
            .or_insert_with(HashMap::new)
            .entry("avatar".to_string())
            .or_insert_with(Vec::new)
            .push(Arc::new(|field: &weft_composer::ast::FieldNode| {
                if field.arguments.is_empty() {
                    parse_selection_set("{ id }").ok()
                } else {
                    None
                }
            }));
        let mut ss = parse_selection_set("{ me { avatar } }").unwrap();
        inject(&source, &info, "Query", &mut ss);
        assert_eq!(print_selection_set(&ss), "{me{avatar id}}");
    }

    #[test]
    fn adds_computed_dependencies_as_siblings() {
        let source = SchemaIndex::parse(
            "type Query { me: User } type User { id: ID! fullName: String firstName: String lastName: String }",
        )
        .unwrap();
        let info = info_with(vec![], vec![("User", "fullName", "{ firstName lastName }")]);
        let mut ss = parse_selection_set("{ me { fullName } }").unwrap();
        inject(&source, &info, "Query", &mut ss);
        assert_eq!(
            print_selection_set(&ss),
            "{me{fullName firstName lastName}}"
        );
    }
}
