//! Drops fields, fragments, arguments, and variables the target subschema
//! does not know, along with selection sets emptied by the dropping.

use super::{
    join_document, operation_selection_set, root_type_name, split_document, Transform,
    TransformContext,
};
use crate::error::DelegationError;
use crate::wire::Request;
use std::collections::{HashMap, HashSet};
use weft_composer::ast::*;
use weft_composer::schema::{named_type, SchemaIndex};

pub struct FilterToSchema;

impl Transform for FilterToSchema {
    fn transform_request(
        &self,
        mut request: Request,
        cx: &mut TransformContext<'_>,
    ) -> Result<Request, DelegationError> {
        let target = &cx.delegation.subschema.transformed_schema;
        let (operations, fragments) = split_document(std::mem::replace(
            &mut request.document,
            QueryDocument { definitions: vec![] },
        ));

        // Fragments filter against their own type conditions; a spread of an
        // emptied fragment is dropped, which can empty another fragment, so
        // iterate to a fixpoint.
        let mut surviving: HashMap<String, FragmentDefinition> = fragments
            .into_iter()
            .map(|f| (f.name.clone(), f))
            .collect();
        loop {
            let live: HashSet<String> = surviving.keys().cloned().collect();
            let mut next: HashMap<String, FragmentDefinition> = HashMap::new();
            for (name, frag) in surviving.iter() {
                let TypeCondition::On(cond) = &frag.type_condition;
                if !target.is_composite(cond) {
                    continue;
                }
                let filtered = filter_selection_set(target, cond, &frag.selection_set, &live);
                if !filtered.items.is_empty() {
                    let mut frag = frag.clone();
                    frag.selection_set = filtered;
                    next.insert(name.clone(), frag);
                }
            }
            if next.len() == surviving.len() {
                surviving = next;
                break;
            }
            surviving = next;
        }
        let live: HashSet<String> = surviving.keys().cloned().collect();

        let mut filtered_operations = vec![];
        for op in operations {
            let root = match root_type_name(target, cx.delegation.operation) {
                Some(root) => root.to_string(),
                None => {
                    return Err(DelegationError::InvalidRequest(format!(
                        "subschema \"{}\" has no {} root",
                        cx.delegation.subschema.name,
                        cx.delegation.operation.as_str()
                    )))
                }
            };
            let filtered = filter_selection_set(target, &root, operation_selection_set(&op), &live);
            let mut op = op;
            *super::operation_selection_set_mut(&mut op) = filtered;
            filtered_operations.push(op);
        }

        // Variables: keep only definitions still referenced somewhere.
        let mut used = HashSet::new();
        for op in &filtered_operations {
            collect_variables(operation_selection_set(op), &mut used);
        }
        for frag in surviving.values() {
            collect_variables(&frag.selection_set, &mut used);
        }
        for op in filtered_operations.iter_mut() {
            if let Some(defs) = super::variable_definitions_mut(op) {
                defs.retain(|vd| used.contains(&vd.name));
            }
        }
        let keys: Vec<String> = request.variables.keys().cloned().collect();
        for key in keys {
            if !used.contains(&key) {
                request.variables.remove(&key);
            }
        }

        // Drop fragment definitions that are no longer spread.
        let mut spread = HashSet::new();
        for op in &filtered_operations {
            collect_spreads(operation_selection_set(op), &surviving, &mut spread);
        }
        let fragments: Vec<FragmentDefinition> = surviving
            .into_iter()
            .filter(|(name, _)| spread.contains(name))
            .map(|(_, f)| f)
            .collect();

        request.document = join_document(filtered_operations, fragments);
        Ok(request)
    }
}

fn filter_selection_set(
    target: &SchemaIndex,
    parent_type: &str,
    ss: &SelectionSet,
    live_fragments: &HashSet<String>,
) -> SelectionSet {
    let mut items = vec![];
    for item in &ss.items {
        match item {
            Selection::Field(field) => {
                let field_def = match target.field_def(parent_type, &field.name) {
                    Some(def) => def,
                    None => continue,
                };
                let mut field = field.clone();
                field
                    .arguments
                    .retain(|(name, _)| field_def.arguments.iter().any(|a| &a.name == name));
                let return_type = named_type(&field_def.field_type).to_string();
                if target.is_composite(&return_type) {
                    field.selection_set = filter_selection_set(
                        target,
                        &return_type,
                        &field.selection_set,
                        live_fragments,
                    );
                    if field.selection_set.items.is_empty() {
                        continue;
                    }
                } else {
                    field.selection_set.items.clear();
                }
                items.push(Selection::Field(field));
            }
            Selection::InlineFragment(frag) => {
                let condition_type = match &frag.type_condition {
                    Some(TypeCondition::On(cond)) => {
                        if !target.is_composite(cond) {
                            continue;
                        }
                        cond.clone()
                    }
                    None => parent_type.to_string(),
                };
                let mut frag = frag.clone();
                frag.selection_set = filter_selection_set(
                    target,
                    &condition_type,
                    &frag.selection_set,
                    live_fragments,
                );
                if frag.selection_set.items.is_empty() {
                    continue;
                }
                items.push(Selection::InlineFragment(frag));
            }
            Selection::FragmentSpread(sp) => {
                if live_fragments.contains(&sp.fragment_name) {
                    items.push(Selection::FragmentSpread(sp.clone()));
                }
            }
        }
    }
    SelectionSet {
        span: ss.span,
        items,
    }
}

fn collect_variables(ss: &SelectionSet, used: &mut HashSet<String>) {
    for item in &ss.items {
        match item {
            Selection::Field(field) => {
                for (_, value) in &field.arguments {
                    collect_value_variables(value, used);
                }
                for d in &field.directives {
                    for (_, value) in &d.arguments {
                        collect_value_variables(value, used);
                    }
                }
                collect_variables(&field.selection_set, used);
            }
            Selection::InlineFragment(frag) => {
                for d in &frag.directives {
                    for (_, value) in &d.arguments {
                        collect_value_variables(value, used);
                    }
                }
                collect_variables(&frag.selection_set, used);
            }
            Selection::FragmentSpread(sp) => {
                for d in &sp.directives {
                    for (_, value) in &d.arguments {
                        collect_value_variables(value, used);
                    }
                }
            }
        }
    }
}

fn collect_value_variables(value: &GraphValue, used: &mut HashSet<String>) {
    match value {
        GraphValue::Variable(name) => {
            used.insert(name.clone());
        }
        GraphValue::List(items) => {
            for item in items {
                collect_value_variables(item, used);
            }
        }
        GraphValue::Object(fields) => {
            for (_, value) in fields {
                collect_value_variables(value, used);
            }
        }
        _ => {}
    }
}


fn collect_spreads(
    ss: &SelectionSet,
    fragments: &HashMap<String, FragmentDefinition>,
    spread: &mut HashSet<String>,
) {
    for item in &ss.items {
        match item {
            Selection::Field(field) => collect_spreads(&field.selection_set, fragments, spread),
            Selection::InlineFragment(frag) => {
                collect_spreads(&frag.selection_set, fragments, spread)
            }
            Selection::FragmentSpread(sp) => {
                if spread.insert(sp.fragment_name.clone()) {
                    if let Some(frag) = fragments.get(&sp.fragment_name) {
                        collect_spreads(&frag.selection_set, fragments, spread);
                    }
                }
            }
        }
    }
}
