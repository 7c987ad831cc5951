//! Selection-set utilities: parsing configured selection-set strings (once,
//! at composition), union-by-printed-form merging, and response-key
//! collection.

use crate::ast::*;
use crate::error::ConfigurationError;
use crate::print;
use std::collections::HashSet;

/// Parses a configured selection set such as `"{ id }"`. Bare field lists
/// are accepted and wrapped.
pub fn parse_selection_set(source: &str) -> Result<SelectionSet, ConfigurationError> {
    let text = source.trim();
    let braced = if text.starts_with('{') {
        text.to_string()
    } else {
        format!("{{ {} }}", text)
    };
    let doc = graphql_parser::parse_query::<String>(&braced)
        .map_err(|e| ConfigurationError::InvalidSelectionSet {
            source_text: source.to_string(),
            message: e.to_string(),
        })?
        .into_static();

    let mut definitions = doc.definitions;
    if definitions.len() != 1 {
        return Err(ConfigurationError::InvalidSelectionSet {
            source_text: source.to_string(),
            message: "expected a single bare selection set".to_string(),
        });
    }
    match definitions.pop() {
        Some(Definition::Operation(OperationDefinition::SelectionSet(ss))) => Ok(ss),
        _ => Err(ConfigurationError::InvalidSelectionSet {
            source_text: source.to_string(),
            message: "expected a bare selection set".to_string(),
        }),
    }
}

/// Unions `source` into `target`. Fields merge recursively by response key
/// and printed arguments; fragments dedupe by printed form. Merging the same
/// selection set twice is a no-op.
pub fn merge_selection_sets(target: &mut SelectionSet, source: &SelectionSet) {
    for item in &source.items {
        merge_selection(target, item);
    }
}

fn merge_selection(target: &mut SelectionSet, item: &Selection) {
    match item {
        Selection::Field(field) => {
            let args = print::print_arguments(&field.arguments);
            let position = target.items.iter().position(|s| match s {
                Selection::Field(f) => {
                    response_key(f) == response_key(field)
                        && print::print_arguments(&f.arguments) == args
                }
                _ => false,
            });
            match position {
                Some(i) => {
                    if let Selection::Field(f) = &mut target.items[i] {
                        merge_selection_sets(&mut f.selection_set, &field.selection_set);
                    }
                }
                None => target.items.push(Selection::Field(field.clone())),
            }
        }
        Selection::InlineFragment(frag) => {
            let position = target.items.iter().position(|s| {
                matches!(s, Selection::InlineFragment(f) if f.type_condition == frag.type_condition)
            });
            match position {
                Some(i) => {
                    if let Selection::InlineFragment(f) = &mut target.items[i] {
                        merge_selection_sets(&mut f.selection_set, &frag.selection_set);
                    }
                }
                None => target.items.push(Selection::InlineFragment(frag.clone())),
            }
        }
        Selection::FragmentSpread(spread) => {
            let present = target.items.iter().any(|s| {
                matches!(s, Selection::FragmentSpread(sp) if sp.fragment_name == spread.fragment_name)
            });
            if !present {
                target.items.push(Selection::FragmentSpread(spread.clone()));
            }
        }
    }
}

/// Response keys selected by a selection set, in order, descending through
/// inline fragments. Used to synthesize null results for failed sources.
pub fn collect_response_keys(ss: &SelectionSet) -> Vec<String> {
    let mut keys = vec![];
    let mut seen = HashSet::new();
    collect_keys_into(ss, &mut keys, &mut seen);
    keys
}

fn collect_keys_into(ss: &SelectionSet, keys: &mut Vec<String>, seen: &mut HashSet<String>) {
    for item in &ss.items {
        match item {
            Selection::Field(field) => {
                let key = response_key(field);
                if seen.insert(key.to_string()) {
                    keys.push(key.to_string());
                }
            }
            Selection::InlineFragment(frag) => collect_keys_into(&frag.selection_set, keys, seen),
            Selection::FragmentSpread(_) => {}
        }
    }
}

/// Immediate field nodes of a selection set, descending through inline
/// fragments (fragment spreads are resolved by the caller).
pub fn selection_fields(ss: &SelectionSet) -> Vec<&FieldNode> {
    let mut out = vec![];
    fields_into(ss, &mut out);
    out
}

fn fields_into<'a>(ss: &'a SelectionSet, out: &mut Vec<&'a FieldNode>) {
    for item in &ss.items {
        match item {
            Selection::Field(field) => out.push(field),
            Selection::InlineFragment(frag) => fields_into(&frag.selection_set, out),
            Selection::FragmentSpread(_) => {}
        }
    }
}
