//! External objects: parent values returned by delegated sub-executions,
//! annotated with origin, per-field provenance, and errors awaiting a reader.

use crate::deep_merge;
use crate::receiver::{join_path_key, Receiver};
use crate::wire::{GraphQLError, JsonMap, PathSegment};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use weft_composer::ast::{response_key, Selection, SelectionSet, TypeCondition, TYPENAME_FIELD};
use weft_composer::selections::collect_response_keys;
use weft_composer::SubschemaId;

#[derive(Clone)]
pub struct ReceiverHandle {
    pub receiver: Arc<Receiver>,
    pub path_key: String,
}

impl ReceiverHandle {
    pub fn new(receiver: Arc<Receiver>) -> Self {
        ReceiverHandle {
            receiver,
            path_key: String::new(),
        }
    }

    pub fn child(&self, segment: &str) -> Self {
        ReceiverHandle {
            receiver: Arc::clone(&self.receiver),
            path_key: join_path_key(&self.path_key, segment),
        }
    }
}

/// A parent value with provenance. Resolution discriminates external objects
/// from plain values by static type, not a property probe.
#[derive(Clone)]
pub struct ExternalObject {
    pub data: JsonMap,
    pub origin: SubschemaId,
    /// Response key to the subschema that supplied it once merged.
    pub field_subschemas: HashMap<String, SubschemaId>,
    /// Sub-result errors without a path, relocated at first field read.
    pub unpathed_errors: Vec<GraphQLError>,
    /// Per-response-key located errors from failed merge sources; reading the
    /// key surfaces the error and yields null.
    pub pathed_errors: HashMap<String, GraphQLError>,
    pub receiver: Option<ReceiverHandle>,
}

impl ExternalObject {
    pub fn annotate(data: JsonMap, unpathed_errors: Vec<GraphQLError>, origin: SubschemaId) -> Self {
        ExternalObject {
            data,
            origin,
            field_subschemas: HashMap::new(),
            unpathed_errors,
            pathed_errors: HashMap::new(),
            receiver: None,
        }
    }

    /// Provenance for a response key; defaults to the object's origin.
    pub fn subschema_for(&self, key: &str) -> SubschemaId {
        self.field_subschemas.get(key).copied().unwrap_or(self.origin)
    }
}

/// One result of a planner round, paired with the selection it was asked for.
pub enum MergeSource {
    Object(ExternalObject),
    /// The sub-request failed outright; every requested key carries the
    /// relocated error.
    Failure(GraphQLError),
    /// The resolver returned null; every requested key becomes null.
    Empty,
}

/// Merges round results into the parent. Error and null sources synthesize
/// null results over their selection's response keys; object sources
/// deep-merge with per-field provenance rebuilt.
pub fn merge_external(
    path: &[PathSegment],
    target: &mut ExternalObject,
    sources: Vec<(MergeSource, SelectionSet)>,
) {
    for (source, selection_set) in sources {
        match source {
            MergeSource::Object(source) => {
                for (key, value) in source.data.iter() {
                    let merged_in_place = match target.data.get_mut(key) {
                        Some(existing) if existing.is_object() && value.is_object() => {
                            deep_merge::merge(existing, value);
                            true
                        }
                        _ => false,
                    };
                    if !merged_in_place {
                        target.data.insert(key.clone(), value.clone());
                    }
                    let provenance = source.subschema_for(key);
                    target.field_subschemas.insert(key.clone(), provenance);
                }
                target.unpathed_errors.extend(source.unpathed_errors);
                for (key, error) in source.pathed_errors {
                    target.pathed_errors.entry(key).or_insert(error);
                }
                if target.receiver.is_none() {
                    target.receiver = source.receiver;
                }
            }
            MergeSource::Failure(error) => {
                for key in collect_response_keys(&selection_set) {
                    if key == TYPENAME_FIELD {
                        continue;
                    }
                    let located = if error.path.is_some() {
                        error.clone()
                    } else {
                        let mut field_path = path.to_vec();
                        field_path.push(PathSegment::field(&key));
                        error.clone().located(field_path)
                    };
                    target.pathed_errors.entry(key.clone()).or_insert(located);
                    target.data.entry(key).or_insert(Value::Null);
                }
            }
            MergeSource::Empty => {
                for key in collect_response_keys(&selection_set) {
                    if key == TYPENAME_FIELD {
                        continue;
                    }
                    target.data.entry(key).or_insert(Value::Null);
                }
            }
        }
    }
}

/// Projects the key selection set over parent data to build the
/// representation sent to an entry point. Missing fields are omitted.
pub fn build_key_object(data: &JsonMap, selection_set: &SelectionSet) -> JsonMap {
    let mut out = JsonMap::new();
    project_into(data, selection_set, &mut out);
    out
}

fn project_into(data: &JsonMap, selection_set: &SelectionSet, out: &mut JsonMap) {
    for item in &selection_set.items {
        match item {
            Selection::Field(field) => {
                let key = response_key(field);
                let source = match data.get(&field.name) {
                    Some(value) => value,
                    None => continue,
                };
                let value = if field.selection_set.items.is_empty() {
                    source.clone()
                } else {
                    project_value(source, &field.selection_set)
                };
                out.insert(key.to_string(), value);
            }
            Selection::InlineFragment(frag) => {
                let matches = match &frag.type_condition {
                    None => true,
                    Some(TypeCondition::On(cond)) => {
                        data.get(TYPENAME_FIELD).and_then(Value::as_str) == Some(cond.as_str())
                    }
                };
                if matches {
                    project_into(data, &frag.selection_set, out);
                }
            }
            Selection::FragmentSpread(_) => {}
        }
    }
}

fn project_value(source: &Value, selection_set: &SelectionSet) -> Value {
    match source {
        Value::Object(map) => {
            let mut out = JsonMap::new();
            project_into(map, selection_set, &mut out);
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| project_value(item, selection_set))
                .collect(),
        ),
        other => other.clone(),
    }
}
