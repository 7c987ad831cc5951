//! Merged-parent planner: given a parent from one subschema and field nodes
//! it cannot satisfy, decide which target subschemas to query, in rounds,
//! respecting declared key and computed-field dependencies.

use crate::delegate::{DelegationParams, Delegator};
use crate::external::{build_key_object, merge_external, ExternalObject, MergeSource};
use crate::subschema::Subschema;
use crate::values::{get_path, graphql_value_to_json, set_path};
use crate::wire::{GraphQLError, JsonMap, PathSegment};
use futures::future::{join_all, BoxFuture, FutureExt};
use itertools::Itertools;
use linked_hash_map::LinkedHashMap;
use lru::LruCache;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::debug;
use weft_composer::ast::*;
use weft_composer::print::{print_field_node, print_selection_set};
use weft_composer::selections::{merge_selection_sets, selection_fields};
use weft_composer::{EntryPoint, MergedTypeInfo, OperationKind, StitchingInfo, SubschemaId};

const PLAN_CACHE_SIZE: usize = 512;

pub struct MergePlanner {
    stitching: Arc<StitchingInfo>,
    subschemas: Arc<Vec<Arc<Subschema>>>,
    delegator: Arc<Delegator>,
    plan_cache: Mutex<LruCache<PlanKey, Arc<DelegationPlan>>>,
    containment_cache: Mutex<LruCache<ContainmentKey, bool>>,
}

#[derive(Hash, PartialEq, Eq)]
struct PlanKey {
    type_name: String,
    sources: Vec<SubschemaId>,
    targets: Vec<SubschemaId>,
    fields: String,
}

#[derive(Hash, PartialEq, Eq)]
struct ContainmentKey {
    sources: Vec<SubschemaId>,
    type_name: String,
    selection: String,
}

pub struct DelegationPlan {
    pub delegation_map: Vec<(SubschemaId, SelectionSet)>,
    pub unproxiable: Vec<FieldNode>,
    pub proxiable_subschemas: Vec<SubschemaId>,
    pub non_proxiable_subschemas: Vec<SubschemaId>,
}

impl MergePlanner {
    pub fn new(
        stitching: Arc<StitchingInfo>,
        subschemas: Arc<Vec<Arc<Subschema>>>,
        delegator: Arc<Delegator>,
    ) -> Self {
        MergePlanner {
            stitching,
            subschemas,
            delegator,
            plan_cache: Mutex::new(LruCache::new(PLAN_CACHE_SIZE)),
            containment_cache: Mutex::new(LruCache::new(PLAN_CACHE_SIZE)),
        }
    }

    pub fn stitching(&self) -> &Arc<StitchingInfo> {
        &self.stitching
    }

    /// Runs planner rounds until every requested field is either merged into
    /// the parent or provably unreachable, and returns the merged parent.
    pub fn merge_fields(
        self: &Arc<Self>,
        type_name: String,
        parent: ExternalObject,
        field_nodes: Vec<FieldNode>,
        sources: Vec<SubschemaId>,
        targets: Vec<SubschemaId>,
        path: Vec<PathSegment>,
    ) -> BoxFuture<'static, ExternalObject> {
        let planner = Arc::clone(self);
        async move {
            let merged_info = match planner.stitching.merged_types.get(&type_name) {
                Some(info) => info,
                None => return parent,
            };
            if targets.is_empty() || field_nodes.is_empty() {
                return parent;
            }

            let expanded = expand_with_dependencies(merged_info, &field_nodes, &targets);
            let plan = planner.plan(merged_info, &sources, &targets, &expanded);
            if plan.delegation_map.is_empty() {
                // dead end: unproxiable fields resolve from the unchanged
                // parent and surface as null
                return parent;
            }
            debug!(
                type_name = %type_name,
                rounds = plan.delegation_map.len(),
                "executing planner round"
            );

            let mut parent = parent;
            let round = join_all(plan.delegation_map.iter().map(|(target, bucket)| {
                planner.fetch_from(merged_info, *target, &parent, bucket, &path)
            }))
            .await;
            merge_external(&path, &mut parent, round);

            if !plan.unproxiable.is_empty() {
                let mut next_sources = sources.clone();
                for id in &plan.proxiable_subschemas {
                    if !next_sources.contains(id) {
                        next_sources.push(*id);
                    }
                }
                parent = planner
                    .merge_fields(
                        type_name,
                        parent,
                        plan.unproxiable.clone(),
                        next_sources,
                        plan.non_proxiable_subschemas.clone(),
                        path,
                    )
                    .await;
            }
            parent
        }
        .boxed()
    }

    /// Memoized planning: partition targets by proxiability, then assign each
    /// field node to a delegation bucket or mark it unproxiable.
    fn plan(
        &self,
        merged: &MergedTypeInfo,
        sources: &[SubschemaId],
        targets: &[SubschemaId],
        field_nodes: &[FieldNode],
    ) -> Arc<DelegationPlan> {
        let key = PlanKey {
            type_name: merged.type_name.clone(),
            sources: sources.to_vec(),
            targets: targets.to_vec(),
            fields: field_nodes.iter().map(print_field_node).join(" "),
        };
        if let Some(plan) = self.plan_cache.lock().unwrap().get(&key) {
            return Arc::clone(plan);
        }

        let (proxiable, non_proxiable) =
            self.sort_subschemas_by_proxiability(merged, sources, targets, field_nodes);

        let mut delegation_map: LinkedHashMap<SubschemaId, SelectionSet> = LinkedHashMap::new();
        let mut unproxiable = vec![];
        for field in field_nodes {
            if field.name == TYPENAME_FIELD {
                continue;
            }
            let owner = if let Some(&owner) = merged.unique_fields.get(&field.name) {
                if proxiable.contains(&owner) {
                    Some(owner)
                } else {
                    None
                }
            } else if let Some(owners) = merged.non_unique_fields.get(&field.name) {
                let viable: Vec<SubschemaId> = owners
                    .iter()
                    .copied()
                    .filter(|o| proxiable.contains(o))
                    .collect();
                if viable.is_empty() {
                    None
                } else {
                    // prefer a subschema already targeted this round
                    Some(
                        viable
                            .iter()
                            .copied()
                            .find(|o| delegation_map.contains_key(o))
                            .unwrap_or(viable[0]),
                    )
                }
            } else {
                None
            };
            match owner {
                Some(owner) => {
                    delegation_map
                        .entry(owner)
                        .or_insert_with(empty_selection_set)
                        .items
                        .push(Selection::Field(field.clone()));
                }
                None => unproxiable.push(field.clone()),
            }
        }

        let plan = Arc::new(DelegationPlan {
            delegation_map: delegation_map.into_iter().collect(),
            unproxiable,
            proxiable_subschemas: proxiable,
            non_proxiable_subschemas: non_proxiable,
        });
        self.plan_cache.lock().unwrap().put(key, Arc::clone(&plan));
        plan
    }

    fn sort_subschemas_by_proxiability(
        &self,
        merged: &MergedTypeInfo,
        sources: &[SubschemaId],
        targets: &[SubschemaId],
        field_nodes: &[FieldNode],
    ) -> (Vec<SubschemaId>, Vec<SubschemaId>) {
        let mut proxiable = vec![];
        let mut non_proxiable = vec![];
        for &target in targets {
            let mut ok = merged.entry_points.contains_key(&target);
            if ok {
                if let Some(key) = merged.selection_sets.get(&target) {
                    ok = self.subschemas_contain_selection_set(sources, &merged.type_name, key);
                }
            }
            if ok {
                if let Some(per_field) = merged.field_selection_sets.get(&target) {
                    for field in field_nodes {
                        if let Some(dependency) = per_field.get(&field.name) {
                            if !self.subschemas_contain_selection_set(
                                sources,
                                &merged.type_name,
                                dependency,
                            ) {
                                ok = false;
                                break;
                            }
                        }
                    }
                }
            }
            if ok {
                proxiable.push(target);
            } else {
                non_proxiable.push(target);
            }
        }
        (proxiable, non_proxiable)
    }

    /// A dependency is satisfied when every field of the selection set
    /// appears, recursively, in at least one source subschema's type.
    fn subschemas_contain_selection_set(
        &self,
        sources: &[SubschemaId],
        type_name: &str,
        selection_set: &SelectionSet,
    ) -> bool {
        let key = ContainmentKey {
            sources: sources.to_vec(),
            type_name: type_name.to_string(),
            selection: print_selection_set(selection_set),
        };
        if let Some(&contained) = self.containment_cache.lock().unwrap().get(&key) {
            return contained;
        }
        let contained = selection_fields(selection_set).iter().all(|field| {
            if field.name == TYPENAME_FIELD {
                return true;
            }
            sources.iter().any(|&source| {
                let schema = &self.subschemas[source].transformed_schema;
                match schema.field_def(type_name, &field.name) {
                    Some(def) => {
                        if field.selection_set.items.is_empty() {
                            true
                        } else {
                            let inner = weft_composer::schema::named_type(&def.field_type);
                            self.subschemas_contain_selection_set(
                                &[source],
                                inner,
                                &field.selection_set,
                            )
                        }
                    }
                    None => false,
                }
            })
        });
        self.containment_cache.lock().unwrap().put(key, contained);
        contained
    }

    /// One sub-request of a round: project the key off the parent, build the
    /// entry-point arguments, and delegate the bucket selection. Errors are
    /// captured as merge sources, never thrown.
    async fn fetch_from(
        &self,
        merged: &MergedTypeInfo,
        target: SubschemaId,
        parent: &ExternalObject,
        bucket: &SelectionSet,
        path: &[PathSegment],
    ) -> (MergeSource, SelectionSet) {
        let subschema = &self.subschemas[target];
        let entry = match merged.entry_points.get(&target) {
            Some(entry) => entry,
            None => {
                let error = GraphQLError::new(format!(
                    "subschema \"{}\" has no entry point for type \"{}\"",
                    subschema.name, merged.type_name
                ));
                return (MergeSource::Failure(error), bucket.clone());
            }
        };

        // the key projection: the type-level selection set plus the
        // dependencies of every field in this bucket
        let mut key_selection = merged
            .selection_sets
            .get(&target)
            .cloned()
            .unwrap_or_else(empty_selection_set);
        if let Some(per_field) = merged.field_selection_sets.get(&target) {
            for field in selection_fields(bucket) {
                if let Some(dependency) = per_field.get(&field.name) {
                    merge_selection_sets(&mut key_selection, dependency);
                }
            }
        }
        let mut key_object = build_key_object(&parent.data, &key_selection);
        key_object
            .entry(TYPENAME_FIELD.to_string())
            .or_insert_with(|| Value::String(merged.type_name.clone()));

        let args = match entry_point_args(entry, subschema, key_object) {
            Ok(args) => args,
            Err(message) => {
                let error = GraphQLError::new(message).located(path.to_vec());
                return (MergeSource::Failure(error), bucket.clone());
            }
        };

        // wrap the bucket when the entry point returns an abstract type
        let mut selection = bucket.clone();
        if let Some(root) = subschema.transformed_schema.query_type() {
            if let Some(def) = subschema
                .transformed_schema
                .field_def(root, &entry.field_name)
            {
                let returns = weft_composer::schema::named_type(&def.field_type);
                if returns != merged.type_name {
                    selection = SelectionSet {
                        span: span(),
                        items: vec![Selection::InlineFragment(InlineFragment {
                            position: pos(),
                            type_condition: Some(TypeCondition::On(merged.type_name.clone())),
                            directives: vec![],
                            selection_set: selection,
                        })],
                    };
                }
            }
        }

        let result = self
            .delegator
            .delegate(
                subschema,
                DelegationParams {
                    operation: OperationKind::Query,
                    field_name: entry.field_name.clone(),
                    args,
                    selection_set: selection,
                    variables: JsonMap::new(),
                    variable_definitions: vec![],
                    fragments: vec![],
                    return_type: merged.type_name.clone(),
                    path: path.to_vec(),
                    skip_type_merging: true,
                },
            )
            .await;

        let value = if entry.batch {
            match result.value {
                Value::Array(mut rows) => {
                    if rows.is_empty() {
                        Value::Null
                    } else {
                        rows.swap_remove(0)
                    }
                }
                other => other,
            }
        } else {
            result.value
        };

        let source = match value {
            Value::Object(map) => {
                let mut external =
                    ExternalObject::annotate(map, result.unpathed_errors, target);
                for error in result.pathed_errors {
                    let key = error
                        .path
                        .as_ref()
                        .and_then(|p| p.get(path.len()))
                        .and_then(PathSegment::as_field)
                        .map(str::to_string);
                    if let Some(key) = key {
                        external.pathed_errors.entry(key).or_insert(error);
                    } else {
                        external.unpathed_errors.push(error);
                    }
                }
                external.receiver = result.receiver;
                MergeSource::Object(external)
            }
            _ => {
                if let Some(error) = result.pathed_errors.into_iter().next() {
                    MergeSource::Failure(error)
                } else if let Some(error) = result.unpathed_errors.into_iter().next() {
                    MergeSource::Failure(error)
                } else {
                    MergeSource::Empty
                }
            }
        };
        (source, bucket.clone())
    }
}

/// Requested field nodes plus the dependency fields their computed owners
/// declare; dependencies are plannable fields in their own right.
fn expand_with_dependencies(
    merged: &MergedTypeInfo,
    field_nodes: &[FieldNode],
    targets: &[SubschemaId],
) -> Vec<FieldNode> {
    let mut expanded: Vec<FieldNode> = vec![];
    let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();
    for field in field_nodes {
        if seen.insert(response_key(field).to_string()) {
            expanded.push(field.clone());
        }
    }
    for field in field_nodes {
        if let Some(dependency) = merged.field_dependencies(&field.name, targets) {
            for dep_field in selection_fields(&dependency) {
                if seen.insert(response_key(dep_field).to_string()) {
                    expanded.push(dep_field.clone());
                }
            }
        }
    }
    expanded
}

/// Builds the entry point's argument object from the projected key.
fn entry_point_args(
    entry: &EntryPoint,
    subschema: &Subschema,
    key_object: JsonMap,
) -> Result<JsonMap, String> {
    // @merge(key:) reshapes the key object to the listed paths
    let key_value = match &entry.key_paths {
        Some(paths) => {
            let full = Value::Object(key_object);
            let mut shaped = JsonMap::new();
            for path in paths {
                if let Some(value) = get_path(&full, path) {
                    set_path(&mut shaped, path, value.clone());
                }
            }
            if let Some(typename) = full.get(TYPENAME_FIELD) {
                shaped.insert(TYPENAME_FIELD.to_string(), typename.clone());
            }
            Value::Object(shaped)
        }
        None => Value::Object(key_object),
    };

    let payload = match &entry.key_field {
        Some(path) => get_path(&key_value, path).cloned().unwrap_or(Value::Null),
        None => key_value,
    };
    let payload = if entry.batch {
        Value::Array(vec![payload])
    } else {
        payload
    };

    let mut args = JsonMap::new();
    if let Some(expr) = &entry.args_expr {
        let mut key_variables = JsonMap::new();
        key_variables.insert("key".to_string(), payload);
        for (name, value) in expr {
            args.insert(name.clone(), graphql_value_to_json(value, &key_variables));
        }
    } else {
        let arg_path = match &entry.key_arg {
            Some(path) => path.clone(),
            None => {
                // default to the entry field's single declared argument
                let root = subschema
                    .transformed_schema
                    .query_type()
                    .ok_or_else(|| format!(
                        "subschema \"{}\" has no query root",
                        subschema.name
                    ))?;
                let def = subschema
                    .transformed_schema
                    .field_def(root, &entry.field_name)
                    .ok_or_else(|| format!(
                        "subschema \"{}\" has no field \"{}\"",
                        subschema.name, entry.field_name
                    ))?;
                if def.arguments.len() != 1 {
                    return Err(format!(
                        "entry point \"{}\" needs keyArg to disambiguate its arguments",
                        entry.field_name
                    ));
                }
                vec![def.arguments[0].name.clone()]
            }
        };
        set_path(&mut args, &arg_path, payload);
    }
    let empty = JsonMap::new();
    for (name, value) in &entry.additional_args {
        args.insert(name.clone(), graphql_value_to_json(value, &empty));
    }
    Ok(args)
}
