//! The default merged resolver and the delegation-driven completion walk:
//! present fields short-circuit, deferred fields consult the receiver, and
//! missing fields trigger the per-parent loader and planner.

use crate::delegate::DelegationParams;
use crate::external::{ExternalObject, ReceiverHandle};
use crate::loader::ParentLoader;
use crate::stitcher::Stitcher;
use crate::values::graphql_value_to_json;
use crate::wire::{GraphQLError, JsonMap, PathSegment};
use futures::future::{join_all, BoxFuture, FutureExt};
use linked_hash_map::LinkedHashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use weft_composer::ast::*;
use weft_composer::schema::{is_non_null, named_type};
use weft_composer::selections::merge_selection_sets;
use weft_composer::{OperationKind, SubschemaId};

/// A non-null slot resolved to null; the enclosing value becomes null.
pub(crate) struct Bubble;

#[derive(Clone)]
pub(crate) struct Provenance {
    pub origin: SubschemaId,
    pub receiver: Option<ReceiverHandle>,
    /// Unpathed sub-errors riding toward the next external object.
    pub unpathed: Vec<GraphQLError>,
}

impl Provenance {
    fn plain(origin: SubschemaId, receiver: Option<ReceiverHandle>) -> Self {
        Provenance {
            origin,
            receiver,
            unpathed: vec![],
        }
    }
}

/// One operation's resolution state.
pub(crate) struct Walk<'a> {
    pub stitcher: &'a Stitcher,
    pub fragments: HashMap<String, FragmentDefinition>,
    pub variables: JsonMap,
    pub variable_definitions: Vec<VariableDefinition>,
    pub errors: Mutex<Vec<GraphQLError>>,
}

impl<'a> Walk<'a> {
    pub fn push_error(&self, error: GraphQLError) {
        if let Ok(mut sink) = self.errors.lock() {
            sink.push(error);
        }
    }

    pub fn into_errors(self) -> Vec<GraphQLError> {
        self.errors.into_inner().unwrap_or_default()
    }

    fn include(&self, directives: &[Directive]) -> bool {
        for d in directives {
            if d.name != "skip" && d.name != "include" {
                continue;
            }
            let cond = d
                .arguments
                .iter()
                .find(|(name, _)| name.as_str() == "if")
                .map(|(_, value)| graphql_value_to_json(value, &self.variables))
                .map(|value| value == Value::Bool(true))
                .unwrap_or(false);
            if d.name == "skip" && cond {
                return false;
            }
            if d.name == "include" && !cond {
                return false;
            }
        }
        true
    }

    fn fragment_applies(&self, condition: Option<&TypeCondition>, runtime_type: &str) -> bool {
        match condition {
            None => true,
            Some(TypeCondition::On(cond)) => {
                cond.as_str() == runtime_type
                    || self
                        .stitcher
                        .composed
                        .possible_types(cond)
                        .iter()
                        .any(|t| t == runtime_type)
            }
        }
    }

    /// Groups the selection's field nodes by response key for the runtime
    /// type, resolving fragments and @skip/@include.
    pub(crate) fn collect_fields(
        &self,
        runtime_type: &str,
        selection_set: &SelectionSet,
        out: &mut LinkedHashMap<String, FieldNode>,
    ) {
        for item in &selection_set.items {
            match item {
                Selection::Field(field) => {
                    if !self.include(&field.directives) {
                        continue;
                    }
                    let key = response_key(field).to_string();
                    if out.contains_key(&key) {
                        if let Some(existing) = out.get_mut(&key) {
                            merge_selection_sets(&mut existing.selection_set, &field.selection_set);
                        }
                    } else {
                        out.insert(key, field.clone());
                    }
                }
                Selection::InlineFragment(frag) => {
                    if !self.include(&frag.directives) {
                        continue;
                    }
                    if self.fragment_applies(frag.type_condition.as_ref(), runtime_type) {
                        self.collect_fields(runtime_type, &frag.selection_set, out);
                    }
                }
                Selection::FragmentSpread(spread) => {
                    if !self.include(&spread.directives) {
                        continue;
                    }
                    if let Some(frag) = self.fragments.get(&spread.fragment_name) {
                        if self.fragment_applies(Some(&frag.type_condition), runtime_type) {
                            self.collect_fields(runtime_type, &frag.selection_set, out);
                        }
                    }
                }
            }
        }
    }

    /// Resolves one root field through its proxying resolver.
    pub(crate) fn resolve_root_field<'s>(
        &'s self,
        kind: OperationKind,
        root_type: String,
        key: String,
        node: FieldNode,
    ) -> BoxFuture<'s, (String, Result<Value, Bubble>)> {
        async move {
            if node.name == TYPENAME_FIELD {
                return (key, Ok(Value::String(root_type)));
            }
            let field_def = self
                .stitcher
                .composed
                .field_def(&root_type, &node.name)
                .cloned();
            let (owner, resolver) = match self
                .stitcher
                .proxy_resolvers
                .get(&(kind, node.name.clone()))
            {
                Some((owner, resolver)) => (*owner, resolver.clone()),
                None => {
                    self.push_error(
                        GraphQLError::new(format!(
                            "Cannot query field \"{}\" on type \"{}\"",
                            node.name, root_type
                        ))
                        .located(vec![PathSegment::field(&key)]),
                    );
                    return (key, Ok(Value::Null));
                }
            };
            let subschema = Arc::clone(&self.stitcher.subschemas[owner]);
            let args = arguments_to_json(&node, &self.variables);
            let return_type = field_def
                .as_ref()
                .map(|def| named_type(&def.field_type).to_string())
                .unwrap_or_default();
            let params = DelegationParams {
                operation: kind,
                field_name: node.name.clone(),
                args,
                selection_set: node.selection_set.clone(),
                variables: self.variables.clone(),
                variable_definitions: self.variable_definitions.clone(),
                fragments: self.fragments.values().cloned().collect(),
                return_type: return_type.clone(),
                path: vec![PathSegment::field(&key)],
                skip_type_merging: false,
            };
            let result = resolver(Arc::clone(&self.stitcher.delegator), subschema, params).await;
            for error in result.pathed_errors {
                self.push_error(error);
            }
            let mut unpathed = result.unpathed_errors;
            if !self
                .stitcher
                .composed
                .is_composite(&return_type)
            {
                // leaf roots have no field read to relocate onto
                for error in unpathed.drain(..) {
                    self.push_error(error.located(vec![PathSegment::field(&key)]));
                }
            }
            let provenance = Provenance {
                origin: result.origin,
                receiver: result.receiver,
                unpathed,
            };
            let field_type = field_def.map(|def| def.field_type);
            let outcome = self
                .complete_value(
                    field_type,
                    node.selection_set.clone(),
                    result.value,
                    provenance,
                    vec![PathSegment::field(&key)],
                )
                .await;
            (key, outcome)
        }
        .boxed()
    }

    /// Completes a value against its declared type, descending into lists
    /// and child external objects.
    fn complete_value<'s>(
        &'s self,
        field_type: Option<GraphType>,
        selection: SelectionSet,
        value: Value,
        provenance: Provenance,
        path: Vec<PathSegment>,
    ) -> BoxFuture<'s, Result<Value, Bubble>> {
        async move {
            match field_type {
                None => Ok(value),
                Some(GraphType::NonNullType(inner)) => {
                    let completed = self
                        .complete_value(Some(*inner), selection, value, provenance, path)
                        .await?;
                    if completed.is_null() {
                        Err(Bubble)
                    } else {
                        Ok(completed)
                    }
                }
                Some(GraphType::ListType(inner)) => match value {
                    Value::Array(items) => {
                        let futures = items.into_iter().enumerate().map(|(index, item)| {
                            let mut item_path = path.clone();
                            item_path.push(PathSegment::Index(index));
                            let item_provenance = Provenance {
                                origin: provenance.origin,
                                receiver: provenance
                                    .receiver
                                    .as_ref()
                                    .map(|handle| handle.child(&index.to_string())),
                                // relocate unpathed errors with the first row
                                unpathed: if index == 0 {
                                    provenance.unpathed.clone()
                                } else {
                                    vec![]
                                },
                            };
                            self.complete_value(
                                Some((*inner).clone()),
                                selection.clone(),
                                item,
                                item_provenance,
                                item_path,
                            )
                        });
                        let completed = join_all(futures).await;
                        let mut out = vec![];
                        for item in completed {
                            match item {
                                Ok(value) => out.push(value),
                                // a null in a non-null position nulls the list
                                Err(Bubble) => return Ok(Value::Null),
                            }
                        }
                        Ok(Value::Array(out))
                    }
                    _ => Ok(Value::Null),
                },
                Some(GraphType::NamedType(name)) => {
                    if value.is_null() {
                        return Ok(Value::Null);
                    }
                    if self.stitcher.composed.is_composite(&name) {
                        match value {
                            Value::Object(map) => {
                                let mut child = ExternalObject::annotate(
                                    map,
                                    provenance.unpathed,
                                    provenance.origin,
                                );
                                child.receiver = provenance.receiver.clone();
                                match self
                                    .complete_external_object(name, child, selection, path)
                                    .await
                                {
                                    Some(object) => Ok(Value::Object(object)),
                                    None => Ok(Value::Null),
                                }
                            }
                            _ => Ok(Value::Null),
                        }
                    } else {
                        // leaf values pass through in wire form
                        Ok(value)
                    }
                }
            }
        }
        .boxed()
    }

    /// Resolves an external object's selection; `None` means a non-null
    /// child was null and this object position becomes null.
    pub(crate) fn complete_external_object<'s>(
        &'s self,
        declared_type: String,
        mut external: ExternalObject,
        selection: SelectionSet,
        path: Vec<PathSegment>,
    ) -> BoxFuture<'s, Option<JsonMap>> {
        async move {
            let runtime_type = match external.data.get(TYPENAME_FIELD).and_then(Value::as_str) {
                Some(typename) if self.stitcher.composed.is_object(typename) => {
                    typename.to_string()
                }
                _ => declared_type,
            };

            let mut grouped: LinkedHashMap<String, FieldNode> = LinkedHashMap::new();
            self.collect_fields(&runtime_type, &selection, &mut grouped);

            // unpathed sub-errors relocate to the first field read
            if !external.unpathed_errors.is_empty() {
                let first_key = grouped
                    .keys()
                    .next()
                    .cloned()
                    .unwrap_or_else(|| TYPENAME_FIELD.to_string());
                let mut relocated = path.clone();
                relocated.push(PathSegment::field(&first_key));
                for error in external.unpathed_errors.drain(..) {
                    self.push_error(error.located(relocated.clone()));
                }
            }

            let missing = grouped.iter().any(|(key, node)| {
                node.name != TYPENAME_FIELD && !external.data.contains_key(key.as_str())
            });
            let loader = if missing
                && self
                    .stitcher
                    .stitching
                    .merged_types
                    .contains_key(&runtime_type)
            {
                Some(ParentLoader::new(
                    Arc::clone(&self.stitcher.planner),
                    runtime_type.clone(),
                    path.clone(),
                    external.clone(),
                ))
            } else {
                None
            };
            let external = Arc::new(external);

            let entries: Vec<(String, FieldNode)> = grouped.into_iter().collect();
            let futures = entries.into_iter().map(|(key, node)| {
                self.resolve_field(
                    runtime_type.clone(),
                    Arc::clone(&external),
                    loader.clone(),
                    key,
                    node,
                    path.clone(),
                )
            });
            let resolved = join_all(futures).await;

            let mut out = JsonMap::new();
            for (key, outcome) in resolved {
                match outcome {
                    Ok(value) => {
                        out.insert(key, value);
                    }
                    Err(Bubble) => return None,
                }
            }
            Some(out)
        }
        .boxed()
    }

    /// The default merged resolver for one field of an external parent.
    fn resolve_field<'s>(
        &'s self,
        runtime_type: String,
        external: Arc<ExternalObject>,
        loader: Option<Arc<ParentLoader>>,
        key: String,
        node: FieldNode,
        path: Vec<PathSegment>,
    ) -> BoxFuture<'s, (String, Result<Value, Bubble>)> {
        async move {
            let mut field_path = path.clone();
            field_path.push(PathSegment::field(&key));

            if node.name == TYPENAME_FIELD {
                return (key, Ok(Value::String(runtime_type)));
            }

            let field_def = self
                .stitcher
                .composed
                .field_def(&runtime_type, &node.name)
                .cloned();
            let field_type = field_def.map(|def| def.field_type);
            let non_null = matches!(&field_type, Some(t) if is_non_null(t));

            // consumer-provided resolvers take precedence over external data
            if let Some(resolver) = self
                .stitcher
                .resolvers
                .get(&runtime_type)
                .and_then(|by_field| by_field.get(&node.name))
            {
                let args = arguments_to_json(&node, &self.variables);
                return match resolver(&external.data, &args) {
                    Ok(value) => {
                        let provenance = Provenance::plain(external.origin, None);
                        let outcome = self
                            .complete_value(
                                field_type,
                                node.selection_set.clone(),
                                value,
                                provenance,
                                field_path,
                            )
                            .await;
                        (key, outcome)
                    }
                    Err(error) => {
                        self.push_error(error.located(field_path));
                        (key, if non_null { Err(Bubble) } else { Ok(Value::Null) })
                    }
                };
            }

            // an error merged under this key surfaces on read
            if let Some(error) = external.pathed_errors.get(&key) {
                self.push_error(error.clone());
                return (key, if non_null { Err(Bubble) } else { Ok(Value::Null) });
            }

            // present data short-circuits
            if let Some(value) = external.data.get(&key) {
                let provenance = Provenance::plain(
                    external.subschema_for(&key),
                    external.receiver.as_ref().map(|handle| handle.child(&key)),
                );
                let outcome = self
                    .complete_value(
                        field_type,
                        node.selection_set.clone(),
                        value.clone(),
                        provenance,
                        field_path,
                    )
                    .await;
                return (key, outcome);
            }

            // the origin serves this field, so a deferred patch may carry it
            let origin_serves = self.stitcher.subschemas[external.origin]
                .transformed_schema
                .field_def(&runtime_type, &node.name)
                .is_some();
            if origin_serves {
                if let Some(handle) = &external.receiver {
                    let arrived = handle.receiver.request(&handle.path_key, &key).await;
                    for error in handle.receiver.drain_errors().await {
                        self.push_error(error);
                    }
                    if let Some(value) = arrived {
                        let provenance =
                            Provenance::plain(external.origin, Some(handle.child(&key)));
                        let outcome = self
                            .complete_value(
                                field_type,
                                node.selection_set.clone(),
                                value,
                                provenance,
                                field_path,
                            )
                            .await;
                        return (key, outcome);
                    }
                }
            }

            // otherwise plan merged-parent rounds through the loader
            if let Some(loader) = loader {
                let merged = loader.load(&node).await;
                if let Some(error) = merged.pathed_errors.get(&key) {
                    self.push_error(error.clone());
                    return (key, if non_null { Err(Bubble) } else { Ok(Value::Null) });
                }
                if let Some(value) = merged.data.get(&key) {
                    let provenance = Provenance::plain(
                        merged.subschema_for(&key),
                        merged.receiver.as_ref().map(|handle| handle.child(&key)),
                    );
                    let outcome = self
                        .complete_value(
                            field_type,
                            node.selection_set.clone(),
                            value.clone(),
                            provenance,
                            field_path,
                        )
                        .await;
                    return (key, outcome);
                }
            }

            // planner dead end: null, or a nullability error when non-null
            if non_null {
                self.push_error(
                    GraphQLError::new(format!(
                        "Cannot return null for non-nullable field {}.{}",
                        runtime_type, node.name
                    ))
                    .located(field_path),
                );
                (key, Err(Bubble))
            } else {
                (key, Ok(Value::Null))
            }
        }
        .boxed()
    }
}

pub(crate) fn arguments_to_json(node: &FieldNode, variables: &JsonMap) -> JsonMap {
    let mut args = JsonMap::new();
    for (name, value) in &node.arguments {
        args.insert(name.clone(), graphql_value_to_json(value, variables));
    }
    args
}
