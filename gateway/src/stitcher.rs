//! `stitch_schemas`: wires consumer subschema configs through config
//! transforms, computed-field isolation, and composition, then exposes the
//! composed schema behind an executable facade. Root query fields delegate
//! in parallel, mutation fields serially, in document order.

use crate::delegate::Delegator;
use crate::plan::MergePlanner;
use crate::resolve::Walk;
use crate::subschema::{CreateProxyingResolver, ProxyingResolverFn, Subschema, SubschemaConfig};
use crate::wire::{ExecutionResult, GraphQLError, JsonMap, Request};
use futures::future::{join_all, FutureExt};
use linked_hash_map::LinkedHashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument};
use weft_composer::ast::*;
use weft_composer::{
    compose, isolate_computed_fields, ComposeOptions, ConfigurationError, DynamicSelectionSetFn,
    MergeTypesSpec, OnTypeConflict, OperationKind, SchemaIndex, StitchingInfo,
    SubschemaDefinition, SubschemaId, TypeMergingOptions,
};

/// Pre-composition rewriting of a subschema config; may split one config
/// into several (the directive compiler is the canonical example).
pub type SubschemaConfigTransform =
    Arc<dyn Fn(SubschemaConfig) -> Result<Vec<SubschemaConfig>, ConfigurationError> + Send + Sync>;

/// A consumer field resolver: parent data and arguments to a value.
pub type FieldResolverFn =
    Arc<dyn Fn(&JsonMap, &JsonMap) -> Result<Value, GraphQLError> + Send + Sync>;

pub type ResolverMap = HashMap<String, HashMap<String, FieldResolverFn>>;

pub struct StitchConfig {
    pub subschemas: Vec<SubschemaConfig>,
    /// User-provided named types added to the candidate pool.
    pub types: Vec<TypeDefinition>,
    /// SDL snippets added to the candidate pool.
    pub type_defs: Vec<String>,
    pub resolvers: ResolverMap,
    pub merge_types: MergeTypesSpec,
    pub merge_directives: bool,
    pub on_type_conflict: Option<OnTypeConflict>,
    pub type_merging: TypeMergingOptions,
    pub subschema_config_transforms: Vec<SubschemaConfigTransform>,
    pub inherit_resolvers_from_interfaces: bool,
    pub dynamic_selection_sets: Vec<(String, String, DynamicSelectionSetFn)>,
}

impl StitchConfig {
    pub fn new(subschemas: Vec<SubschemaConfig>) -> Self {
        StitchConfig {
            subschemas,
            types: vec![],
            type_defs: vec![],
            resolvers: ResolverMap::new(),
            merge_types: MergeTypesSpec::default(),
            merge_directives: false,
            on_type_conflict: None,
            type_merging: TypeMergingOptions::default(),
            subschema_config_transforms: vec![],
            inherit_resolvers_from_interfaces: false,
            dynamic_selection_sets: vec![],
        }
    }
}

/// The composed, executable gateway schema.
pub struct Stitcher {
    pub(crate) composed: Arc<SchemaIndex>,
    pub(crate) stitching: Arc<StitchingInfo>,
    pub(crate) subschemas: Vec<Arc<Subschema>>,
    pub(crate) delegator: Arc<Delegator>,
    pub(crate) planner: Arc<MergePlanner>,
    pub(crate) resolvers: ResolverMap,
    pub(crate) proxy_resolvers: HashMap<(OperationKind, String), (SubschemaId, ProxyingResolverFn)>,
}

/// The pre-composition transform that compiles `@key`/`@computed`/`@merge`/
/// `@canonical` directives into the subschema's merge configuration.
pub fn stitching_directives_transform() -> SubschemaConfigTransform {
    Arc::new(|mut config: SubschemaConfig| {
        let index = SchemaIndex::parse(&config.schema)?;
        let compiled = weft_composer::directives::extract_merge_config(&index)?;
        for (type_name, merged) in compiled {
            config.merge.insert(type_name, merged);
        }
        Ok(vec![config])
    })
}

pub use weft_composer::directives::STITCHING_DIRECTIVES_SDL;

#[instrument(level = "debug", skip_all, fields(subschemas = config.subschemas.len()))]
pub fn stitch_schemas(config: StitchConfig) -> Result<Stitcher, ConfigurationError> {
    struct Prepared {
        definition: SubschemaDefinition,
        original_schema: SchemaIndex,
        executor: Arc<dyn crate::executor::Executor>,
        transforms: Vec<Arc<dyn crate::transforms::Transform>>,
        batch: bool,
        create_proxying_resolver: Option<CreateProxyingResolver>,
    }

    // consumer config transforms, applied in order, each may fan out
    let mut configs: Vec<SubschemaConfig> = vec![];
    for subschema in config.subschemas {
        let mut stack = vec![subschema];
        for transform in &config.subschema_config_transforms {
            let mut next = vec![];
            for entry in stack {
                next.extend(transform(entry)?);
            }
            stack = next;
        }
        configs.extend(stack);
    }

    // parse, apply schema transforms, and isolate computed fields
    let mut prepared: Vec<Prepared> = vec![];
    for cfg in configs {
        let original = SchemaIndex::parse(&cfg.schema)?;
        let transformed = cfg
            .transforms
            .iter()
            .fold(original.clone(), |schema, t| t.transform_schema(schema));
        let mut definition = SubschemaDefinition::new(cfg.name.clone(), transformed);
        definition.merge = cfg.merge.clone();
        for part in isolate_computed_fields(definition)? {
            prepared.push(Prepared {
                definition: part,
                original_schema: original.clone(),
                executor: Arc::clone(&cfg.executor),
                transforms: cfg.transforms.clone(),
                batch: cfg.batch,
                create_proxying_resolver: cfg.create_proxying_resolver.clone(),
            });
        }
    }

    let definitions: Vec<SubschemaDefinition> =
        prepared.iter().map(|p| p.definition.clone()).collect();

    let mut type_defs = vec![];
    for sdl in &config.type_defs {
        let doc = graphql_parser::parse_schema::<String>(sdl)
            .map_err(|e| ConfigurationError::InvalidSchema(e.to_string()))?
            .into_static();
        type_defs.push(doc);
    }
    let options = ComposeOptions {
        extra_types: config.types,
        type_defs,
        merge_types: config.merge_types,
        merge_directives: config.merge_directives,
        on_type_conflict: config.on_type_conflict,
        type_merging: config.type_merging,
        dynamic_selection_sets: config.dynamic_selection_sets,
    };
    let composed = compose(&definitions, &options)?;
    debug!(
        types = composed.schema.types().count(),
        merged_types = composed.info.merged_types.len(),
        "composed schema"
    );

    let subschemas: Vec<Arc<Subschema>> = prepared
        .iter()
        .enumerate()
        .map(|(id, p)| {
            Arc::new(Subschema {
                id,
                name: p.definition.name.clone(),
                schema: Arc::new(p.original_schema.clone()),
                transformed_schema: Arc::new(p.definition.schema.clone()),
                executor: Arc::clone(&p.executor),
                transforms: p.transforms.clone(),
                merge: p.definition.merge.clone(),
                batch: p.batch,
            })
        })
        .collect();

    let composed_schema = Arc::new(composed.schema);
    let stitching = Arc::new(composed.info);
    let delegator = Arc::new(Delegator::new(
        Arc::clone(&composed_schema),
        Arc::clone(&stitching),
    ));
    let planner = Arc::new(MergePlanner::new(
        Arc::clone(&stitching),
        Arc::new(subschemas.clone()),
        Arc::clone(&delegator),
    ));

    let resolvers = inherit_interface_resolvers(
        config.resolvers,
        &composed_schema,
        config.inherit_resolvers_from_interfaces,
    );

    let mut proxy_resolvers = HashMap::new();
    for ((kind, field_name), owners) in stitching.root_fields.iter() {
        let owner = match owners.first() {
            Some(&owner) => owner,
            None => continue,
        };
        let subschema = &subschemas[owner];
        let resolver = match &prepared[owner].create_proxying_resolver {
            Some(factory) => factory(subschema, *kind, field_name),
            None => default_proxying_resolver(),
        };
        proxy_resolvers.insert((*kind, field_name.clone()), (owner, resolver));
    }

    Ok(Stitcher {
        composed: composed_schema,
        stitching,
        subschemas,
        delegator,
        planner,
        resolvers,
        proxy_resolvers,
    })
}

fn default_proxying_resolver() -> ProxyingResolverFn {
    Arc::new(|delegator, subschema, params| {
        async move { delegator.delegate(&subschema, params).await }.boxed()
    })
}

fn inherit_interface_resolvers(
    mut resolvers: ResolverMap,
    composed: &SchemaIndex,
    inherit: bool,
) -> ResolverMap {
    if !inherit {
        return resolvers;
    }
    let interface_entries: Vec<(String, Vec<String>)> = resolvers
        .keys()
        .filter(|name| composed.is_abstract(name))
        .map(|name| {
            (
                name.clone(),
                composed.possible_types(name).to_vec(),
            )
        })
        .collect();
    for (interface, implementations) in interface_entries {
        let inherited: Vec<(String, FieldResolverFn)> = resolvers
            .get(&interface)
            .map(|by_field| {
                by_field
                    .iter()
                    .map(|(field, f)| (field.clone(), Arc::clone(f)))
                    .collect()
            })
            .unwrap_or_default();
        for implementation in implementations {
            let slot = resolvers
                .entry(implementation)
                .or_insert_with(HashMap::new);
            for (field, resolver) in &inherited {
                slot.entry(field.clone()).or_insert_with(|| Arc::clone(resolver));
            }
        }
    }
    resolvers
}

impl Stitcher {
    pub fn schema(&self) -> &SchemaIndex {
        &self.composed
    }

    pub fn stitching_info(&self) -> &StitchingInfo {
        &self.stitching
    }

    /// The composed schema rendered as SDL.
    pub fn sdl(&self) -> String {
        format!("{}", self.composed.to_document())
    }

    /// Executes an operation against the composed schema by decomposing it
    /// into sub-operations and assembling one coherent response.
    #[instrument(level = "debug", skip_all)]
    pub async fn execute(&self, request: Request) -> ExecutionResult {
        let (operation, fragments) = match pick_operation(&request.document, &request.operation_name)
        {
            Ok(parts) => parts,
            Err(error) => return ExecutionResult::from_errors(vec![error]),
        };
        let kind = operation_kind(&operation);
        if kind == OperationKind::Subscription {
            return ExecutionResult::from_errors(vec![GraphQLError::new(
                "subscriptions pass through subschema executors and are not executable here",
            )]);
        }
        let root_type = match kind {
            OperationKind::Query => self.composed.query_type(),
            OperationKind::Mutation => self.composed.mutation_type(),
            OperationKind::Subscription => self.composed.subscription_type(),
        };
        let root_type = match root_type {
            Some(name) => name.to_string(),
            None => {
                return ExecutionResult::from_errors(vec![GraphQLError::new(format!(
                    "the composed schema has no {} root",
                    kind.as_str()
                ))])
            }
        };

        let walk = Walk {
            stitcher: self,
            fragments,
            variables: request.variables.clone(),
            variable_definitions: operation_variable_definitions(&operation),
            errors: Mutex::new(vec![]),
        };

        let mut grouped = LinkedHashMap::new();
        walk.collect_fields(&root_type, operation_selection_set_ref(&operation), &mut grouped);
        let entries: Vec<(String, FieldNode)> = grouped.into_iter().collect();

        let mut data = JsonMap::new();
        let mut nulled = false;
        if kind == OperationKind::Mutation {
            // mutation root fields run serially, in document order
            for (key, node) in entries {
                let (key, outcome) = walk
                    .resolve_root_field(kind, root_type.clone(), key, node)
                    .await;
                match outcome {
                    Ok(value) => {
                        data.insert(key, value);
                    }
                    Err(_) => {
                        nulled = true;
                        break;
                    }
                }
            }
        } else {
            let resolved = join_all(entries.into_iter().map(|(key, node)| {
                walk.resolve_root_field(kind, root_type.clone(), key, node)
            }))
            .await;
            for (key, outcome) in resolved {
                match outcome {
                    Ok(value) => {
                        data.insert(key, value);
                    }
                    Err(_) => {
                        nulled = true;
                        break;
                    }
                }
            }
        }

        let errors = walk.into_errors();
        ExecutionResult {
            data: Some(if nulled { Value::Null } else { Value::Object(data) }),
            errors,
        }
    }
}

fn pick_operation(
    document: &QueryDocument,
    operation_name: &Option<String>,
) -> Result<(OperationDefinition, HashMap<String, FragmentDefinition>), GraphQLError> {
    let mut operations = vec![];
    let mut fragments = HashMap::new();
    for def in &document.definitions {
        match def {
            Definition::Operation(op) => operations.push(op.clone()),
            Definition::Fragment(frag) => {
                fragments.insert(frag.name.clone(), frag.clone());
            }
        }
    }
    let operation = match operation_name {
        Some(name) => operations
            .into_iter()
            .find(|op| operation_name_of(op).map(str::to_string) == Some(name.clone()))
            .ok_or_else(|| GraphQLError::new(format!("unknown operation \"{}\"", name)))?,
        None => {
            if operations.len() != 1 {
                return Err(GraphQLError::new(
                    "must provide operation name if query contains multiple operations",
                ));
            }
            match operations.pop() {
                Some(op) => op,
                None => return Err(GraphQLError::new("no operation in document")),
            }
        }
    };
    Ok((operation, fragments))
}

fn operation_name_of(op: &OperationDefinition) -> Option<&str> {
    match op {
        OperationDefinition::SelectionSet(_) => None,
        OperationDefinition::Query(q) => q.name.as_deref(),
        OperationDefinition::Mutation(m) => m.name.as_deref(),
        OperationDefinition::Subscription(s) => s.name.as_deref(),
    }
}

fn operation_kind(op: &OperationDefinition) -> OperationKind {
    match op {
        OperationDefinition::SelectionSet(_) | OperationDefinition::Query(_) => {
            OperationKind::Query
        }
        OperationDefinition::Mutation(_) => OperationKind::Mutation,
        OperationDefinition::Subscription(_) => OperationKind::Subscription,
    }
}

fn operation_variable_definitions(op: &OperationDefinition) -> Vec<VariableDefinition> {
    match op {
        OperationDefinition::SelectionSet(_) => vec![],
        OperationDefinition::Query(q) => q.variable_definitions.clone(),
        OperationDefinition::Mutation(m) => m.variable_definitions.clone(),
        OperationDefinition::Subscription(s) => s.variable_definitions.clone(),
    }
}

fn operation_selection_set_ref(op: &OperationDefinition) -> &SelectionSet {
    match op {
        OperationDefinition::SelectionSet(ss) => ss,
        OperationDefinition::Query(q) => &q.selection_set,
        OperationDefinition::Mutation(m) => &m.selection_set,
        OperationDefinition::Subscription(s) => &s.selection_set,
    }
}
