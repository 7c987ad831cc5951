//! Composition driver: candidates → merged type map → stitching index.
//! Also hosts computed-field isolation, the pre-composition rewrite that
//! splits a subschema into a base part and a computed-only part.

use crate::ast::*;
use crate::candidates;
use crate::config::*;
use crate::error::ConfigurationError;
use crate::index::{self, DynamicSelectionSetFn, StitchingInfo};
use crate::merge::TypeMerger;
use crate::schema::SchemaIndex;
use linked_hash_map::LinkedHashMap;
use std::collections::HashSet;

pub struct ComposeOptions {
    /// User-provided named types added to the candidate pool.
    pub extra_types: Vec<TypeDefinition>,
    /// Parsed `typeDefs` documents added to the candidate pool.
    pub type_defs: Vec<SchemaDocument>,
    pub merge_types: MergeTypesSpec,
    pub merge_directives: bool,
    pub on_type_conflict: Option<OnTypeConflict>,
    pub type_merging: TypeMergingOptions,
    /// (type, field, producer) triples registered into the stitching index.
    pub dynamic_selection_sets: Vec<(String, String, DynamicSelectionSetFn)>,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        ComposeOptions {
            extra_types: vec![],
            type_defs: vec![],
            merge_types: MergeTypesSpec::default(),
            merge_directives: false,
            on_type_conflict: None,
            type_merging: TypeMergingOptions::default(),
            dynamic_selection_sets: vec![],
        }
    }
}

#[derive(Debug)]
pub struct ComposedSchema {
    pub schema: SchemaIndex,
    pub info: StitchingInfo,
}

pub fn compose(
    subschemas: &[SubschemaDefinition],
    options: &ComposeOptions,
) -> Result<ComposedSchema, ConfigurationError> {
    if subschemas.is_empty() {
        return Err(ConfigurationError::NoSubschemas);
    }

    let registry = candidates::collect_candidates(
        subschemas,
        &options.extra_types,
        &options.type_defs,
        options.merge_directives,
    )?;

    let merged_type_names: HashSet<String> = subschemas
        .iter()
        .flat_map(|def| def.merge.keys().cloned())
        .collect();

    let merger = TypeMerger {
        subschemas,
        merge_types: &options.merge_types,
        on_type_conflict: options.on_type_conflict.as_ref(),
        options: &options.type_merging,
        merged_type_names: &merged_type_names,
    };

    let mut types: LinkedHashMap<String, TypeDefinition> = LinkedHashMap::new();
    let directives = registry.directives.clone();
    for (name, candidates) in registry.types.iter() {
        let merged = merger.merge_candidates(name, candidates.clone())?;
        types.insert(name.clone(), merged);
    }

    let schema = SchemaIndex::from_parts(
        types,
        directives,
        registry
            .query_root
            .then(|| QUERY_TYPE_NAME.to_string()),
        registry
            .mutation_root
            .then(|| MUTATION_TYPE_NAME.to_string()),
        registry
            .subscription_root
            .then(|| SUBSCRIPTION_TYPE_NAME.to_string()),
    )?;

    let mut info = index::build_stitching_info(subschemas)?;
    for (type_name, field_name, producer) in &options.dynamic_selection_sets {
        info.dynamic_selection_sets_by_field
            .entry(type_name.clone())
            .or_insert_with(Default::default)
            .entry(field_name.clone())
            .or_insert_with(Vec::new)
            .push(producer.clone());
    }

    Ok(ComposedSchema { schema, info })
}

/// Splits a subschema with computed fields into a base definition (computed
/// fields removed) and an isolated definition serving only the computed
/// fields through the type's entry point. Without the split, a field computed
/// by the origin subschema could never be fetched again: sources never target
/// themselves.
pub fn isolate_computed_fields(
    def: SubschemaDefinition,
) -> Result<Vec<SubschemaDefinition>, ConfigurationError> {
    let computed_types: Vec<String> = def
        .merge
        .iter()
        .filter(|(_, cfg)| cfg.has_computed_fields())
        .map(|(name, _)| name.clone())
        .collect();
    if computed_types.is_empty() {
        return Ok(vec![def]);
    }

    let mut base = def.clone();
    let mut isolated = SubschemaDefinition::new(format!("{}.computed", def.name), def.schema.clone());

    for type_name in &computed_types {
        let cfg = match def.merge.get(type_name) {
            Some(cfg) => cfg,
            None => continue,
        };
        if cfg.entry_point.is_none() {
            return Err(ConfigurationError::InvalidDirectiveUsage {
                directive: "computed",
                location: type_name.clone(),
                message: "computed fields require a merge entry point for the type".to_string(),
            });
        }
        let computed_fields: HashSet<String> = cfg
            .fields
            .iter()
            .filter(|(_, f)| f.computed)
            .map(|(name, _)| name.clone())
            .collect();

        let total_fields = def
            .schema
            .type_fields(type_name)
            .map(|fields| fields.len())
            .unwrap_or(0);
        if total_fields > 0 && computed_fields.len() >= total_fields {
            return Err(ConfigurationError::AllFieldsComputed(type_name.clone()));
        }

        // base keeps everything except the computed fields
        {
            let fields = computed_fields.clone();
            base.schema
                .filter_type_fields(type_name, &move |f| !fields.contains(&f.name));
            if let Some(base_cfg) = base.merge.get_mut(type_name) {
                let keep: Vec<String> = base_cfg
                    .fields
                    .keys()
                    .filter(|name| !computed_fields.contains(*name))
                    .cloned()
                    .collect();
                let mut kept = LinkedHashMap::new();
                for name in keep {
                    if let Some(field_cfg) = base_cfg.fields.get(&name) {
                        kept.insert(name.clone(), field_cfg.clone());
                    }
                }
                base_cfg.fields = kept;
            }
        }

        // the isolated subschema serves only the computed fields
        {
            let fields = computed_fields.clone();
            isolated
                .schema
                .filter_type_fields(type_name, &move |f| fields.contains(&f.name));
            let mut iso_cfg = MergedTypeConfig::default();
            iso_cfg.selection_set = cfg.selection_set.clone();
            iso_cfg.entry_point = cfg.entry_point.clone();
            for (name, field_cfg) in cfg.fields.iter() {
                if field_cfg.computed {
                    iso_cfg.fields.insert(name.clone(), field_cfg.clone());
                }
            }
            isolated.merge.insert(type_name.clone(), iso_cfg);
        }
    }

    Ok(vec![base, isolated])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selections::parse_selection_set;

    fn subschema(name: &str, sdl: &str) -> SubschemaDefinition {
        SubschemaDefinition::new(name, SchemaIndex::parse(sdl).unwrap())
    }

    #[test]
    fn composes_a_two_subschema_merge() {
        let mut a = subschema(
            "accounts",
            "type Query { me: User } type User { id: ID! name: String }",
        );
        let mut a_cfg = MergedTypeConfig::default();
        a_cfg.selection_set = Some(parse_selection_set("{ id }").unwrap());
        a.merge.insert("User".to_string(), a_cfg);

        let mut b = subschema(
            "emails",
            "type Query { userById(id: ID!): User } type User { id: ID! email: String }",
        );
        let mut b_cfg = MergedTypeConfig::default();
        b_cfg.selection_set = Some(parse_selection_set("{ id }").unwrap());
        b_cfg.entry_point = Some(EntryPoint::new("userById"));
        b.merge.insert("User".to_string(), b_cfg);

        let composed = compose(&[a, b], &ComposeOptions::default()).unwrap();
        let fields: Vec<&str> = composed
            .schema
            .type_fields("User")
            .unwrap()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(fields, ["id", "name", "email"]);
        let query_fields: Vec<&str> = composed
            .schema
            .type_fields("Query")
            .unwrap()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(query_fields, ["me", "userById"]);
        assert!(composed.info.merged_types.contains_key("User"));
    }

    #[test]
    fn unknown_reference_fails_composition() {
        let a = subschema("bad", "type Query { thing: Missing }");
        let err = compose(&[a], &ComposeOptions::default()).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownType(_)));
    }

    #[test]
    fn isolation_splits_computed_fields() {
        let mut b = subschema(
            "profiles",
            "type Query { userById(id: ID!): User } type User { id: ID! fullName: String }",
        );
        let mut cfg = MergedTypeConfig::default();
        cfg.selection_set = Some(parse_selection_set("{ id }").unwrap());
        cfg.entry_point = Some(EntryPoint::new("userById"));
        let mut field_cfg = MergedFieldConfig::default();
        field_cfg.computed = true;
        field_cfg.selection_set = Some(parse_selection_set("{ firstName lastName }").unwrap());
        cfg.fields.insert("fullName".to_string(), field_cfg);
        b.merge.insert("User".to_string(), cfg);

        let split = isolate_computed_fields(b).unwrap();
        assert_eq!(split.len(), 2);
        let base = &split[0];
        let isolated = &split[1];
        assert_eq!(isolated.name, "profiles.computed");
        assert!(base.schema.field_def("User", "fullName").is_none());
        assert!(base.schema.field_def("User", "id").is_some());
        assert!(isolated.schema.field_def("User", "fullName").is_some());
        assert!(isolated.schema.field_def("User", "id").is_none());
        assert!(isolated.merge["User"].fields["fullName"].computed);
        assert!(isolated.merge["User"].entry_point.is_some());
    }

    #[test]
    fn isolation_rejects_fully_computed_types() {
        let mut b = subschema(
            "profiles",
            "type Query { userById(id: ID!): User } type User { fullName: String }",
        );
        let mut cfg = MergedTypeConfig::default();
        cfg.entry_point = Some(EntryPoint::new("userById"));
        let mut field_cfg = MergedFieldConfig::default();
        field_cfg.computed = true;
        cfg.fields.insert("fullName".to_string(), field_cfg);
        b.merge.insert("User".to_string(), cfg);
        let err = isolate_computed_fields(b).unwrap_err();
        assert!(matches!(err, ConfigurationError::AllFieldsComputed(_)));
    }

    #[test]
    fn isolation_is_a_no_op_without_computed_fields() {
        let a = subschema("a", "type Query { ok: Boolean }");
        let split = isolate_computed_fields(a).unwrap();
        assert_eq!(split.len(), 1);
    }
}
