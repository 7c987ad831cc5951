//! Type-candidate registry: every named type from every subschema, plus
//! user-supplied types and parsed type definitions, grouped by name.

use crate::ast::*;
use crate::config::{SubschemaDefinition, SubschemaId};
use crate::error::ConfigurationError;
use crate::schema::{self, SchemaIndex};
use linked_hash_map::LinkedHashMap;

/// A named type as contributed by one source. `subschema` is `None` for
/// user-supplied types and type definitions.
#[derive(Clone)]
pub struct TypeCandidate {
    pub type_def: TypeDefinition,
    pub subschema: Option<SubschemaId>,
}

pub(crate) struct CandidateRegistry {
    pub types: LinkedHashMap<String, Vec<TypeCandidate>>,
    pub directives: LinkedHashMap<String, DirectiveDefinition>,
    pub query_root: bool,
    pub mutation_root: bool,
    pub subscription_root: bool,
}

pub(crate) fn collect_candidates(
    subschemas: &[SubschemaDefinition],
    extra_types: &[TypeDefinition],
    type_defs: &[SchemaDocument],
    merge_directives: bool,
) -> Result<CandidateRegistry, ConfigurationError> {
    let mut registry = CandidateRegistry {
        types: LinkedHashMap::new(),
        directives: LinkedHashMap::new(),
        query_root: false,
        mutation_root: false,
        subscription_root: false,
    };

    for (id, def) in subschemas.iter().enumerate() {
        collect_from_index(&mut registry, &def.schema, Some(id), merge_directives);
    }

    for td in extra_types {
        let name = schema::type_definition_name(td).to_string();
        push_candidate(
            &mut registry.types,
            name,
            TypeCandidate {
                type_def: td.clone(),
                subschema: None,
            },
        );
    }

    for doc in type_defs {
        let index = SchemaIndex::from_document(doc.clone())?;
        collect_from_index(&mut registry, &index, None, merge_directives);
    }

    Ok(registry)
}

fn collect_from_index(
    registry: &mut CandidateRegistry,
    index: &SchemaIndex,
    id: Option<SubschemaId>,
    merge_directives: bool,
) {
    let roots = [
        (index.query_type(), QUERY_TYPE_NAME),
        (index.mutation_type(), MUTATION_TYPE_NAME),
        (index.subscription_type(), SUBSCRIPTION_TYPE_NAME),
    ];

    for (type_name, td) in index.types() {
        if schema::is_introspection_type(type_name) {
            continue;
        }
        // Operation roots are registered separately under canonical names.
        let canonical_root = roots
            .iter()
            .find(|(root, _)| *root == Some(type_name.as_str()))
            .map(|(_, canonical)| *canonical);
        match canonical_root {
            Some(canonical) => {
                match canonical {
                    n if n == QUERY_TYPE_NAME => registry.query_root = true,
                    n if n == MUTATION_TYPE_NAME => registry.mutation_root = true,
                    _ => registry.subscription_root = true,
                }
                let mut td = td.clone();
                schema::set_type_definition_name(&mut td, canonical);
                push_candidate(
                    &mut registry.types,
                    canonical.to_string(),
                    TypeCandidate {
                        type_def: td,
                        subschema: id,
                    },
                );
            }
            None => push_candidate(
                &mut registry.types,
                type_name.clone(),
                TypeCandidate {
                    type_def: td.clone(),
                    subschema: id,
                },
            ),
        }
    }

    for (name, dd) in index.directive_definitions() {
        if merge_directives && registry.directives.contains_key(name) {
            if let Some(existing) = registry.directives.get_mut(name) {
                for location in &dd.locations {
                    if !existing.locations.contains(location) {
                        existing.locations.push(location.clone());
                    }
                }
                for arg in &dd.arguments {
                    if !existing.arguments.iter().any(|a| a.name == arg.name) {
                        existing.arguments.push(arg.clone());
                    }
                }
            }
            continue;
        }
        // last write wins unless directives are merged
        registry.directives.insert(name.clone(), dd.clone());
    }
}

fn push_candidate(
    types: &mut LinkedHashMap<String, Vec<TypeCandidate>>,
    name: String,
    candidate: TypeCandidate,
) {
    types.entry(name).or_insert_with(Vec::new).push(candidate);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SubschemaDefinition;

    fn definition(name: &str, sdl: &str) -> SubschemaDefinition {
        SubschemaDefinition::new(name, SchemaIndex::parse(sdl).unwrap())
    }

    #[test]
    fn renames_operation_roots_to_canonical_names() {
        let subschemas = vec![definition(
            "accounts",
            r#"
            schema { query: RootQuery }
            type RootQuery { me: User }
            type User { id: ID! }
            "#,
        )];
        let registry = collect_candidates(&subschemas, &[], &[], false).unwrap();
        assert!(registry.query_root);
        assert!(registry.types.contains_key("Query"));
        assert!(!registry.types.contains_key("RootQuery"));
        assert_eq!(registry.types["User"].len(), 1);
    }

    #[test]
    fn groups_candidates_by_name_across_subschemas() {
        let subschemas = vec![
            definition("a", "type Query { me: User } type User { id: ID! }"),
            definition("b", "type Query { userById(id: ID!): User } type User { id: ID! email: String }"),
        ];
        let registry = collect_candidates(&subschemas, &[], &[], false).unwrap();
        assert_eq!(registry.types["User"].len(), 2);
        assert_eq!(registry.types["Query"].len(), 2);
        assert_eq!(registry.types["User"][1].subschema, Some(1));
    }

    #[test]
    fn directive_definitions_accumulate_when_merging() {
        let subschemas = vec![
            definition("a", "directive @tag(name: String) on OBJECT type Query { ok: Boolean }"),
            definition("b", "directive @tag(label: String) on FIELD_DEFINITION type Query { ok: Boolean }"),
        ];
        let merged = collect_candidates(&subschemas, &[], &[], true).unwrap();
        assert_eq!(merged.directives["tag"].locations.len(), 2);
        assert_eq!(merged.directives["tag"].arguments.len(), 2);

        let last_wins = collect_candidates(&subschemas, &[], &[], false).unwrap();
        assert_eq!(last_wins.directives["tag"].locations.len(), 1);
    }
}
