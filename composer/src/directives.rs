//! Reads stitching directives (`@key`, `@computed`, `@merge`, `@canonical`)
//! from a subschema's SDL and emits the merge configuration consumed by the
//! stitching index.

use crate::ast::*;
use crate::config::{EntryPoint, MergedTypeConfig};
use crate::error::ConfigurationError;
use crate::schema::{self, SchemaIndex};
use crate::selections;
use linked_hash_map::LinkedHashMap;

/// Definitions for the stitching directives. Concatenate to a subschema's
/// type definitions so its SDL parses standalone.
pub static STITCHING_DIRECTIVES_SDL: &str = "\
directive @key(selectionSet: String!) on OBJECT | INTERFACE
directive @computed(selectionSet: String!) on FIELD_DEFINITION
directive @merge(keyField: String, keyArg: String, key: [String!], additionalArgs: String, argsExpr: String, types: [String!]) on FIELD_DEFINITION
directive @canonical on OBJECT | INTERFACE | INPUT_OBJECT | UNION | ENUM | SCALAR | FIELD_DEFINITION | INPUT_FIELD_DEFINITION
";

/// Compiles a subschema's stitching directives into its merge configuration.
pub fn extract_merge_config(
    index: &SchemaIndex,
) -> Result<LinkedHashMap<String, MergedTypeConfig>, ConfigurationError> {
    let mut merge: LinkedHashMap<String, MergedTypeConfig> = LinkedHashMap::new();

    for (type_name, td) in index.types() {
        let type_directives = schema::type_definition_directives(td);

        for d in get_directive!(type_directives, "key") {
            if !matches!(
                td,
                TypeDefinition::Object(_) | TypeDefinition::Interface(_)
            ) {
                return Err(invalid("key", type_name, "only valid on objects and interfaces"));
            }
            let source = string_argument(d, "selectionSet")
                .ok_or_else(|| invalid("key", type_name, "selectionSet is required"))?;
            let key = selections::parse_selection_set(&source)?;
            let cfg = merge
                .entry(type_name.clone())
                .or_insert_with(MergedTypeConfig::default);
            match &mut cfg.selection_set {
                Some(existing) => selections::merge_selection_sets(existing, &key),
                none => *none = Some(key),
            }
        }

        if get_directive!(type_directives, "canonical").next().is_some() {
            merge
                .entry(type_name.clone())
                .or_insert_with(MergedTypeConfig::default)
                .canonical = true;
        }

        if let Some(fields) = index.type_fields(type_name) {
            for field in fields {
                for d in get_directive!(field.directives, "computed") {
                    let source = string_argument(d, "selectionSet").ok_or_else(|| {
                        invalid(
                            "computed",
                            &format!("{}.{}", type_name, field.name),
                            "selectionSet is required",
                        )
                    })?;
                    let dependency = selections::parse_selection_set(&source)?;
                    let cfg = merge
                        .entry(type_name.clone())
                        .or_insert_with(MergedTypeConfig::default);
                    let field_cfg = cfg.fields.entry(field.name.clone()).or_insert_with(Default::default);
                    field_cfg.computed = true;
                    match &mut field_cfg.selection_set {
                        Some(existing) => selections::merge_selection_sets(existing, &dependency),
                        none => *none = Some(dependency),
                    }
                }

                if get_directive!(field.directives, "canonical").next().is_some() {
                    merge
                        .entry(type_name.clone())
                        .or_insert_with(MergedTypeConfig::default)
                        .fields
                        .entry(field.name.clone())
                        .or_insert_with(Default::default)
                        .canonical = true;
                }

                for d in get_directive!(field.directives, "merge") {
                    compile_entry_point(index, type_name, field, d, &mut merge)?;
                }
            }
        }

        if let TypeDefinition::InputObject(io) = td {
            for input_field in &io.fields {
                if get_directive!(input_field.directives, "canonical").next().is_some() {
                    merge
                        .entry(type_name.clone())
                        .or_insert_with(MergedTypeConfig::default)
                        .fields
                        .entry(input_field.name.clone())
                        .or_insert_with(Default::default)
                        .canonical = true;
                }
            }
        }
    }

    Ok(merge)
}

fn compile_entry_point(
    index: &SchemaIndex,
    parent_type: &str,
    field: &SchemaField,
    d: &Directive,
    merge: &mut LinkedHashMap<String, MergedTypeConfig>,
) -> Result<(), ConfigurationError> {
    let location = format!("{}.{}", parent_type, field.name);

    if Some(parent_type) != index.query_type() {
        return Err(invalid(
            "merge",
            &location,
            "only root Query fields may be merge entry points",
        ));
    }

    let named_return = schema::named_type(&field.field_type);
    let batch = schema::is_list_type(&field.field_type);
    match index.get_type(named_return) {
        Some(TypeDefinition::Object(_))
        | Some(TypeDefinition::Interface(_))
        | Some(TypeDefinition::Union(_)) => {}
        Some(_) => {
            return Err(invalid(
                "merge",
                &location,
                "entry points must return an object, interface, or union",
            ))
        }
        None => return Err(ConfigurationError::UnknownType(named_return.to_string())),
    }

    let key_field = match string_argument(d, "keyField") {
        Some(path) => Some(parse_dotted(&path, &location)?),
        None => None,
    };
    let key_arg = match string_argument(d, "keyArg") {
        Some(path) => Some(parse_dotted(&path, &location)?),
        None => None,
    };
    let key_paths = match string_list_argument(d, "key", &location)? {
        Some(paths) => {
            let mut parsed = vec![];
            for p in paths {
                parsed.push(parse_dotted(&p, &location)?);
            }
            Some(parsed)
        }
        None => None,
    };
    let additional_args = match string_argument(d, "additionalArgs") {
        Some(text) => parse_argument_list(&text, "additionalArgs", &location)?,
        None => vec![],
    };
    let args_expr = match string_argument(d, "argsExpr") {
        Some(text) => Some(parse_argument_list(&text, "argsExpr", &location)?),
        None => None,
    };
    let types = string_list_argument(d, "types", &location)?;

    if key_paths.is_some() && key_field.is_some() {
        return Err(invalid("merge", &location, "key and keyField are mutually exclusive"));
    }
    if args_expr.is_some() && (key_arg.is_some() || !additional_args.is_empty()) {
        return Err(invalid(
            "merge",
            &location,
            "argsExpr excludes keyArg and additionalArgs",
        ));
    }
    if let Some(type_names) = &types {
        if !index.is_abstract(named_return) {
            return Err(invalid(
                "merge",
                &location,
                "types requires an abstract return type",
            ));
        }
        let possible = index.possible_types(named_return);
        for t in type_names {
            if !possible.contains(t) {
                return Err(invalid(
                    "merge",
                    &location,
                    &format!("\"{}\" does not implement \"{}\"", t, named_return),
                ));
            }
        }
    }

    let entry = EntryPoint {
        field_name: field.name.clone(),
        key_field,
        key_arg,
        key_paths,
        additional_args,
        args_expr,
        types: types.clone(),
        batch,
    };

    let owners: Vec<String> = match types {
        Some(type_names) => type_names,
        None => vec![named_return.to_string()],
    };
    for owner in owners {
        merge
            .entry(owner)
            .or_insert_with(MergedTypeConfig::default)
            .entry_point = Some(entry.clone());
    }
    Ok(())
}

fn string_argument(d: &Directive, name: &str) -> Option<String> {
    d.arguments.iter().find_map(|(arg, value)| {
        if arg == name {
            if let GraphValue::String(s) = value {
                return Some(s.clone());
            }
        }
        None
    })
}

fn string_list_argument(
    d: &Directive,
    name: &str,
    location: &str,
) -> Result<Option<Vec<String>>, ConfigurationError> {
    for (arg, value) in &d.arguments {
        if arg != name {
            continue;
        }
        match value {
            GraphValue::List(items) => {
                let mut out = vec![];
                for item in items {
                    match item {
                        GraphValue::String(s) => out.push(s.clone()),
                        _ => {
                            return Err(invalid(
                                "merge",
                                location,
                                &format!("{} must be a list of strings", name),
                            ))
                        }
                    }
                }
                return Ok(Some(out));
            }
            GraphValue::String(s) => return Ok(Some(vec![s.clone()])),
            _ => {
                return Err(invalid(
                    "merge",
                    location,
                    &format!("{} must be a list of strings", name),
                ))
            }
        }
    }
    Ok(None)
}

fn parse_dotted(path: &str, location: &str) -> Result<Vec<String>, ConfigurationError> {
    let segments: Vec<String> = path.split('.').map(str::to_string).collect();
    let well_formed = !segments.is_empty()
        && segments.iter().all(|s| {
            !s.is_empty()
                && s.chars().next().map(|c| c.is_ascii_alphabetic() || c == '_') == Some(true)
                && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if !well_formed {
        return Err(invalid(
            "merge",
            location,
            &format!("\"{}\" is not a dotted name path", path),
        ));
    }
    Ok(segments)
}

/// Parses directive text such as `scope: "all"` or `input: { ids: [$key] }`
/// as a GraphQL argument list.
fn parse_argument_list(
    text: &str,
    argument: &str,
    location: &str,
) -> Result<Vec<(String, GraphValue)>, ConfigurationError> {
    let wrapped = format!("{{ _stub({}) }}", text);
    let doc = graphql_parser::parse_query::<String>(&wrapped)
        .map_err(|e| {
            invalid(
                "merge",
                location,
                &format!("{} is not an argument list: {}", argument, e),
            )
        })?
        .into_static();
    let mut definitions = doc.definitions;
    if let Some(Definition::Operation(OperationDefinition::SelectionSet(mut ss))) =
        definitions.pop()
    {
        if let Some(Selection::Field(field)) = ss.items.pop() {
            return Ok(field.arguments);
        }
    }
    Err(invalid(
        "merge",
        location,
        &format!("{} is not an argument list", argument),
    ))
}

fn invalid(directive: &'static str, location: &str, message: &str) -> ConfigurationError {
    ConfigurationError::InvalidDirectiveUsage {
        directive,
        location: location.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::print::print_selection_set;

    fn compile(sdl: &str) -> Result<LinkedHashMap<String, MergedTypeConfig>, ConfigurationError> {
        let full = format!("{}\n{}", STITCHING_DIRECTIVES_SDL, sdl);
        extract_merge_config(&SchemaIndex::parse(&full).unwrap())
    }

    #[test]
    fn compiles_key_computed_and_merge() {
        let merge = compile(
            r#"
            type Query {
              userById(id: ID!): User @merge(keyField: "id")
            }
            type User @key(selectionSet: "{ id }") {
              id: ID!
              fullName: String @computed(selectionSet: "{ firstName lastName }")
            }
            "#,
        )
        .unwrap();

        let user = &merge["User"];
        assert_eq!(
            print_selection_set(user.selection_set.as_ref().unwrap()),
            "{id}"
        );
        let full_name = &user.fields["fullName"];
        assert!(full_name.computed);
        assert_eq!(
            print_selection_set(full_name.selection_set.as_ref().unwrap()),
            "{firstName lastName}"
        );
        let entry = user.entry_point.as_ref().unwrap();
        assert_eq!(entry.field_name, "userById");
        assert_eq!(entry.key_field.as_ref().unwrap(), &["id"]);
        assert!(!entry.batch);
    }

    #[test]
    fn batch_entry_points_detect_list_returns() {
        let merge = compile(
            r#"
            type Query {
              usersByIds(ids: [ID!]!): [User] @merge(keyField: "id", keyArg: "ids")
            }
            type User @key(selectionSet: "{ id }") { id: ID! }
            "#,
        )
        .unwrap();
        let entry = merge["User"].entry_point.as_ref().unwrap();
        assert!(entry.batch);
        assert_eq!(entry.key_arg.as_ref().unwrap(), &["ids"]);
    }

    #[test]
    fn multiple_keys_union() {
        let merge = compile(
            r#"
            type Query { u(id: ID): User @merge(keyField: "id") }
            type User @key(selectionSet: "{ id }") @key(selectionSet: "{ email }") {
              id: ID!
              email: String
            }
            "#,
        )
        .unwrap();
        assert_eq!(
            print_selection_set(merge["User"].selection_set.as_ref().unwrap()),
            "{id email}"
        );
    }

    #[test]
    fn canonical_flags_types_and_fields() {
        let merge = compile(
            r#"
            type Query { u: User }
            type User @canonical {
              id: ID!
              name: String @canonical
            }
            "#,
        )
        .unwrap();
        assert!(merge["User"].canonical);
        assert!(merge["User"].fields["name"].canonical);
    }

    #[test]
    fn merge_on_non_root_fields_is_rejected() {
        let err = compile(
            r#"
            type Query { u: User }
            type User {
              id: ID!
              friend: User @merge(keyField: "id")
            }
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidDirectiveUsage { directive: "merge", .. }
        ));
    }

    #[test]
    fn key_and_key_field_are_mutually_exclusive() {
        let err = compile(
            r#"
            type Query {
              u(id: ID): User @merge(keyField: "id", key: ["id"])
            }
            type User { id: ID! }
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidDirectiveUsage { directive: "merge", .. }
        ));
    }

    #[test]
    fn args_expr_excludes_key_arg_and_additional_args() {
        let err = compile(
            r#"
            type Query {
              u(input: ID): User @merge(argsExpr: "input: $key", keyArg: "input")
            }
            type User { id: ID! }
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidDirectiveUsage { directive: "merge", .. }
        ));
    }

    #[test]
    fn types_must_implement_the_abstract_return() {
        let err = compile(
            r#"
            type Query {
              entity(id: ID): Node @merge(keyField: "id", types: ["Order"])
            }
            interface Node { id: ID! }
            type User implements Node { id: ID! }
            type Order { id: ID! }
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidDirectiveUsage { directive: "merge", .. }
        ));
    }

    #[test]
    fn types_attach_the_entry_point_to_each_implementation() {
        let merge = compile(
            r#"
            type Query {
              entity(id: ID): Node @merge(keyField: "id", types: ["User"])
            }
            interface Node { id: ID! }
            type User implements Node { id: ID! }
            "#,
        )
        .unwrap();
        assert!(merge["User"].entry_point.is_some());
        assert!(merge.get("Node").map(|c| c.entry_point.is_some()) != Some(true));
    }

    #[test]
    fn args_expr_parses_key_placeholders() {
        let merge = compile(
            r#"
            type Query {
              users(filter: UserFilter): [User] @merge(argsExpr: "filter: { keys: [$key] }")
            }
            input UserFilter { keys: [ID!] }
            type User { id: ID! }
            "#,
        )
        .unwrap();
        let entry = merge["User"].entry_point.as_ref().unwrap();
        let expr = entry.args_expr.as_ref().unwrap();
        assert_eq!(expr.len(), 1);
        assert_eq!(expr[0].0, "filter");
    }
}
