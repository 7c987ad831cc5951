//! Composing subschemas whose merge configuration comes entirely from
//! stitching directives in their SDL.

use weft_composer::directives::{extract_merge_config, STITCHING_DIRECTIVES_SDL};
use weft_composer::print::print_selection_set;
use weft_composer::{compose, ComposeOptions, SchemaIndex, SubschemaDefinition};

fn subschema(name: &str, body: &str) -> SubschemaDefinition {
    let sdl = format!("{}\n{}", STITCHING_DIRECTIVES_SDL, body);
    let schema = SchemaIndex::parse(&sdl).unwrap();
    let merge = extract_merge_config(&schema).unwrap();
    let mut definition = SubschemaDefinition::new(name, schema);
    definition.merge = merge;
    definition
}

#[test]
fn directive_driven_composition_builds_the_full_index() {
    let users = subschema(
        "users",
        r#"
        type Query {
          me: User
          userById(id: ID!): User @merge(keyField: "id")
        }
        type User @key(selectionSet: "{ id }") {
          id: ID!
          name: String!
        }
        "#,
    );
    let reviews = subschema(
        "reviews",
        r#"
        type Query {
          usersByIds(ids: [ID!]!): [User] @merge(keyField: "id", keyArg: "ids")
        }
        type User @key(selectionSet: "{ id }") {
          id: ID!
          reviews: [Review]
        }
        type Review {
          id: ID!
          body: String
        }
        "#,
    );

    let composed = compose(&[users, reviews], &ComposeOptions::default()).unwrap();

    let user_fields: Vec<&str> = composed
        .schema
        .type_fields("User")
        .unwrap()
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(user_fields, ["id", "name", "reviews"]);

    let merged = &composed.info.merged_types["User"];
    assert_eq!(merged.subschemas, [0, 1]);
    assert_eq!(merged.unique_fields["name"], 0);
    assert_eq!(merged.unique_fields["reviews"], 1);
    assert_eq!(merged.non_unique_fields["id"], [0, 1]);
    assert!(merged.entry_points[&1].batch);
    assert_eq!(
        print_selection_set(&composed.info.selection_sets_by_type["User"]),
        "{id}"
    );

    // either side can still be fetched from the other
    assert_eq!(merged.targets_for(0), [1]);
    assert_eq!(merged.targets_for(1), [0]);
}

#[test]
fn canonical_annotations_steer_merged_definitions() {
    let a = subschema(
        "a",
        r#"
        type Query { thing: Thing }
        type Thing { id: ID! kind: String }
        "#,
    );
    let b = subschema(
        "b",
        r#"
        type Query { thingById(id: ID!): Thing @merge(keyField: "id") }
        type Thing @canonical @key(selectionSet: "{ id }") { id: ID! kind: String }
        "#,
    );
    let composed = compose(&[a, b], &ComposeOptions::default()).unwrap();
    assert!(composed.schema.get_type("Thing").is_some());
    assert!(composed.info.merged_types.contains_key("Thing"));
}
