//! Owned-text aliases over the graphql-parser ASTs.
//!
//! Composition owns every document it touches (selection sets configured as
//! strings are parsed once at composition and kept as ASTs), so all node
//! types are fixed to `String` text with a `'static` lifetime.

use graphql_parser::Pos;

pub type SchemaDocument = graphql_parser::schema::Document<'static, String>;
pub type SchemaDefinitionNode = graphql_parser::schema::SchemaDefinition<'static, String>;
pub type TypeDefinition = graphql_parser::schema::TypeDefinition<'static, String>;
pub type ObjectType = graphql_parser::schema::ObjectType<'static, String>;
pub type InterfaceType = graphql_parser::schema::InterfaceType<'static, String>;
pub type UnionType = graphql_parser::schema::UnionType<'static, String>;
pub type EnumType = graphql_parser::schema::EnumType<'static, String>;
pub type ScalarType = graphql_parser::schema::ScalarType<'static, String>;
pub type InputObjectType = graphql_parser::schema::InputObjectType<'static, String>;
pub type TypeExtension = graphql_parser::schema::TypeExtension<'static, String>;
pub type SchemaField = graphql_parser::schema::Field<'static, String>;
pub type InputValue = graphql_parser::schema::InputValue<'static, String>;
pub type DirectiveDefinition = graphql_parser::schema::DirectiveDefinition<'static, String>;

pub type QueryDocument = graphql_parser::query::Document<'static, String>;
pub type Definition = graphql_parser::query::Definition<'static, String>;
pub type OperationDefinition = graphql_parser::query::OperationDefinition<'static, String>;
pub type QueryOperation = graphql_parser::query::Query<'static, String>;
pub type MutationOperation = graphql_parser::query::Mutation<'static, String>;
pub type SubscriptionOperation = graphql_parser::query::Subscription<'static, String>;
pub type SelectionSet = graphql_parser::query::SelectionSet<'static, String>;
pub type Selection = graphql_parser::query::Selection<'static, String>;
pub type FieldNode = graphql_parser::query::Field<'static, String>;
pub type FragmentDefinition = graphql_parser::query::FragmentDefinition<'static, String>;
pub type FragmentSpread = graphql_parser::query::FragmentSpread<'static, String>;
pub type InlineFragment = graphql_parser::query::InlineFragment<'static, String>;
pub type TypeCondition = graphql_parser::query::TypeCondition<'static, String>;
pub type VariableDefinition = graphql_parser::query::VariableDefinition<'static, String>;

pub type GraphType = graphql_parser::query::Type<'static, String>;
pub type GraphValue = graphql_parser::query::Value<'static, String>;
pub type Directive = graphql_parser::query::Directive<'static, String>;

pub static TYPENAME_FIELD: &str = "__typename";
pub static QUERY_TYPE_NAME: &str = "Query";
pub static MUTATION_TYPE_NAME: &str = "Mutation";
pub static SUBSCRIPTION_TYPE_NAME: &str = "Subscription";

pub fn pos() -> Pos {
    Pos { line: 0, column: 0 }
}

pub fn span() -> (Pos, Pos) {
    (pos(), pos())
}

pub fn empty_selection_set() -> SelectionSet {
    SelectionSet {
        span: span(),
        items: vec![],
    }
}

pub fn field_node(name: &str) -> FieldNode {
    FieldNode {
        position: pos(),
        alias: None,
        name: name.to_string(),
        arguments: vec![],
        directives: vec![],
        selection_set: empty_selection_set(),
    }
}

pub fn typename_field_node() -> FieldNode {
    field_node(TYPENAME_FIELD)
}

lazy_static! {
    static ref TYPENAME_SCHEMA_FIELD: SchemaField = SchemaField {
        position: pos(),
        description: None,
        name: TYPENAME_FIELD.to_string(),
        arguments: vec![],
        field_type: GraphType::NonNullType(Box::new(GraphType::NamedType("String".to_string()))),
        directives: vec![],
    };
}

pub fn typename_field_def() -> &'static SchemaField {
    &*TYPENAME_SCHEMA_FIELD
}

/// Alias if present, field name otherwise.
pub fn response_key(field: &FieldNode) -> &str {
    field.alias.as_deref().unwrap_or(&field.name)
}
