//! Consumer-authored composition configuration. The runtime half of a
//! subschema (executor, transforms) lives in the gateway crate; composition
//! only sees the schema and its merge configuration.

use crate::ast::*;
use crate::candidates::TypeCandidate;
use crate::schema::SchemaIndex;
use linked_hash_map::LinkedHashMap;
use std::collections::HashSet;
use std::sync::Arc;

pub type SubschemaId = usize;

/// One subschema's contribution to composition.
#[derive(Clone, Debug)]
pub struct SubschemaDefinition {
    pub name: String,
    pub schema: SchemaIndex,
    /// Type name to merge configuration.
    pub merge: LinkedHashMap<String, MergedTypeConfig>,
}

impl SubschemaDefinition {
    pub fn new(name: impl Into<String>, schema: SchemaIndex) -> Self {
        SubschemaDefinition {
            name: name.into(),
            schema,
            merge: LinkedHashMap::new(),
        }
    }
}

/// Per-subschema, per-type merge configuration.
#[derive(Clone, Default, Debug)]
pub struct MergedTypeConfig {
    /// Fields this subschema requires as input to serve queries for the type.
    pub selection_set: Option<SelectionSet>,
    pub fields: LinkedHashMap<String, MergedFieldConfig>,
    pub entry_point: Option<EntryPoint>,
    /// This subschema owns the authoritative definition of the type.
    pub canonical: bool,
}

impl MergedTypeConfig {
    pub fn has_computed_fields(&self) -> bool {
        self.fields.values().any(|f| f.computed)
    }
}

#[derive(Clone, Default, Debug)]
pub struct MergedFieldConfig {
    /// Dependency selection set for a computed field.
    pub selection_set: Option<SelectionSet>,
    pub computed: bool,
    pub canonical: bool,
}

/// How a subschema fetches a merged type: the root field to call and how its
/// arguments are produced from the key object projected off the parent.
/// Interpreted by the gateway (merged-type resolvers are data).
#[derive(Clone, Debug)]
pub struct EntryPoint {
    pub field_name: String,
    /// Dotted path into the key object; the value at this path becomes the
    /// argument payload instead of the whole key object.
    pub key_field: Option<Vec<String>>,
    /// Dotted path naming the (possibly nested) argument that receives the
    /// key payload.
    pub key_arg: Option<Vec<String>>,
    /// Paths that shape batch key objects (`@merge(key:)`).
    pub key_paths: Option<Vec<Vec<String>>>,
    /// Literal arguments always sent along.
    pub additional_args: Vec<(String, GraphValue)>,
    /// Argument list in which the variable `$key` stands for the key object.
    pub args_expr: Option<Vec<(String, GraphValue)>>,
    /// For abstract-returning entry points, the concrete types servable.
    pub types: Option<Vec<String>>,
    /// List-returning entry point: keys are sent and rows received as lists.
    pub batch: bool,
}

impl EntryPoint {
    pub fn new(field_name: impl Into<String>) -> Self {
        EntryPoint {
            field_name: field_name.into(),
            key_field: None,
            key_arg: None,
            key_paths: None,
            additional_args: vec![],
            args_expr: None,
            types: None,
            batch: false,
        }
    }
}

/// Which type names get merged rather than chosen.
#[derive(Clone)]
pub enum MergeTypesSpec {
    All,
    None,
    Names(HashSet<String>),
    Predicate(Arc<dyn Fn(&str, &[TypeCandidate]) -> bool + Send + Sync>),
}

impl Default for MergeTypesSpec {
    fn default() -> Self {
        MergeTypesSpec::All
    }
}

pub struct ConflictContext<'a> {
    pub left_subschema: Option<&'a str>,
    pub right_subschema: Option<&'a str>,
}

/// Reduces conflicting candidates left-to-right when types are chosen
/// instead of merged.
pub type OnTypeConflict =
    Arc<dyn Fn(&TypeDefinition, &TypeDefinition, &ConflictContext<'_>) -> TypeDefinition + Send + Sync>;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ValidationLevel {
    Off,
    Warn,
    Error,
}

impl Default for ValidationLevel {
    fn default() -> Self {
        ValidationLevel::Error
    }
}

#[derive(Clone, Debug, Default)]
pub struct TypeMergingOptions {
    /// How conflicting field types on merged types are treated when no
    /// canonical owner decides: `Error` rejects composition, anything else
    /// lets the later candidate win.
    pub validation: ValidationLevel,
}
