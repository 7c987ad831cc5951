//! Schema-side core of the weft stitching gateway: collects type candidates
//! from subschemas, merges them into one composed schema, compiles stitching
//! directives into merge configuration, and builds the stitching index the
//! gateway runtime plans against.
//!
//! This crate is pure data and algorithms; delegation, transforms, and
//! execution live in `weft-gateway`.

#[macro_use]
extern crate lazy_static;

#[macro_use]
pub mod macros;

pub mod ast;
pub mod candidates;
pub mod compose;
pub mod config;
pub mod directives;
pub mod error;
pub mod index;
mod merge;
pub mod print;
pub mod schema;
pub mod selections;

pub use crate::compose::{compose, isolate_computed_fields, ComposeOptions, ComposedSchema};
pub use crate::config::{
    ConflictContext, EntryPoint, MergeTypesSpec, MergedFieldConfig, MergedTypeConfig,
    OnTypeConflict, SubschemaDefinition, SubschemaId, TypeMergingOptions, ValidationLevel,
};
pub use crate::error::ConfigurationError;
pub use crate::index::{
    DynamicSelectionSetFn, MergedTypeInfo, OperationKind, StitchingInfo,
};
pub use crate::schema::SchemaIndex;
