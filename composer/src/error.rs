use thiserror::Error;

/// Raised eagerly while composing; fatal for the composition call.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("could not parse schema: {0}")]
    InvalidSchema(String),

    #[error("could not parse selection set {source_text:?}: {message}")]
    InvalidSelectionSet {
        source_text: String,
        message: String,
    },

    #[error("multiple schema definition blocks in one document")]
    DuplicateSchemaDefinition,

    #[error("duplicate definition of type \"{0}\"")]
    DuplicateTypeName(String),

    #[error("type \"{0}\" is defined with incompatible kinds across subschemas")]
    IncompatibleTypeKinds(String),

    #[error("field \"{type_name}.{field_name}\" is defined with conflicting types: {left} vs {right}")]
    IncompatibleFieldTypes {
        type_name: String,
        field_name: String,
        left: String,
        right: String,
    },

    #[error("unknown type \"{0}\" referenced in the composed schema")]
    UnknownType(String),

    #[error("invalid @{directive} on {location}: {message}")]
    InvalidDirectiveUsage {
        directive: &'static str,
        location: String,
        message: String,
    },

    #[error("conflicting @canonical declarations for \"{0}\"")]
    ConflictingCanonical(String),

    #[error("no subschemas were provided")]
    NoSubschemas,

    #[error("every field of \"{0}\" is computed; at least one field must be directly resolvable")]
    AllFieldsComputed(String),
}
