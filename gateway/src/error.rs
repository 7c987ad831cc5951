use thiserror::Error;

/// The executor failed outright (network, serialization, protocol); converted
/// at the delegation boundary into a located GraphQL error, never rethrown.
#[derive(Error, Debug)]
#[error("subschema transport error: {0}")]
pub struct TransportError(pub String);

#[derive(Error, Debug)]
pub enum DelegationError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("request transform failed: {0}")]
    Transform(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
