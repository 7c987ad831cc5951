//! Runtime core of the weft stitching gateway: the type-merging delegation
//! engine. Builds on `weft-composer` for schema composition and the
//! stitching index, and adds the executor contract, the request transform
//! pipeline, delegation, external-object merging, the merged-parent planner,
//! per-parent batching, and deferred-patch delivery.

pub mod deep_merge;
pub mod delegate;
pub mod error;
pub mod executor;
pub mod external;
pub mod http;
pub mod loader;
pub mod plan;
pub mod receiver;
mod resolve;
pub mod stitcher;
pub mod subschema;
pub mod transforms;
pub mod values;
pub mod wire;

pub use crate::delegate::{DelegationParams, DelegationResult, Delegator};
pub use crate::error::{DelegationError, TransportError};
pub use crate::executor::{Executor, ExecutorResponse, FnExecutor};
pub use crate::external::{ExternalObject, MergeSource, ReceiverHandle};
pub use crate::http::HttpExecutor;
pub use crate::receiver::Receiver;
pub use crate::stitcher::{
    stitch_schemas, stitching_directives_transform, FieldResolverFn, ResolverMap, StitchConfig,
    Stitcher, SubschemaConfigTransform, STITCHING_DIRECTIVES_SDL,
};
pub use crate::subschema::{CreateProxyingResolver, ProxyingResolverFn, Subschema, SubschemaConfig};
pub use crate::transforms::{DelegationInfo, Transform, TransformContext};
pub use crate::wire::{
    AsyncExecutionResult, ErrorLocation, ExecutionResult, GraphQLError, JsonMap, PathSegment,
    Request,
};

pub use weft_composer::{
    ConfigurationError, EntryPoint, MergeTypesSpec, MergedFieldConfig, MergedTypeConfig,
    OperationKind, SchemaIndex, StitchingInfo, SubschemaId, TypeMergingOptions,
};

use weft_composer::ast::QueryDocument;

/// Parses an executable document for [`Request`]s.
pub fn parse_operation(source: &str) -> Result<QueryDocument, DelegationError> {
    graphql_parser::parse_query::<String>(source)
        .map(|doc| doc.into_static())
        .map_err(|e| DelegationError::InvalidRequest(e.to_string()))
}
