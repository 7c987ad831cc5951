//! Runtime subschemas: an executable schema plus configuration, as authored
//! by the consumer and as wired by the stitcher.

use crate::delegate::{DelegationParams, DelegationResult, Delegator};
use crate::executor::Executor;
use crate::transforms::Transform;
use futures::future::BoxFuture;
use linked_hash_map::LinkedHashMap;
use std::sync::Arc;
use weft_composer::{MergedTypeConfig, OperationKind, SchemaIndex, SubschemaId};

/// A resolver that forwards a root field to a subschema; overriding the
/// default lets consumers reshape the delegation.
pub type ProxyingResolverFn = Arc<
    dyn Fn(Arc<Delegator>, Arc<Subschema>, DelegationParams) -> BoxFuture<'static, DelegationResult>
        + Send
        + Sync,
>;

/// Factory hook invoked per (subschema, operation, root field).
pub type CreateProxyingResolver =
    Arc<dyn Fn(&Arc<Subschema>, OperationKind, &str) -> ProxyingResolverFn + Send + Sync>;

/// Consumer-authored subschema configuration.
pub struct SubschemaConfig {
    pub name: String,
    /// SDL of the executable schema.
    pub schema: String,
    pub executor: Arc<dyn Executor>,
    pub transforms: Vec<Arc<dyn Transform>>,
    pub merge: LinkedHashMap<String, MergedTypeConfig>,
    /// Merged-type entry points may batch keys into list calls.
    pub batch: bool,
    pub create_proxying_resolver: Option<CreateProxyingResolver>,
}

impl SubschemaConfig {
    pub fn new(
        name: impl Into<String>,
        schema: impl Into<String>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        SubschemaConfig {
            name: name.into(),
            schema: schema.into(),
            executor,
            transforms: vec![],
            merge: LinkedHashMap::new(),
            batch: false,
            create_proxying_resolver: None,
        }
    }
}

/// A wired subschema as the engine sees it.
pub struct Subschema {
    pub id: SubschemaId,
    pub name: String,
    pub schema: Arc<SchemaIndex>,
    /// The schema after request-side transforms were applied to types; the
    /// view requests are filtered against.
    pub transformed_schema: Arc<SchemaIndex>,
    pub executor: Arc<dyn Executor>,
    pub transforms: Vec<Arc<dyn Transform>>,
    pub merge: LinkedHashMap<String, MergedTypeConfig>,
    pub batch: bool,
}
