//! Per-parent batch loader: sibling field resolves on the same parent during
//! one tick coalesce into a single planner invocation. The first requester
//! schedules dispatch behind one cooperative yield; everyone awaits the same
//! shared round.

use crate::external::ExternalObject;
use crate::plan::MergePlanner;
use crate::wire::PathSegment;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use weft_composer::ast::{response_key, FieldNode};
use weft_composer::selections::merge_selection_sets;
use weft_composer::SubschemaId;

type SharedRound = Shared<BoxFuture<'static, Arc<ExternalObject>>>;

pub struct ParentLoader {
    planner: Arc<MergePlanner>,
    type_name: String,
    path: Vec<PathSegment>,
    sources: Vec<SubschemaId>,
    targets: Vec<SubschemaId>,
    inner: Mutex<LoaderInner>,
}

struct LoaderInner {
    parent: Arc<ExternalObject>,
    pending: Option<Pending>,
}

struct Pending {
    batch: Arc<Mutex<FieldBatch>>,
    shared: SharedRound,
}

#[derive(Default)]
struct FieldBatch {
    nodes: Vec<FieldNode>,
    keys: HashSet<String>,
}

impl ParentLoader {
    pub fn new(
        planner: Arc<MergePlanner>,
        type_name: impl Into<String>,
        path: Vec<PathSegment>,
        parent: ExternalObject,
    ) -> Arc<Self> {
        let type_name = type_name.into();
        let origin = parent.origin;
        let targets = planner
            .stitching()
            .merged_types
            .get(&type_name)
            .map(|merged| merged.targets_for(origin))
            .unwrap_or_default();
        Arc::new(ParentLoader {
            planner,
            type_name,
            path,
            sources: vec![origin],
            targets,
            inner: Mutex::new(LoaderInner {
                parent: Arc::new(parent),
                pending: None,
            }),
        })
    }

    /// Joins the tick's batch (opening one if none is pending) and returns
    /// the shared merged-parent future.
    pub fn load(self: &Arc<Self>, field: &FieldNode) -> SharedRound {
        let mut inner = self.inner.lock().unwrap();
        if let Some(pending) = &inner.pending {
            let mut batch = pending.batch.lock().unwrap();
            push_field(&mut batch, field);
            return pending.shared.clone();
        }

        let mut initial = FieldBatch::default();
        push_field(&mut initial, field);
        let batch = Arc::new(Mutex::new(initial));

        let loader = Arc::clone(self);
        let dispatch_batch = Arc::clone(&batch);
        let shared: SharedRound = async move {
            // one cooperative yield lets same-tick siblings enqueue
            TickYield::default().await;
            let nodes = {
                let mut batch = dispatch_batch.lock().unwrap();
                std::mem::take(&mut batch.nodes)
            };
            let parent_snapshot = {
                let inner = loader.inner.lock().unwrap();
                (*inner.parent).clone()
            };
            let merged = loader
                .planner
                .merge_fields(
                    loader.type_name.clone(),
                    parent_snapshot,
                    nodes,
                    loader.sources.clone(),
                    loader.targets.clone(),
                    loader.path.clone(),
                )
                .await;
            let merged = Arc::new(merged);
            let mut inner = loader.inner.lock().unwrap();
            inner.parent = Arc::clone(&merged);
            inner.pending = None;
            merged
        }
        .boxed()
        .shared();

        inner.pending = Some(Pending {
            batch,
            shared: shared.clone(),
        });
        shared
    }
}

fn push_field(batch: &mut FieldBatch, field: &FieldNode) {
    let key = response_key(field).to_string();
    if batch.keys.insert(key.clone()) {
        batch.nodes.push(field.clone());
        return;
    }
    // response keys dedupe; selections under the same key union
    if let Some(existing) = batch
        .nodes
        .iter_mut()
        .find(|node| response_key(node) == key)
    {
        merge_selection_sets(&mut existing.selection_set, &field.selection_set);
    }
}

/// Pending once, ready on the next poll: defers dispatch to the end of the
/// current cooperative tick.
#[derive(Default)]
struct TickYield {
    yielded: bool,
}

impl Future for TickYield {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        if this.yielded {
            Poll::Ready(())
        } else {
            this.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}
