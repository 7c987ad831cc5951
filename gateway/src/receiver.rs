//! Receiver: multiplexes an executor's patch stream to waiting field
//! resolvers. The first requester with no pump running becomes the pump for
//! one patch; the role rotates so no task is parked holding the stream.

use crate::deep_merge;
use crate::wire::{AsyncExecutionResult, GraphQLError, PathSegment};
use futures::channel::oneshot;
use futures::lock::Mutex;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub struct Receiver {
    base_path: Vec<PathSegment>,
    inner: Mutex<ReceiverInner>,
}

struct ReceiverInner {
    stream: Option<BoxStream<'static, AsyncExecutionResult>>,
    /// Initial data enriched by every patch applied so far.
    root: Value,
    pending_errors: Vec<GraphQLError>,
    /// Parked requesters, woken after every applied patch to re-check.
    wakers: Vec<oneshot::Sender<()>>,
    num_requests: usize,
    iterating: bool,
    done: bool,
}

impl Receiver {
    /// Awaits the first stream item (the initial result) and wraps the rest.
    /// Returns no receiver when the stream is already exhausted.
    pub(crate) async fn from_stream(
        mut stream: BoxStream<'static, AsyncExecutionResult>,
        base_path: Vec<PathSegment>,
    ) -> (AsyncExecutionResult, Option<Arc<Receiver>>) {
        let initial = match stream.next().await {
            Some(item) => item,
            None => AsyncExecutionResult {
                data: None,
                path: None,
                label: None,
                errors: vec![],
                has_next: false,
            },
        };
        if !initial.has_next {
            return (initial, None);
        }
        let receiver = Receiver {
            base_path,
            inner: Mutex::new(ReceiverInner {
                stream: Some(stream),
                root: initial.data.clone().unwrap_or(Value::Null),
                pending_errors: vec![],
                wakers: vec![],
                num_requests: 0,
                iterating: false,
                done: false,
            }),
        };
        (initial, Some(Arc::new(receiver)))
    }

    /// Resolves `response_key` under `path_key` from arrived data, pumping
    /// the stream as needed. Returns `None` when the stream finished without
    /// delivering the key.
    pub async fn request(&self, path_key: &str, response_key: &str) -> Option<Value> {
        loop {
            enum Action {
                Resolved(Option<Value>),
                Pump(BoxStream<'static, AsyncExecutionResult>),
                Wait(oneshot::Receiver<()>),
            }

            let action = {
                let mut inner = self.inner.lock().await;
                if let Some(value) = lookup(&inner.root, path_key, response_key) {
                    Action::Resolved(Some(value.clone()))
                } else if inner.done {
                    Action::Resolved(None)
                } else if !inner.iterating {
                    match inner.stream.take() {
                        Some(stream) => {
                            inner.iterating = true;
                            Action::Pump(stream)
                        }
                        None => {
                            inner.done = true;
                            Action::Resolved(None)
                        }
                    }
                } else {
                    let (tx, rx) = oneshot::channel();
                    inner.wakers.push(tx);
                    inner.num_requests += 1;
                    Action::Wait(rx)
                }
            };

            match action {
                Action::Resolved(value) => return value,
                Action::Wait(rx) => {
                    let _ = rx.await;
                    let mut inner = self.inner.lock().await;
                    inner.num_requests = inner.num_requests.saturating_sub(1);
                }
                Action::Pump(mut stream) => {
                    let item = stream.next().await;
                    let mut inner = self.inner.lock().await;
                    inner.iterating = false;
                    match item {
                        None => {
                            inner.done = true;
                        }
                        Some(patch) => {
                            let has_next = patch.has_next;
                            apply_patch(&mut inner, patch);
                            if has_next {
                                inner.stream = Some(stream);
                            } else {
                                // dropping the stream cancels the source
                                inner.done = true;
                            }
                        }
                    }
                    for waker in inner.wakers.drain(..) {
                        let _ = waker.send(());
                    }
                }
            }
        }
    }

    /// Errors reported by patches since the last drain, relocated under the
    /// receiver's delegation path.
    pub async fn drain_errors(&self) -> Vec<GraphQLError> {
        let mut inner = self.inner.lock().await;
        let mut errors: Vec<GraphQLError> = inner.pending_errors.drain(..).collect();
        for error in errors.iter_mut() {
            if error.path.is_some() {
                // the patch path's leading root-field key is already part of
                // the delegation path
                let sub_path: Vec<PathSegment> =
                    error.path.take().into_iter().flatten().skip(1).collect();
                let mut path = self.base_path.clone();
                path.extend(sub_path);
                error.path = Some(path);
            }
        }
        errors
    }
}

fn apply_patch(inner: &mut ReceiverInner, patch: AsyncExecutionResult) {
    let path = patch.path.clone().unwrap_or_default();
    debug!(path = %display_path(&path), "applying deferred patch");
    inner.pending_errors.extend(patch.errors);
    let data = match patch.data {
        Some(data) => data,
        None => return,
    };
    let mut target = &mut inner.root;
    for segment in &path {
        match segment {
            PathSegment::Field(name) => {
                if !target.is_object() {
                    return;
                }
                let map = match target.as_object_mut() {
                    Some(map) => map,
                    None => return,
                };
                target = map
                    .entry(name.clone())
                    .or_insert_with(|| Value::Object(Default::default()));
            }
            PathSegment::Index(i) => {
                target = match target.as_array_mut().and_then(|a| a.get_mut(*i)) {
                    Some(element) => element,
                    None => return,
                };
            }
        }
    }
    deep_merge::merge(target, &data);
}

/// Reads `path_key`'s object then `response_key` out of the accumulated
/// data. Present-but-null counts as resolved.
fn lookup<'a>(root: &'a Value, path_key: &str, response_key: &str) -> Option<&'a Value> {
    let mut current = root;
    if !path_key.is_empty() {
        for segment in path_key.split('.') {
            current = match segment.parse::<usize>() {
                Ok(index) => current.as_array()?.get(index)?,
                Err(_) => current.as_object()?.get(segment)?,
            };
        }
    }
    current.as_object()?.get(response_key)
}

pub fn join_path_key(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", parent, segment)
    }
}

fn display_path(path: &[PathSegment]) -> String {
    path.iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(".")
}
