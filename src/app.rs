//! Compiled graph execution.
//!
//! [`App`] is the immutable product of
//! [`GraphBuilder::compile`](crate::graph::GraphBuilder::compile). It owns
//! the node registry, the
//! edge map, the reducer registry, an optional checkpointer, and the
//! interrupt-before set, and executes one sequential walk per invocation:
//!
//! 1. optionally seed state from the thread's latest checkpoint,
//! 2. run each frontier node in turn, merging its partial update at a
//!    barrier and bumping channel versions when content changed,
//! 3. persist a checkpoint after every node,
//! 4. stop at `End`, on an empty frontier, or immediately before an
//!    interrupt node (which is never invoked).
//!
//! [`invoke`](App::invoke) returns only the final state;
//! [`stream_events`](App::stream_events) runs the same walk on a spawned
//! task and exposes the ordered event sequence.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tracing::instrument;

use crate::channels::Channel;
use crate::checkpoint::{Checkpoint, Checkpointer, CheckpointerError};
use crate::event::StreamEvent;
use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::reducers::ReducerRegistry;
use crate::state::ExecutionState;
use crate::types::NodeKind;

/// An immutable, executable workflow graph.
#[derive(Clone)]
pub struct App {
    nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
    edges: FxHashMap<NodeKind, Vec<NodeKind>>,
    reducers: ReducerRegistry,
    checkpointer: Option<Arc<dyn Checkpointer>>,
    interrupt_before: Vec<NodeKind>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .field("checkpointer", &self.checkpointer)
            .field("interrupt_before", &self.interrupt_before)
            .finish()
    }
}

/// Failures surfaced by [`App::invoke`] and [`App::stream_events`].
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// A node returned a fatal error; the walk aborted at that step.
    #[error("node '{node}' failed: {source}")]
    #[diagnostic(code(tutorloom::runner::node))]
    Node {
        /// Name of the failing node.
        node: String,
        /// The underlying node error.
        #[source]
        source: NodeError,
    },

    /// The checkpoint store failed.
    #[error(transparent)]
    #[diagnostic(code(tutorloom::runner::checkpointer))]
    Checkpointer(#[from] CheckpointerError),

    /// State reduction failed at a barrier.
    #[error("barrier merge failed: {0}")]
    #[diagnostic(code(tutorloom::runner::barrier))]
    Barrier(#[from] crate::reducers::ReducerError),

    /// The spawned streaming task could not be joined.
    #[error("workflow task join error: {0}")]
    #[diagnostic(code(tutorloom::runner::join))]
    Join(#[from] JoinError),
}

/// Handle on a streaming walk.
///
/// Dropping the handle does not stop the walk; use
/// [`abort`](InvocationHandle::abort) for hard cancellation.
pub struct InvocationHandle {
    join_handle: JoinHandle<Result<ExecutionState, RunnerError>>,
}

impl InvocationHandle {
    /// Abort the underlying task immediately.
    pub fn abort(&self) {
        self.join_handle.abort();
    }

    /// Whether the walk has finished or was aborted.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join_handle.is_finished()
    }

    /// Await the final state of the walk.
    pub async fn join(self) -> Result<ExecutionState, RunnerError> {
        match self.join_handle.await {
            Ok(result) => result,
            Err(err) => Err(RunnerError::Join(err)),
        }
    }
}

impl App {
    /// Crate-internal factory used by graph compilation.
    pub(crate) fn from_parts(
        nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
        edges: FxHashMap<NodeKind, Vec<NodeKind>>,
        checkpointer: Option<Arc<dyn Checkpointer>>,
        interrupt_before: Vec<NodeKind>,
    ) -> Self {
        Self {
            nodes,
            edges,
            reducers: ReducerRegistry::default(),
            checkpointer,
            interrupt_before,
        }
    }

    /// The registered nodes, keyed by name.
    #[must_use]
    pub fn nodes(&self) -> &FxHashMap<NodeKind, Arc<dyn Node>> {
        &self.nodes
    }

    /// The static edge map.
    #[must_use]
    pub fn edges(&self) -> &FxHashMap<NodeKind, Vec<NodeKind>> {
        &self.edges
    }

    /// Run the walk to completion (or to an interrupt point) and return
    /// the final state. Events emitted by nodes are discarded.
    #[instrument(skip(self, input), err)]
    pub async fn invoke(
        &self,
        input: ExecutionState,
        thread_id: Option<&str>,
    ) -> Result<ExecutionState, RunnerError> {
        // The receiver is held for the duration so node emits never observe
        // a disconnected channel.
        let (tx, _rx) = flume::unbounded();
        self.run_walk(input, thread_id.map(str::to_string), tx)
            .await
    }

    /// Run the walk on a spawned task, exposing its event sequence.
    ///
    /// The receiver yields `NodeStarted`/`NodeFinished` brackets, any
    /// `Token` events the nodes pushed, and a terminal `Error` if the walk
    /// fails. Abandoning the receiver does not cancel the walk; it runs to
    /// completion and still commits its checkpoints.
    pub fn stream_events(
        &self,
        input: ExecutionState,
        thread_id: Option<&str>,
    ) -> (InvocationHandle, flume::Receiver<StreamEvent>) {
        let (tx, rx) = flume::unbounded();
        let app = self.clone();
        let thread = thread_id.map(str::to_string);
        let join_handle = tokio::spawn(async move {
            let result = app.run_walk(input, thread, tx.clone()).await;
            if let Err(err) = &result {
                let _ = tx.send(StreamEvent::Error {
                    message: err.to_string(),
                });
            }
            result
        });
        (InvocationHandle { join_handle }, rx)
    }

    /// One sequential walk from `Start` to a terminal frontier.
    async fn run_walk(
        &self,
        input: ExecutionState,
        thread_id: Option<String>,
        events: flume::Sender<StreamEvent>,
    ) -> Result<ExecutionState, RunnerError> {
        let (mut state, mut step) = self.seed_state(input, thread_id.as_deref()).await?;

        let mut frontier = self
            .edges
            .get(&NodeKind::Start)
            .cloned()
            .unwrap_or_default();

        while !frontier.is_empty() && !frontier.iter().all(NodeKind::is_end) {
            let mut next_frontier: Vec<NodeKind> = Vec::new();

            for kind in frontier {
                if kind.is_end() {
                    continue;
                }
                if self.interrupt_before.contains(&kind) {
                    tracing::debug!(node = %kind, "halting before interrupt node");
                    return Ok(state);
                }

                step += 1;
                let node_name = kind.to_string();
                let _ = events.send(StreamEvent::NodeStarted {
                    node: node_name.clone(),
                    step,
                });

                let node = self
                    .nodes
                    .get(&kind)
                    .cloned()
                    .expect("compile validated every frontier node");
                let ctx = NodeContext::new(node_name.clone(), step, thread_id.clone(), events.clone());
                let snapshot = state.snapshot();

                let partial =
                    node.run(snapshot, ctx)
                        .await
                        .map_err(|source| RunnerError::Node {
                            node: node_name.clone(),
                            source,
                        })?;

                self.apply_barrier(&mut state, partial)?;

                let _ = events.send(StreamEvent::NodeFinished {
                    node: node_name.clone(),
                    step,
                });

                if let (Some(cp), Some(tid)) = (&self.checkpointer, thread_id.as_deref()) {
                    cp.save(Checkpoint::new(tid, step, state.clone())).await?;
                }

                for target in self.edges.get(&kind).cloned().unwrap_or_default() {
                    if !next_frontier.contains(&target) {
                        next_frontier.push(target);
                    }
                }
            }

            frontier = next_frontier;
        }

        Ok(state)
    }

    /// Resolve the starting state: a fresh input, or the thread's latest
    /// checkpoint with the input merged in through the reducers.
    async fn seed_state(
        &self,
        input: ExecutionState,
        thread_id: Option<&str>,
    ) -> Result<(ExecutionState, u64), RunnerError> {
        if let (Some(cp), Some(tid)) = (&self.checkpointer, thread_id)
            && let Some(checkpoint) = cp.load_latest(tid).await?
        {
            tracing::debug!(
                thread = %tid,
                checkpoint_step = checkpoint.step,
                "resuming state from checkpoint"
            );
            let mut state = checkpoint.state;
            let carry = NodePartial {
                messages: Some(input.messages.snapshot()),
                extra: Some(input.extra.snapshot()),
            };
            self.apply_barrier(&mut state, carry)?;
            return Ok((state, checkpoint.step));
        }
        Ok((input, 0))
    }

    /// Merge one node's partial update into state and bump versions for
    /// channels whose content changed.
    fn apply_barrier(
        &self,
        state: &mut ExecutionState,
        partial: NodePartial,
    ) -> Result<(), RunnerError> {
        let messages_before_len = state.messages.len();
        let messages_before_ver = state.messages.version();
        let extra_before = state.extra.snapshot();
        let extra_before_ver = state.extra.version();

        self.reducers.apply_all(state, &partial)?;

        if state.messages.len() != messages_before_len {
            state
                .messages
                .set_version(messages_before_ver.saturating_add(1));
            tracing::debug!(
                channel = "messages",
                before = messages_before_len,
                after = state.messages.len(),
                version = state.messages.version(),
                "channel updated"
            );
        }
        if state.extra.snapshot() != extra_before {
            state.extra.set_version(extra_before_ver.saturating_add(1));
            tracing::debug!(
                channel = "extra",
                version = state.extra.version(),
                "channel updated"
            );
        }
        Ok(())
    }
}
