//! Node execution primitives.
//!
//! A [`Node`] is one named pipeline step: it receives a read-only
//! [`StateSnapshot`] and a [`NodeContext`], and returns a [`NodePartial`]
//! describing the fields it wants merged back into the running state.
//!
//! Error handling follows one rule: a node that cannot meaningfully
//! continue the pipeline (missing dependency, unresolved record) returns
//! `Err(NodeError)` and aborts the walk; a node whose optional enrichment
//! failed degrades to a safe default update and returns `Ok`.

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;

use crate::event::StreamEvent;
use crate::message::Message;
use crate::state::StateSnapshot;

/// One executable pipeline step.
#[async_trait]
pub trait Node: Send + Sync {
    /// Execute against the given snapshot, returning a partial state update.
    async fn run(&self, snapshot: StateSnapshot, ctx: NodeContext)
    -> Result<NodePartial, NodeError>;
}

/// Execution context handed to a node for one step.
#[derive(Clone, Debug)]
pub struct NodeContext {
    /// Name of the executing node.
    pub node_id: String,
    /// 1-based step counter within the walk.
    pub step: u64,
    /// Session thread id for this invocation, when the caller supplied one.
    pub thread_id: Option<String>,
    events: flume::Sender<StreamEvent>,
}

impl NodeContext {
    /// Build a context bound to the given event channel.
    #[must_use]
    pub fn new(
        node_id: impl Into<String>,
        step: u64,
        thread_id: Option<String>,
        events: flume::Sender<StreamEvent>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            step,
            thread_id,
            events,
        }
    }

    /// Push one text increment to the run's event stream.
    ///
    /// An abandoned consumer must not fail the walk: if the receiving side
    /// is gone the event is dropped and the node keeps executing.
    pub fn emit_token(&self, text: impl Into<String>) {
        let event = StreamEvent::Token {
            node: self.node_id.clone(),
            text: text.into(),
        };
        if self.events.send(event).is_err() {
            tracing::debug!(node = %self.node_id, "token dropped: event consumer gone");
        }
    }
}

/// Partial state update returned by a node.
///
/// All fields are optional; `None` means "no change to that channel".
#[derive(Clone, Debug, Default)]
pub struct NodePartial {
    /// Messages to append to the conversation history.
    pub messages: Option<Vec<Message>>,
    /// Extras entries to merge (overwriting existing keys).
    pub extra: Option<FxHashMap<String, Value>>,
}

impl NodePartial {
    /// Empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Update appending the given messages.
    #[must_use]
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }

    /// Update merging the given extras.
    #[must_use]
    pub fn with_extra(mut self, extra: FxHashMap<String, Value>) -> Self {
        self.extra = Some(extra);
        self
    }
}

/// Fatal node failures. These abort the walk and surface to the caller.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeError {
    /// A required input or collaborator is absent from the state.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(tutorloom::node::missing_input),
        help("Check that the caller or a previous node produced the required field.")
    )]
    MissingInput {
        /// Name of the missing field or dependency.
        what: &'static str,
    },

    /// A referenced record could not be resolved.
    #[error("{what} not found: {id}")]
    #[diagnostic(
        code(tutorloom::node::not_found),
        help("The referenced record does not exist in the backing store.")
    )]
    NotFound {
        /// Kind of record (e.g. "lesson").
        what: &'static str,
        /// The unresolved identifier.
        id: String,
    },

    /// An external collaborator failed in a way the node cannot absorb.
    #[error("provider error ({provider}): {message}")]
    #[diagnostic(code(tutorloom::node::provider))]
    Provider {
        /// Collaborator name.
        provider: &'static str,
        /// Failure description.
        message: String,
    },

    /// JSON (de)serialization failed.
    #[error(transparent)]
    #[diagnostic(code(tutorloom::node::serde))]
    Serde(#[from] serde_json::Error),
}
