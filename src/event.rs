//! Events emitted during a streaming graph run.
//!
//! A run produces one ordered, finite sequence of [`StreamEvent`]s: the
//! engine brackets each node with `NodeStarted`/`NodeFinished`, generation
//! nodes interleave `Token` events through their
//! [`NodeContext`](crate::node::NodeContext), and a fatal failure
//! terminates the sequence with a single `Error`. Events are never
//! replayed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One event in a streaming run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamEvent {
    /// The engine is about to execute the named node.
    NodeStarted {
        /// Node name.
        node: String,
        /// 1-based step counter within the walk.
        step: u64,
    },
    /// The named node finished and its update was merged.
    NodeFinished {
        /// Node name.
        node: String,
        /// 1-based step counter within the walk.
        step: u64,
    },
    /// A text increment pushed by a generation node.
    Token {
        /// Emitting node name.
        node: String,
        /// Text fragment, in emission order.
        text: String,
    },
    /// Terminal event for a failed walk.
    Error {
        /// Human-readable failure description.
        message: String,
    },
}

impl StreamEvent {
    /// Token text, if this is a `Token` event.
    #[must_use]
    pub fn token_text(&self) -> Option<&str> {
        match self {
            StreamEvent::Token { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Whether this is a `Token` event.
    #[must_use]
    pub fn is_token(&self) -> bool {
        matches!(self, StreamEvent::Token { .. })
    }
}

impl fmt::Display for StreamEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamEvent::NodeStarted { node, step } => write!(f, "[{node}@{step}] started"),
            StreamEvent::NodeFinished { node, step } => write!(f, "[{node}@{step}] finished"),
            StreamEvent::Token { node, text } => write!(f, "[{node}] {text}"),
            StreamEvent::Error { message } => write!(f, "error: {message}"),
        }
    }
}
