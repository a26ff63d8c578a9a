//! Minimal nodes for engine-level tests.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use tutorloom::message::Message;
use tutorloom::node::{Node, NodeContext, NodeError, NodePartial};
use tutorloom::state::StateSnapshot;

/// Appends a fixed assistant message.
#[derive(Debug, Clone)]
pub struct SimpleMessageNode {
    pub msg: &'static str,
}

impl SimpleMessageNode {
    pub fn new(msg: &'static str) -> Self {
        Self { msg }
    }
}

#[async_trait]
impl Node for SimpleMessageNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        Ok(NodePartial::new().with_messages(vec![Message::assistant(self.msg)]))
    }
}

/// Emits each configured token, then appends their concatenation.
#[derive(Debug, Clone)]
pub struct TokenNode {
    pub tokens: Vec<&'static str>,
}

#[async_trait]
impl Node for TokenNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let mut full = String::new();
        for token in &self.tokens {
            ctx.emit_token(*token);
            full.push_str(token);
        }
        Ok(NodePartial::new().with_messages(vec![Message::assistant(&full)]))
    }
}

/// Fails with a fatal error.
#[derive(Debug, Clone)]
pub struct FailingNode;

#[async_trait]
impl Node for FailingNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        Err(NodeError::Provider {
            provider: "test",
            message: "scripted failure".to_string(),
        })
    }
}

/// Records that it ran; used to prove interrupt-before skips a node.
#[derive(Debug, Clone, Default)]
pub struct RecordingNode {
    pub runs: Arc<Mutex<Vec<String>>>,
}

impl RecordingNode {
    pub fn new(runs: Arc<Mutex<Vec<String>>>) -> Self {
        Self { runs }
    }
}

#[async_trait]
impl Node for RecordingNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        self.runs.lock().unwrap().push(ctx.node_id.clone());
        Ok(NodePartial::default())
    }
}

/// No-op node.
#[derive(Debug, Clone)]
pub struct NoopNode;

#[async_trait]
impl Node for NoopNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        Ok(NodePartial::default())
    }
}
