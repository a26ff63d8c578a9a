//! Engine behavior: compilation validation, the sequential walk, event
//! ordering, interrupt-before, failure semantics, and checkpoint cadence.

mod common;
use common::*;

use std::sync::{Arc, Mutex};

use tutorloom::app::RunnerError;
use tutorloom::checkpoint::{Checkpointer, InMemoryCheckpointer};
use tutorloom::event::StreamEvent;
use tutorloom::graph::{GraphBuilder, GraphCompileError};
use tutorloom::state::ExecutionState;
use tutorloom::types::NodeKind;

fn custom(name: &str) -> NodeKind {
    NodeKind::Custom(name.to_string())
}

fn linear_two_nodes() -> GraphBuilder {
    GraphBuilder::new()
        .add_node(custom("a"), SimpleMessageNode::new("from a"))
        .add_node(custom("b"), SimpleMessageNode::new("from b"))
        .add_edge(NodeKind::Start, custom("a"))
        .add_edge(custom("a"), custom("b"))
        .add_edge(custom("b"), NodeKind::End)
}

#[test]
fn compile_rejects_missing_entry() {
    let err = GraphBuilder::new()
        .add_node(custom("a"), NoopNode)
        .add_edge(custom("a"), NodeKind::End)
        .compile()
        .unwrap_err();
    assert!(matches!(err, GraphCompileError::MissingEntry));
}

#[test]
fn compile_rejects_duplicate_node() {
    let err = GraphBuilder::new()
        .add_node(custom("a"), NoopNode)
        .add_node(custom("a"), NoopNode)
        .add_edge(NodeKind::Start, custom("a"))
        .add_edge(custom("a"), NodeKind::End)
        .compile()
        .unwrap_err();
    assert!(matches!(err, GraphCompileError::DuplicateNode { .. }));
}

#[test]
fn compile_rejects_edge_to_unknown_node() {
    let err = GraphBuilder::new()
        .add_node(custom("a"), NoopNode)
        .add_edge(NodeKind::Start, custom("a"))
        .add_edge(custom("a"), custom("ghost"))
        .compile()
        .unwrap_err();
    assert!(matches!(err, GraphCompileError::UnknownNode { .. }));
}

#[test]
fn compile_rejects_unreachable_node() {
    let err = GraphBuilder::new()
        .add_node(custom("a"), NoopNode)
        .add_node(custom("island"), NoopNode)
        .add_edge(NodeKind::Start, custom("a"))
        .add_edge(custom("a"), NodeKind::End)
        .compile()
        .unwrap_err();
    assert!(matches!(err, GraphCompileError::UnreachableNode { .. }));
}

#[test]
fn compile_rejects_graph_without_terminal_path() {
    let err = GraphBuilder::new()
        .add_node(custom("a"), NoopNode)
        .add_edge(NodeKind::Start, custom("a"))
        .compile()
        .unwrap_err();
    assert!(matches!(err, GraphCompileError::NoTerminalPath));
}

#[test]
fn compile_rejects_cycle() {
    let err = GraphBuilder::new()
        .add_node(custom("a"), NoopNode)
        .add_node(custom("b"), NoopNode)
        .add_edge(NodeKind::Start, custom("a"))
        .add_edge(custom("a"), custom("b"))
        .add_edge(custom("b"), custom("a"))
        .add_edge(custom("b"), NodeKind::End)
        .compile()
        .unwrap_err();
    assert!(matches!(err, GraphCompileError::CycleDetected { .. }));
}

#[test]
fn compile_rejects_unknown_interrupt_target() {
    let err = linear_two_nodes()
        .with_interrupt_before(custom("ghost"))
        .compile()
        .unwrap_err();
    assert!(matches!(err, GraphCompileError::UnknownInterrupt { .. }));
}

#[tokio::test]
async fn invoke_walks_linear_chain_appending_messages() {
    let app = linear_two_nodes().compile().unwrap();
    let result = app
        .invoke(ExecutionState::new_with_user_message("hi"), None)
        .await
        .unwrap();
    let snapshot = result.snapshot();
    let contents: Vec<&str> = snapshot.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["hi", "from a", "from b"]);
    // One version bump per node that changed the channel.
    assert_eq!(snapshot.messages_version, 3);
}

#[tokio::test]
async fn stream_events_brackets_nodes_and_orders_tokens() {
    let app = GraphBuilder::new()
        .add_node(
            custom("gen"),
            TokenNode {
                tokens: vec!["A", "B", "C"],
            },
        )
        .add_edge(NodeKind::Start, custom("gen"))
        .add_edge(custom("gen"), NodeKind::End)
        .compile()
        .unwrap();

    let (handle, events) = app.stream_events(ExecutionState::new_with_user_message("go"), None);

    let mut collected = Vec::new();
    while let Ok(event) = events.recv_async().await {
        collected.push(event);
    }
    let final_state = handle.join().await.unwrap();

    assert_eq!(
        collected,
        vec![
            StreamEvent::NodeStarted {
                node: "gen".into(),
                step: 1
            },
            StreamEvent::Token {
                node: "gen".into(),
                text: "A".into()
            },
            StreamEvent::Token {
                node: "gen".into(),
                text: "B".into()
            },
            StreamEvent::Token {
                node: "gen".into(),
                text: "C".into()
            },
            StreamEvent::NodeFinished {
                node: "gen".into(),
                step: 1
            },
        ]
    );

    // Concatenated tokens equal the node's single-shot text.
    let tokens: String = collected.iter().filter_map(|e| e.token_text()).collect();
    assert_eq!(
        final_state.snapshot().last_assistant_message().unwrap().content,
        tokens
    );
}

#[tokio::test]
async fn interrupt_before_halts_without_invoking_node() {
    let runs = Arc::new(Mutex::new(Vec::new()));
    let app = GraphBuilder::new()
        .add_node(custom("route"), RecordingNode::new(runs.clone()))
        .add_node(custom("delegate"), RecordingNode::new(runs.clone()))
        .add_edge(NodeKind::Start, custom("route"))
        .add_edge(custom("route"), custom("delegate"))
        .add_edge(custom("delegate"), NodeKind::End)
        .with_interrupt_before(custom("delegate"))
        .compile()
        .unwrap();

    let result = app
        .invoke(ExecutionState::new_with_user_message("hi"), None)
        .await
        .unwrap();

    assert_eq!(*runs.lock().unwrap(), vec!["route".to_string()]);
    // The halted state reflects only the nodes that executed.
    assert_eq!(result.snapshot().messages.len(), 1);
}

#[tokio::test]
async fn node_failure_aborts_walk_and_emits_error_event() {
    let app = GraphBuilder::new()
        .add_node(custom("boom"), FailingNode)
        .add_node(custom("after"), SimpleMessageNode::new("unreachable"))
        .add_edge(NodeKind::Start, custom("boom"))
        .add_edge(custom("boom"), custom("after"))
        .add_edge(custom("after"), NodeKind::End)
        .compile()
        .unwrap();

    let (handle, events) = app.stream_events(ExecutionState::new_with_user_message("x"), None);
    let mut collected = Vec::new();
    while let Ok(event) = events.recv_async().await {
        collected.push(event);
    }
    let err = handle.join().await.unwrap_err();
    assert!(matches!(err, RunnerError::Node { .. }));

    assert!(matches!(
        collected.last(),
        Some(StreamEvent::Error { .. })
    ));
    // The failing node started but never finished.
    assert!(collected
        .iter()
        .any(|e| matches!(e, StreamEvent::NodeStarted { node, .. } if node == "boom")));
    assert!(!collected
        .iter()
        .any(|e| matches!(e, StreamEvent::NodeFinished { node, .. } if node == "boom")));
}

#[tokio::test]
async fn checkpoint_saved_after_every_node() {
    let store = Arc::new(InMemoryCheckpointer::new());
    let app = linear_two_nodes()
        .with_checkpointer(store.clone())
        .compile()
        .unwrap();

    app.invoke(ExecutionState::new_with_user_message("hi"), Some("t1"))
        .await
        .unwrap();

    let latest = store.load_latest("t1").await.unwrap().unwrap();
    assert_eq!(latest.step, 2);
    assert_eq!(latest.state.snapshot().messages.len(), 3);
}

#[tokio::test]
async fn second_turn_resumes_from_checkpoint() {
    let store = Arc::new(InMemoryCheckpointer::new());
    let app = GraphBuilder::new()
        .add_node(custom("echo"), SimpleMessageNode::new("reply"))
        .add_edge(NodeKind::Start, custom("echo"))
        .add_edge(custom("echo"), NodeKind::End)
        .with_checkpointer(store.clone())
        .compile()
        .unwrap();

    app.invoke(ExecutionState::new_with_user_message("turn one"), Some("t"))
        .await
        .unwrap();
    let second = app
        .invoke(ExecutionState::new_with_user_message("turn two"), Some("t"))
        .await
        .unwrap();

    let contents: Vec<String> = second
        .snapshot()
        .messages
        .iter()
        .map(|m| m.content.clone())
        .collect();
    assert_eq!(contents, vec!["turn one", "reply", "turn two", "reply"]);

    // Independent threads never share state.
    let other = app
        .invoke(ExecutionState::new_with_user_message("fresh"), Some("t2"))
        .await
        .unwrap();
    assert_eq!(other.snapshot().messages.len(), 2);
}

#[tokio::test]
async fn earlier_checkpoints_survive_a_failing_step() {
    let store = Arc::new(InMemoryCheckpointer::new());
    let app = GraphBuilder::new()
        .add_node(custom("ok"), SimpleMessageNode::new("saved"))
        .add_node(custom("boom"), FailingNode)
        .add_edge(NodeKind::Start, custom("ok"))
        .add_edge(custom("ok"), custom("boom"))
        .add_edge(custom("boom"), NodeKind::End)
        .with_checkpointer(store.clone())
        .compile()
        .unwrap();

    let err = app
        .invoke(ExecutionState::new_with_user_message("x"), Some("t"))
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::Node { .. }));

    let latest = store.load_latest("t").await.unwrap().unwrap();
    assert_eq!(latest.step, 1);
    assert_eq!(
        latest.state.snapshot().last_assistant_message().unwrap().content,
        "saved"
    );
}
