//! Orchestrator routing and delegation behavior.

mod common;
use common::*;

use std::sync::Arc;

use tutorloom::agents::Agent;
use tutorloom::agents::registry::{AgentRegistry, ORCHESTRATOR_ID, REVIEWER_ID, TEACHER_ID};

#[test]
fn registered_commands_resolve_to_their_agents() {
    let registry = AgentRegistry::builtin();
    assert_eq!(registry.agent_by_command("teach"), Some(TEACHER_ID));
    assert_eq!(registry.agent_by_command("review"), Some(REVIEWER_ID));
    assert_eq!(registry.agent_by_command("nonexistent"), None);
}

#[tokio::test]
async fn message_without_command_reaches_default_agent() {
    let llm = Arc::new(ScriptedModel::new().with_stream_chunks(&["guided ", "answer"]));
    let (manager, _store) = initialized_manager(llm.clone()).await;

    let orchestrator = manager.get_agent(ORCHESTRATOR_ID).unwrap();
    let response = orchestrator
        .chat(LESSON, "how do I propagate errors?")
        .await
        .unwrap();

    // The default agent (teacher) streamed its answer back through delegation.
    assert_eq!(response, "guided answer");
    // Delegation embeds the teacher's identity.
    let stream_calls = llm.stream_calls();
    assert_eq!(stream_calls.len(), 1);
    assert!(stream_calls[0].prompt.contains("how do I propagate errors?"));
}

#[tokio::test]
async fn known_command_routes_to_mapped_agent() {
    let llm = Arc::new(ScriptedModel::new());
    let (manager, store) = initialized_manager(llm.clone()).await;

    let orchestrator = manager.get_agent(ORCHESTRATOR_ID).unwrap();
    let response = orchestrator
        .chat(LESSON, "/review fn main() {}")
        .await
        .unwrap();

    assert_eq!(response, llm.full_text());
    // Only the reviewer creates review records.
    assert_eq!(store.review_ids().len(), 1);
}

#[tokio::test]
async fn unknown_command_falls_back_with_warning() {
    let llm = Arc::new(ScriptedModel::new());
    let (manager, store) = initialized_manager(llm.clone()).await;

    let orchestrator = manager.get_agent(ORCHESTRATOR_ID).unwrap();
    let response = orchestrator.chat(LESSON, "/fly to the moon").await.unwrap();

    assert!(
        response.starts_with("Unknown command '/fly'"),
        "warning missing from response: {response}"
    );
    assert!(response.ends_with(&llm.full_text()));
    // Fallback went to the teacher, not the reviewer.
    assert!(store.review_ids().is_empty());
}

#[tokio::test]
async fn streaming_relays_fragments_from_delegated_agent() {
    let llm = Arc::new(ScriptedModel::new().with_stream_chunks(&["A", "B", "C"]));
    let (manager, _store) = initialized_manager(llm.clone()).await;

    let orchestrator = manager.get_agent(ORCHESTRATOR_ID).unwrap();
    let fragments =
        collect_fragments(orchestrator.chat_stream(LESSON, "teach me lifetimes").await).await;

    assert_eq!(fragments, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn streaming_unknown_command_leads_with_warning_fragment() {
    let llm = Arc::new(ScriptedModel::new().with_stream_chunks(&["ok"]));
    let (manager, _store) = initialized_manager(llm).await;

    let orchestrator = manager.get_agent(ORCHESTRATOR_ID).unwrap();
    let fragments = collect_fragments(orchestrator.chat_stream(LESSON, "/warp 9").await).await;

    assert!(fragments[0].starts_with("Unknown command '/warp'"));
    assert_eq!(fragments[1..], ["ok".to_string()]);
}

#[tokio::test]
async fn delegation_failure_is_in_band_not_raised() {
    // An unknown lesson makes the teacher's enrichment fail fatally; the
    // orchestrator must still answer with an in-band error string.
    let llm = Arc::new(ScriptedModel::new());
    let (manager, _store) = initialized_manager(llm).await;

    let orchestrator = manager.get_agent(ORCHESTRATOR_ID).unwrap();
    let response = orchestrator
        .chat("unseeded-lesson", "explain enums")
        .await
        .unwrap();

    assert!(
        response.starts_with("Error processing your request"),
        "unexpected response: {response}"
    );
}
