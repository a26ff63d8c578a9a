//! Agent manager lifecycle behavior.

mod common;
use common::*;

use std::sync::Arc;

use tutorloom::agents::registry::{ORCHESTRATOR_ID, TEACHER_ID};
use tutorloom::agents::{AgentError, AgentManager};
use tutorloom::checkpoint::CheckpointerConfig;

#[tokio::test]
async fn get_agent_before_initialize_fails() {
    let llm = Arc::new(ScriptedModel::new());
    let store = seeded_store();
    let manager = AgentManager::new(llm, store.clone(), store, CheckpointerConfig::InMemory);

    let err = manager.get_agent(TEACHER_ID).unwrap_err();
    assert!(matches!(err, AgentError::NotInitialized { .. }));
}

#[tokio::test]
async fn unknown_agent_id_fails_after_initialize() {
    let llm = Arc::new(ScriptedModel::new());
    let (manager, _store) = initialized_manager(llm).await;

    let err = manager.get_agent("stranger").unwrap_err();
    assert!(matches!(err, AgentError::UnknownAgent { .. }));
}

#[tokio::test]
async fn metadata_lists_all_builtin_agents() {
    let llm = Arc::new(ScriptedModel::new());
    let (manager, _store) = initialized_manager(llm).await;

    let mut ids: Vec<String> = manager
        .agents_metadata()
        .into_iter()
        .map(|d| d.agent_id)
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["orchestrator", "reviewer", "teacher"]);
}

#[tokio::test]
async fn initialize_all_is_idempotent() {
    let llm = Arc::new(ScriptedModel::new());
    let (manager, _store) = initialized_manager(llm).await;

    let second = manager.initialize_all().await;
    assert!(second.succeeded.is_empty());
    assert!(second.failed.is_empty());
    assert!(manager.get_agent(TEACHER_ID).is_ok());
}

#[tokio::test]
async fn close_all_clears_roster_and_is_idempotent() {
    let llm = Arc::new(ScriptedModel::new());
    let (manager, _store) = initialized_manager(llm).await;

    manager.close_all().await;
    assert!(matches!(
        manager.get_agent(TEACHER_ID),
        Err(AgentError::NotInitialized { .. })
    ));
    // A second close is harmless.
    manager.close_all().await;
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn one_failing_agent_does_not_abort_the_others() {
    // Point the checkpoint directory at a regular file: agents that open a
    // checkpoint store fail to initialize, the orchestrator (which has no
    // checkpointer) still comes up.
    let blocker = tempfile::NamedTempFile::new().unwrap();
    let llm = Arc::new(ScriptedModel::new());
    let store = seeded_store();
    let manager = AgentManager::new(
        llm,
        store.clone(),
        store,
        CheckpointerConfig::Sqlite {
            dir: blocker.path().to_path_buf(),
        },
    );

    let report = manager.initialize_all().await;
    assert!(report.succeeded.contains(&ORCHESTRATOR_ID.to_string()));
    assert_eq!(report.failed.len(), 2);
    assert!(manager.get_agent(ORCHESTRATOR_ID).is_ok());
}
