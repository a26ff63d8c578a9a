//! Store and manager fixtures.

use std::sync::Arc;

use tutorloom::agents::AgentManager;
use tutorloom::checkpoint::CheckpointerConfig;
use tutorloom::store::{LessonContext, MemoryStore};

use super::llm::ScriptedModel;

/// Lesson id seeded by [`seeded_store`].
pub const LESSON: &str = "lesson-1";

pub fn sample_lesson(lesson_id: &str) -> LessonContext {
    LessonContext {
        lesson_id: lesson_id.to_string(),
        name: "Error Handling".to_string(),
        description: "Result, the question mark operator, and error types".to_string(),
        objectives: vec![
            "propagate errors with ?".to_string(),
            "define error enums".to_string(),
        ],
        documentation: vec!["https://doc.rust-lang.org/book/ch09-00-error-handling.html".to_string()],
    }
}

/// A memory store with one lesson seeded.
pub fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.insert_lesson(sample_lesson(LESSON));
    store
}

/// A fully initialized manager over the builtin agents, backed by the
/// given scripted model and a fresh seeded store.
pub async fn initialized_manager(llm: Arc<ScriptedModel>) -> (AgentManager, Arc<MemoryStore>) {
    let store = seeded_store();
    let manager = AgentManager::new(
        llm,
        store.clone(),
        store.clone(),
        CheckpointerConfig::InMemory,
    );
    let report = manager.initialize_all().await;
    assert!(
        report.failed.is_empty(),
        "agent initialization failed: {:?}",
        report.failed
    );
    (manager, store)
}

/// Collect a fragment stream to completion.
pub async fn collect_fragments(rx: tutorloom::agents::FragmentStream) -> Vec<String> {
    let mut fragments = Vec::new();
    while let Ok(fragment) = rx.recv_async().await {
        fragments.push(fragment);
    }
    fragments
}
