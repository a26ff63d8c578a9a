//! Context enrichment: load the lesson the conversation is anchored to.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::agents::nodes::{LESSON_CONTEXT, LESSON_ID, LESSON_NAME, OBJECTIVES, SUGGESTED_DOCS};
use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::state::StateSnapshot;
use crate::store::{LessonStore, StoreError};
use crate::utils::collections::new_extra_map;

/// Fetches lesson metadata and documentation links for downstream prompts.
///
/// An unresolved lesson id is fatal: without context there is nothing to
/// teach or review against, so the walk aborts with
/// [`NodeError::NotFound`].
pub struct ContextEnrichmentNode {
    lessons: Arc<dyn LessonStore>,
}

impl ContextEnrichmentNode {
    /// Node backed by the given lesson store.
    #[must_use]
    pub fn new(lessons: Arc<dyn LessonStore>) -> Self {
        Self { lessons }
    }
}

#[async_trait]
impl Node for ContextEnrichmentNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let lesson_id = snapshot
            .extra_str(LESSON_ID)
            .ok_or(NodeError::MissingInput { what: LESSON_ID })?;

        let context = self
            .lessons
            .lesson_context(lesson_id)
            .await
            .map_err(|err| match err {
                StoreError::NotFound { id, .. } => NodeError::NotFound { what: "lesson", id },
                StoreError::Backend { message } => NodeError::Provider {
                    provider: "lesson store",
                    message,
                },
            })?;

        tracing::debug!(lesson = %context.name, "lesson context loaded");

        let mut extra = new_extra_map();
        extra.insert(LESSON_NAME.to_string(), json!(context.name));
        extra.insert(LESSON_CONTEXT.to_string(), json!(context.description));
        extra.insert(
            OBJECTIVES.to_string(),
            Value::Array(context.objectives.iter().map(|o| json!(o)).collect()),
        );
        extra.insert(
            SUGGESTED_DOCS.to_string(),
            Value::Array(context.documentation.iter().map(|d| json!(d)).collect()),
        );
        Ok(NodePartial::new().with_extra(extra))
    }
}
