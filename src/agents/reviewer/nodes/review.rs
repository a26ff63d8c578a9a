//! Review generation: the streamed feedback response.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use crate::agents::nodes::{
    CODE_CONTENT, FINDINGS, GUARDRAIL_TRIGGERED, LANGUAGE, LESSON_NAME, REVIEW_ID,
    stream_generation,
};
use crate::llm::LanguageModel;
use crate::message::Message;
use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::prompts;
use crate::state::StateSnapshot;
use crate::store::ReviewStore;

/// Generates the review feedback, streaming tokens as they arrive.
///
/// The prompt is built from the analysis findings and the submission;
/// when the guardrail triggered, the fixed refusal-and-redirect
/// instruction is substituted instead. On success the full text and a
/// completed status are written back to the originating review record; a
/// failed generation leaves the record pending and answers with the
/// static apology.
pub struct ReviewNode {
    llm: Arc<dyn LanguageModel>,
    reviews: Arc<dyn ReviewStore>,
}

impl ReviewNode {
    /// Node backed by the given model and review store.
    #[must_use]
    pub fn new(llm: Arc<dyn LanguageModel>, reviews: Arc<dyn ReviewStore>) -> Self {
        Self { llm, reviews }
    }
}

#[async_trait]
impl Node for ReviewNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let lesson_name = snapshot.extra_str(LESSON_NAME).unwrap_or_default();
        let language = snapshot.extra_str(LANGUAGE).unwrap_or("plaintext");
        let code = snapshot.extra_str(CODE_CONTENT).unwrap_or_default();
        let triggered = snapshot.extra_bool(GUARDRAIL_TRIGGERED).unwrap_or(false);

        let system_instruction = prompts::reviewer_system(lesson_name);
        let prompt = if triggered {
            let user_message = snapshot
                .last_message()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            prompts::refusal_instruction(&user_message)
        } else {
            let findings = snapshot.extra.get(FINDINGS).cloned().unwrap_or(json!([]));
            let findings_json =
                serde_json::to_string_pretty(&findings).unwrap_or_else(|_| "[]".to_string());
            prompts::review_instruction(&findings_json, language, code)
        };

        let outcome = stream_generation(&self.llm, &prompt, &system_instruction, &ctx).await;

        if !outcome.failed
            && let Some(review_id) = snapshot.extra_str(REVIEW_ID)
        {
            // A store failure must not swallow the feedback the user
            // already received as tokens.
            if let Err(err) = self.reviews.complete_review(review_id, &outcome.text).await {
                tracing::error!(review = %review_id, error = %err, "failed to complete review record");
            }
        }

        Ok(NodePartial::new().with_messages(vec![Message::assistant(&outcome.text)]))
    }
}
