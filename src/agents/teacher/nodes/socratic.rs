//! Socratic generation: the teacher's streamed response.

use async_trait::async_trait;
use std::sync::Arc;

use crate::agents::nodes::{
    GUARDRAIL_TRIGGERED, LESSON_CONTEXT, LESSON_NAME, OBJECTIVES, stream_generation,
};
use crate::llm::LanguageModel;
use crate::message::Message;
use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::prompts;
use crate::state::StateSnapshot;

/// Generates the teaching response, streaming tokens as they arrive.
///
/// The persona instruction is parameterized by the loaded lesson context.
/// When the guardrail triggered, the normal teaching prompt is replaced by
/// the fixed refusal-and-redirect instruction. The completed text is
/// appended to the conversation history, which is what the checkpointer
/// persists across turns.
pub struct SocraticNode {
    llm: Arc<dyn LanguageModel>,
}

impl SocraticNode {
    /// Node backed by the given model.
    #[must_use]
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Node for SocraticNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let lesson_name = snapshot.extra_str(LESSON_NAME).unwrap_or("Unknown Lesson");
        let lesson_context = snapshot.extra_str(LESSON_CONTEXT).unwrap_or_default();
        let objectives = snapshot.extra_str_list(OBJECTIVES);
        let triggered = snapshot.extra_bool(GUARDRAIL_TRIGGERED).unwrap_or(false);
        let user_message = snapshot
            .last_message()
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let system_instruction = prompts::teacher_system(lesson_name, &objectives);
        let prompt = if triggered {
            prompts::refusal_instruction(&user_message)
        } else {
            prompts::socratic_instruction(lesson_context, &user_message)
        };

        let outcome = stream_generation(&self.llm, &prompt, &system_instruction, &ctx).await;
        Ok(NodePartial::new().with_messages(vec![Message::assistant(&outcome.text)]))
    }
}
