//! Pipeline nodes shared by the specialized agents.
//!
//! Both the teacher and the reviewer open with the same two steps:
//! context enrichment (load the lesson the conversation is anchored to)
//! and the guardrail (classify bypass attempts). The state keys those
//! steps read and write are shared as well.

pub mod enrichment;
pub mod guardrail;

pub use enrichment::ContextEnrichmentNode;
pub use guardrail::GuardrailNode;

use std::sync::Arc;

use crate::llm::LanguageModel;
use crate::node::NodeContext;
use crate::prompts::GENERATION_APOLOGY;

/// Lesson id anchoring the pipeline; required before enrichment.
pub const LESSON_ID: &str = "lesson_id";
/// Lesson display name, written by enrichment.
pub const LESSON_NAME: &str = "lesson_name";
/// Lesson description, written by enrichment.
pub const LESSON_CONTEXT: &str = "lesson_context";
/// Lesson objectives (string array), written by enrichment.
pub const OBJECTIVES: &str = "objectives";
/// Reference documentation links (string array), written by enrichment.
pub const SUGGESTED_DOCS: &str = "suggested_docs";
/// Guardrail verdict (bool), written by the guardrail node.
pub const GUARDRAIL_TRIGGERED: &str = "guardrail_triggered";
/// Submitted code artifact, set by review submissions.
pub const CODE_CONTENT: &str = "code_content";
/// Submission language, set alongside the artifact.
pub const LANGUAGE: &str = "language";
/// Review record id, set by review submissions.
pub const REVIEW_ID: &str = "review_id";
/// Analysis findings (JSON array), written by the reviewer's analysis node.
pub const FINDINGS: &str = "findings";

/// Result of one streamed generation call.
pub(crate) struct GenerationOutcome {
    /// The accumulated response text (or the static apology).
    pub text: String,
    /// Whether the stream failed before producing anything.
    pub failed: bool,
}

/// Run one streaming generation call, forwarding every increment as a
/// token event and accumulating the full text.
///
/// A call that fails before producing any increment degrades to the
/// static apology with no token events. A stream that breaks after
/// producing increments keeps the accumulated text (consumers already saw
/// those tokens); the failure is logged.
pub(crate) async fn stream_generation(
    llm: &Arc<dyn LanguageModel>,
    prompt: &str,
    system_instruction: &str,
    ctx: &NodeContext,
) -> GenerationOutcome {
    let stream = match llm.generate_stream(prompt, Some(system_instruction)).await {
        Ok(stream) => stream,
        Err(err) => {
            tracing::error!(node = %ctx.node_id, error = %err, "generation stream failed to start");
            return GenerationOutcome {
                text: GENERATION_APOLOGY.to_string(),
                failed: true,
            };
        }
    };

    let mut full_text = String::new();
    while let Ok(increment) = stream.recv_async().await {
        match increment {
            Ok(chunk) => {
                ctx.emit_token(&chunk);
                full_text.push_str(&chunk);
            }
            Err(err) => {
                tracing::error!(node = %ctx.node_id, error = %err, "generation stream broke");
                if full_text.is_empty() {
                    return GenerationOutcome {
                        text: GENERATION_APOLOGY.to_string(),
                        failed: true,
                    };
                }
                break;
            }
        }
    }

    GenerationOutcome {
        text: full_text,
        failed: false,
    }
}
