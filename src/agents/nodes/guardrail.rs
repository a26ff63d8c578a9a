//! Guardrail: classify attempts to bypass the guided interaction.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::agents::nodes::{CODE_CONTENT, GUARDRAIL_TRIGGERED};
use crate::llm::{LanguageModel, ResponseFormat};
use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::prompts;
use crate::state::StateSnapshot;
use crate::utils::collections::new_extra_map;

/// Artifact excerpts longer than this are truncated before classification.
const ARTIFACT_CLASSIFY_LIMIT: usize = 2000;

#[derive(Debug, Deserialize)]
struct GuardrailVerdict {
    #[serde(default)]
    triggered: bool,
}

/// One structured classification call deciding whether the user is trying
/// to bypass the intended interaction.
///
/// Content preference is uniform for every agent: when a submitted code
/// artifact is present it is classified, otherwise the latest
/// conversational turn. Any call or parse failure fails open to
/// `triggered=false`; this node never aborts the walk.
pub struct GuardrailNode {
    llm: Arc<dyn LanguageModel>,
}

impl GuardrailNode {
    /// Node backed by the given model.
    #[must_use]
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    fn content_to_check(snapshot: &StateSnapshot) -> Option<String> {
        if let Some(code) = snapshot.extra_str(CODE_CONTENT)
            && !code.is_empty()
        {
            let excerpt: String = code.chars().take(ARTIFACT_CLASSIFY_LIMIT).collect();
            return Some(format!("Code submission: {excerpt}"));
        }
        snapshot.last_message().map(|m| m.content.clone())
    }

    async fn classify(&self, content: &str) -> Result<bool, NodeError> {
        let response = self
            .llm
            .generate(
                &prompts::guardrail_user(content),
                Some(prompts::GUARDRAIL_SYSTEM),
                ResponseFormat::Json,
            )
            .await
            .map_err(|e| NodeError::Provider {
                provider: "language model",
                message: e.to_string(),
            })?;
        let verdict: GuardrailVerdict = serde_json::from_str(&response)?;
        Ok(verdict.triggered)
    }
}

#[async_trait]
impl Node for GuardrailNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let mut extra = new_extra_map();

        let Some(content) = Self::content_to_check(&snapshot) else {
            extra.insert(GUARDRAIL_TRIGGERED.to_string(), json!(false));
            return Ok(NodePartial::new().with_extra(extra));
        };

        // Fail open: a broken classifier must not block the student.
        let triggered = match self.classify(&content).await {
            Ok(triggered) => triggered,
            Err(err) => {
                tracing::warn!(error = %err, "guardrail classification failed; failing open");
                false
            }
        };

        extra.insert(GUARDRAIL_TRIGGERED.to_string(), json!(triggered));
        Ok(NodePartial::new().with_extra(extra))
    }
}
