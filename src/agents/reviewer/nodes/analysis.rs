//! Code analysis: structured findings ahead of the review response.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::agents::nodes::{
    CODE_CONTENT, FINDINGS, GUARDRAIL_TRIGGERED, LANGUAGE, LESSON_NAME, OBJECTIVES, REVIEW_ID,
};
use crate::llm::{LanguageModel, LlmError, ResponseFormat};
use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::prompts;
use crate::state::StateSnapshot;
use crate::store::{ReviewFinding, ReviewStore};
use crate::utils::collections::new_extra_map;

#[derive(Debug, Deserialize)]
struct AnalysisResponse {
    #[serde(default)]
    findings: Vec<ReviewFinding>,
}

enum AnalysisFailure {
    Model(LlmError),
    Parse(serde_json::Error),
    Store(crate::store::StoreError),
}

impl std::fmt::Display for AnalysisFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisFailure::Model(e) => write!(f, "model: {e}"),
            AnalysisFailure::Parse(e) => write!(f, "parse: {e}"),
            AnalysisFailure::Store(e) => write!(f, "store: {e}"),
        }
    }
}

/// One structured call identifying 2-3 areas for improvement in the
/// submitted code, each persisted as a child record of the review.
///
/// Skipped entirely when the guardrail triggered. Any model, parse, or
/// persistence failure degrades to an empty findings list; the review
/// response is still produced downstream.
pub struct CodeAnalysisNode {
    llm: Arc<dyn LanguageModel>,
    reviews: Arc<dyn ReviewStore>,
}

impl CodeAnalysisNode {
    /// Node backed by the given model and review store.
    #[must_use]
    pub fn new(llm: Arc<dyn LanguageModel>, reviews: Arc<dyn ReviewStore>) -> Self {
        Self { llm, reviews }
    }

    async fn analyze(
        &self,
        snapshot: &StateSnapshot,
        code: &str,
        review_id: &str,
    ) -> Result<Vec<ReviewFinding>, AnalysisFailure> {
        let prompt = prompts::analysis_prompt(
            snapshot.extra_str(LESSON_NAME).unwrap_or_default(),
            &snapshot.extra_str_list(OBJECTIVES),
            snapshot.extra_str(LANGUAGE).unwrap_or("plaintext"),
            code,
        );

        let response = self
            .llm
            .generate(&prompt, None, ResponseFormat::Json)
            .await
            .map_err(AnalysisFailure::Model)?;
        let parsed: AnalysisResponse =
            serde_json::from_str(&response).map_err(AnalysisFailure::Parse)?;

        for finding in &parsed.findings {
            self.reviews
                .add_finding(review_id, finding)
                .await
                .map_err(AnalysisFailure::Store)?;
        }
        Ok(parsed.findings)
    }
}

#[async_trait]
impl Node for CodeAnalysisNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let mut extra = new_extra_map();

        if snapshot.extra_bool(GUARDRAIL_TRIGGERED).unwrap_or(false) {
            tracing::info!("guardrail triggered; skipping code analysis");
            extra.insert(FINDINGS.to_string(), json!([]));
            return Ok(NodePartial::new().with_extra(extra));
        }

        let code = snapshot
            .extra_str(CODE_CONTENT)
            .ok_or(NodeError::MissingInput { what: CODE_CONTENT })?;
        let review_id = snapshot
            .extra_str(REVIEW_ID)
            .ok_or(NodeError::MissingInput { what: REVIEW_ID })?;

        let findings = match self.analyze(&snapshot, code, review_id).await {
            Ok(findings) => findings,
            Err(err) => {
                tracing::error!(error = %err, "code analysis failed; continuing without findings");
                Vec::new()
            }
        };

        let findings_value =
            serde_json::to_value(&findings).unwrap_or_else(|_| Value::Array(Vec::new()));
        extra.insert(FINDINGS.to_string(), findings_value);
        Ok(NodePartial::new().with_extra(extra))
    }
}
