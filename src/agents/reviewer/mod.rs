//! The code reviewer: constructive review through guided questions.
//!
//! Pipeline: `enrichment → guardrail → analysis → reviewer`, compiled
//! once at initialization with the agent's own checkpoint namespace.
//!
//! Two entry shapes exist over the same pipeline:
//!
//! - [`review`](ReviewerAgent::review) is the explicit submission surface
//!   `(lesson_id, code, language)`; it creates the pending review record
//!   before producing any fragment and threads state under the review id.
//! - The generic [`chat`](crate::agents::Agent::chat) and
//!   [`chat_stream`](crate::agents::Agent::chat_stream) calls treat the
//!   incoming message as the submitted artifact (language unknown), so
//!   orchestrator delegation works for both call shapes.

pub mod nodes;

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::agents::manager::AgentDeps;
use crate::agents::nodes::{
    CODE_CONTENT, ContextEnrichmentNode, GuardrailNode, LANGUAGE, LESSON_ID, REVIEW_ID,
};
use crate::agents::registry::REVIEWER_ID;
use crate::agents::reviewer::nodes::{CodeAnalysisNode, ReviewNode};
use crate::agents::{
    Agent, AgentDescriptor, AgentError, FragmentStream, error_fragment, relay_pipeline_stream,
};
use crate::app::App;
use crate::checkpoint::{Checkpointer, CheckpointerConfig};
use crate::graph::GraphBuilder;
use crate::llm::LanguageModel;
use crate::prompts::EMPTY_RESPONSE_FALLBACK;
use crate::state::ExecutionState;
use crate::store::{LessonStore, ReviewStore};
use crate::types::NodeKind;
use crate::utils::id_generator::IdGenerator;

const ENRICHMENT: &str = "enrichment";
const GUARDRAIL: &str = "guardrail";
const ANALYSIS: &str = "analysis";
const REVIEWER: &str = "reviewer";

/// Language recorded when a submission arrives without one.
const UNKNOWN_LANGUAGE: &str = "plaintext";

#[derive(Debug)]
struct ReviewerRuntime {
    app: App,
    checkpointer: Arc<dyn Checkpointer>,
}

/// Agent reviewing code through guided questions.
#[derive(Debug)]
pub struct ReviewerAgent {
    descriptor: AgentDescriptor,
    llm: Arc<dyn LanguageModel>,
    lessons: Arc<dyn LessonStore>,
    reviews: Arc<dyn ReviewStore>,
    checkpoints: CheckpointerConfig,
    ids: IdGenerator,
    runtime: RwLock<Option<ReviewerRuntime>>,
}

impl ReviewerAgent {
    /// Static configuration for this agent type.
    #[must_use]
    pub fn config() -> AgentDescriptor {
        AgentDescriptor {
            agent_id: REVIEWER_ID.to_string(),
            name: "Code Reviewer".to_string(),
            description: "constructive code review through guided questions".to_string(),
            command: Some("review".to_string()),
            capabilities: vec![
                "code review".to_string(),
                "static analysis".to_string(),
                "questioning".to_string(),
            ],
            icon: "SearchCode".to_string(),
        }
    }

    /// Build from shared collaborators.
    #[must_use]
    pub fn new(deps: &AgentDeps) -> Self {
        Self {
            descriptor: Self::config(),
            llm: deps.llm.clone(),
            lessons: deps.lessons.clone(),
            reviews: deps.reviews.clone(),
            checkpoints: deps.checkpoints.clone(),
            ids: IdGenerator::new(),
            runtime: RwLock::new(None),
        }
    }

    /// Submit code for review, streaming the feedback.
    ///
    /// Creates the pending review record before any fragment is produced.
    /// The review id becomes the pipeline's thread id.
    pub async fn review(&self, lesson_id: &str, code: &str, language: &str) -> FragmentStream {
        let (tx, rx) = flume::unbounded();
        let review_id = self.ids.generate_review_id();
        match self
            .prepare_submission(&review_id, lesson_id, code, language, None)
            .await
        {
            Ok((app, state)) => {
                tokio::spawn(relay_pipeline_stream(app, state, review_id, tx));
            }
            Err(err) => {
                let _ = tx.send(error_fragment(err));
            }
        }
        rx
    }

    /// Create the review record and assemble the pipeline input.
    async fn prepare_submission(
        &self,
        review_id: &str,
        lesson_id: &str,
        code: &str,
        language: &str,
        message: Option<&str>,
    ) -> Result<(App, ExecutionState), AgentError> {
        let app = self.app().await?;
        self.reviews
            .create_review(review_id, lesson_id, code, language)
            .await?;

        let opening = message
            .map(str::to_string)
            .unwrap_or_else(|| format!("Please review my {language} code."));
        let state = ExecutionState::builder()
            .with_user_message(&opening)
            .with_extra(LESSON_ID, json!(lesson_id))
            .with_extra(REVIEW_ID, json!(review_id))
            .with_extra(CODE_CONTENT, json!(code))
            .with_extra(LANGUAGE, json!(language))
            .build();
        Ok((app, state))
    }

    async fn app(&self) -> Result<App, AgentError> {
        let guard = self.runtime.read().await;
        guard
            .as_ref()
            .map(|runtime| runtime.app.clone())
            .ok_or_else(|| AgentError::NotInitialized {
                agent_id: self.descriptor.agent_id.clone(),
            })
    }
}

#[async_trait]
impl Agent for ReviewerAgent {
    fn descriptor(&self) -> &AgentDescriptor {
        &self.descriptor
    }

    async fn initialize(&self) -> Result<(), AgentError> {
        let mut guard = self.runtime.write().await;
        if guard.is_some() {
            return Ok(());
        }

        let checkpointer = self.checkpoints.build(&self.descriptor.agent_id).await?;
        let app = GraphBuilder::new()
            .add_node(
                NodeKind::Custom(ENRICHMENT.into()),
                ContextEnrichmentNode::new(self.lessons.clone()),
            )
            .add_node(
                NodeKind::Custom(GUARDRAIL.into()),
                GuardrailNode::new(self.llm.clone()),
            )
            .add_node(
                NodeKind::Custom(ANALYSIS.into()),
                CodeAnalysisNode::new(self.llm.clone(), self.reviews.clone()),
            )
            .add_node(
                NodeKind::Custom(REVIEWER.into()),
                ReviewNode::new(self.llm.clone(), self.reviews.clone()),
            )
            .add_edge(NodeKind::Start, NodeKind::Custom(ENRICHMENT.into()))
            .add_edge(
                NodeKind::Custom(ENRICHMENT.into()),
                NodeKind::Custom(GUARDRAIL.into()),
            )
            .add_edge(
                NodeKind::Custom(GUARDRAIL.into()),
                NodeKind::Custom(ANALYSIS.into()),
            )
            .add_edge(
                NodeKind::Custom(ANALYSIS.into()),
                NodeKind::Custom(REVIEWER.into()),
            )
            .add_edge(NodeKind::Custom(REVIEWER.into()), NodeKind::End)
            .with_checkpointer(checkpointer.clone())
            .compile()?;

        *guard = Some(ReviewerRuntime { app, checkpointer });
        tracing::info!("reviewer initialized with checkpointer");
        Ok(())
    }

    async fn chat(&self, thread_id: &str, message: &str) -> Result<String, AgentError> {
        let review_id = self.ids.generate_review_id();
        let (app, state) = self
            .prepare_submission(&review_id, thread_id, message, UNKNOWN_LANGUAGE, Some(message))
            .await?;
        let result = app.invoke(state, Some(&review_id)).await?;
        Ok(result
            .snapshot()
            .last_assistant_message()
            .map(|m| m.content.clone())
            .unwrap_or_else(|| EMPTY_RESPONSE_FALLBACK.to_string()))
    }

    async fn chat_stream(&self, thread_id: &str, message: &str) -> FragmentStream {
        let (tx, rx) = flume::unbounded();
        let review_id = self.ids.generate_review_id();
        match self
            .prepare_submission(&review_id, thread_id, message, UNKNOWN_LANGUAGE, Some(message))
            .await
        {
            Ok((app, state)) => {
                tokio::spawn(relay_pipeline_stream(app, state, review_id, tx));
            }
            Err(err) => {
                let _ = tx.send(error_fragment(err));
            }
        }
        rx
    }

    async fn close(&self) -> Result<(), AgentError> {
        if let Some(runtime) = self.runtime.write().await.take() {
            runtime.checkpointer.close().await?;
            tracing::info!("reviewer checkpointer closed");
        }
        Ok(())
    }
}
