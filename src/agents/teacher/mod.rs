//! The teacher: guided lessons through questioning.
//!
//! Pipeline: `enrichment → guardrail → socratic`, compiled once at
//! initialization with the agent's own checkpoint namespace. The thread
//! id doubles as the lesson id, so every lesson carries its own
//! conversation memory.

pub mod nodes;

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::agents::manager::AgentDeps;
use crate::agents::nodes::{ContextEnrichmentNode, GuardrailNode, LESSON_ID};
use crate::agents::registry::TEACHER_ID;
use crate::agents::teacher::nodes::SocraticNode;
use crate::agents::{
    Agent, AgentDescriptor, AgentError, FragmentStream, error_fragment, relay_pipeline_stream,
};
use crate::app::App;
use crate::checkpoint::{Checkpointer, CheckpointerConfig};
use crate::graph::GraphBuilder;
use crate::llm::LanguageModel;
use crate::prompts::EMPTY_RESPONSE_FALLBACK;
use crate::state::ExecutionState;
use crate::store::LessonStore;
use crate::types::NodeKind;

const ENRICHMENT: &str = "enrichment";
const GUARDRAIL: &str = "guardrail";
const SOCRATIC: &str = "socratic";

#[derive(Debug)]
struct TeacherRuntime {
    app: App,
    checkpointer: Arc<dyn Checkpointer>,
}

/// Agent teaching through guided questions.
#[derive(Debug)]
pub struct TeacherAgent {
    descriptor: AgentDescriptor,
    llm: Arc<dyn LanguageModel>,
    lessons: Arc<dyn LessonStore>,
    checkpoints: CheckpointerConfig,
    runtime: RwLock<Option<TeacherRuntime>>,
}

impl TeacherAgent {
    /// Static configuration for this agent type.
    #[must_use]
    pub fn config() -> AgentDescriptor {
        AgentDescriptor {
            agent_id: TEACHER_ID.to_string(),
            name: "Teacher".to_string(),
            description: "guided programming lessons through questioning".to_string(),
            command: Some("teach".to_string()),
            capabilities: vec![
                "teaching".to_string(),
                "questioning".to_string(),
                "documentation guidance".to_string(),
            ],
            icon: "GraduationCap".to_string(),
        }
    }

    /// Build from shared collaborators.
    #[must_use]
    pub fn new(deps: &AgentDeps) -> Self {
        Self {
            descriptor: Self::config(),
            llm: deps.llm.clone(),
            lessons: deps.lessons.clone(),
            checkpoints: deps.checkpoints.clone(),
            runtime: RwLock::new(None),
        }
    }

    fn initial_state(lesson_id: &str, message: &str) -> ExecutionState {
        ExecutionState::builder()
            .with_user_message(message)
            .with_extra(LESSON_ID, json!(lesson_id))
            .build()
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
impl Agent for TeacherAgent {
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
                NodeKind::Custom(SOCRATIC.into()),
                SocraticNode::new(self.llm.clone()),
            )
            .add_edge(NodeKind::Start, NodeKind::Custom(ENRICHMENT.into()))
            .add_edge(
                NodeKind::Custom(ENRICHMENT.into()),
                NodeKind::Custom(GUARDRAIL.into()),
            )
            .add_edge(
                NodeKind::Custom(GUARDRAIL.into()),
                NodeKind::Custom(SOCRATIC.into()),
            )
            .add_edge(NodeKind::Custom(SOCRATIC.into()), NodeKind::End)
            .with_checkpointer(checkpointer.clone())
            .compile()?;

        *guard = Some(TeacherRuntime { app, checkpointer });
        tracing::info!("teacher initialized with checkpointer");
        Ok(())
    }

    async fn chat(&self, thread_id: &str, message: &str) -> Result<String, AgentError> {
        let app = self.app().await?;
        let result = app
            .invoke(Self::initial_state(thread_id, message), Some(thread_id))
            .await?;
        Ok(result
            .snapshot()
            .last_assistant_message()
            .map(|m| m.content.clone())
            .unwrap_or_else(|| EMPTY_RESPONSE_FALLBACK.to_string()))
    }

    async fn chat_stream(&self, thread_id: &str, message: &str) -> FragmentStream {
        let (tx, rx) = flume::unbounded();
        match self.app().await {
            Ok(app) => {
                let state = Self::initial_state(thread_id, message);
                let thread = thread_id.to_string();
                tokio::spawn(relay_pipeline_stream(app, state, thread, tx));
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
            tracing::info!("teacher checkpointer closed");
        }
        Ok(())
    }
}
