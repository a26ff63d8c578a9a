//! The orchestrator: routes inbound messages to specialized agents.
//!
//! One graph definition, two compilations:
//!
//! - the **full** graph (`parse_command → route_agent → delegate`) backs
//!   the non-streaming [`chat`](crate::agents::Agent::chat) call;
//! - the **routing-only** graph is compiled with interrupt-before on
//!   `delegate`; [`chat_stream`](crate::agents::Agent::chat_stream) runs
//!   it to obtain the [`DelegationDecision`](state::DelegationDecision),
//!   then calls the resolved agent's streaming chat directly and relays
//!   its fragments.
//!
//! The split exists because a node returns exactly one value, which
//! cannot express token-level streaming from inside a generic node;
//! streaming reuses only the routing decision and happens outside the
//! engine.

pub mod nodes;
pub mod state;

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::agents::manager::{AgentDeps, AgentRoster};
use crate::agents::orchestrator::nodes::{DelegateNode, ParseCommandNode, RouteAgentNode};
use crate::agents::orchestrator::state::{
    CLEAN_MESSAGE, CURRENT_MESSAGE, FINAL_RESPONSE, delegation_decision,
};
use crate::agents::registry::{ORCHESTRATOR_ID, RoutingTable};
use crate::agents::{
    Agent, AgentDescriptor, AgentError, FragmentStream, error_fragment,
};
use crate::app::App;
use crate::graph::GraphBuilder;
use crate::prompts;
use crate::state::ExecutionState;
use crate::types::NodeKind;

const PARSE_COMMAND: &str = "parse_command";
const ROUTE_AGENT: &str = "route_agent";
const DELEGATE: &str = "delegate";

/// Reply when the full graph somehow produced no final response.
const NO_RESPONSE: &str = "No response generated";

#[derive(Debug)]
struct OrchestratorRuntime {
    full: App,
    routing_only: App,
}

/// Main coordinator delegating to specialized agents.
#[derive(Debug)]
pub struct OrchestratorAgent {
    descriptor: AgentDescriptor,
    roster: Arc<AgentRoster>,
    routing: RoutingTable,
    runtime: RwLock<Option<OrchestratorRuntime>>,
}

impl OrchestratorAgent {
    /// Static configuration for this agent type.
    #[must_use]
    pub fn config() -> AgentDescriptor {
        AgentDescriptor {
            agent_id: ORCHESTRATOR_ID.to_string(),
            name: "Orchestrator".to_string(),
            description: "main coordinator that routes requests to specialized agents".to_string(),
            // The orchestrator is the entry point, never a routing target.
            command: None,
            capabilities: vec![
                "routing".to_string(),
                "delegation".to_string(),
                "coordination".to_string(),
            ],
            icon: "Network".to_string(),
        }
    }

    /// Build from shared collaborators.
    #[must_use]
    pub fn new(deps: &AgentDeps) -> Self {
        Self {
            descriptor: Self::config(),
            roster: deps.roster.clone(),
            routing: deps.routing.clone(),
            runtime: RwLock::new(None),
        }
    }

    fn build_workflow(&self) -> GraphBuilder {
        GraphBuilder::new()
            .add_node(NodeKind::Custom(PARSE_COMMAND.into()), ParseCommandNode)
            .add_node(
                NodeKind::Custom(ROUTE_AGENT.into()),
                RouteAgentNode::new(self.routing.clone()),
            )
            .add_node(
                NodeKind::Custom(DELEGATE.into()),
                DelegateNode::new(self.roster.clone()),
            )
            .add_edge(NodeKind::Start, NodeKind::Custom(PARSE_COMMAND.into()))
            .add_edge(
                NodeKind::Custom(PARSE_COMMAND.into()),
                NodeKind::Custom(ROUTE_AGENT.into()),
            )
            .add_edge(
                NodeKind::Custom(ROUTE_AGENT.into()),
                NodeKind::Custom(DELEGATE.into()),
            )
            .add_edge(NodeKind::Custom(DELEGATE.into()), NodeKind::End)
    }

    fn initial_state(message: &str) -> ExecutionState {
        ExecutionState::builder()
            .with_extra(CURRENT_MESSAGE, json!(message))
            .with_extra(CLEAN_MESSAGE, json!(message))
            .build()
    }

    async fn runtime_apps(&self) -> Result<(App, App), AgentError> {
        let guard = self.runtime.read().await;
        match guard.as_ref() {
            Some(runtime) => Ok((runtime.full.clone(), runtime.routing_only.clone())),
            None => Err(AgentError::NotInitialized {
                agent_id: self.descriptor.agent_id.clone(),
            }),
        }
    }
}

#[async_trait]
impl Agent for OrchestratorAgent {
    fn descriptor(&self) -> &AgentDescriptor {
        &self.descriptor
    }

    async fn initialize(&self) -> Result<(), AgentError> {
        let mut guard = self.runtime.write().await;
        if guard.is_some() {
            return Ok(());
        }
        let full = self.build_workflow().compile()?;
        let routing_only = self
            .build_workflow()
            .with_interrupt_before(NodeKind::Custom(DELEGATE.into()))
            .compile()?;
        *guard = Some(OrchestratorRuntime { full, routing_only });
        tracing::info!("orchestrator initialized with dual-graph compilation");
        Ok(())
    }

    async fn chat(&self, thread_id: &str, message: &str) -> Result<String, AgentError> {
        let (full, _) = self.runtime_apps().await?;
        let result = full
            .invoke(Self::initial_state(message), Some(thread_id))
            .await?;
        Ok(result
            .snapshot()
            .extra_str(FINAL_RESPONSE)
            .unwrap_or(NO_RESPONSE)
            .to_string())
    }

    async fn chat_stream(&self, thread_id: &str, message: &str) -> FragmentStream {
        let (tx, rx) = flume::unbounded();

        let routing_only = match self.runtime_apps().await {
            Ok((_, routing_only)) => routing_only,
            Err(err) => {
                let _ = tx.send(error_fragment(err));
                return rx;
            }
        };

        let roster = self.roster.clone();
        let thread = thread_id.to_string();
        let message = message.to_string();

        tokio::spawn(async move {
            let outcome: Result<(), AgentError> = async {
                // Run routing up to (but not into) the delegate node.
                let halted = routing_only
                    .invoke(OrchestratorAgent::initial_state(&message), Some(&thread))
                    .await?;

                let Some(decision) = delegation_decision(&halted) else {
                    let _ = tx.send(nodes::NO_AGENT_SELECTED.to_string());
                    return Ok(());
                };

                let agent =
                    roster
                        .get(&decision.selected_agent_id)
                        .ok_or_else(|| AgentError::UnknownAgent {
                            agent_id: decision.selected_agent_id.clone(),
                        })?;

                let instruction = prompts::delegation_instruction(
                    agent.descriptor(),
                    &decision.clean_message,
                    &decision.history,
                );
                let enhanced = format!(
                    "{instruction}\n\nUser request: {clean}",
                    clean = decision.clean_message
                );

                if let Some(warning) = &decision.routing_warning {
                    let _ = tx.send(warning.clone());
                }

                let fragments = agent.chat_stream(&thread, &enhanced).await;
                while let Ok(fragment) = fragments.recv_async().await {
                    if tx.send(fragment).is_err() {
                        break;
                    }
                }
                Ok(())
            }
            .await;

            if let Err(err) = outcome {
                tracing::error!(error = %err, "orchestrator streaming failed");
                let _ = tx.send(error_fragment(err));
            }
        });

        rx
    }

    async fn close(&self) -> Result<(), AgentError> {
        self.runtime.write().await.take();
        tracing::info!("orchestrator closed");
        Ok(())
    }
}
