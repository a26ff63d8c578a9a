//! Delegation: hand the cleaned message to the selected agent.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use crate::agents::manager::AgentRoster;
use crate::agents::orchestrator::state::{
    CLEAN_MESSAGE, DELEGATED_RESPONSE, FINAL_RESPONSE, ROUTING_WARNING, SELECTED_AGENT_ID,
};
use crate::agents::{Agent, AgentError};
use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::prompts;
use crate::state::StateSnapshot;
use crate::utils::collections::new_extra_map;

/// Reply used when routing produced no agent id.
pub const NO_AGENT_SELECTED: &str = "No agent selected. Please try again.";

/// Resolve the selected agent and run its non-streaming chat with a
/// delegation instruction built from its descriptor, the cleaned message,
/// and the formatted conversation history.
///
/// Delegation failures never abort the walk; they become an in-band error
/// string in the final response.
pub struct DelegateNode {
    roster: Arc<AgentRoster>,
}

impl DelegateNode {
    /// Node resolving agents through the given roster.
    #[must_use]
    pub fn new(roster: Arc<AgentRoster>) -> Self {
        Self { roster }
    }

    async fn delegate(
        &self,
        agent_id: &str,
        clean_message: &str,
        history: &str,
        thread_id: &str,
    ) -> Result<String, AgentError> {
        let agent: Arc<dyn Agent> =
            self.roster
                .get(agent_id)
                .ok_or_else(|| AgentError::UnknownAgent {
                    agent_id: agent_id.to_string(),
                })?;

        let instruction =
            prompts::delegation_instruction(agent.descriptor(), clean_message, history);
        let enhanced = format!("{instruction}\n\nUser request: {clean_message}");

        tracing::info!(
            agent = %agent_id,
            history_len = history.len(),
            "delegating to agent"
        );
        agent.chat(thread_id, &enhanced).await
    }
}

#[async_trait]
impl Node for DelegateNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let mut extra = new_extra_map();

        let Some(agent_id) = snapshot.extra_str(SELECTED_AGENT_ID) else {
            extra.insert(FINAL_RESPONSE.to_string(), json!(NO_AGENT_SELECTED));
            return Ok(NodePartial::new().with_extra(extra));
        };

        let clean_message = snapshot.extra_str(CLEAN_MESSAGE).unwrap_or_default();
        let history = prompts::format_history(&snapshot.messages);
        let thread_id = ctx.thread_id.clone().unwrap_or_default();

        match self
            .delegate(agent_id, clean_message, &history, &thread_id)
            .await
        {
            Ok(response) => {
                let final_response = match snapshot.extra_str(ROUTING_WARNING) {
                    Some(warning) => format!("{warning}\n\n{response}"),
                    None => response.clone(),
                };
                extra.insert(DELEGATED_RESPONSE.to_string(), json!(response));
                extra.insert(FINAL_RESPONSE.to_string(), json!(final_response));
            }
            Err(err) => {
                tracing::error!(agent = %agent_id, error = %err, "delegation failed");
                extra.insert(
                    FINAL_RESPONSE.to_string(),
                    json!(format!("{}: {err}", prompts::DELEGATION_FAILURE)),
                );
            }
        }

        Ok(NodePartial::new().with_extra(extra))
    }
}
