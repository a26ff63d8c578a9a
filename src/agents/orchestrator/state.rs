//! State keys and the delegation decision read out of a routing run.

use crate::prompts;
use crate::state::ExecutionState;

/// Latest raw user message, as received by the orchestrator.
pub const CURRENT_MESSAGE: &str = "current_message";
/// Detected `/command` token (lowercase), or null when absent.
pub const DETECTED_COMMAND: &str = "detected_command";
/// Message with any command stripped and whitespace trimmed.
pub const CLEAN_MESSAGE: &str = "clean_message";
/// Agent id chosen by routing.
pub const SELECTED_AGENT_ID: &str = "selected_agent_id";
/// Warning attached when an unknown command fell back to the default agent.
pub const ROUTING_WARNING: &str = "routing_warning";
/// Raw response returned by the delegated agent.
pub const DELEGATED_RESPONSE: &str = "delegated_response";
/// Response handed back to the caller.
pub const FINAL_RESPONSE: &str = "final_response";

/// Routing outcome consumed by delegation or by the streaming relay.
///
/// Ephemeral: produced by one routing run (full or interrupted) and
/// consumed immediately.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelegationDecision {
    /// The agent that should handle the message.
    pub selected_agent_id: String,
    /// The message with any command stripped.
    pub clean_message: String,
    /// Prior turns rendered as role-prefixed lines, oldest first.
    pub history: String,
    /// Unknown-command warning to surface with the response, if any.
    pub routing_warning: Option<String>,
}

/// Extract the decision from a halted (or completed) routing run.
///
/// Returns `None` when routing never selected an agent.
#[must_use]
pub fn delegation_decision(state: &ExecutionState) -> Option<DelegationDecision> {
    let snapshot = state.snapshot();
    let selected = snapshot.extra_str(SELECTED_AGENT_ID)?.to_string();
    Some(DelegationDecision {
        selected_agent_id: selected,
        clean_message: snapshot.extra_str(CLEAN_MESSAGE).unwrap_or_default().to_string(),
        history: prompts::format_history(&snapshot.messages),
        routing_warning: snapshot.extra_str(ROUTING_WARNING).map(str::to_string),
    })
}
