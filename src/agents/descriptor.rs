//! Static agent metadata.

use serde::{Deserialize, Serialize};

/// Immutable description of one agent type.
///
/// Created once at startup and read-only thereafter. The optional
/// `command` wires the agent into the orchestrator's `/command` routing
/// table; agents without a command are reached only by direct delegation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Stable identifier used for routing and lookup.
    pub agent_id: String,
    /// Human-readable name.
    pub name: String,
    /// One-line description embedded in delegation prompts.
    pub description: String,
    /// Routing command (without the leading slash), if any.
    pub command: Option<String>,
    /// Capability tags embedded in delegation prompts.
    pub capabilities: Vec<String>,
    /// UI icon hint.
    pub icon: String,
}
