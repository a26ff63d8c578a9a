//! Command → agent resolution.

use async_trait::async_trait;
use serde_json::json;

use crate::agents::orchestrator::state::{DETECTED_COMMAND, ROUTING_WARNING, SELECTED_AGENT_ID};
use crate::agents::registry::RoutingTable;
use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::state::StateSnapshot;
use crate::utils::collections::new_extra_map;

/// Select the agent that should handle the request.
///
/// A detected command resolves through the routing table; an unknown
/// command falls back to the configured fallback agent and records a
/// warning that delegation surfaces with the response; no command selects
/// the default agent.
pub struct RouteAgentNode {
    routing: RoutingTable,
}

impl RouteAgentNode {
    /// Node over the given routing table.
    #[must_use]
    pub fn new(routing: RoutingTable) -> Self {
        Self { routing }
    }
}

#[async_trait]
impl Node for RouteAgentNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let mut extra = new_extra_map();

        match snapshot.extra_str(DETECTED_COMMAND) {
            Some(command) => match self.routing.commands.get(command) {
                Some(agent_id) => {
                    tracing::info!(agent = %agent_id, command = %command, "routing via command");
                    extra.insert(SELECTED_AGENT_ID.to_string(), json!(agent_id));
                }
                None => {
                    tracing::warn!(command = %command, "unknown command; falling back");
                    extra.insert(
                        SELECTED_AGENT_ID.to_string(),
                        json!(self.routing.fallback_agent_id),
                    );
                    extra.insert(
                        ROUTING_WARNING.to_string(),
                        json!(format!(
                            "Unknown command '/{command}'. Routing to the general tutor."
                        )),
                    );
                }
            },
            None => {
                tracing::info!(agent = %self.routing.default_agent_id, "no command; routing to default agent");
                extra.insert(
                    SELECTED_AGENT_ID.to_string(),
                    json!(self.routing.default_agent_id),
                );
            }
        }

        Ok(NodePartial::new().with_extra(extra))
    }
}
