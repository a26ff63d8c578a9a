//! Static agent registration.
//!
//! The set of agents is a compile-time table, validated once at startup:
//! no directory scanning, no reflection. Each entry pairs an
//! [`AgentDescriptor`] with a factory closure that builds the agent from
//! its collaborators. The command routing table is derived from the
//! descriptors.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::agents::descriptor::AgentDescriptor;
use crate::agents::manager::AgentDeps;
use crate::agents::orchestrator::OrchestratorAgent;
use crate::agents::reviewer::ReviewerAgent;
use crate::agents::teacher::TeacherAgent;
use crate::agents::Agent;

/// Agent id of the orchestrator.
pub const ORCHESTRATOR_ID: &str = "orchestrator";
/// Agent id of the teacher; also the routing default and fallback.
pub const TEACHER_ID: &str = "teacher";
/// Agent id of the code reviewer.
pub const REVIEWER_ID: &str = "reviewer";

/// Factory building one agent from its collaborators.
pub type AgentFactory = Arc<dyn Fn(&AgentDeps) -> Arc<dyn Agent> + Send + Sync>;

/// One registered agent type.
pub struct AgentSpec {
    /// Static metadata.
    pub descriptor: AgentDescriptor,
    /// Constructor.
    pub factory: AgentFactory,
}

/// Command routing configuration consumed by the orchestrator.
#[derive(Clone, Debug)]
pub struct RoutingTable {
    /// Command (without slash) → agent id.
    pub commands: FxHashMap<String, String>,
    /// Agent handling messages without a command.
    pub default_agent_id: String,
    /// Agent handling unknown commands (plus a routing warning).
    pub fallback_agent_id: String,
}

/// The static id→constructor table plus the derived command map.
pub struct AgentRegistry {
    specs: Vec<AgentSpec>,
    commands: FxHashMap<String, String>,
}

impl AgentRegistry {
    /// Build a registry from explicit specs.
    #[must_use]
    pub fn new(specs: Vec<AgentSpec>) -> Self {
        let mut commands = FxHashMap::default();
        for spec in &specs {
            if let Some(command) = &spec.descriptor.command {
                commands.insert(command.clone(), spec.descriptor.agent_id.clone());
            }
        }
        Self { specs, commands }
    }

    /// The builtin agent set: orchestrator, teacher, reviewer.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(vec![
            AgentSpec {
                descriptor: OrchestratorAgent::config(),
                factory: Arc::new(|deps: &AgentDeps| {
                    Arc::new(OrchestratorAgent::new(deps)) as Arc<dyn Agent>
                }),
            },
            AgentSpec {
                descriptor: TeacherAgent::config(),
                factory: Arc::new(|deps: &AgentDeps| {
                    Arc::new(TeacherAgent::new(deps)) as Arc<dyn Agent>
                }),
            },
            AgentSpec {
                descriptor: ReviewerAgent::config(),
                factory: Arc::new(|deps: &AgentDeps| {
                    Arc::new(ReviewerAgent::new(deps)) as Arc<dyn Agent>
                }),
            },
        ])
    }

    /// All registered specs.
    #[must_use]
    pub fn specs(&self) -> &[AgentSpec] {
        &self.specs
    }

    /// Descriptors of all registered agents.
    #[must_use]
    pub fn descriptors(&self) -> Vec<AgentDescriptor> {
        self.specs.iter().map(|s| s.descriptor.clone()).collect()
    }

    /// Agent id registered for a command, if any.
    #[must_use]
    pub fn agent_by_command(&self, command: &str) -> Option<&str> {
        self.commands.get(command).map(String::as_str)
    }

    /// The derived command→agent-id map.
    #[must_use]
    pub fn command_map(&self) -> &FxHashMap<String, String> {
        &self.commands
    }

    /// Derive the orchestrator's routing table.
    #[must_use]
    pub fn routing_table(&self, default_agent_id: &str, fallback_agent_id: &str) -> RoutingTable {
        RoutingTable {
            commands: self.commands.clone(),
            default_agent_id: default_agent_id.to_string(),
            fallback_agent_id: fallback_agent_id.to_string(),
        }
    }

    /// Descriptor for one agent id.
    #[must_use]
    pub fn descriptor(&self, agent_id: &str) -> Option<&AgentDescriptor> {
        self.specs
            .iter()
            .map(|s| &s.descriptor)
            .find(|d| d.agent_id == agent_id)
    }
}
