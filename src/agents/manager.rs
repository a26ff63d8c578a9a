//! Agent lifecycle management.
//!
//! [`AgentManager`] replaces the original process-wide singleton with an
//! explicitly constructed context object: build it, call
//! [`initialize_all`](AgentManager::initialize_all) at startup, hand it to
//! whatever composes the transport layer, and call
//! [`close_all`](AgentManager::close_all) at shutdown.
//!
//! The [`AgentRoster`] is the shared id→instance map. The orchestrator's
//! delegate node holds a clone of the roster handle, which is how a
//! routing decision resolves to a live agent without any global state.

use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::agents::registry::{AgentRegistry, RoutingTable, TEACHER_ID};
use crate::agents::{Agent, AgentDescriptor, AgentError};
use crate::checkpoint::CheckpointerConfig;
use crate::llm::LanguageModel;
use crate::store::{LessonStore, ReviewStore};

/// Shared, read-mostly map of initialized agents.
#[derive(Default)]
pub struct AgentRoster {
    inner: RwLock<FxHashMap<String, Arc<dyn Agent>>>,
}

impl AgentRoster {
    /// Empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve an agent by id.
    #[must_use]
    pub fn get(&self, agent_id: &str) -> Option<Arc<dyn Agent>> {
        self.read().get(agent_id).cloned()
    }

    /// All agents currently registered, in unspecified order.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<dyn Agent>> {
        self.read().values().cloned().collect()
    }

    /// Whether any agent is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn insert(&self, agent_id: String, agent: Arc<dyn Agent>) {
        self.write().insert(agent_id, agent);
    }

    fn drain(&self) -> Vec<Arc<dyn Agent>> {
        self.write().drain().map(|(_, agent)| agent).collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, FxHashMap<String, Arc<dyn Agent>>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, FxHashMap<String, Arc<dyn Agent>>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for AgentRoster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<String> = self.read().keys().cloned().collect();
        f.debug_struct("AgentRoster").field("agents", &ids).finish()
    }
}

/// Collaborators handed to every agent factory.
#[derive(Clone)]
pub struct AgentDeps {
    /// Text-generation capability.
    pub llm: Arc<dyn LanguageModel>,
    /// Lesson context persistence.
    pub lessons: Arc<dyn LessonStore>,
    /// Review record persistence.
    pub reviews: Arc<dyn ReviewStore>,
    /// Checkpoint backend selection, one namespace per agent.
    pub checkpoints: CheckpointerConfig,
    /// Shared agent roster (for delegation).
    pub roster: Arc<AgentRoster>,
    /// Command routing table (for the orchestrator).
    pub routing: RoutingTable,
}

/// Per-agent outcome of [`AgentManager::initialize_all`].
#[derive(Debug, Default)]
pub struct InitReport {
    /// Agents that initialized successfully.
    pub succeeded: Vec<String>,
    /// Agents whose initialization failed, with the failure.
    pub failed: Vec<(String, AgentError)>,
}

/// Owns the registry and the roster; drives agent lifecycle.
pub struct AgentManager {
    registry: AgentRegistry,
    roster: Arc<AgentRoster>,
    llm: Arc<dyn LanguageModel>,
    lessons: Arc<dyn LessonStore>,
    reviews: Arc<dyn ReviewStore>,
    checkpoints: CheckpointerConfig,
    initialized: AtomicBool,
}

impl AgentManager {
    /// Manager over the builtin registry.
    #[must_use]
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        lessons: Arc<dyn LessonStore>,
        reviews: Arc<dyn ReviewStore>,
        checkpoints: CheckpointerConfig,
    ) -> Self {
        Self::with_registry(AgentRegistry::builtin(), llm, lessons, reviews, checkpoints)
    }

    /// Manager over an explicit registry.
    #[must_use]
    pub fn with_registry(
        registry: AgentRegistry,
        llm: Arc<dyn LanguageModel>,
        lessons: Arc<dyn LessonStore>,
        reviews: Arc<dyn ReviewStore>,
        checkpoints: CheckpointerConfig,
    ) -> Self {
        Self {
            registry,
            roster: Arc::new(AgentRoster::new()),
            llm,
            lessons,
            reviews,
            checkpoints,
            initialized: AtomicBool::new(false),
        }
    }

    /// Instantiate and initialize every registered agent.
    ///
    /// One agent's failure does not abort the others; each outcome is
    /// recorded in the returned report. Idempotent: a second call returns
    /// an empty report.
    pub async fn initialize_all(&self) -> InitReport {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return InitReport::default();
        }

        let deps = AgentDeps {
            llm: self.llm.clone(),
            lessons: self.lessons.clone(),
            reviews: self.reviews.clone(),
            checkpoints: self.checkpoints.clone(),
            roster: self.roster.clone(),
            routing: self.registry.routing_table(TEACHER_ID, TEACHER_ID),
        };

        let mut report = InitReport::default();
        for spec in self.registry.specs() {
            let agent_id = spec.descriptor.agent_id.clone();
            let agent = (spec.factory)(&deps);
            self.roster.insert(agent_id.clone(), agent.clone());
            match agent.initialize().await {
                Ok(()) => {
                    tracing::info!(agent = %agent_id, "agent initialized");
                    report.succeeded.push(agent_id);
                }
                Err(err) => {
                    tracing::error!(agent = %agent_id, error = %err, "agent initialization failed");
                    report.failed.push((agent_id, err));
                }
            }
        }
        report
    }

    /// Resolve an initialized agent by id.
    pub fn get_agent(&self, agent_id: &str) -> Result<Arc<dyn Agent>, AgentError> {
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(AgentError::NotInitialized {
                agent_id: agent_id.to_string(),
            });
        }
        self.roster
            .get(agent_id)
            .ok_or_else(|| AgentError::UnknownAgent {
                agent_id: agent_id.to_string(),
            })
    }

    /// Descriptors of all currently instantiated agents.
    #[must_use]
    pub fn agents_metadata(&self) -> Vec<AgentDescriptor> {
        self.roster
            .all()
            .iter()
            .map(|agent| agent.descriptor().clone())
            .collect()
    }

    /// The shared roster handle.
    #[must_use]
    pub fn roster(&self) -> Arc<AgentRoster> {
        self.roster.clone()
    }

    /// Close every agent, tolerating individual failures, and clear the
    /// roster. Idempotent.
    pub async fn close_all(&self) {
        for agent in self.roster.drain() {
            let agent_id = agent.descriptor().agent_id.clone();
            if let Err(err) = agent.close().await {
                tracing::error!(agent = %agent_id, error = %err, "error closing agent");
            } else {
                tracing::info!(agent = %agent_id, "agent closed");
            }
        }
        self.initialized.store(false, Ordering::SeqCst);
        tracing::info!("all agents closed");
    }
}
