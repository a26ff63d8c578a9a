//! Agents: the orchestrator and the specialized pipelines it delegates to.
//!
//! Every agent implements [`Agent`]: a two-phase lifecycle
//! (`initialize`/`close`), a non-streaming [`chat`](Agent::chat) call, and
//! a streaming [`chat_stream`](Agent::chat_stream) call that yields text
//! fragments.
//!
//! The streaming contract is deliberately infallible at the signature
//! level: failures inside a stream arrive as one final fragment of the
//! form `[ERROR] <message>`, which consumers must treat as terminal.

pub mod descriptor;
pub mod manager;
pub mod nodes;
pub mod orchestrator;
pub mod registry;
pub mod reviewer;
pub mod teacher;

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

pub use descriptor::AgentDescriptor;
pub use manager::{AgentDeps, AgentManager, AgentRoster, InitReport};
pub use registry::AgentRegistry;

use crate::app::RunnerError;
use crate::checkpoint::CheckpointerError;
use crate::graph::GraphCompileError;

/// Ordered fragments of one streamed response.
pub type FragmentStream = flume::Receiver<String>;

/// Prefix marking a terminal in-band error fragment.
pub const ERROR_FRAGMENT_PREFIX: &str = "[ERROR]";

/// Render an error as a terminal stream fragment.
#[must_use]
pub fn error_fragment(message: impl std::fmt::Display) -> String {
    format!("{ERROR_FRAGMENT_PREFIX} {message}")
}

/// Consumer-facing streaming contract shared by the specialized agents.
///
/// Runs the pipeline with [`stream_events`](crate::app::App::stream_events)
/// and forwards only `Token` texts. When the run produced no tokens, the
/// generation node's final assistant text is forwarded as one fragment so
/// the caller always receives at least one response. A fatal walk failure
/// becomes a terminal `[ERROR]` fragment.
pub(crate) async fn relay_pipeline_stream(
    app: crate::app::App,
    state: crate::state::ExecutionState,
    thread_id: String,
    tx: flume::Sender<String>,
) {
    let (handle, events) = app.stream_events(state, Some(&thread_id));

    let mut streamed = false;
    while let Ok(event) = events.recv_async().await {
        if let crate::event::StreamEvent::Token { text, .. } = event {
            streamed = true;
            if tx.send(text).is_err() {
                // Consumer gone; let the walk run to completion unobserved.
                break;
            }
        }
    }

    match handle.join().await {
        Ok(final_state) => {
            if !streamed {
                let text = final_state
                    .snapshot()
                    .last_assistant_message()
                    .map(|m| m.content.clone())
                    .unwrap_or_else(|| crate::prompts::EMPTY_RESPONSE_FALLBACK.to_string());
                let _ = tx.send(text);
            }
        }
        Err(err) => {
            let _ = tx.send(error_fragment(err));
        }
    }
}

/// A conversational agent with lifecycle, chat, and streaming surfaces.
#[async_trait]
pub trait Agent: Send + Sync + std::fmt::Debug {
    /// This agent's static metadata.
    fn descriptor(&self) -> &AgentDescriptor;

    /// Open resources and compile the agent's pipeline. Idempotent.
    async fn initialize(&self) -> Result<(), AgentError>;

    /// Process one message and return the completed response.
    ///
    /// Fatal pipeline failures (missing dependency, unresolved record)
    /// surface as `Err`; recoverable failures are absorbed by the
    /// pipeline's fail-open nodes.
    async fn chat(&self, thread_id: &str, message: &str) -> Result<String, AgentError>;

    /// Process one message, yielding the response as ordered fragments.
    ///
    /// Never returns an error: failures become one final
    /// `[ERROR] <message>` fragment.
    async fn chat_stream(&self, thread_id: &str, message: &str) -> FragmentStream;

    /// Release resources. Idempotent; safe to call at shutdown.
    async fn close(&self) -> Result<(), AgentError>;
}

/// Agent-level failures.
#[derive(Debug, Error, Diagnostic)]
pub enum AgentError {
    /// The agent (or the manager) was used before `initialize`.
    #[error("agent '{agent_id}' has not been initialized; call initialize_all() at startup")]
    #[diagnostic(code(tutorloom::agent::not_initialized))]
    NotInitialized {
        /// The uninitialized agent id.
        agent_id: String,
    },

    /// No agent is registered under the requested id.
    #[error("unknown agent id: '{agent_id}'")]
    #[diagnostic(code(tutorloom::agent::unknown))]
    UnknownAgent {
        /// The unresolved id.
        agent_id: String,
    },

    /// The agent's pipeline failed to compile at initialization.
    #[error(transparent)]
    #[diagnostic(code(tutorloom::agent::graph))]
    Graph(#[from] GraphCompileError),

    /// The agent's checkpoint store failed.
    #[error(transparent)]
    #[diagnostic(code(tutorloom::agent::checkpointer))]
    Checkpointer(#[from] CheckpointerError),

    /// The pipeline walk failed with a fatal error.
    #[error(transparent)]
    #[diagnostic(code(tutorloom::agent::runner))]
    Runner(#[from] RunnerError),

    /// A persistence collaborator failed outside the pipeline.
    #[error(transparent)]
    #[diagnostic(code(tutorloom::agent::store))]
    Store(#[from] crate::store::StoreError),
}
