//! # Tutorloom: graph-driven coordination for LLM tutoring agents
//!
//! Tutorloom coordinates multi-step, LLM-backed conversational agents. It
//! decides which specialized agent answers a message, runs that agent
//! through a fixed pipeline of steps (context loading, policy gating,
//! response generation), persists per-thread state across turns, and
//! streams generated text back token-by-token.
//!
//! ## Core pieces
//!
//! - **Engine** ([`graph`], [`app`]): declarative node/edge graphs with
//!   per-field merge reducers, compiled once and executed as sequential
//!   walks; split synchronous ([`App::invoke`](app::App::invoke)) and
//!   streaming ([`App::stream_events`](app::App::stream_events)) modes,
//!   plus interrupt-before for partial execution.
//! - **Checkpoints** ([`checkpoint`]): durable per-thread state snapshots,
//!   in-memory or SQLite, one namespace per agent.
//! - **Agents** ([`agents`]): a static registry, an explicit
//!   manager/roster lifecycle, the routing/delegation orchestrator, and
//!   the teacher and code-reviewer pipelines.
//! - **Collaborators** ([`llm`], [`store`]): the model service and the
//!   relational persistence are consumed through traits; the crate ships
//!   an in-memory store and leaves transports to implementations.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tutorloom::agents::{Agent, AgentManager};
//! use tutorloom::agents::registry::ORCHESTRATOR_ID;
//! use tutorloom::checkpoint::CheckpointerConfig;
//! use tutorloom::store::MemoryStore;
//!
//! # async fn example(llm: Arc<dyn tutorloom::llm::LanguageModel>) -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let manager = AgentManager::new(
//!     llm,
//!     store.clone(),
//!     store,
//!     CheckpointerConfig::from_env(),
//! );
//! manager.initialize_all().await;
//!
//! let orchestrator = manager.get_agent(ORCHESTRATOR_ID)?;
//! let fragments = orchestrator.chat_stream("lesson-1", "/review fn main() {}").await;
//! while let Ok(fragment) = fragments.recv_async().await {
//!     print!("{fragment}");
//! }
//!
//! manager.close_all().await;
//! # Ok(())
//! # }
//! ```

pub mod agents;
pub mod app;
pub mod channels;
pub mod checkpoint;
pub mod event;
pub mod graph;
pub mod llm;
pub mod message;
pub mod node;
pub mod prompts;
pub mod reducers;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod utils;
