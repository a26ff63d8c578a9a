//! Durable per-thread state snapshots.
//!
//! A [`Checkpoint`] captures the execution state of one thread after one
//! node; [`Checkpointer`] implementations persist the latest snapshot per
//! thread id. Each agent owns its own store instance, giving every agent
//! an isolated namespace.
//!
//! Backends: [`InMemoryCheckpointer`] for tests and volatile sessions, and
//! [`SqliteCheckpointer`](crate::checkpoint::sqlite::SqliteCheckpointer)
//! (behind the default `sqlite` feature) for durable storage.

pub mod persistence;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use rustc_hash::FxHashMap;
#[cfg(feature = "sqlite")]
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::state::ExecutionState;

/// One persisted snapshot of a thread's state.
#[derive(Clone, Debug, PartialEq)]
pub struct Checkpoint {
    /// The session thread this snapshot belongs to.
    pub thread_id: String,
    /// Monotonic step counter at save time.
    pub step: u64,
    /// Full execution state at save time.
    pub state: ExecutionState,
    /// Save timestamp.
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Snapshot the given state under a thread id.
    #[must_use]
    pub fn new(thread_id: &str, step: u64, state: ExecutionState) -> Self {
        Self {
            thread_id: thread_id.to_string(),
            step,
            state,
            created_at: Utc::now(),
        }
    }
}

/// Pluggable checkpoint persistence.
#[async_trait]
pub trait Checkpointer: Send + Sync + std::fmt::Debug {
    /// Persist a snapshot; replaces any earlier snapshot at the same step.
    async fn save(&self, checkpoint: Checkpoint) -> Result<(), CheckpointerError>;

    /// Load the most recent snapshot for a thread, if one exists.
    async fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointerError>;

    /// All thread ids with at least one snapshot.
    async fn list_threads(&self) -> Result<Vec<String>, CheckpointerError>;

    /// Release backend resources. Default is a no-op.
    async fn close(&self) -> Result<(), CheckpointerError> {
        Ok(())
    }
}

/// Checkpoint store failures.
#[derive(Debug, Error, Diagnostic)]
pub enum CheckpointerError {
    /// The storage backend failed.
    #[error("checkpoint backend error: {message}")]
    #[diagnostic(code(tutorloom::checkpoint::backend))]
    Backend {
        /// Backend-specific description.
        message: String,
    },

    /// A snapshot could not be (de)serialized.
    #[error("checkpoint serialization error: {message}")]
    #[diagnostic(code(tutorloom::checkpoint::serde))]
    Serialization {
        /// Parser/encoder description.
        message: String,
    },
}

/// Volatile in-memory store keeping the latest snapshot per thread.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointer {
    inner: Mutex<FxHashMap<String, Checkpoint>>,
}

impl InMemoryCheckpointer {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, FxHashMap<String, Checkpoint>>, CheckpointerError> {
        self.inner.lock().map_err(|_| CheckpointerError::Backend {
            message: "checkpoint map poisoned".to_string(),
        })
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn save(&self, checkpoint: Checkpoint) -> Result<(), CheckpointerError> {
        self.lock()?
            .insert(checkpoint.thread_id.clone(), checkpoint);
        Ok(())
    }

    async fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointerError> {
        Ok(self.lock()?.get(thread_id).cloned())
    }

    async fn list_threads(&self) -> Result<Vec<String>, CheckpointerError> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}

/// How an agent should build its checkpoint store.
#[derive(Clone, Debug)]
pub enum CheckpointerConfig {
    /// Volatile in-memory snapshots.
    InMemory,
    /// One SQLite database file per agent namespace under `dir`.
    #[cfg(feature = "sqlite")]
    Sqlite {
        /// Directory holding the per-agent database files.
        dir: PathBuf,
    },
}

impl CheckpointerConfig {
    /// Resolve from the environment: `TUTORLOOM_CHECKPOINT_DIR` selects the
    /// SQLite backend rooted at that directory, otherwise in-memory.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        #[cfg(feature = "sqlite")]
        if let Ok(dir) = std::env::var("TUTORLOOM_CHECKPOINT_DIR") {
            return Self::Sqlite {
                dir: PathBuf::from(dir),
            };
        }
        Self::InMemory
    }

    /// Build the store for one agent namespace.
    #[cfg_attr(not(feature = "sqlite"), allow(unused_variables))]
    pub async fn build(&self, namespace: &str) -> Result<Arc<dyn Checkpointer>, CheckpointerError> {
        match self {
            Self::InMemory => Ok(Arc::new(InMemoryCheckpointer::new())),
            #[cfg(feature = "sqlite")]
            Self::Sqlite { dir } => {
                let path = dir.join(format!("{namespace}_checkpoints.db"));
                let store = sqlite::SqliteCheckpointer::connect(&path).await?;
                Ok(Arc::new(store))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_load_returns_equal_state() {
        let store = InMemoryCheckpointer::new();
        let state = ExecutionState::new_with_user_message("remember me");
        store
            .save(Checkpoint::new("t1", 2, state.clone()))
            .await
            .unwrap();

        let loaded = store.load_latest("t1").await.unwrap().unwrap();
        assert_eq!(loaded.step, 2);
        assert_eq!(loaded.state, state);
        assert!(store.load_latest("t2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_threads_reports_saved_ids() {
        let store = InMemoryCheckpointer::new();
        for tid in ["alpha", "beta"] {
            store
                .save(Checkpoint::new(tid, 1, ExecutionState::default()))
                .await
                .unwrap();
        }
        let mut ids = store.list_threads().await.unwrap();
        ids.sort();
        assert_eq!(ids, vec!["alpha", "beta"]);
    }
}
