/*!
SQLite-backed checkpointer.

Stores one row per (thread, step); `load_latest` returns the highest step
for a thread. The schema is created idempotently on connect, so a database
file can be pointed at an empty path and used immediately. Serialization
goes through the persistence models in `checkpoint::persistence`.

Each agent connects to its own database file, which is what gives every
agent an isolated checkpoint namespace.
*/

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Row;
use tracing::instrument;

use crate::checkpoint::persistence::{PersistedState, from_json, to_json};
use crate::checkpoint::{Checkpoint, Checkpointer, CheckpointerError};
use crate::state::ExecutionState;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS checkpoints (
    thread_id  TEXT    NOT NULL,
    step       INTEGER NOT NULL,
    state_json TEXT    NOT NULL,
    created_at TEXT    NOT NULL,
    PRIMARY KEY (thread_id, step)
);
CREATE INDEX IF NOT EXISTS idx_checkpoints_thread ON checkpoints (thread_id, step DESC);
"#;

/// Durable checkpoint store over a single SQLite database file.
pub struct SqliteCheckpointer {
    pool: Arc<SqlitePool>,
}

impl std::fmt::Debug for SqliteCheckpointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCheckpointer").finish()
    }
}

fn backend_err(e: impl std::fmt::Display) -> CheckpointerError {
    CheckpointerError::Backend {
        message: e.to_string(),
    }
}

impl SqliteCheckpointer {
    /// Open (creating if missing) the database at `path` and ensure the
    /// schema exists.
    #[instrument(skip(path))]
    pub async fn connect(path: &Path) -> Result<Self, CheckpointerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(backend_err)?;
        }
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))
            .map_err(backend_err)?
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await.map_err(backend_err)?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await.map_err(backend_err)?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait::async_trait]
impl Checkpointer for SqliteCheckpointer {
    #[instrument(skip(self, checkpoint), err)]
    async fn save(&self, checkpoint: Checkpoint) -> Result<(), CheckpointerError> {
        let state_json = to_json(&PersistedState::from(&checkpoint.state), "state")?;
        sqlx::query(
            "INSERT OR REPLACE INTO checkpoints (thread_id, step, state_json, created_at) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&checkpoint.thread_id)
        .bind(checkpoint.step as i64)
        .bind(&state_json)
        .bind(checkpoint.created_at.to_rfc3339())
        .execute(self.pool.as_ref())
        .await
        .map_err(backend_err)?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointerError> {
        let row = sqlx::query(
            "SELECT step, state_json, created_at FROM checkpoints \
             WHERE thread_id = ?1 ORDER BY step DESC LIMIT 1",
        )
        .bind(thread_id)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(backend_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let step: i64 = row.try_get("step").map_err(backend_err)?;
        let state_json: String = row.try_get("state_json").map_err(backend_err)?;
        let created_at: String = row.try_get("created_at").map_err(backend_err)?;

        let state: PersistedState = from_json(&state_json, "state")?;
        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now());

        Ok(Some(Checkpoint {
            thread_id: thread_id.to_string(),
            step: step as u64,
            state: ExecutionState::from(state),
            created_at,
        }))
    }

    #[instrument(skip(self), err)]
    async fn list_threads(&self) -> Result<Vec<String>, CheckpointerError> {
        let rows = sqlx::query("SELECT DISTINCT thread_id FROM checkpoints ORDER BY thread_id")
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(backend_err)?;
        rows.into_iter()
            .map(|row| row.try_get::<String, _>("thread_id").map_err(backend_err))
            .collect()
    }

    async fn close(&self) -> Result<(), CheckpointerError> {
        self.pool.close().await;
        Ok(())
    }
}
