/*!
Serde-friendly persistence models for checkpoints.

These shapes are deliberately decoupled from the in-memory types so the
storage format stays stable while the runtime types evolve. Conversion
logic lives here (`From`/`TryFrom`); backends only serialize and store.
This module performs no I/O.
*/

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::channels::{Channel, ExtrasChannel, MessagesChannel};
use crate::checkpoint::{Checkpoint, CheckpointerError};
use crate::message::Message;
use crate::state::ExecutionState;

/// Vector-shaped channel with version metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedVecChannel<T> {
    /// Channel version at save time.
    pub version: u32,
    /// Channel contents.
    #[serde(default)]
    pub items: Vec<T>,
}

impl<T> Default for PersistedVecChannel<T> {
    fn default() -> Self {
        Self {
            version: 1,
            items: Vec::new(),
        }
    }
}

/// Map-shaped channel with version metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedMapChannel<V> {
    /// Channel version at save time.
    pub version: u32,
    /// Channel contents.
    #[serde(default)]
    pub map: FxHashMap<String, V>,
}

impl<V> Default for PersistedMapChannel<V> {
    fn default() -> Self {
        Self {
            version: 1,
            map: FxHashMap::default(),
        }
    }
}

/// Persisted shape of [`ExecutionState`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PersistedState {
    /// Conversation history channel.
    pub messages: PersistedVecChannel<Message>,
    /// Extras channel.
    pub extra: PersistedMapChannel<Value>,
}

/// Persisted shape of a full [`Checkpoint`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedCheckpoint {
    /// Owning thread id.
    pub thread_id: String,
    /// Step counter at save time.
    pub step: u64,
    /// Persisted state shape.
    pub state: PersistedState,
    /// RFC 3339 save timestamp.
    pub created_at: String,
}

impl From<&ExecutionState> for PersistedState {
    fn from(state: &ExecutionState) -> Self {
        PersistedState {
            messages: PersistedVecChannel {
                version: state.messages.version(),
                items: state.messages.snapshot(),
            },
            extra: PersistedMapChannel {
                version: state.extra.version(),
                map: state.extra.snapshot(),
            },
        }
    }
}

impl From<PersistedState> for ExecutionState {
    fn from(persisted: PersistedState) -> Self {
        ExecutionState {
            messages: MessagesChannel::new(persisted.messages.items, persisted.messages.version),
            extra: ExtrasChannel::new(persisted.extra.map, persisted.extra.version),
        }
    }
}

impl From<&Checkpoint> for PersistedCheckpoint {
    fn from(checkpoint: &Checkpoint) -> Self {
        PersistedCheckpoint {
            thread_id: checkpoint.thread_id.clone(),
            step: checkpoint.step,
            state: PersistedState::from(&checkpoint.state),
            created_at: checkpoint.created_at.to_rfc3339(),
        }
    }
}

impl From<PersistedCheckpoint> for Checkpoint {
    fn from(persisted: PersistedCheckpoint) -> Self {
        let created_at = DateTime::parse_from_rfc3339(&persisted.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        Checkpoint {
            thread_id: persisted.thread_id,
            step: persisted.step,
            state: ExecutionState::from(persisted.state),
            created_at,
        }
    }
}

/// Encode a persisted shape to a JSON string.
pub fn to_json<T: Serialize>(value: &T, what: &'static str) -> Result<String, CheckpointerError> {
    serde_json::to_string(value).map_err(|e| CheckpointerError::Serialization {
        message: format!("{what}: {e}"),
    })
}

/// Decode a persisted shape from a JSON string.
pub fn from_json<T: for<'de> Deserialize<'de>>(
    json: &str,
    what: &'static str,
) -> Result<T, CheckpointerError> {
    serde_json::from_str(json).map_err(|e| CheckpointerError::Serialization {
        message: format!("{what}: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn state_round_trips_through_persisted_shape() {
        let mut state = ExecutionState::builder()
            .with_user_message("hi")
            .with_assistant_message("hello")
            .with_extra("lesson_id", json!("l1"))
            .build();
        state.messages.set_version(4);

        let persisted = PersistedState::from(&state);
        let json = to_json(&persisted, "state").unwrap();
        let back: PersistedState = from_json(&json, "state").unwrap();
        let restored = ExecutionState::from(back);

        assert_eq!(restored, state);
        assert_eq!(restored.messages.version(), 4);
    }

    #[test]
    fn checkpoint_round_trips_with_timestamp() {
        let checkpoint = Checkpoint::new("t9", 5, ExecutionState::new_with_user_message("x"));
        let persisted = PersistedCheckpoint::from(&checkpoint);
        let restored = Checkpoint::from(persisted);
        assert_eq!(restored.thread_id, "t9");
        assert_eq!(restored.step, 5);
        assert_eq!(restored.state, checkpoint.state);
    }

    #[test]
    fn malformed_timestamp_falls_back_to_now() {
        let persisted = PersistedCheckpoint {
            thread_id: "t".into(),
            step: 1,
            state: PersistedState::default(),
            created_at: "not-a-date".into(),
        };
        // Conversion must not fail on a corrupt timestamp.
        let restored = Checkpoint::from(persisted);
        assert_eq!(restored.step, 1);
    }
}
