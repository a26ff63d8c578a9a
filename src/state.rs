//! Execution state shared by all pipeline nodes.
//!
//! [`ExecutionState`] carries two versioned channels: the conversation
//! history (append semantics) and a JSON extras map (overwrite semantics).
//! Agent-specific fields such as lesson ids, routing decisions, or review
//! findings live in the extras map behind per-agent key constants.
//!
//! Nodes never see the state directly; they receive a [`StateSnapshot`],
//! a cloned read-only view taken immediately before the node runs.

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::channels::{Channel, ExtrasChannel, MessagesChannel};
use crate::message::Message;

/// Mutable workflow state: conversation history plus keyed extras.
///
/// # Examples
///
/// ```rust
/// use tutorloom::state::ExecutionState;
/// use serde_json::json;
///
/// let state = ExecutionState::builder()
///     .with_user_message("How do I reverse a list?")
///     .with_extra("lesson_id", json!("lesson-7"))
///     .build();
///
/// let snapshot = state.snapshot();
/// assert_eq!(snapshot.messages.len(), 1);
/// assert_eq!(snapshot.extra_str("lesson_id"), Some("lesson-7"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ExecutionState {
    /// Conversation history channel (append reducer).
    pub messages: MessagesChannel,
    /// Keyed metadata channel (overwrite reducer).
    pub extra: ExtrasChannel,
}

impl ExecutionState {
    /// State seeded with a single user message.
    pub fn new_with_user_message(text: &str) -> Self {
        Self {
            messages: MessagesChannel::new(vec![Message::user(text)], 1),
            extra: ExtrasChannel::default(),
        }
    }

    /// Fluent builder for states with several messages or extras.
    pub fn builder() -> ExecutionStateBuilder {
        ExecutionStateBuilder::default()
    }

    /// Take a read-only snapshot of both channels.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            messages: self.messages.snapshot(),
            messages_version: self.messages.version(),
            extra: self.extra.snapshot(),
            extra_version: self.extra.version(),
        }
    }
}

/// Point-in-time read-only view handed to nodes.
#[derive(Clone, Debug)]
pub struct StateSnapshot {
    /// Conversation history at snapshot time.
    pub messages: Vec<Message>,
    /// Messages channel version at snapshot time.
    pub messages_version: u32,
    /// Extras map at snapshot time.
    pub extra: FxHashMap<String, Value>,
    /// Extras channel version at snapshot time.
    pub extra_version: u32,
}

impl StateSnapshot {
    /// String-valued extra, if present and a JSON string.
    #[must_use]
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    /// Boolean-valued extra, if present and a JSON bool.
    #[must_use]
    pub fn extra_bool(&self, key: &str) -> Option<bool> {
        self.extra.get(key).and_then(Value::as_bool)
    }

    /// String-array extra; missing or mistyped entries collapse to empty.
    #[must_use]
    pub fn extra_str_list(&self, key: &str) -> Vec<String> {
        self.extra
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Most recent message, if any.
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Most recent assistant message, if any.
    #[must_use]
    pub fn last_assistant_message(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.has_role(Message::ASSISTANT))
    }
}

/// Builder for [`ExecutionState`].
#[derive(Debug, Default)]
pub struct ExecutionStateBuilder {
    messages: Vec<Message>,
    extra: FxHashMap<String, Value>,
}

impl ExecutionStateBuilder {
    /// Append a user message.
    #[must_use]
    pub fn with_user_message(mut self, content: &str) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    /// Append an assistant message.
    #[must_use]
    pub fn with_assistant_message(mut self, content: &str) -> Self {
        self.messages.push(Message::assistant(content));
        self
    }

    /// Append a message with an arbitrary role.
    #[must_use]
    pub fn with_message(mut self, role: &str, content: &str) -> Self {
        self.messages.push(Message::new(role, content));
        self
    }

    /// Set an extras entry.
    #[must_use]
    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// Finalize the state; both channels start at version 1.
    #[must_use]
    pub fn build(self) -> ExecutionState {
        ExecutionState {
            messages: MessagesChannel::new(self.messages, 1),
            extra: ExtrasChannel::new(self.extra, 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_reflects_builder_contents() {
        let state = ExecutionState::builder()
            .with_user_message("hi")
            .with_assistant_message("hello")
            .with_extra("guardrail_triggered", json!(false))
            .build();
        let snap = state.snapshot();
        assert_eq!(snap.messages.len(), 2);
        assert_eq!(snap.extra_bool("guardrail_triggered"), Some(false));
        assert_eq!(snap.last_assistant_message().unwrap().content, "hello");
    }

    #[test]
    fn extra_str_list_tolerates_missing_and_mistyped() {
        let state = ExecutionState::builder()
            .with_extra("objectives", json!(["a", "b"]))
            .with_extra("not_a_list", json!(42))
            .build();
        let snap = state.snapshot();
        assert_eq!(snap.extra_str_list("objectives"), vec!["a", "b"]);
        assert!(snap.extra_str_list("not_a_list").is_empty());
        assert!(snap.extra_str_list("absent").is_empty());
    }
}
