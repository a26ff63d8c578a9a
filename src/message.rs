//! Conversation messages exchanged between the user and an agent.

use serde::{Deserialize, Serialize};

/// A single conversation turn: a role plus text content.
///
/// Roles are open strings; use the constants on [`Message`] for the three
/// standard ones.
///
/// # Examples
///
/// ```
/// use tutorloom::message::Message;
///
/// let question = Message::user("Why does my loop never end?");
/// let reply = Message::assistant("What is the loop condition checking?");
/// assert!(question.has_role(Message::USER));
/// assert!(reply.has_role(Message::ASSISTANT));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    /// Sender role (`"user"`, `"assistant"`, `"system"`, or custom).
    pub role: String,
    /// Text content of the turn.
    pub content: String,
}

impl Message {
    /// Standard role for user input.
    pub const USER: &'static str = "user";
    /// Standard role for model output.
    pub const ASSISTANT: &'static str = "assistant";
    /// Standard role for system instructions.
    pub const SYSTEM: &'static str = "system";

    /// Build a message with an arbitrary role.
    #[must_use]
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    /// Build a user message.
    #[must_use]
    pub fn user(content: &str) -> Self {
        Self::new(Self::USER, content)
    }

    /// Build an assistant message.
    #[must_use]
    pub fn assistant(content: &str) -> Self {
        Self::new(Self::ASSISTANT, content)
    }

    /// Build a system message.
    #[must_use]
    pub fn system(content: &str) -> Self {
        Self::new(Self::SYSTEM, content)
    }

    /// Whether this message carries the given role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }
}
