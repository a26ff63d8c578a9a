//! `/command` detection.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::agents::orchestrator::state::{CLEAN_MESSAGE, CURRENT_MESSAGE, DETECTED_COMMAND};
use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::state::StateSnapshot;
use crate::utils::collections::new_extra_map;

/// Result of scanning a message for a leading `/command`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedCommand {
    /// The lowercase command token, when one was found.
    pub command: Option<String>,
    /// The message with the command stripped and whitespace trimmed.
    pub remainder: String,
}

/// Scan a message for a leading `/command`.
///
/// A command is a slash followed by one or more ASCII letters at the very
/// start of the trimmed message; the token is matched case-insensitively
/// and normalized to lowercase. Everything after the token, trimmed,
/// becomes the remainder. Messages without a command pass through trimmed
/// and unchanged.
#[must_use]
pub fn parse_command(message: &str) -> ParsedCommand {
    let trimmed = message.trim();
    if let Some(rest) = trimmed.strip_prefix('/') {
        let token_len = rest.chars().take_while(char::is_ascii_alphabetic).count();
        if token_len > 0 {
            // The token is ASCII, so char count equals byte length.
            let (token, remainder) = rest.split_at(token_len);
            return ParsedCommand {
                command: Some(token.to_ascii_lowercase()),
                remainder: remainder.trim().to_string(),
            };
        }
    }
    ParsedCommand {
        command: None,
        remainder: trimmed.to_string(),
    }
}

/// Pure routing step: detect a command and write the cleaned message.
pub struct ParseCommandNode;

#[async_trait]
impl Node for ParseCommandNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let message = snapshot
            .extra_str(CURRENT_MESSAGE)
            .ok_or(NodeError::MissingInput {
                what: CURRENT_MESSAGE,
            })?;

        let parsed = parse_command(message);
        if let Some(command) = &parsed.command {
            tracing::info!(command = %command, "detected command");
        }

        let mut extra = new_extra_map();
        extra.insert(
            DETECTED_COMMAND.to_string(),
            parsed.command.map_or(Value::Null, |c| json!(c)),
        );
        extra.insert(CLEAN_MESSAGE.to_string(), json!(parsed.remainder));
        Ok(NodePartial::new().with_extra(extra))
    }
}
