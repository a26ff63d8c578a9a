//! Core identifiers for workflow graphs.
//!
//! [`NodeKind`] names the nodes of a pipeline graph, with virtual `Start`
//! and `End` endpoints that exist only for topology. [`ChannelType`]
//! identifies the state channels that reducers operate on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a node within a workflow graph.
///
/// `Start` and `End` are virtual endpoints: they are never registered or
/// executed, they only anchor edges. Every executable node is a
/// `Custom(name)` with a name unique within its graph.
///
/// # Examples
///
/// ```rust
/// use tutorloom::types::NodeKind;
///
/// let guardrail = NodeKind::Custom("guardrail".to_string());
/// assert_eq!(guardrail.encode(), "Custom:guardrail");
/// assert_eq!(NodeKind::decode("Custom:guardrail"), guardrail);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Virtual entry endpoint. Edges from `Start` define where execution begins.
    Start,
    /// Virtual terminal endpoint. Reaching `End` completes a walk.
    End,
    /// An executable node identified by a graph-unique name.
    Custom(String),
}

impl NodeKind {
    /// Encode into the persisted string form (`"Start"`, `"End"`,
    /// `"Custom:<name>"`).
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            NodeKind::Start => "Start".to_string(),
            NodeKind::End => "End".to_string(),
            NodeKind::Custom(name) => format!("Custom:{name}"),
        }
    }

    /// Decode a persisted string form. Unrecognized strings fall back to
    /// `Custom` so older encodings keep round-tripping.
    pub fn decode(s: &str) -> Self {
        if s == "Start" {
            NodeKind::Start
        } else if s == "End" {
            NodeKind::End
        } else if let Some(rest) = s.strip_prefix("Custom:") {
            NodeKind::Custom(rest.to_string())
        } else {
            NodeKind::Custom(s.to_string())
        }
    }

    /// Returns `true` for the virtual `Start` endpoint.
    #[must_use]
    pub fn is_start(&self) -> bool {
        matches!(self, Self::Start)
    }

    /// Returns `true` for the virtual `End` endpoint.
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "Start"),
            Self::End => write!(f, "End"),
            Self::Custom(name) => write!(f, "{name}"),
        }
    }
}

impl From<&str> for NodeKind {
    fn from(s: &str) -> Self {
        match s {
            "Start" => NodeKind::Start,
            "End" => NodeKind::End,
            other => NodeKind::Custom(other.to_string()),
        }
    }
}

/// Identifies a state channel managed by the reducer registry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelType {
    /// Conversation history; merged by appending.
    Message,
    /// Keyed metadata and intermediate results; merged by overwriting keys.
    Extra,
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message => write!(f, "messages"),
            Self::Extra => write!(f, "extra"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        for kind in [
            NodeKind::Start,
            NodeKind::End,
            NodeKind::Custom("enrichment".into()),
        ] {
            assert_eq!(NodeKind::decode(&kind.encode()), kind);
        }
    }

    #[test]
    fn decode_unknown_falls_back_to_custom() {
        assert_eq!(
            NodeKind::decode("legacy_name"),
            NodeKind::Custom("legacy_name".into())
        );
    }

    #[test]
    fn from_str_recognizes_endpoints() {
        assert!(NodeKind::from("Start").is_start());
        assert!(NodeKind::from("End").is_end());
        assert_eq!(
            NodeKind::from("delegate"),
            NodeKind::Custom("delegate".into())
        );
    }
}
