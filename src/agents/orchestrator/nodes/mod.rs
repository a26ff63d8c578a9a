//! The orchestrator's three pipeline steps.

pub mod command_parser;
pub mod delegate;
pub mod router;

pub use command_parser::{ParseCommandNode, ParsedCommand, parse_command};
pub use delegate::{DelegateNode, NO_AGENT_SELECTED};
pub use router::RouteAgentNode;
