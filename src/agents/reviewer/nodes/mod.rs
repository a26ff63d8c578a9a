//! Reviewer-specific pipeline steps. Enrichment and the guardrail are
//! shared nodes (`crate::agents::nodes`).

pub mod analysis;
pub mod review;

pub use analysis::CodeAnalysisNode;
pub use review::ReviewNode;
