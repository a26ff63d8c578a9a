//! Teacher-specific pipeline steps. Enrichment and the guardrail are
//! shared nodes (`crate::agents::nodes`).

pub mod socratic;

pub use socratic::SocraticNode;
