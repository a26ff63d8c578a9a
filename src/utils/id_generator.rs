//! Identifier generation for runs and review records.

use uuid::Uuid;

/// Generator for the crate's prefixed identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdGenerator;

impl IdGenerator {
    /// New generator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Identifier for an ad-hoc run/session.
    #[must_use]
    pub fn generate_run_id(&self) -> String {
        format!("run_{}", Uuid::new_v4().simple())
    }

    /// Identifier for a review record.
    #[must_use]
    pub fn generate_review_id(&self) -> String {
        format!("review_{}", Uuid::new_v4().simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_prefixed_and_unique() {
        let generator = IdGenerator::new();
        let a = generator.generate_review_id();
        let b = generator.generate_review_id();
        assert!(a.starts_with("review_"));
        assert_ne!(a, b);
    }
}
