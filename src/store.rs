//! Persistence collaborators for lesson context and review records.
//!
//! The relational schema lives outside this crate; pipelines consume it
//! through two narrow traits. [`LessonStore`] resolves the context an
//! agent teaches or reviews against, and [`ReviewStore`] owns the
//! lifecycle of a code review record and its findings. [`MemoryStore`]
//! implements both for tests and for embedding without a database.

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Context loaded for a lesson before generation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonContext {
    /// Lesson identifier.
    pub lesson_id: String,
    /// Display name.
    pub name: String,
    /// Free-form description used in prompts.
    pub description: String,
    /// Learning objectives, in order.
    pub objectives: Vec<String>,
    /// Reference documentation links.
    pub documentation: Vec<String>,
}

/// Lifecycle status of a review record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// Created, feedback not yet produced.
    Pending,
    /// Feedback written; the record is terminal.
    Completed,
}

/// One analysis finding attached to a review.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewFinding {
    /// Source line the finding refers to, when applicable.
    #[serde(default)]
    pub line_number: Option<u32>,
    /// Finding category (security, performance, practices, ...).
    pub category: String,
    /// What was observed.
    pub observation: String,
    /// Question guiding the student toward the issue.
    pub guiding_question: String,
}

/// Store failures.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    /// A referenced record does not exist.
    #[error("{what} not found: {id}")]
    #[diagnostic(code(tutorloom::store::not_found))]
    NotFound {
        /// Record kind.
        what: &'static str,
        /// The unresolved identifier.
        id: String,
    },

    /// The backing store failed.
    #[error("store backend error: {message}")]
    #[diagnostic(code(tutorloom::store::backend))]
    Backend {
        /// Backend-specific description.
        message: String,
    },
}

/// Read access to lesson context.
#[async_trait]
pub trait LessonStore: Send + Sync + std::fmt::Debug {
    /// Resolve the context for a lesson id.
    ///
    /// Returns [`StoreError::NotFound`] when the id does not resolve;
    /// callers treat that as fatal for the current pipeline.
    async fn lesson_context(&self, lesson_id: &str) -> Result<LessonContext, StoreError>;
}

/// Lifecycle operations on review records.
#[async_trait]
pub trait ReviewStore: Send + Sync + std::fmt::Debug {
    /// Create a pending review record.
    async fn create_review(
        &self,
        review_id: &str,
        lesson_id: &str,
        code: &str,
        language: &str,
    ) -> Result<(), StoreError>;

    /// Attach one finding to an existing review.
    async fn add_finding(&self, review_id: &str, finding: &ReviewFinding)
    -> Result<(), StoreError>;

    /// Write the final feedback and mark the review completed.
    async fn complete_review(&self, review_id: &str, feedback: &str) -> Result<(), StoreError>;
}

/// A review record as kept by [`MemoryStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReviewRecord {
    /// Review identifier.
    pub review_id: String,
    /// Lesson the submission belongs to.
    pub lesson_id: String,
    /// Submitted code.
    pub code: String,
    /// Submission language.
    pub language: String,
    /// Current lifecycle status.
    pub status: ReviewStatus,
    /// Final feedback, present once completed.
    pub feedback: Option<String>,
    /// Findings attached by analysis.
    pub findings: Vec<ReviewFinding>,
}

/// In-memory implementation of both store traits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    lessons: Mutex<FxHashMap<String, LessonContext>>,
    reviews: Mutex<FxHashMap<String, ReviewRecord>>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a lesson.
    pub fn insert_lesson(&self, lesson: LessonContext) {
        self.lock_lessons().insert(lesson.lesson_id.clone(), lesson);
    }

    /// Look up a review record by id (test/introspection helper).
    #[must_use]
    pub fn review(&self, review_id: &str) -> Option<ReviewRecord> {
        self.lock_reviews().get(review_id).cloned()
    }

    /// All review ids currently stored.
    #[must_use]
    pub fn review_ids(&self) -> Vec<String> {
        self.lock_reviews().keys().cloned().collect()
    }

    fn lock_lessons(&self) -> MutexGuard<'_, FxHashMap<String, LessonContext>> {
        self.lessons.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_reviews(&self) -> MutexGuard<'_, FxHashMap<String, ReviewRecord>> {
        self.reviews.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl LessonStore for MemoryStore {
    async fn lesson_context(&self, lesson_id: &str) -> Result<LessonContext, StoreError> {
        self.lock_lessons()
            .get(lesson_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                what: "lesson",
                id: lesson_id.to_string(),
            })
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn create_review(
        &self,
        review_id: &str,
        lesson_id: &str,
        code: &str,
        language: &str,
    ) -> Result<(), StoreError> {
        self.lock_reviews().insert(
            review_id.to_string(),
            ReviewRecord {
                review_id: review_id.to_string(),
                lesson_id: lesson_id.to_string(),
                code: code.to_string(),
                language: language.to_string(),
                status: ReviewStatus::Pending,
                feedback: None,
                findings: Vec::new(),
            },
        );
        Ok(())
    }

    async fn add_finding(
        &self,
        review_id: &str,
        finding: &ReviewFinding,
    ) -> Result<(), StoreError> {
        let mut reviews = self.lock_reviews();
        let record = reviews.get_mut(review_id).ok_or_else(|| StoreError::NotFound {
            what: "review",
            id: review_id.to_string(),
        })?;
        record.findings.push(finding.clone());
        Ok(())
    }

    async fn complete_review(&self, review_id: &str, feedback: &str) -> Result<(), StoreError> {
        let mut reviews = self.lock_reviews();
        let record = reviews.get_mut(review_id).ok_or_else(|| StoreError::NotFound {
            what: "review",
            id: review_id.to_string(),
        })?;
        record.status = ReviewStatus::Completed;
        record.feedback = Some(feedback.to_string());
        Ok(())
    }
}
