//! The text-generation capability consumed by pipeline nodes.
//!
//! The crate never talks to a concrete model API; it consumes
//! [`LanguageModel`], a trait with the one call contract the pipelines
//! need: single-shot generation (optionally constrained to JSON for the
//! classification calls) and streamed generation yielding ordered text
//! increments. Transport, retries, and timeouts belong to implementations.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

/// Output constraint for a single-shot generation call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Free-form text.
    Text,
    /// The model must return a single JSON document. Used by the guardrail
    /// and analysis classification calls.
    Json,
}

/// Failures from the model service.
#[derive(Debug, Error, Diagnostic)]
pub enum LlmError {
    /// The service rejected or failed the request.
    #[error("model service error: {message}")]
    #[diagnostic(code(tutorloom::llm::service))]
    Service {
        /// Service-reported description.
        message: String,
    },

    /// The service reported quota exhaustion.
    #[error("model quota exceeded")]
    #[diagnostic(
        code(tutorloom::llm::quota),
        help("Back off and retry later, or rotate credentials.")
    )]
    QuotaExceeded,

    /// The stream broke after it was established.
    #[error("model stream error: {message}")]
    #[diagnostic(code(tutorloom::llm::stream))]
    Stream {
        /// Failure description.
        message: String,
    },
}

/// Ordered sequence of generated text increments.
///
/// The receiver ends when the model finishes; a mid-stream failure arrives
/// as one `Err` item and terminates the sequence.
pub type TokenStream = flume::Receiver<Result<String, LlmError>>;

/// Text-generation capability with single-shot and streaming calls.
#[async_trait]
pub trait LanguageModel: Send + Sync + std::fmt::Debug {
    /// Generate one completed text for the prompt.
    async fn generate(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
        format: ResponseFormat,
    ) -> Result<String, LlmError>;

    /// Generate text as an ordered stream of increments.
    async fn generate_stream(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
    ) -> Result<TokenStream, LlmError>;
}
