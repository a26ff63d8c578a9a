//! Scripted language model used across the integration tests.
//!
//! Call dispatch mirrors how the pipelines use the model: the guardrail
//! call carries the guardrail system instruction, the analysis call is the
//! only JSON call without one, and generation goes through the streaming
//! surface.

use async_trait::async_trait;
use std::sync::Mutex;

use tutorloom::llm::{LanguageModel, LlmError, ResponseFormat, TokenStream};
use tutorloom::prompts::GUARDRAIL_SYSTEM;

/// One recorded single-shot call.
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub prompt: String,
    pub system: Option<String>,
    pub format: ResponseFormat,
}

/// One recorded streaming call.
#[derive(Clone, Debug)]
pub struct RecordedStreamCall {
    pub prompt: String,
    pub system: Option<String>,
}

#[derive(Clone, Debug)]
enum Script<T> {
    Respond(T),
    Fail,
}

/// Deterministic stub model.
#[derive(Debug)]
pub struct ScriptedModel {
    guardrail: Script<bool>,
    analysis: Script<String>,
    chunks: Vec<String>,
    fail_stream: bool,
    calls: Mutex<Vec<RecordedCall>>,
    stream_calls: Mutex<Vec<RecordedStreamCall>>,
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self {
            guardrail: Script::Respond(false),
            analysis: Script::Respond(
                r#"{"findings": [
                    {"line_number": 1, "category": "practices",
                     "observation": "single-letter name",
                     "guiding_question": "what does f stand for?"},
                    {"line_number": 1, "category": "practices",
                     "observation": "empty body",
                     "guiding_question": "what should this function return?"}
                ]}"#
                .to_string(),
            ),
            chunks: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            fail_stream: false,
            calls: Mutex::new(Vec::new()),
            stream_calls: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Guardrail classification answers `triggered: true`.
    pub fn with_guardrail_triggered(mut self) -> Self {
        self.guardrail = Script::Respond(true);
        self
    }

    /// Guardrail classification call fails.
    pub fn with_guardrail_failure(mut self) -> Self {
        self.guardrail = Script::Fail;
        self
    }

    /// Analysis classification call fails.
    pub fn with_analysis_failure(mut self) -> Self {
        self.analysis = Script::Fail;
        self
    }

    /// Override the streamed generation chunks.
    pub fn with_stream_chunks(mut self, chunks: &[&str]) -> Self {
        self.chunks = chunks.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Streaming generation fails before producing anything.
    pub fn with_stream_failure(mut self) -> Self {
        self.fail_stream = true;
        self
    }

    /// All recorded single-shot calls.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// All recorded streaming calls.
    pub fn stream_calls(&self) -> Vec<RecordedStreamCall> {
        self.stream_calls.lock().unwrap().clone()
    }

    /// JSON calls without a system instruction: the analysis calls.
    pub fn analysis_call_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.format == ResponseFormat::Json && c.system.is_none())
            .count()
    }

    /// Calls carrying the guardrail system instruction.
    pub fn guardrail_call_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.system.as_deref() == Some(GUARDRAIL_SYSTEM))
            .count()
    }

    /// What a successful full generation returns, for equality asserts.
    pub fn full_text(&self) -> String {
        self.chunks.concat()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
        format: ResponseFormat,
    ) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(RecordedCall {
            prompt: prompt.to_string(),
            system: system_instruction.map(str::to_string),
            format,
        });

        if system_instruction == Some(GUARDRAIL_SYSTEM) {
            return match &self.guardrail {
                Script::Respond(triggered) => Ok(format!("{{\"triggered\": {triggered}}}")),
                Script::Fail => Err(LlmError::Service {
                    message: "guardrail call scripted to fail".to_string(),
                }),
            };
        }

        if format == ResponseFormat::Json {
            return match &self.analysis {
                Script::Respond(json) => Ok(json.clone()),
                Script::Fail => Err(LlmError::Service {
                    message: "analysis call scripted to fail".to_string(),
                }),
            };
        }

        Ok(self.full_text())
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
    ) -> Result<TokenStream, LlmError> {
        self.stream_calls.lock().unwrap().push(RecordedStreamCall {
            prompt: prompt.to_string(),
            system: system_instruction.map(str::to_string),
        });

        if self.fail_stream {
            return Err(LlmError::Service {
                message: "stream scripted to fail".to_string(),
            });
        }

        let (tx, rx) = flume::unbounded();
        for chunk in &self.chunks {
            let _ = tx.send(Ok(chunk.clone()));
        }
        Ok(rx)
    }
}
