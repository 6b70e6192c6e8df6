//! Language-model interaction: send the extraction prompt, return the text.
//!
//! The pipeline only depends on [`CompletionBackend`], a one-method seam that
//! takes a prompt and returns a completion. [`LlmBackend`] is the production
//! implementation over any `edgequake-llm` provider; tests and embedders can
//! plug in their own.
//!
//! There is no retry loop here. A failed call surfaces as a
//! [`ModelError`] and callers that want resilience wrap the whole extraction
//! in their own backoff.

use crate::error::ModelError;
use crate::prompts::{JSON_ONLY_REMINDER, MENU_ASSISTANT_ROLE};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Parameters for one completion call.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub prompt: &'a str,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// Text returned by the model plus token accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl Completion {
    /// A completion with no token accounting, handy for mocks.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Anything that can turn a prompt into a completion.
///
/// The model identifier is bound when the backend is constructed.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Short label used in logs and error messages.
    fn name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion, ModelError>;
}

/// [`CompletionBackend`] over an `edgequake-llm` provider.
pub struct LlmBackend {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl LlmBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }
}

#[async_trait]
impl CompletionBackend for LlmBackend {
    fn name(&self) -> &str {
        &self.label
    }

    /// ## Message Layout
    ///
    /// 1. System: the assistant role.
    /// 2. System: the JSON-only reminder, kept separate so it is not buried
    ///    under the long instruction block.
    /// 3. User: the full extraction prompt with the menu text.
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion, ModelError> {
        let start = Instant::now();
        let messages = vec![
            ChatMessage::system(MENU_ASSISTANT_ROLE),
            ChatMessage::system(JSON_ONLY_REMINDER),
            ChatMessage::user(request.prompt),
        ];
        let options = build_options(&request);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ModelError::from_provider_message(&self.label, e.to_string()))?;

        debug!(
            "{}: {} input tokens, {} output tokens, {:?}",
            self.label,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(Completion {
            text: response.content,
            input_tokens: response.prompt_tokens as usize,
            output_tokens: response.completion_tokens as usize,
        })
    }
}

/// Build `CompletionOptions` from a request.
fn build_options(request: &CompletionRequest<'_>) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(request.temperature),
        max_tokens: Some(request.max_tokens),
        ..Default::default()
    }
}
