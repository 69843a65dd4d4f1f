//! Model interaction: one prompt in, one text completion out.
//!
//! Every stage talks to the model through [`CompletionClient`], an explicitly
//! constructed object handed to each component. The production
//! implementation, [`LlmClient`], wraps any `edgequake-llm` provider; tests
//! substitute a scripted client.
//!
//! ## Retry Strategy
//!
//! Off by default: a failed call surfaces immediately. With `max_retries > 0`
//! the wait doubles per attempt (`retry_backoff_ms * 2^attempt`), so 500 ms
//! with three retries waits 500 ms → 1 s → 2 s.

use crate::config::FillConfig;
use crate::error::FillError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// A single request to the model.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    /// Page images attached to the user message (ingestion only).
    pub images: Vec<ImageData>,
}

impl CompletionRequest {
    /// Text-only request.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            images: Vec::new(),
        }
    }

    /// Request carrying one image alongside the prompt.
    pub fn with_image(prompt: impl Into<String>, image: ImageData) -> Self {
        Self {
            prompt: prompt.into(),
            images: vec![image],
        }
    }
}

/// The model's answer plus accounting.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    pub retries: u32,
}

/// Anything that can answer a [`CompletionRequest`].
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, FillError>;
}

/// [`CompletionClient`] backed by an `edgequake-llm` provider.
pub struct LlmClient {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl LlmClient {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &FillConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        }
    }
}

#[async_trait]
impl CompletionClient for LlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, FillError> {
        let start = Instant::now();
        let message = if request.images.is_empty() {
            ChatMessage::user(request.prompt.as_str())
        } else {
            ChatMessage::user_with_images(request.prompt.as_str(), request.images.clone())
        };
        let messages = vec![message];

        let mut last_err: Option<String> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "Retry {}/{} after {}ms",
                    attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match self.provider.chat(&messages, Some(&self.options)).await {
                Ok(response) => {
                    let duration = start.elapsed();
                    debug!(
                        "{} input tokens, {} output tokens, {:?}",
                        response.prompt_tokens, response.completion_tokens, duration
                    );
                    return Ok(Completion {
                        text: response.content,
                        input_tokens: response.prompt_tokens,
                        output_tokens: response.completion_tokens,
                        duration_ms: duration.as_millis() as u64,
                        retries: attempt,
                    });
                }
                Err(e) => {
                    let err_msg = format!("{}", e);
                    warn!("Attempt {} failed: {}", attempt + 1, err_msg);
                    last_err = Some(err_msg);
                }
            }
        }

        Err(FillError::LlmFailed {
            retries: self.max_retries,
            detail: last_err.unwrap_or_else(|| "Unknown error".to_string()),
        })
    }
}

/// Build `CompletionOptions` from the fill config.
fn build_options(config: &FillConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
