//! Text generation: the seam between the pipeline and an LLM provider.
//!
//! The pipeline only ever sees [`TextGenerator`]: a prompt, an optional
//! system message and sampling options go in, raw response text comes out.
//! [`LlmGenerator`] implements it over an `edgequake_llm` provider. Tests
//! implement it with canned responses.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient and frequent under
//! load. Each attempt is bounded by `timeout_secs`; failures back off
//! exponentially (`retry_backoff_ms * 2^attempt`): with 500 ms base and 3
//! retries the waits are 500 ms → 1 s → 2 s.
//!
//! A provider that keeps failing yields [`GenerationError`]. Nothing here
//! looks at the response text; malformed output is the repair engine's job.

use crate::error::GenerationError;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// One generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_message: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<usize>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_message: None,
            temperature: 0.7,
            max_tokens: None,
        }
    }

    pub fn system(mut self, message: impl Into<String>) -> Self {
        self.system_message = Some(message.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.max_tokens = Some(n);
        self
    }
}

/// Produces response text for a prompt.
pub trait TextGenerator: Send + Sync {
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send;
}

impl<G: TextGenerator> TextGenerator for Arc<G> {
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send {
        (**self).generate(request)
    }
}

/// [`TextGenerator`] backed by an `edgequake_llm` provider, with per-call
/// timeout and exponential-backoff retries.
#[derive(Clone)]
pub struct LlmGenerator {
    provider: Arc<dyn LLMProvider>,
    max_retries: u32,
    retry_backoff_ms: u64,
    timeout_secs: u64,
}

impl LlmGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            max_retries: 3,
            retry_backoff_ms: 500,
            timeout_secs: 120,
        }
    }

    pub fn with_retries(mut self, max_retries: u32, retry_backoff_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff_ms = retry_backoff_ms;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl std::fmt::Debug for LlmGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmGenerator")
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl TextGenerator for LlmGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let start = Instant::now();
        let messages = build_messages(request);
        let options = build_options(request);
        let mut last_err: Option<String> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = backoff_ms(self.retry_backoff_ms, attempt);
                warn!(
                    "LLM retry {}/{} after {}ms",
                    attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            let call = self.provider.chat(&messages, Some(&options));
            match timeout(Duration::from_secs(self.timeout_secs), call).await {
                Ok(Ok(response)) => {
                    debug!(
                        "LLM call: {} input tokens, {} output tokens, {:?}",
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    return Ok(received_text(response.content));
                }
                Ok(Err(e)) => {
                    warn!("LLM attempt {} failed: {}", attempt + 1, e);
                    last_err = Some(e.to_string());
                }
                Err(_) => {
                    warn!(
                        "LLM attempt {} timed out after {}s",
                        attempt + 1,
                        self.timeout_secs
                    );
                    last_err = None;
                }
            }
        }

        Err(match last_err {
            Some(detail) => GenerationError::Failed {
                retries: self.max_retries,
                detail,
            },
            None => GenerationError::Timeout {
                secs: self.timeout_secs,
            },
        })
    }
}

/// Delay before retry `attempt` (1-based): base, 2×base, 4×base, ...
fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

/// A reply that arrived is handed on even when blank; repair decides what it
/// is worth.
fn received_text(content: String) -> String {
    if content.trim().is_empty() {
        warn!("LLM returned an empty reply");
    }
    content
}

fn build_messages(request: &GenerationRequest) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = request.system_message.as_deref() {
        messages.push(ChatMessage::system(system));
    }
    messages.push(ChatMessage::user(request.prompt.as_str()));
    messages
}

fn build_options(request: &GenerationRequest) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(request.temperature),
        max_tokens: request.max_tokens,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_follow_request() {
        let req = GenerationRequest::new("hi").temperature(0.3).max_tokens(4000);
        let opts = build_options(&req);
        assert_eq!(opts.temperature, Some(0.3));
        assert_eq!(opts.max_tokens, Some(4000));
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        assert_eq!(backoff_ms(500, 1), 500);
        assert_eq!(backoff_ms(500, 2), 1000);
        assert_eq!(backoff_ms(500, 4), 4000);
        assert_eq!(backoff_ms(500, 64), u64::MAX);
        assert_eq!(backoff_ms(500, u32::MAX), u64::MAX);
    }

    #[test]
    fn blank_replies_are_passed_through() {
        assert_eq!(received_text("  \n".to_string()), "  \n");
        assert_eq!(received_text("[]".to_string()), "[]");
    }

    #[test]
    fn system_message_is_optional() {
        assert_eq!(build_messages(&GenerationRequest::new("hi")).len(), 1);
        let req = GenerationRequest::new("hi").system("be brief");
        assert_eq!(build_messages(&req).len(), 2);
    }
}
