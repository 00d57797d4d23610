//! Model interaction: send the extraction prompt, recover a JSON array.
//!
//! The remote model sits behind the [`CompletionClient`] capability (one
//! prompt in, one completion out) so the pipeline can run against an
//! edgequake-llm provider (named, auto-detected, or an OpenAI-compatible
//! endpoint) or a deterministic stub in tests.
//!
//! ## Reply handling
//!
//! Models wrap JSON in prose and markdown fences no matter what the prompt
//! says. [`parse_product_array`] keeps the span from the first `[` to the
//! last `]` and parses it; anything else resolves to an empty list. A reply
//! holding two separate arrays therefore spans both and fails to parse.
//! That is accepted: this stage never returns an error, it returns nothing.
//!
//! ## Retry Strategy
//!
//! Only failed *calls* are retried (transport errors, non-2xx, timeouts),
//! with exponential backoff `retry_backoff_ms * 2^(attempt-1)`. A reply that
//! arrives but holds no usable JSON is final.

use crate::config::ExtractionConfig;
use crate::error::ModelCallError;
use crate::output::ProductRecord;
use crate::prompts::build_extraction_prompt;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// One completion returned by a [`CompletionClient`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    /// 0 when the backend does not report usage.
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

impl Completion {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Boxed future returned by [`CompletionClient::complete`].
pub type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Completion, ModelCallError>> + Send + 'a>>;

/// A single-shot text completion capability.
///
/// No conversation state, no streaming: one prompt, one reply.
pub trait CompletionClient: Send + Sync {
    /// Short label for logs, e.g. `"openai/gpt-4.1-nano"`.
    fn name(&self) -> &str;

    fn complete<'a>(&'a self, prompt: &'a str) -> CompletionFuture<'a>;
}

/// Result of [`request_products`]. Never an error.
#[derive(Debug, Clone, Default)]
pub struct ModelOutcome {
    pub products: Vec<ProductRecord>,
    /// Calls made, retries included.
    pub attempts: u32,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub duration_ms: u64,
}

/// Ask the model for the products in `text` and parse its reply.
///
/// Always returns; a dead endpoint or an unusable reply both yield an
/// outcome with no products.
pub async fn request_products(
    client: &dyn CompletionClient,
    text: &str,
    config: &ExtractionConfig,
) -> ModelOutcome {
    let start = Instant::now();
    let prompt = build_extraction_prompt(text, config.prompt_template.as_deref());
    debug!("Prompt: {} chars → {}", prompt.len(), client.name());

    let mut outcome = ModelOutcome::default();

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_delay(config.retry_backoff_ms, attempt);
            warn!(
                "Model call: retry {}/{} after {}ms",
                attempt,
                config.max_retries,
                backoff.as_millis()
            );
            sleep(backoff).await;
        }

        outcome.attempts = attempt + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_model_request(outcome.attempts);
        }

        let call = timeout(
            Duration::from_secs(config.api_timeout_secs),
            client.complete(&prompt),
        )
        .await
        .unwrap_or(Err(ModelCallError::Timeout {
            secs: config.api_timeout_secs,
        }));

        match call {
            Ok(completion) => {
                outcome.prompt_tokens = completion.prompt_tokens;
                outcome.completion_tokens = completion.completion_tokens;
                outcome.products = parse_product_array(&completion.content);
                break;
            }
            Err(e) => {
                warn!("Model call: attempt {} failed — {}", attempt + 1, e);
            }
        }
    }

    outcome.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Model returned {} products after {} attempt(s) in {}ms",
        outcome.products.len(),
        outcome.attempts,
        outcome.duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_products_parsed(outcome.products.len());
    }
    outcome
}

/// Upper bound for a single retry delay.
pub const MAX_RETRY_BACKOFF_MS: u64 = 60_000;

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`,
/// saturating and capped at [`MAX_RETRY_BACKOFF_MS`].
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 2u64.checked_pow(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor).min(MAX_RETRY_BACKOFF_MS))
}

// ── Reply parsing ────────────────────────────────────────────────────────

/// Greedy first-`[`-to-last-`]` span, `.` matching newlines.
static RE_JSON_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*\]").unwrap());

/// Recover the product array from a raw model reply.
///
/// No bracketed span, or a span that is not valid JSON, yields an empty
/// list. Field names and types are not checked.
pub fn parse_product_array(reply: &str) -> Vec<ProductRecord> {
    let Some(span) = RE_JSON_ARRAY.find(reply.trim()) else {
        warn!("Model reply unusable: no JSON array found");
        return Vec::new();
    };

    match serde_json::from_str::<Value>(span.as_str()) {
        Ok(Value::Array(items)) => {
            debug!("Model JSON: {}", span.as_str());
            items
        }
        Ok(other) => {
            // Unreachable for a span that starts with '['; kept total.
            vec![other]
        }
        Err(e) => {
            warn!("Model reply unusable: invalid JSON ({})", e);
            Vec::new()
        }
    }
}

// ── edgequake-llm provider ───────────────────────────────────────────────

/// [`CompletionClient`] over an edgequake-llm provider.
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    label: String,
}

impl ProviderClient {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>, config: &ExtractionConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
            label: label.into(),
        }
    }
}

impl CompletionClient for ProviderClient {
    fn name(&self) -> &str {
        &self.label
    }

    fn complete<'a>(&'a self, prompt: &'a str) -> CompletionFuture<'a> {
        Box::pin(async move {
            let messages = vec![ChatMessage::user(prompt)];
            let response = self
                .provider
                .chat(&messages, Some(&self.options))
                .await
                .map_err(|e| ModelCallError::Provider(format!("{}", e)))?;
            Ok(Completion {
                content: response.content,
                prompt_tokens: response.prompt_tokens as usize,
                completion_tokens: response.completion_tokens as usize,
            })
        })
    }
}

/// Build `CompletionOptions` from the extraction config.
fn build_options(config: &ExtractionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
