//! The AI request gateway.
//!
//! [`AiGateway`] mediates every outbound chat-completion call:
//!
//! 1. resolve the provider credential (none ⇒ `Ok(None)`),
//! 2. serve from the two-tier [`ResponseCache`] when possible,
//! 3. collapse identical concurrent requests via [`InflightRegistry`],
//! 4. admit the call through the sliding-window [`RateLimiter`],
//! 5. run the attempt loop with exponential backoff.
//!
//! Only the user-facing errors (`LocalRateLimited`, `ProviderRateLimited`,
//! `InvalidCredential`) come back as `Err`. Every other failure is logged
//! and resolves to `Ok(None)` so callers can show a fallback without
//! special-casing routine provider hiccups.

mod builder;
pub mod dedup;
pub mod rate_limit;

pub use builder::{Huginn, HuginnBuilder};
pub use dedup::InflightRegistry;
pub use rate_limit::{RateLimitConfig, RateLimiter};

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, instrument, warn};

use crate::cache::{ResponseCache, cache_key};
use crate::providers::{CompletionTransport, CredentialSource, Provider, RetryConfig};
use crate::telemetry;
use crate::types::{ChatRequest, CompletionOptions, CompletionResponse, Message};
use crate::{HuginnError, Result};

/// Default model when neither the options nor the config name one.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// What one attempt produced.
enum Attempt {
    /// Terminal: return this to the caller.
    Done(Result<Option<String>>),
    /// Provider said 429.
    Throttled { retry_after: Option<Duration> },
    /// Network fault or unreadable body.
    Faulted(HuginnError),
}

pub(crate) struct GatewayInner {
    pub(crate) model: String,
    pub(crate) credentials: Arc<dyn CredentialSource>,
    pub(crate) transport: Arc<dyn CompletionTransport>,
    pub(crate) cache: ResponseCache,
    pub(crate) inflight: InflightRegistry<Result<Option<String>>>,
    pub(crate) limiter: RateLimiter,
    pub(crate) retry: RetryConfig,
}

/// Cached, deduplicated, rate-limited access to a chat-completion API.
///
/// Cheap to clone; clones share cache, limiter and in-flight state.
#[derive(Clone)]
pub struct AiGateway {
    inner: Arc<GatewayInner>,
}

impl AiGateway {
    pub(crate) fn from_inner(inner: GatewayInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Create a new builder.
    pub fn builder() -> HuginnBuilder {
        HuginnBuilder::new()
    }

    /// Whether a provider credential is configured right now.
    pub fn is_configured(&self) -> bool {
        self.inner.credentials.resolve().is_some()
    }

    /// The response cache (exposed for inspection and `clear`).
    pub fn cache(&self) -> &ResponseCache {
        &self.inner.cache
    }

    /// The local rate limiter (exposed so UIs can pre-check).
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.inner.limiter
    }

    /// Number of requests currently in flight.
    pub fn inflight_len(&self) -> usize {
        self.inner.inflight.len()
    }

    /// Single-prompt completion.
    ///
    /// Checks the cache first, then joins an identical in-flight request if
    /// there is one; otherwise admits through the rate limiter and runs the
    /// attempt loop. A successful response is cached. If every caller waiting
    /// on a request drops its future, the request is abandoned.
    #[instrument(
        skip_all,
        fields(max_tokens = options.max_tokens, temperature = options.temperature)
    )]
    pub async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<Option<String>> {
        let Some(provider) = self.inner.credentials.resolve() else {
            debug!("no AI provider configured");
            return Ok(None);
        };

        let model = self.model_for(options);
        let key = cache_key(&model, prompt, options.max_tokens, options.temperature);
        if let Some(hit) = self.inner.cache.get(&key) {
            debug!(key = %key, "cache hit");
            return Ok(Some(hit));
        }

        let request = ChatRequest {
            model,
            messages: vec![Message::user(prompt)],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        let inner = Arc::clone(&self.inner);
        let owned_key = key.clone();
        self.inner
            .inflight
            .run(&key, move || async move {
                // an identical call may have filled the cache since the check above
                if let Some(hit) = inner.cache.get(&owned_key) {
                    return Ok(Some(hit));
                }
                inner.limiter.try_admit()?;
                execute(&inner, &provider, &request, Some(&owned_key)).await
            })
            .await
    }

    /// Multi-turn completion over a full conversation.
    ///
    /// Rate limited and retried like [`complete`](Self::complete), but never
    /// cached or deduplicated: the same key can legitimately need a
    /// different answer at a different point in a conversation.
    #[instrument(skip_all, fields(turns = messages.len()))]
    pub async fn chat(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Option<String>> {
        let Some(provider) = self.inner.credentials.resolve() else {
            debug!("no AI provider configured");
            return Ok(None);
        };

        self.inner.limiter.try_admit()?;

        let request = ChatRequest {
            model: self.model_for(options),
            messages: messages.to_vec(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };
        execute(&self.inner, &provider, &request, None).await
    }

    fn model_for(&self, options: &CompletionOptions) -> String {
        options
            .model
            .clone()
            .unwrap_or_else(|| self.inner.model.clone())
    }
}

/// The attempt loop.
///
/// The first attempt's rate-limit slot was taken by the caller's admission
/// check; later attempts record their own slot when `count_retries` is set.
async fn execute(
    inner: &GatewayInner,
    provider: &Provider,
    request: &ChatRequest,
    cache_key: Option<&str>,
) -> Result<Option<String>> {
    let retry = &inner.retry;
    let provider_name = provider.kind.name();
    let started = Instant::now();

    let mut attempt = 0;
    let outcome = loop {
        if attempt > 0 && inner.limiter.config().count_retries {
            inner.limiter.record_request();
        }

        let (delay, reason) = match attempt_once(inner, provider, request, cache_key).await {
            Attempt::Done(result) => break result,
            Attempt::Throttled { retry_after } => {
                if retry.is_last(attempt) {
                    warn!(
                        provider = provider_name,
                        attempts = attempt + 1,
                        "provider rate limit, retries exhausted"
                    );
                    break Err(HuginnError::ProviderRateLimited { retry_after });
                }
                let delay = retry.effective_delay(attempt, retry_after);
                (delay, "rate limited".to_string())
            }
            Attempt::Faulted(e) => {
                if !e.is_transient() {
                    warn!(provider = provider_name, error = %e, "AI request failed");
                    break Ok(None);
                }
                if retry.is_last(attempt) {
                    warn!(
                        provider = provider_name,
                        attempts = attempt + 1,
                        error = %e,
                        "giving up after transient errors"
                    );
                    break Ok(None);
                }
                (retry.delay_for_attempt(attempt), e.to_string())
            }
        };

        metrics::counter!(telemetry::RETRIES_TOTAL, "provider" => provider_name).increment(1);
        warn!(
            provider = provider_name,
            attempt = attempt + 1,
            max_attempts = retry.max_attempts,
            delay_ms = delay.as_millis() as u64,
            reason = %reason,
            "retrying AI request"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    };

    let status = match &outcome {
        Ok(Some(_)) => "ok",
        Ok(None) => "empty",
        Err(_) => "error",
    };
    metrics::counter!(telemetry::REQUESTS_TOTAL, "provider" => provider_name, "status" => status)
        .increment(1);
    metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS, "provider" => provider_name)
        .record(started.elapsed().as_secs_f64());

    outcome
}

/// One HTTP exchange, classified.
async fn attempt_once(
    inner: &GatewayInner,
    provider: &Provider,
    request: &ChatRequest,
    cache_key: Option<&str>,
) -> Attempt {
    let response = match inner.transport.send(provider, request).await {
        Ok(response) => response,
        Err(e) => return Attempt::Faulted(e),
    };

    match response.status {
        200..=299 => {
            let content = match CompletionResponse::parse(&response.body) {
                Ok(parsed) => parsed.into_content(),
                Err(e) => return Attempt::Faulted(e),
            };
            match content {
                Some(text) => {
                    if let Some(key) = cache_key {
                        inner.cache.set(key, &text);
                    }
                    Attempt::Done(Ok(Some(text)))
                }
                None => {
                    debug!("provider returned no completion text");
                    Attempt::Done(Ok(None))
                }
            }
        }
        429 => Attempt::Throttled {
            retry_after: response.retry_after,
        },
        401 => Attempt::Done(Err(HuginnError::InvalidCredential)),
        status => {
            let error = api_error(status, &response.body);
            warn!(status, error = %error, "AI provider error");
            Attempt::Done(Ok(None))
        }
    }
}

fn api_error(status: u16, body: &str) -> HuginnError {
    HuginnError::Api {
        status,
        message: truncate(body.trim(), 200).to_string(),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }

    #[test]
    fn api_error_keeps_status_and_trims_body() {
        let body = format!("  {}  ", "x".repeat(300));
        match api_error(503, &body) {
            HuginnError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message.len(), 200);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
