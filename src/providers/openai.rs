//! OpenAI-compatible chat-completion transport.
//!
//! The transport performs exactly one HTTP exchange and reports what came
//! back. Status classification (retry on 429, fail on 401, ...) is the
//! gateway's job, so the transport never turns a non-2xx status into an
//! error; only failures to talk to the server at all are `Err`.
//!
//! See: <https://platform.openai.com/docs/api-reference/chat/create>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};

use super::credentials::Provider;
use crate::types::{ChatRequest, TransportResponse};
use crate::{HuginnError, Result};

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One round-trip to a chat-completion endpoint.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Send `request` authenticated as `provider`.
    ///
    /// Returns `Err` only for transport failures (connect, timeout, body
    /// read). Every HTTP status, including errors, is `Ok`.
    async fn send(&self, provider: &Provider, request: &ChatRequest) -> Result<TransportResponse>;
}

/// reqwest-backed transport.
#[derive(Clone)]
pub struct HttpTransport {
    http: Client,
    base_url: Option<String>,
}

impl HttpTransport {
    /// Create a transport using each provider's default base URL.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(crate::version::user_agent())
            .build()
            .map_err(|e| HuginnError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: None,
        })
    }

    /// Create a transport that sends every request to `base_url`
    /// (self-hosted proxies, or wiremock in tests).
    pub fn with_base_url(timeout: Duration, base_url: impl Into<String>) -> Result<Self> {
        let mut transport = Self::new(timeout)?;
        transport.base_url = Some(base_url.into());
        Ok(transport)
    }

    fn endpoint(&self, provider: &Provider) -> String {
        let base = self
            .base_url
            .as_deref()
            .unwrap_or_else(|| provider.kind.default_base_url());
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionTransport for HttpTransport {
    async fn send(&self, provider: &Provider, request: &ChatRequest) -> Result<TransportResponse> {
        let response = self
            .http
            .post(self.endpoint(provider))
            .header(AUTHORIZATION, format!("Bearer {}", provider.api_key()))
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let retry_after = parse_retry_after(response.headers());
        let body = response.text().await?;

        Ok(TransportResponse {
            status,
            retry_after,
            body,
        })
    }
}

/// Parse a `Retry-After` header given in whole seconds.
///
/// The HTTP-date form is ignored; callers fall back to their own backoff.
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderMap, HeaderValue};

    use super::*;
    use crate::providers::ProviderKind;

    #[test]
    fn retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("5"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(5)));
    }

    #[test]
    fn retry_after_http_date_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn endpoint_uses_provider_default() {
        let transport = HttpTransport::new(DEFAULT_TIMEOUT).unwrap();
        let router = Provider::new(ProviderKind::OpenRouter, "k").unwrap();
        assert_eq!(
            transport.endpoint(&router),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }

    #[test]
    fn endpoint_override_trims_slash() {
        let transport =
            HttpTransport::with_base_url(DEFAULT_TIMEOUT, "http://localhost:9/v1/").unwrap();
        let openai = Provider::new(ProviderKind::OpenAi, "k").unwrap();
        assert_eq!(
            transport.endpoint(&openai),
            "http://localhost:9/v1/chat/completions"
        );
    }
}
